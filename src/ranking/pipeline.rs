//! # RankingPipeline — Filtra, Pontua, Compõe e Ordena
//!
//! Máquina de estados linear por requisição:
//!
//! ```text
//! RawCandidates ──▶ Filtered ──▶ Scored (por scorer) ──▶ Composed ──▶ Ranked
//!                 (filtros em       (scorers em          (1/N)       (score ↓, URI ↑)
//!                  paralelo, ∩)      paralelo)
//! ```
//!
//! Nenhum estado de ranking é persistido: a pontuação composta é
//! recalculada a cada chamada.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use super::composer::{ScorerOutput, UniformScoreComposer};
use super::filter::{self, Filter};
use super::ranker::StandardRanker;
use super::scorer::{Scorer, ScorerContext, ScorerKind};
use crate::core::ServiceCatalog;
use crate::error::{DiscoveryError, Result};
use crate::matching::MatchResult;

/// Entrada do resultado final.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedResource {
    pub resource: String,
    /// Posição na ordem final, a partir de 1.
    pub position: usize,
    pub score: f64,
    /// Melhor match que trouxe o recurso, se houver.
    pub best_match: Option<MatchResult>,
}

/// Pipeline configurado: filtros já construídos e os scorers a instanciar
/// por requisição.
pub struct RankingPipeline {
    catalog: Arc<dyn ServiceCatalog>,
    filters: Vec<Box<dyn Filter>>,
    scorers: Vec<ScorerKind>,
    extra_scorers: Vec<Arc<dyn Scorer>>,
    composer: UniformScoreComposer,
    ranker: StandardRanker,
}

impl RankingPipeline {
    pub fn new(
        catalog: Arc<dyn ServiceCatalog>,
        filters: Vec<Box<dyn Filter>>,
        scorers: Vec<ScorerKind>,
    ) -> Self {
        Self {
            catalog,
            filters,
            scorers,
            extra_scorers: Vec::new(),
            composer: UniformScoreComposer,
            ranker: StandardRanker,
        }
    }

    /// Acrescenta um scorer já instanciado (injeção programática).
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.extra_scorers.push(scorer);
        self
    }

    pub fn scorer_count(&self) -> usize {
        self.scorers.len() + self.extra_scorers.len()
    }

    /// Ordena os candidatos. `candidates` mapeia URI → melhor match;
    /// `text` é repassado a todos os scorers; `limit` corta o resultado.
    pub fn rank(
        &self,
        candidates: &BTreeMap<String, Option<MatchResult>>,
        text: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<RankedResource> {
        let raw: BTreeSet<String> = candidates.keys().cloned().collect();
        let filtered = filter::apply_all(&self.filters, &raw);

        let best_matches: HashMap<String, MatchResult> = candidates
            .iter()
            .filter_map(|(r, m)| m.clone().map(|m| (r.clone(), m)))
            .collect();
        let ctx = ScorerContext {
            catalog: Arc::clone(&self.catalog),
            best_matches: Arc::new(best_matches),
        };

        let mut scorers: Vec<(String, Result<Arc<dyn Scorer>>)> = self
            .scorers
            .iter()
            .map(|kind| (format!("{kind:?}"), kind.build(&ctx).map(Arc::from)))
            .collect();
        scorers.extend(
            self.extra_scorers
                .iter()
                .map(|s| (s.name().to_string(), Ok(Arc::clone(s)))),
        );

        let outputs: Vec<ScorerOutput> = scorers
            .into_par_iter()
            .map(|(name, scorer)| match scorer {
                Ok(scorer) => {
                    let name = scorer.name().to_string();
                    let result = isolate(&name, || scorer.apply(&filtered, text));
                    (name, result)
                }
                Err(e) => (name, Err(e)),
            })
            .collect();

        let composite = self.composer.compose(&filtered, &outputs);
        let mut ranked = self.ranker.rank(composite);
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }

        tracing::debug!(
            candidates = raw.len(),
            filtered = filtered.len(),
            scorers = outputs.len(),
            returned = ranked.len(),
            "Pipeline de ranking concluído"
        );

        ranked
            .into_iter()
            .enumerate()
            .map(|(i, (resource, score))| RankedResource {
                best_match: candidates.get(&resource).cloned().flatten(),
                resource,
                position: i + 1,
                score,
            })
            .collect()
    }
}

/// Executa um scorer convertendo pânico em erro, para que ele conte como
/// contribuição zero em vez de derrubar a requisição.
fn isolate<F>(name: &str, score: F) -> Result<HashMap<String, f64>>
where
    F: FnOnce() -> Result<HashMap<String, f64>>,
{
    panic::catch_unwind(AssertUnwindSafe(score)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "pânico sem mensagem".to_string());
        Err(DiscoveryError::Unavailable(format!(
            "scorer '{name}' entrou em pânico: {reason}"
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Concept, InMemoryCatalog, MatchType, Operation, Service};
    use crate::ranking::filter::NamespaceFilter;

    fn catalog() -> Arc<dyn ServiceCatalog> {
        let svc = Service::new(
            "svc:a",
            vec![
                Operation::new("op:alpha", vec![], vec![]),
                Operation::new("op:beta", vec![], vec![]),
                Operation::new("op:gamma", vec![], vec![]),
                Operation::new("x:delta", vec![], vec![]),
            ],
        );
        let usage = HashMap::from([("op:gamma".to_string(), 10), ("op:beta".to_string(), 10)]);
        Arc::new(InMemoryCatalog::from_services(vec![svc], usage))
    }

    fn candidates() -> BTreeMap<String, Option<MatchResult>> {
        let m = |t: MatchType| {
            Some(MatchResult::new(Concept::new("o"), Concept::new("d"), t, "logic"))
        };
        BTreeMap::from([
            ("op:alpha".to_string(), m(MatchType::EXACT)),
            ("op:beta".to_string(), m(MatchType::PLUGIN)),
            ("op:gamma".to_string(), m(MatchType::PLUGIN)),
            ("x:delta".to_string(), None),
        ])
    }

    struct Broken;

    impl Scorer for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn apply(&self, _: &BTreeSet<String>, _: Option<&str>) -> Result<HashMap<String, f64>> {
            Err(DiscoveryError::Unavailable("sem dados".into()))
        }
    }

    struct Panicking;

    impl Scorer for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn apply(&self, _: &BTreeSet<String>, _: Option<&str>) -> Result<HashMap<String, f64>> {
            panic!("índice fora do intervalo")
        }
    }

    #[test]
    fn ties_break_by_uri_and_positions_start_at_one() {
        let pipeline = RankingPipeline::new(
            catalog(),
            vec![],
            vec![ScorerKind::Popularity, ScorerKind::MatchQuality],
        );
        let ranked = pipeline.rank(&candidates(), None, None);
        let order: Vec<&str> = ranked.iter().map(|r| r.resource.as_str()).collect();
        // beta e gamma empatam (uso 10, Plugin); alpha só tem Exact; delta nada
        assert_eq!(order, vec!["op:beta", "op:gamma", "op:alpha", "x:delta"]);
        assert_eq!(ranked[0].position, 1);
        assert!((ranked[0].score - 0.9).abs() < 1e-9);
        assert!((ranked[2].score - 0.5).abs() < 1e-9);
        assert_eq!(ranked[3].score, 0.0);
        assert!(ranked[3].best_match.is_none());
    }

    #[test]
    fn pipeline_is_deterministic() {
        let pipeline = RankingPipeline::new(
            catalog(),
            vec![],
            vec![ScorerKind::Popularity, ScorerKind::TextRelevance, ScorerKind::MatchQuality],
        );
        let first = pipeline.rank(&candidates(), Some("beta"), None);
        let second = pipeline.rank(&candidates(), Some("beta"), None);
        assert_eq!(first, second);
    }

    #[test]
    fn filters_and_limit_apply_before_output() {
        let pipeline = RankingPipeline::new(
            catalog(),
            vec![Box::new(NamespaceFilter::new("op:"))],
            vec![ScorerKind::MatchQuality],
        );
        let ranked = pipeline.rank(&candidates(), None, Some(2));
        let order: Vec<&str> = ranked.iter().map(|r| r.resource.as_str()).collect();
        assert_eq!(order, vec!["op:alpha", "op:beta"]);
    }

    #[test]
    fn broken_scorer_counts_but_contributes_zero() {
        let pipeline = RankingPipeline::new(catalog(), vec![], vec![ScorerKind::MatchQuality])
            .with_scorer(Arc::new(Broken));
        assert_eq!(pipeline.scorer_count(), 2);
        let ranked = pipeline.rank(&candidates(), None, None);
        assert_eq!(ranked[0].resource, "op:alpha");
        assert!((ranked[0].score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn panicking_scorer_counts_but_contributes_zero() {
        let pipeline = RankingPipeline::new(catalog(), vec![], vec![ScorerKind::MatchQuality])
            .with_scorer(Arc::new(Panicking));
        let ranked = pipeline.rank(&candidates(), None, None);
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0].resource, "op:alpha");
        assert!((ranked[0].score - 0.5).abs() < 1e-9);
    }
}
