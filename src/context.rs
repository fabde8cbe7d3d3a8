//! # DiscoveryContext — Contexto Explícito do Processo
//!
//! Monta uma única vez tudo que a descoberta precisa e é passado por
//! referência aos pontos de entrada. Não existe estado global.
//!
//! ```text
//! DiscoveryConfig ─┐
//! ServiceCatalog ──┼──▶ DiscoveryContext::build
//! Reasoner ────────┘        │
//!                           ├── MatchTypeRegistry (pré-definidos + config)
//!                           ├── matcher (MatcherKind: logic | indexed → store)
//!                           ├── RelevantServicesFinder
//!                           ├── OperationDiscoverer
//!                           └── RankingPipeline (filtros + scorers)
//! ```
//!
//! ## Fluxo de `discover`
//!
//! 1. Valida a consulta (sementes, limite)
//! 2. Busca de composição a partir das sementes
//! 3. Candidatos = operações das camadas (+ produtoras das saídas pedidas)
//! 4. Pipeline de ranking (filtros → scorers → compositor → ranker)
//! 5. Resposta com `(recurso, posição, pontuação, melhor match)` e as camadas

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DiscoveryConfig;
use crate::core::{match_type, Concept, Deadline, MatchType, MatchTypeRegistry, ServiceCatalog};
use crate::discovery::{
    CompositionOptions, CompositionOutcome, Coverage, OperationDiscoverer, RelevantServicesFinder,
};
use crate::error::{DiscoveryError, Result};
use crate::matching::{ConceptMatcher, IndexedConceptMatcher, MatchResult, MatcherChain, Reasoner};
use crate::ranking::{Filter, RankedResource, RankingPipeline};

/// Consulta de descoberta.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiscoveryQuery {
    /// Conceitos que o chamador já possui.
    pub seeds: Vec<Concept>,
    /// Conceitos que o chamador deseja obter (opcional).
    #[serde(default)]
    pub requested_outputs: Vec<Concept>,
    /// Texto livre repassado aos scorers.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// Resposta de descoberta, ordenada pelo ranker.
#[derive(Clone, Debug, Serialize)]
pub struct DiscoveryResponse {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<RankedResource>,
    pub composition: CompositionOutcome,
    pub elapsed_ms: u64,
}

/// Contexto de descoberta de um processo.
pub struct DiscoveryContext {
    config: DiscoveryConfig,
    catalog: Arc<dyn ServiceCatalog>,
    registry: Arc<MatchTypeRegistry>,
    matcher: Arc<dyn ConceptMatcher>,
    /// Presente quando o matcher é `indexed`.
    index: Option<Arc<IndexedConceptMatcher>>,
    finder: RelevantServicesFinder,
    discoverer: OperationDiscoverer,
    pipeline: RankingPipeline,
    composition_threshold: MatchType,
}

impl DiscoveryContext {
    /// Constrói o contexto. Pode popular o índice de matches (chamada
    /// cara e bloqueante); qualquer falha aqui é fatal.
    pub fn build(
        config: DiscoveryConfig,
        catalog: Arc<dyn ServiceCatalog>,
        reasoner: Arc<dyn Reasoner>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(config.registry()?);
        let configured_threshold = registry.resolve(&config.matcher.index_threshold)?;
        let index_threshold = config.index_threshold(&registry)?;
        if index_threshold != configured_threshold {
            tracing::info!(
                configured = %configured_threshold,
                effective = %index_threshold,
                "Limiar do índice rebaixado para cobrir composição e filtros"
            );
        }
        let composition_threshold = registry.resolve(&config.composition.threshold)?;

        let mut vocabulary: BTreeSet<Concept> = catalog.concepts();
        let ontology = reasoner.concepts().map_err(|e| {
            DiscoveryError::Configuration(format!("reasoner indisponível: {e}"))
        })?;
        vocabulary.extend(ontology);

        let store = config.open_store().map_err(|e| {
            DiscoveryError::Configuration(format!("store do índice indisponível: {e}"))
        })?;
        let MatcherChain { matcher, index } = config.matcher.kind.build(
            reasoner,
            Arc::clone(&registry),
            &vocabulary,
            index_threshold,
            store,
            &Deadline::from_millis(config.matcher.build_deadline_ms),
        )?;

        let mut finder = RelevantServicesFinder::new(Arc::clone(&matcher), Arc::clone(&catalog));
        if let Some(threads) = config.composition.worker_threads {
            finder = finder.with_worker_threads(threads)?;
        }
        let discoverer = OperationDiscoverer::new(Arc::clone(&matcher), Arc::clone(&catalog));

        let filters: Vec<Box<dyn Filter>> = config
            .ranking
            .filters
            .iter()
            .map(|spec| spec.build(&catalog, &matcher, &registry))
            .collect::<Result<_>>()?;
        let pipeline = RankingPipeline::new(
            Arc::clone(&catalog),
            filters,
            config.ranking.scorers.clone(),
        );

        tracing::info!(
            matcher = matcher.id(),
            vocabulary = vocabulary.len(),
            operations = catalog.operations().len(),
            filters = config.ranking.filters.len(),
            scorers = pipeline.scorer_count(),
            "Contexto de descoberta pronto"
        );

        Ok(Self {
            config,
            catalog,
            registry,
            matcher,
            index,
            finder,
            discoverer,
            pipeline,
            composition_threshold,
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<dyn ServiceCatalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &MatchTypeRegistry {
        &self.registry
    }

    pub fn matcher(&self) -> &Arc<dyn ConceptMatcher> {
        &self.matcher
    }

    /// Reconstrói o índice de matches sobre o vocabulário atual.
    ///
    /// Retorna `false` quando o matcher configurado não é indexado.
    pub fn rebuild_index(&self, deadline: &Deadline) -> Result<bool> {
        let Some(index) = &self.index else {
            return Ok(false);
        };
        index.rebuild(deadline)?;
        Ok(true)
    }

    pub fn discoverer(&self) -> &OperationDiscoverer {
        &self.discoverer
    }

    /// Busca de composição com o limiar, limite de rodadas e prazo configurados.
    pub fn compose(&self, seeds: &[Concept]) -> Result<CompositionOutcome> {
        let options = CompositionOptions {
            threshold: self.composition_threshold.clone(),
            max_rounds: self.config.composition.max_rounds,
            deadline: Deadline::from_millis(self.config.composition.deadline_ms),
        };
        self.finder.find(seeds, &options)
    }

    /// Descoberta ponta a ponta.
    pub fn discover(&self, query: &DiscoveryQuery) -> Result<DiscoveryResponse> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("discover", %request_id, seeds = query.seeds.len());
        let _enter = span.enter();
        let started = Instant::now();

        Self::validate(query)?;
        let composition = self.compose(&query.seeds)?;

        let mut candidates: BTreeMap<String, Option<MatchResult>> = composition
            .unlocked_by
            .iter()
            .map(|(uri, matches)| (uri.clone(), strongest(matches)))
            .collect();

        if !query.requested_outputs.is_empty() {
            let hits = self.discoverer.find_producing(
                &query.requested_outputs,
                &self.composition_threshold,
                Coverage::Any,
            );
            for hit in hits {
                let slot = candidates.entry(hit.resource).or_insert(None);
                if slot
                    .as_ref()
                    .map_or(true, |current| hit.best.match_type > current.match_type)
                {
                    *slot = Some(hit.best);
                }
            }
        }

        let limit = query.max_results.unwrap_or(self.config.ranking.max_results);
        let results = self
            .pipeline
            .rank(&candidates, query.text.as_deref(), Some(limit));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            candidates = candidates.len(),
            results = results.len(),
            layers = ?composition.layer_sizes(),
            elapsed_ms,
            "Descoberta concluída"
        );

        Ok(DiscoveryResponse {
            request_id,
            generated_at: Utc::now(),
            results,
            composition,
            elapsed_ms,
        })
    }

    fn validate(query: &DiscoveryQuery) -> Result<()> {
        if query.seeds.is_empty() {
            return Err(DiscoveryError::EmptySeed);
        }
        if let Some(blank) = query
            .seeds
            .iter()
            .chain(&query.requested_outputs)
            .find(|c| c.as_str().trim().is_empty())
        {
            return Err(DiscoveryError::InvalidQuery(format!(
                "conceito vazio na consulta: '{blank}'"
            )));
        }
        if query.max_results == Some(0) {
            return Err(DiscoveryError::InvalidQuery(
                "max_results deve ser maior que zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Match mais forte entre os que destravaram uma operação.
fn strongest(matches: &[MatchResult]) -> Option<MatchResult> {
    let top = match_type::best(matches.iter().map(|m| &m.match_type));
    matches.iter().find(|m| m.match_type == top).cloned()
}
