//! # RelevantServicesFinder — Busca de Composição por Camadas
//!
//! Dado um conjunto de conceitos que o chamador **já possui**, descobre em
//! rodadas quais operações se tornam invocáveis e quais novos conceitos
//! elas passariam a fornecer.
//!
//! ## Algoritmo (expansão monótona em largura)
//!
//! ```text
//! available ← sementes          consumed ← ∅
//! repete:
//!   camada ← { op ∉ consumed | ∀ entrada e de op,
//!              ∃ c ∈ available: match(c, e) ≥ limiar }     (paralelo)
//!   camada vazia?  → FixedPoint
//!   consumed  ∪= camada
//!   available ∪= saídas(camada)
//! ```
//!
//! Cada rodada avalia todas as operações contra o `available` do **início**
//! da rodada; a invocabilidade de uma operação nunca depende de outra da
//! mesma rodada, o que permite checá-las em paralelo com rayon.
//!
//! ## Terminação
//!
//! | Motivo | Quando |
//! |--------|--------|
//! | `FixedPoint` | Uma rodada não destravou nenhuma operação |
//! | `RoundLimit` | `max_rounds` rodadas completadas e a seguinte ainda destravaria operações |
//! | `DeadlineExpired` | Prazo expirou; camadas completas são mantidas |
//!
//! Como cada rodada não vazia consome ao menos uma operação, a busca
//! termina em no máximo `|operações| + 1` rodadas mesmo sem limite.
//!
//! ## Exemplo
//!
//! ```text
//! sementes {c1, c2, c3}
//! rodada 1: op1[c1] op2[A ⊒ c1] op3[c2,c3] op4[] op5[c3]   → 5
//! rodada 2: op6[d1,d2] op7[d3] op8[d4,c2]                  → 3
//! rodada 3: op9[e1,e2] op10[e3]                            → 2
//! rodada 4: ∅                                              → FixedPoint
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::core::{Concept, Deadline, MatchType, Operation, ServiceCatalog};
use crate::error::{DiscoveryError, Result};
use crate::matching::{best_match_from, ConceptMatcher, MatchResult};

/// Parâmetros de uma busca de composição.
#[derive(Clone, Debug)]
pub struct CompositionOptions {
    /// Tipo mínimo para um conceito disponível satisfazer uma entrada.
    pub threshold: MatchType,
    /// Número máximo de camadas. Uma rodada extra é avaliada para
    /// distinguir ponto fixo de corte, mas nunca entra no resultado.
    pub max_rounds: usize,
    pub deadline: Deadline,
}

impl Default for CompositionOptions {
    fn default() -> Self {
        Self {
            threshold: MatchType::PLUGIN,
            max_rounds: 64,
            deadline: Deadline::none(),
        }
    }
}

/// Por que a busca parou.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    FixedPoint,
    RoundLimit,
    DeadlineExpired,
}

/// Resultado da busca de composição.
#[derive(Clone, Debug, Serialize)]
pub struct CompositionOutcome {
    /// Camadas em ordem de profundidade; cada uma com as URIs de operação
    /// destravadas naquela rodada.
    pub layers: Vec<BTreeSet<String>>,
    /// Conceitos disponíveis ao final (sementes + saídas das camadas).
    pub available: BTreeSet<Concept>,
    /// Para cada operação destravada, o match que satisfez cada entrada.
    pub unlocked_by: BTreeMap<String, Vec<MatchResult>>,
    pub termination: Termination,
}

impl CompositionOutcome {
    pub fn layer_sizes(&self) -> Vec<usize> {
        self.layers.iter().map(BTreeSet::len).collect()
    }

    /// Todas as operações destravadas, camada a camada.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().flatten().map(String::as_str)
    }

    /// Profundidade (1 = primeira rodada) em que a operação foi destravada.
    pub fn depth_of(&self, operation_uri: &str) -> Option<usize> {
        self.layers
            .iter()
            .position(|layer| layer.contains(operation_uri))
            .map(|i| i + 1)
    }

    /// `true` se a busca parou antes do ponto fixo.
    pub fn is_partial(&self) -> bool {
        self.termination != Termination::FixedPoint
    }
}

/// Operação destravada numa rodada.
struct Unlocked {
    operation: Arc<Operation>,
    matches: Vec<MatchResult>,
}

/// Busca de composição sobre um matcher e um catálogo.
pub struct RelevantServicesFinder {
    matcher: Arc<dyn ConceptMatcher>,
    catalog: Arc<dyn ServiceCatalog>,
    pool: Option<rayon::ThreadPool>,
}

impl RelevantServicesFinder {
    pub fn new(matcher: Arc<dyn ConceptMatcher>, catalog: Arc<dyn ServiceCatalog>) -> Self {
        Self {
            matcher,
            catalog,
            pool: None,
        }
    }

    /// Usa um pool rayon dedicado e limitado em vez do pool global.
    pub fn with_worker_threads(mut self, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("composition-{i}"))
            .build()
            .map_err(|e| DiscoveryError::Configuration(format!("pool de composição: {e}")))?;
        self.pool = Some(pool);
        Ok(self)
    }

    /// Executa a busca a partir das sementes.
    ///
    /// # Erros
    ///
    /// [`DiscoveryError::EmptySeed`] se não houver nenhuma semente. Prazo
    /// expirado **não** é erro: o resultado parcial é devolvido com
    /// [`Termination::DeadlineExpired`].
    pub fn find<'a>(
        &self,
        seeds: impl IntoIterator<Item = &'a Concept>,
        options: &CompositionOptions,
    ) -> Result<CompositionOutcome> {
        let mut available: BTreeSet<Concept> = seeds.into_iter().cloned().collect();
        if available.is_empty() {
            return Err(DiscoveryError::EmptySeed);
        }

        let started = Instant::now();
        let mut remaining = self.catalog.operations();
        let mut layers: Vec<BTreeSet<String>> = Vec::new();
        let mut unlocked_by: BTreeMap<String, Vec<MatchResult>> = BTreeMap::new();

        let termination = loop {
            if options.deadline.is_expired() {
                break Termination::DeadlineExpired;
            }

            let round = self.run_round(&remaining, &available, options);

            // rodada interrompida pelo prazo é descartada
            if options.deadline.is_expired() {
                tracing::debug!(round = layers.len() + 1, "Prazo expirou durante a rodada");
                break Termination::DeadlineExpired;
            }
            if round.is_empty() {
                break Termination::FixedPoint;
            }
            // além do limite a rodada só decide entre FixedPoint e RoundLimit
            if layers.len() >= options.max_rounds {
                break Termination::RoundLimit;
            }

            let mut layer = BTreeSet::new();
            for unlocked in round {
                available.extend(unlocked.operation.outputs.iter().cloned());
                unlocked_by.insert(unlocked.operation.uri.clone(), unlocked.matches);
                layer.insert(unlocked.operation.uri.clone());
            }
            remaining.retain(|op| !layer.contains(&op.uri));

            tracing::debug!(
                round = layers.len() + 1,
                unlocked = layer.len(),
                available = available.len(),
                remaining = remaining.len(),
                "Rodada de composição concluída"
            );
            layers.push(layer);
        };

        let outcome = CompositionOutcome {
            layers,
            available,
            unlocked_by,
            termination,
        };
        tracing::info!(
            layers = ?outcome.layer_sizes(),
            available = outcome.available.len(),
            termination = ?termination,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Busca de composição concluída"
        );
        Ok(outcome)
    }

    fn run_round(
        &self,
        remaining: &[Arc<Operation>],
        available: &BTreeSet<Concept>,
        options: &CompositionOptions,
    ) -> Vec<Unlocked> {
        let scan = || {
            remaining
                .par_iter()
                .filter_map(|op| {
                    if options.deadline.is_expired() {
                        return None;
                    }
                    self.unlock(op, available, &options.threshold)
                        .map(|matches| Unlocked {
                            operation: Arc::clone(op),
                            matches,
                        })
                })
                .collect::<Vec<_>>()
        };
        match &self.pool {
            Some(pool) => pool.install(scan),
            None => scan(),
        }
    }

    /// Matches que satisfazem cada entrada distinta de `op`, ou `None` se
    /// alguma entrada não é atendida por nenhum conceito disponível.
    fn unlock(
        &self,
        op: &Operation,
        available: &BTreeSet<Concept>,
        threshold: &MatchType,
    ) -> Option<Vec<MatchResult>> {
        op.distinct_inputs()
            .into_iter()
            .map(|input| {
                // o próprio conceito primeiro: costuma ser Exact e encerra a busca
                let candidates = available
                    .get(input)
                    .into_iter()
                    .chain(available.iter());
                best_match_from(self.matcher.as_ref(), candidates, input, threshold)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InMemoryCatalog, MatchTypeRegistry, Service};
    use crate::matching::{
        IndexedConceptMatcher, InMemoryIndexStore, LogicConceptMatcher, Reasoner,
        SubclassAxiom, TaxonomyReasoner,
    };
    use std::collections::HashMap;

    fn c(s: &str) -> Concept {
        Concept::new(s)
    }

    fn op(uri: &str, inputs: &[&str], outputs: &[&str]) -> Operation {
        Operation::new(
            uri,
            inputs.iter().copied().map(c).collect(),
            outputs.iter().copied().map(c).collect(),
        )
    }

    fn reasoner() -> Arc<TaxonomyReasoner> {
        Arc::new(TaxonomyReasoner::from_axioms(&[
            SubclassAxiom::new("c1", "A"),
            SubclassAxiom::new("Sub", "c2"),
        ]))
    }

    fn catalog() -> Arc<InMemoryCatalog> {
        let ops = vec![
            op("op1", &["c1"], &["d1"]),
            op("op2", &["A"], &["d2"]),
            op("op3", &["c2", "c3"], &["d3"]),
            op("op4", &[], &["d4"]),
            op("op5", &["c3"], &["d5", "d1"]),
            op("op6", &["d1", "d2"], &["e1"]),
            op("op7", &["d3"], &["e2"]),
            op("op8", &["d4", "c2"], &["e3"]),
            op("op9", &["e1", "e2"], &["f1"]),
            op("op10", &["e3"], &["f2"]),
            op("op11", &["Sub"], &["g1"]),
            op("op12", &["z"], &["g2"]),
        ];
        Arc::new(InMemoryCatalog::from_services(
            vec![Service::new("svc:fixture", ops)],
            HashMap::new(),
        ))
    }

    fn logic_finder() -> RelevantServicesFinder {
        RelevantServicesFinder::new(Arc::new(LogicConceptMatcher::new(reasoner())), catalog())
    }

    fn seeds() -> Vec<Concept> {
        vec![c("c1"), c("c2"), c("c3")]
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn layers_are_five_three_two() {
        let outcome = logic_finder()
            .find(&seeds(), &CompositionOptions::default())
            .unwrap();
        assert_eq!(outcome.layer_sizes(), vec![5, 3, 2]);
        assert_eq!(outcome.layers[0], set(&["op1", "op2", "op3", "op4", "op5"]));
        assert_eq!(outcome.layers[1], set(&["op6", "op7", "op8"]));
        assert_eq!(outcome.layers[2], set(&["op10", "op9"]));
        assert_eq!(outcome.termination, Termination::FixedPoint);
        assert!(!outcome.is_partial());
    }

    #[test]
    fn indexed_matcher_yields_same_layers() {
        let catalog = catalog();
        let reasoner = reasoner();
        let mut vocabulary = catalog.concepts();
        vocabulary.extend(reasoner.concepts().unwrap());
        let indexed = IndexedConceptMatcher::build(
            Arc::new(LogicConceptMatcher::new(reasoner)),
            Arc::new(MatchTypeRegistry::with_builtins()),
            Arc::new(InMemoryIndexStore::new()),
            &vocabulary,
            MatchType::PLUGIN,
            &Deadline::none(),
        )
        .unwrap();
        let outcome = RelevantServicesFinder::new(Arc::new(indexed), catalog)
            .find(&seeds(), &CompositionOptions::default())
            .unwrap();
        assert_eq!(outcome.layer_sizes(), vec![5, 3, 2]);
    }

    #[test]
    fn plugin_match_unlocks_but_subsume_does_not() {
        let outcome = logic_finder()
            .find(&seeds(), &CompositionOptions::default())
            .unwrap();
        let op2 = &outcome.unlocked_by["op2"];
        assert_eq!(op2.len(), 1);
        assert_eq!(op2[0].origin, c("c1"));
        assert_eq!(op2[0].match_type, MatchType::PLUGIN);
        // c2 ⊒ Sub só dá Subsume
        assert_eq!(outcome.depth_of("op11"), None);
        assert_eq!(outcome.depth_of("op12"), None);
        assert_eq!(outcome.depth_of("op9"), Some(3));
    }

    #[test]
    fn lower_threshold_admits_subsume_matches() {
        let options = CompositionOptions {
            threshold: MatchType::SUBSUME,
            ..CompositionOptions::default()
        };
        let outcome = logic_finder().find(&seeds(), &options).unwrap();
        assert_eq!(outcome.depth_of("op11"), Some(1));
    }

    #[test]
    fn expansion_is_monotone() {
        let outcome = logic_finder()
            .find(&seeds(), &CompositionOptions::default())
            .unwrap();
        let catalog = catalog();
        let mut reachable: BTreeSet<Concept> = seeds().into_iter().collect();
        let mut consumed: BTreeSet<&str> = BTreeSet::new();
        for layer in &outcome.layers {
            for uri in layer {
                assert!(consumed.insert(uri.as_str()), "{uri} destravada duas vezes");
                for m in &outcome.unlocked_by[uri] {
                    assert!(reachable.contains(&m.origin));
                }
            }
            let before = reachable.len();
            for uri in layer {
                reachable.extend(catalog.operation(uri).unwrap().outputs.iter().cloned());
            }
            assert!(reachable.len() >= before);
        }
        assert_eq!(reachable, outcome.available);
        assert!(outcome.layers.len() <= catalog.operation_count());
    }

    #[test]
    fn zero_input_operation_needs_no_matching_seed() {
        let outcome = logic_finder()
            .find(&[c("unrelated")], &CompositionOptions::default())
            .unwrap();
        // op4 → d4; op8 ainda precisa de c2
        assert_eq!(outcome.layers, vec![set(&["op4"])]);
        assert!(outcome.unlocked_by["op4"].is_empty());
    }

    #[test]
    fn duplicate_seeds_are_idempotent() {
        let finder = logic_finder();
        let options = CompositionOptions::default();
        let once = finder.find(&seeds(), &options).unwrap();
        let dup = [c("c1"), c("c1"), c("c2"), c("c3"), c("c3"), c("d1")];
        let twice = finder.find(&dup, &options).unwrap();
        assert_eq!(twice.layers, once.layers);
    }

    #[test]
    fn empty_seed_is_rejected() {
        let err = logic_finder()
            .find(std::iter::empty(), &CompositionOptions::default())
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::EmptySeed));
    }

    #[test]
    fn round_limit_keeps_completed_layers() {
        let options = CompositionOptions {
            max_rounds: 2,
            ..CompositionOptions::default()
        };
        let outcome = logic_finder().find(&seeds(), &options).unwrap();
        assert_eq!(outcome.layer_sizes(), vec![5, 3]);
        assert_eq!(outcome.termination, Termination::RoundLimit);
        assert!(outcome.is_partial());
    }

    #[test]
    fn limit_equal_to_depth_reports_fixed_point() {
        let options = CompositionOptions {
            max_rounds: 3,
            ..CompositionOptions::default()
        };
        let outcome = logic_finder().find(&seeds(), &options).unwrap();
        assert_eq!(outcome.layer_sizes(), vec![5, 3, 2]);
        assert_eq!(outcome.termination, Termination::FixedPoint);
        assert!(!outcome.is_partial());
    }

    /// Cancela o prazo assim que um conceito específico é usado como origem.
    struct TrippingMatcher {
        inner: LogicConceptMatcher,
        trip_on: Concept,
        deadline: Deadline,
    }

    impl ConceptMatcher for TrippingMatcher {
        fn id(&self) -> &str {
            "tripping"
        }

        fn match_types_supported(&self) -> Vec<MatchType> {
            self.inner.match_types_supported()
        }

        fn match_concepts(&self, origin: &Concept, destination: &Concept) -> MatchResult {
            if *origin == self.trip_on {
                self.deadline.cancel();
            }
            self.inner.match_concepts(origin, destination)
        }
    }

    #[test]
    fn deadline_mid_search_returns_completed_layers() {
        let deadline = Deadline::none();
        let matcher = TrippingMatcher {
            inner: LogicConceptMatcher::new(reasoner()),
            trip_on: c("d1"),
            deadline: deadline.clone(),
        };
        let options = CompositionOptions {
            deadline,
            ..CompositionOptions::default()
        };
        let outcome = RelevantServicesFinder::new(Arc::new(matcher), catalog())
            .find(&seeds(), &options)
            .unwrap();
        assert_eq!(outcome.layer_sizes(), vec![5]);
        assert_eq!(outcome.termination, Termination::DeadlineExpired);
    }

    #[test]
    fn expired_deadline_before_start_is_not_an_error() {
        let options = CompositionOptions {
            deadline: Deadline::after(std::time::Duration::ZERO),
            ..CompositionOptions::default()
        };
        let outcome = logic_finder().find(&seeds(), &options).unwrap();
        assert!(outcome.layers.is_empty());
        assert_eq!(outcome.available.len(), 3);
        assert_eq!(outcome.termination, Termination::DeadlineExpired);
    }

    #[test]
    fn bounded_pool_gives_same_result() {
        let finder = logic_finder().with_worker_threads(2).unwrap();
        let outcome = finder.find(&seeds(), &CompositionOptions::default()).unwrap();
        assert_eq!(outcome.layer_sizes(), vec![5, 3, 2]);
    }
}
