//! # Módulo Matching — Matchers de Conceitos
//!
//! Tudo que responde "quão bem o conceito A atende o conceito B":
//!
//! | Tipo | Papel |
//! |------|-------|
//! | [`ConceptMatcher`] | Contrato par-a-par + consultas em lote |
//! | [`LogicConceptMatcher`] | Delegate lógico sobre um [`Reasoner`] externo |
//! | [`IndexedConceptMatcher`] | Tabela pré-calculada servida de um [`IndexStore`] |
//! | [`MatcherKind`] | Registro fechado de variantes, selecionado por configuração |
//!
//! ## Cadeia de Decoradores
//!
//! ```text
//! IndexedConceptMatcher ──(dono de)──▶ LogicConceptMatcher ──▶ Arc<dyn Reasoner>
//!        │
//!        └──▶ Arc<dyn IndexStore> (memória ou arquivo JSON)
//! ```
//!
//! A cadeia é montada uma vez em [`MatcherKind::build`], sem reflexão.

pub mod indexed;
pub mod logic;
pub mod reasoner;
pub mod result;
pub mod store;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{Concept, Deadline, MatchType, MatchTypeRegistry};
use crate::error::{DiscoveryError, Result};

pub use indexed::IndexedConceptMatcher;
pub use logic::LogicConceptMatcher;
pub use reasoner::{Reasoner, Relation, SubclassAxiom, TaxonomyReasoner};
pub use result::MatchResult;
pub use store::{IndexEntry, IndexSnapshot, IndexStore, InMemoryIndexStore, JsonFileIndexStore};

/// Tabela `origem → destino → resultado`.
pub type MatchTable = HashMap<Concept, HashMap<Concept, MatchResult>>;

/// Contrato de um matcher de conceitos.
///
/// `match_concepts` nunca falha: relação desconhecida é `Fail`. As
/// consultas em lote podem falhar (prazo, reasoner fora do ar).
pub trait ConceptMatcher: Send + Sync {
    /// Identificador estável, gravado em [`MatchResult::produced_by`].
    fn id(&self) -> &str;

    /// Tipos que esta implementação pode produzir, em ordem ascendente.
    fn match_types_supported(&self) -> Vec<MatchType>;

    /// Match par-a-par, sem efeitos colaterais.
    fn match_concepts(&self, origin: &Concept, destination: &Concept) -> MatchResult;

    /// Todos os pares `(origem, destino)` de `concepts × concepts` com
    /// tipo de rank `>= min_type`.
    ///
    /// A implementação padrão faz o produto cartesiano par-a-par,
    /// verificando o prazo a cada origem.
    fn list_matches_at_least_of_type(
        &self,
        concepts: &BTreeSet<Concept>,
        min_type: &MatchType,
        deadline: &Deadline,
    ) -> Result<MatchTable> {
        let mut table = MatchTable::new();
        for origin in concepts {
            if deadline.is_expired() {
                return Err(DiscoveryError::DeadlineExceeded("listagem de matches"));
            }
            let row: HashMap<Concept, MatchResult> = concepts
                .iter()
                .map(|destination| self.match_concepts(origin, destination))
                .filter(|result| result.is_at_least(min_type))
                .map(|result| (result.destination.clone(), result))
                .collect();
            if !row.is_empty() {
                table.insert(origin.clone(), row);
            }
        }
        Ok(table)
    }

    /// Destinos cujo match com `origin` está em `[min_type, max_type]`.
    ///
    /// Opcional: por padrão sinaliza [`DiscoveryError::Unsupported`].
    fn list_matches_within_range(
        &self,
        _origin: &Concept,
        _min_type: &MatchType,
        _max_type: &MatchType,
    ) -> Result<BTreeMap<Concept, MatchResult>> {
        Err(DiscoveryError::Unsupported {
            matcher: self.id().to_string(),
            operation: "list_matches_within_range",
        })
    }
}

/// Melhor match de qualquer conceito de `available` para `required`,
/// desde que com rank `>= threshold`. Para no primeiro `Exact`.
pub fn best_match_from<'a>(
    matcher: &dyn ConceptMatcher,
    available: impl IntoIterator<Item = &'a Concept>,
    required: &Concept,
    threshold: &MatchType,
) -> Option<MatchResult> {
    let mut best: Option<MatchResult> = None;
    for candidate in available {
        let result = matcher.match_concepts(candidate, required);
        if !result.is_at_least(threshold) {
            continue;
        }
        let exact = result.match_type >= MatchType::EXACT;
        if best
            .as_ref()
            .map_or(true, |b| result.match_type > b.match_type)
        {
            best = Some(result);
        }
        if exact {
            break;
        }
    }
    best
}

/// Variantes de matcher disponíveis, selecionadas por chave de configuração.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    /// Consulta o reasoner a cada match.
    Logic,
    /// Tabela pré-calculada a partir do matcher lógico.
    #[default]
    Indexed,
}

/// Cadeia montada por [`MatcherKind::build`].
///
/// `index` guarda o acesso tipado ao matcher indexado, para
/// [`rebuild`](IndexedConceptMatcher::rebuild) sob demanda.
#[derive(Clone)]
pub struct MatcherChain {
    pub matcher: Arc<dyn ConceptMatcher>,
    pub index: Option<Arc<IndexedConceptMatcher>>,
}

impl MatcherKind {
    /// Monta a cadeia de matchers para esta variante.
    ///
    /// Para `Indexed`, popula o índice imediatamente sobre `vocabulary`;
    /// qualquer falha é fatal ([`DiscoveryError::Configuration`]).
    pub fn build(
        self,
        reasoner: Arc<dyn Reasoner>,
        registry: Arc<MatchTypeRegistry>,
        vocabulary: &BTreeSet<Concept>,
        index_threshold: MatchType,
        store: Arc<dyn IndexStore>,
        deadline: &Deadline,
    ) -> Result<MatcherChain> {
        let logic = Arc::new(LogicConceptMatcher::new(reasoner));
        match self {
            MatcherKind::Logic => Ok(MatcherChain {
                matcher: logic as Arc<dyn ConceptMatcher>,
                index: None,
            }),
            MatcherKind::Indexed => {
                let indexed = Arc::new(IndexedConceptMatcher::build(
                    logic,
                    registry,
                    store,
                    vocabulary,
                    index_threshold,
                    deadline,
                )?);
                Ok(MatcherChain {
                    matcher: Arc::clone(&indexed) as Arc<dyn ConceptMatcher>,
                    index: Some(indexed),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Matcher trivial: `Exact` para iguais, `Subsume` se o destino começa
    /// com a origem, `Fail` caso contrário.
    struct PrefixMatcher;

    impl ConceptMatcher for PrefixMatcher {
        fn id(&self) -> &str {
            "prefix"
        }

        fn match_types_supported(&self) -> Vec<MatchType> {
            vec![MatchType::FAIL, MatchType::SUBSUME, MatchType::EXACT]
        }

        fn match_concepts(&self, origin: &Concept, destination: &Concept) -> MatchResult {
            let match_type = if origin == destination {
                MatchType::EXACT
            } else if destination.as_str().starts_with(origin.as_str()) {
                MatchType::SUBSUME
            } else {
                MatchType::FAIL
            };
            MatchResult::new(origin.clone(), destination.clone(), match_type, self.id())
        }
    }

    fn vocab(items: &[&str]) -> BTreeSet<Concept> {
        items.iter().map(|s| Concept::new(*s)).collect()
    }

    #[test]
    fn default_bulk_listing_filters_by_minimum() {
        let table = PrefixMatcher
            .list_matches_at_least_of_type(
                &vocab(&["a", "ab", "b"]),
                &MatchType::SUBSUME,
                &Deadline::none(),
            )
            .unwrap();
        assert_eq!(table[&Concept::new("a")].len(), 2);
        assert_eq!(table[&Concept::new("b")].len(), 1);

        let exact_only = PrefixMatcher
            .list_matches_at_least_of_type(&vocab(&["a", "ab"]), &MatchType::EXACT, &Deadline::none())
            .unwrap();
        assert!(exact_only.values().all(|row| row.len() == 1));
    }

    #[test]
    fn default_bulk_listing_honors_deadline() {
        let deadline = Deadline::none();
        deadline.cancel();
        let err = PrefixMatcher
            .list_matches_at_least_of_type(&vocab(&["a"]), &MatchType::FAIL, &deadline)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::DeadlineExceeded(_)));
    }

    #[test]
    fn range_query_is_explicitly_unsupported_by_default() {
        let err = PrefixMatcher
            .list_matches_within_range(&Concept::new("a"), &MatchType::FAIL, &MatchType::EXACT)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Unsupported { .. }));
    }

    #[test]
    fn best_match_prefers_stronger_type() {
        let available = vocab(&["a", "ab"]);
        let best = best_match_from(&PrefixMatcher, &available, &Concept::new("ab"), &MatchType::SUBSUME)
            .unwrap();
        assert_eq!(best.match_type, MatchType::EXACT);
        assert!(best_match_from(&PrefixMatcher, &available, &Concept::new("zz"), &MatchType::SUBSUME)
            .is_none());
    }
}
