//! # LogicConceptMatcher — Matcher Lógico sobre o Reasoner
//!
//! Traduz a [`Relation`] devolvida pelo reasoner em [`MatchType`]:
//!
//! | Relação (origem, destino) | MatchType |
//! |---------------------------|-----------|
//! | Equivalentes | `Exact` |
//! | Origem ⊑ destino (mais específica) | `Plugin` |
//! | Destino ⊑ origem (origem mais geral) | `Subsume` |
//! | Sem relação | `Fail` |
//!
//! A listagem em lote consulta o reasoner **uma vez por conceito**
//! (super e subclasses), em paralelo com rayon, em vez de uma vez por par.
//! Esta é a chamada cara que o [`IndexedConceptMatcher`](super::IndexedConceptMatcher)
//! faz uma única vez na construção.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use rayon::prelude::*;

use super::{ConceptMatcher, MatchResult, MatchTable, Reasoner, Relation};
use crate::core::{Concept, Deadline, MatchType};
use crate::error::{DiscoveryError, Result};

const MATCHER_ID: &str = "logic";

/// Matcher baseado em subsunção lógica.
pub struct LogicConceptMatcher {
    reasoner: Arc<dyn Reasoner>,
}

impl LogicConceptMatcher {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    fn type_for(relation: Relation) -> MatchType {
        match relation {
            Relation::Equivalent => MatchType::EXACT,
            Relation::Subclass => MatchType::PLUGIN,
            Relation::Superclass => MatchType::SUBSUME,
            Relation::Unrelated => MatchType::FAIL,
        }
    }

    /// Linha da tabela para uma origem: ela mesma, suas superclasses
    /// (Plugin) e subclasses (Subsume), restritas ao vocabulário.
    fn row_for(
        &self,
        origin: &Concept,
        vocabulary: &BTreeSet<Concept>,
        min_type: &MatchType,
    ) -> Result<HashMap<Concept, MatchResult>> {
        let mut row = HashMap::new();
        let mut push = |destination: Concept, match_type: MatchType| {
            if match_type.is_at_least(min_type) && vocabulary.contains(&destination) {
                let result =
                    MatchResult::new(origin.clone(), destination.clone(), match_type, MATCHER_ID);
                row.entry(destination)
                    .and_modify(|existing: &mut MatchResult| {
                        if result.match_type > existing.match_type {
                            *existing = result.clone();
                        }
                    })
                    .or_insert(result);
            }
        };

        push(origin.clone(), MatchType::EXACT);
        let superclasses = self.reasoner.superclasses_of(origin)?;
        let subclasses = self.reasoner.subclasses_of(origin)?;
        // conceito nos dois conjuntos = ciclo na hierarquia = equivalente
        for sup in &superclasses {
            let match_type = if subclasses.contains(sup) {
                MatchType::EXACT
            } else {
                MatchType::PLUGIN
            };
            push(sup.clone(), match_type);
        }
        for sub in subclasses {
            if !superclasses.contains(&sub) {
                push(sub, MatchType::SUBSUME);
            }
        }
        Ok(row)
    }
}

impl ConceptMatcher for LogicConceptMatcher {
    fn id(&self) -> &str {
        MATCHER_ID
    }

    fn match_types_supported(&self) -> Vec<MatchType> {
        vec![
            MatchType::FAIL,
            MatchType::SUBSUME,
            MatchType::PLUGIN,
            MatchType::EXACT,
        ]
    }

    fn match_concepts(&self, origin: &Concept, destination: &Concept) -> MatchResult {
        let match_type = match self.reasoner.relation(origin, destination) {
            Ok(relation) => Self::type_for(relation),
            Err(e) => {
                tracing::warn!(origin = %origin, destination = %destination, error = %e, "Reasoner falhou; match tratado como Fail");
                MatchType::FAIL
            }
        };
        MatchResult::new(origin.clone(), destination.clone(), match_type, MATCHER_ID)
    }

    fn list_matches_at_least_of_type(
        &self,
        concepts: &BTreeSet<Concept>,
        min_type: &MatchType,
        deadline: &Deadline,
    ) -> Result<MatchTable> {
        let rows: Vec<(Concept, HashMap<Concept, MatchResult>)> = concepts
            .par_iter()
            .map(|origin| {
                if deadline.is_expired() {
                    return Err(DiscoveryError::DeadlineExceeded("listagem de matches"));
                }
                Ok((origin.clone(), self.row_for(origin, concepts, min_type)?))
            })
            .collect::<Result<_>>()?;

        let table: MatchTable = rows.into_iter().filter(|(_, row)| !row.is_empty()).collect();
        tracing::debug!(
            origins = table.len(),
            pairs = table.values().map(HashMap::len).sum::<usize>(),
            min_type = %min_type,
            "Tabela de matches lógica calculada"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{SubclassAxiom, TaxonomyReasoner};

    fn c(s: &str) -> Concept {
        Concept::new(s)
    }

    fn matcher() -> LogicConceptMatcher {
        LogicConceptMatcher::new(Arc::new(TaxonomyReasoner::from_axioms(&[
            SubclassAxiom::new("Car", "Vehicle"),
            SubclassAxiom::new("SportsCar", "Car"),
        ])))
    }

    #[test]
    fn pairwise_types_follow_subsumption() {
        let m = matcher();
        assert_eq!(m.match_concepts(&c("Car"), &c("Car")).match_type, MatchType::EXACT);
        assert_eq!(m.match_concepts(&c("SportsCar"), &c("Vehicle")).match_type, MatchType::PLUGIN);
        assert_eq!(m.match_concepts(&c("Vehicle"), &c("Car")).match_type, MatchType::SUBSUME);
        assert_eq!(m.match_concepts(&c("Car"), &c("Boat")).match_type, MatchType::FAIL);
        assert_eq!(m.match_concepts(&c("Car"), &c("Boat")).produced_by, "logic");
    }

    #[test]
    fn bulk_listing_agrees_with_pairwise() {
        let m = matcher();
        let vocabulary: BTreeSet<Concept> =
            ["Car", "Vehicle", "SportsCar", "Boat"].into_iter().map(c).collect();
        let table = m
            .list_matches_at_least_of_type(&vocabulary, &MatchType::SUBSUME, &Deadline::none())
            .unwrap();
        for origin in &vocabulary {
            for destination in &vocabulary {
                let pairwise = m.match_concepts(origin, destination);
                let bulk = table.get(origin).and_then(|row| row.get(destination));
                if pairwise.is_at_least(&MatchType::SUBSUME) {
                    assert_eq!(bulk.map(|r| &r.match_type), Some(&pairwise.match_type));
                } else {
                    assert!(bulk.is_none());
                }
            }
        }
    }

    #[test]
    fn bulk_listing_restricts_to_vocabulary_and_minimum() {
        let m = matcher();
        let vocabulary: BTreeSet<Concept> = ["SportsCar", "Vehicle"].into_iter().map(c).collect();
        let table = m
            .list_matches_at_least_of_type(&vocabulary, &MatchType::PLUGIN, &Deadline::none())
            .unwrap();
        let row = &table[&c("SportsCar")];
        assert_eq!(row.len(), 2);
        assert!(!row.contains_key(&c("Car")));
        // Vehicle → SportsCar é Subsume, abaixo do mínimo
        assert_eq!(table[&c("Vehicle")].len(), 1);
    }

    #[test]
    fn range_queries_are_not_supported() {
        let err = matcher()
            .list_matches_within_range(&c("Car"), &MatchType::SUBSUME, &MatchType::EXACT)
            .unwrap_err();
        assert_eq!(err.status_code(), 501);
    }
}
