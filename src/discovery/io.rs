//! # OperationDiscoverer — Descoberta por Entradas e Saídas
//!
//! Consultas diretas (sem composição) sobre o catálogo:
//!
//! | Consulta | Origem do match | Destino do match |
//! |----------|-----------------|------------------|
//! | [`find_producing`](OperationDiscoverer::find_producing) | saída da operação | conceito pedido |
//! | [`find_consuming`](OperationDiscoverer::find_consuming) | conceito oferecido | entrada da operação |
//!
//! Com [`Coverage::Any`] basta um conceito atendido; com [`Coverage::All`]
//! todos precisam ser. Cada resultado traz os matches e o melhor deles. As
//! variantes `*_services` agregam as operações por serviço.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::{match_type, Concept, MatchType, Operation, ResourceKind, ServiceCatalog};
use crate::matching::{best_match_from, ConceptMatcher, MatchResult};

/// Quantos conceitos da consulta precisam ser atendidos.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    #[default]
    Any,
    All,
}

/// Recurso encontrado por uma consulta de entrada/saída.
#[derive(Clone, Debug, Serialize)]
pub struct DiscoveryHit {
    pub resource: String,
    pub kind: ResourceKind,
    pub matches: Vec<MatchResult>,
    pub best: MatchResult,
}

/// Descoberta direta de operações e serviços.
pub struct OperationDiscoverer {
    matcher: Arc<dyn ConceptMatcher>,
    catalog: Arc<dyn ServiceCatalog>,
}

impl OperationDiscoverer {
    pub fn new(matcher: Arc<dyn ConceptMatcher>, catalog: Arc<dyn ServiceCatalog>) -> Self {
        Self { matcher, catalog }
    }

    /// Operações cujas saídas atendem os conceitos pedidos.
    pub fn find_producing(
        &self,
        requested: &[Concept],
        min_type: &MatchType,
        coverage: Coverage,
    ) -> Vec<DiscoveryHit> {
        self.scan(min_type, coverage, |op| {
            requested
                .iter()
                .map(|wanted| best_match_from(self.matcher.as_ref(), &op.outputs, wanted, min_type))
                .collect()
        })
    }

    /// Operações cujas entradas aceitam os conceitos oferecidos.
    ///
    /// Operações sem entradas nunca aparecem aqui.
    pub fn find_consuming(
        &self,
        offered: &[Concept],
        min_type: &MatchType,
        coverage: Coverage,
    ) -> Vec<DiscoveryHit> {
        self.scan(min_type, coverage, |op| {
            op.distinct_inputs()
                .into_iter()
                .map(|input| best_match_from(self.matcher.as_ref(), offered, input, min_type))
                .collect()
        })
    }

    pub fn find_services_producing(
        &self,
        requested: &[Concept],
        min_type: &MatchType,
        coverage: Coverage,
    ) -> Vec<DiscoveryHit> {
        self.group_by_service(self.find_producing(requested, min_type, coverage))
    }

    pub fn find_services_consuming(
        &self,
        offered: &[Concept],
        min_type: &MatchType,
        coverage: Coverage,
    ) -> Vec<DiscoveryHit> {
        self.group_by_service(self.find_consuming(offered, min_type, coverage))
    }

    /// Avalia todas as operações em paralelo. `slots` devolve, para cada
    /// conceito da consulta, o melhor match ou `None`.
    fn scan<F>(&self, min_type: &MatchType, coverage: Coverage, slots: F) -> Vec<DiscoveryHit>
    where
        F: Fn(&Operation) -> Vec<Option<MatchResult>> + Sync,
    {
        let mut hits: Vec<DiscoveryHit> = self
            .catalog
            .operations()
            .par_iter()
            .filter_map(|op| {
                let slots = slots(op);
                if slots.is_empty() {
                    return None;
                }
                let covered = match coverage {
                    Coverage::Any => slots.iter().any(Option::is_some),
                    Coverage::All => slots.iter().all(Option::is_some),
                };
                if !covered {
                    return None;
                }
                let matches: Vec<MatchResult> = slots.into_iter().flatten().collect();
                let best = best_of(&matches)?;
                Some(DiscoveryHit {
                    resource: op.uri.clone(),
                    kind: ResourceKind::Operation,
                    matches,
                    best,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.resource.cmp(&b.resource));
        tracing::debug!(hits = hits.len(), min_type = %min_type, coverage = ?coverage, "Descoberta de entrada/saída");
        hits
    }

    fn group_by_service(&self, hits: Vec<DiscoveryHit>) -> Vec<DiscoveryHit> {
        let mut by_service: BTreeMap<String, Vec<MatchResult>> = BTreeMap::new();
        for hit in hits {
            match self.catalog.service_of(&hit.resource) {
                Some(service) => by_service
                    .entry(service.to_string())
                    .or_default()
                    .extend(hit.matches),
                None => tracing::warn!(operation = %hit.resource, "Operação sem serviço no catálogo"),
            }
        }
        by_service
            .into_iter()
            .filter_map(|(resource, matches)| {
                let best = best_of(&matches)?;
                Some(DiscoveryHit {
                    resource,
                    kind: ResourceKind::Service,
                    matches,
                    best,
                })
            })
            .collect()
    }
}

/// Match de maior tipo; em empate, o primeiro.
fn best_of(matches: &[MatchResult]) -> Option<MatchResult> {
    let top = match_type::best(matches.iter().map(|m| &m.match_type));
    matches.iter().find(|m| m.match_type == top).cloned()
}
