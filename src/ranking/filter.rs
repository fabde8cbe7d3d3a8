//! # Filtros — Estreitamento do Conjunto de Candidatos
//!
//! Um [`Filter`] é um predicado puro sobre URIs de recursos. Vários filtros
//! compõem por **interseção**: aplicar `f1` e depois `f2` dá o mesmo
//! conjunto que aplicar `f1 ∧ f2` de uma vez.
//!
//! | Filtro | Mantém |
//! |--------|--------|
//! | [`NamespaceFilter`] | URIs com um prefixo |
//! | [`ResourceKindFilter`] | Só operações ou só serviços |
//! | [`ProducesConceptFilter`] | Recursos com alguma saída que atende um conceito |
//! | [`PredicateFilter`] | Predicado arbitrário (uso programático) |
//!
//! [`FilterSpec`] é o registro fechado usado pela configuração.

use std::collections::BTreeSet;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::{Concept, MatchType, MatchTypeRegistry, Operation, ResourceKind, ServiceCatalog};
use crate::error::{DiscoveryError, Result};
use crate::matching::ConceptMatcher;

/// Estágio de filtragem do pipeline de ranking.
pub trait Filter: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, resources: &BTreeSet<String>) -> BTreeSet<String>;
}

/// Aplica todos os filtros em paralelo e intersecta os resultados.
pub fn apply_all(filters: &[Box<dyn Filter>], resources: &BTreeSet<String>) -> BTreeSet<String> {
    if filters.is_empty() {
        return resources.clone();
    }
    let kept: Vec<BTreeSet<String>> = filters.par_iter().map(|f| f.apply(resources)).collect();
    let mut result = resources.clone();
    for (filter, set) in filters.iter().zip(&kept) {
        result.retain(|r| set.contains(r));
        tracing::debug!(filter = filter.name(), kept = set.len(), "Filtro aplicado");
    }
    result
}

pub struct NamespaceFilter {
    prefix: String,
}

impl NamespaceFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Filter for NamespaceFilter {
    fn name(&self) -> &str {
        "namespace"
    }

    fn apply(&self, resources: &BTreeSet<String>) -> BTreeSet<String> {
        resources
            .iter()
            .filter(|r| r.starts_with(&self.prefix))
            .cloned()
            .collect()
    }
}

pub struct ResourceKindFilter {
    catalog: Arc<dyn ServiceCatalog>,
    kind: ResourceKind,
}

impl ResourceKindFilter {
    pub fn new(catalog: Arc<dyn ServiceCatalog>, kind: ResourceKind) -> Self {
        Self { catalog, kind }
    }
}

impl Filter for ResourceKindFilter {
    fn name(&self) -> &str {
        "resource_kind"
    }

    fn apply(&self, resources: &BTreeSet<String>) -> BTreeSet<String> {
        resources
            .iter()
            .filter(|r| self.catalog.resource_kind(r) == Some(self.kind))
            .cloned()
            .collect()
    }
}

/// Mantém recursos com alguma saída cujo match com `concept` é `>= min_type`.
/// Um serviço passa se qualquer uma de suas operações passar.
pub struct ProducesConceptFilter {
    catalog: Arc<dyn ServiceCatalog>,
    matcher: Arc<dyn ConceptMatcher>,
    concept: Concept,
    min_type: MatchType,
}

impl ProducesConceptFilter {
    pub fn new(
        catalog: Arc<dyn ServiceCatalog>,
        matcher: Arc<dyn ConceptMatcher>,
        concept: Concept,
        min_type: MatchType,
    ) -> Self {
        Self {
            catalog,
            matcher,
            concept,
            min_type,
        }
    }

    fn produces(&self, op: &Operation) -> bool {
        op.outputs.iter().any(|out| {
            self.matcher
                .match_concepts(out, &self.concept)
                .is_at_least(&self.min_type)
        })
    }
}

impl Filter for ProducesConceptFilter {
    fn name(&self) -> &str {
        "produces"
    }

    fn apply(&self, resources: &BTreeSet<String>) -> BTreeSet<String> {
        resources
            .iter()
            .filter(|uri| match self.catalog.resource_kind(uri) {
                Some(ResourceKind::Operation) => {
                    self.catalog.operation(uri).is_some_and(|op| self.produces(&op))
                }
                Some(ResourceKind::Service) => self
                    .catalog
                    .service(uri)
                    .is_some_and(|svc| svc.operations.iter().any(|op| self.produces(op))),
                None => false,
            })
            .cloned()
            .collect()
    }
}

/// Filtro a partir de uma closure.
pub struct PredicateFilter<F> {
    name: String,
    predicate: F,
}

impl<F> PredicateFilter<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> Filter for PredicateFilter<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, resources: &BTreeSet<String>) -> BTreeSet<String> {
        resources
            .iter()
            .filter(|r| (self.predicate)(r.as_str()))
            .cloned()
            .collect()
    }
}

/// Filtros disponíveis por configuração.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterSpec {
    Namespace {
        prefix: String,
    },
    ResourceKind {
        kind: ResourceKind,
    },
    Produces {
        concept: Concept,
        /// Nome do tipo mínimo; `Plugin` se ausente.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_type: Option<String>,
    },
}

impl FilterSpec {
    pub fn name(&self) -> &'static str {
        match self {
            FilterSpec::Namespace { .. } => "namespace",
            FilterSpec::ResourceKind { .. } => "resource_kind",
            FilterSpec::Produces { .. } => "produces",
        }
    }

    /// Verifica os parâmetros sem construir o filtro.
    pub fn validate(&self, registry: &MatchTypeRegistry) -> Result<()> {
        match self {
            FilterSpec::Namespace { prefix } if prefix.trim().is_empty() => {
                Err(self.misconfigured("prefixo vazio"))
            }
            FilterSpec::Produces { concept, .. } if concept.as_str().trim().is_empty() => {
                Err(self.misconfigured("conceito vazio"))
            }
            FilterSpec::Produces {
                min_type: Some(name),
                ..
            } => registry
                .resolve(name)
                .map(|_| ())
                .map_err(|e| self.misconfigured(&e.to_string())),
            _ => Ok(()),
        }
    }

    pub fn build(
        &self,
        catalog: &Arc<dyn ServiceCatalog>,
        matcher: &Arc<dyn ConceptMatcher>,
        registry: &MatchTypeRegistry,
    ) -> Result<Box<dyn Filter>> {
        self.validate(registry)?;
        let filter: Box<dyn Filter> = match self {
            FilterSpec::Namespace { prefix } => Box::new(NamespaceFilter::new(prefix.clone())),
            FilterSpec::ResourceKind { kind } => {
                Box::new(ResourceKindFilter::new(Arc::clone(catalog), *kind))
            }
            FilterSpec::Produces { concept, min_type } => {
                let min_type = match min_type {
                    Some(name) => registry.resolve(name)?,
                    None => MatchType::PLUGIN,
                };
                Box::new(ProducesConceptFilter::new(
                    Arc::clone(catalog),
                    Arc::clone(matcher),
                    concept.clone(),
                    min_type,
                ))
            }
        };
        Ok(filter)
    }

    fn misconfigured(&self, reason: &str) -> DiscoveryError {
        DiscoveryError::PluginMisconfigured {
            plugin: self.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InMemoryCatalog, Service};
    use crate::matching::{LogicConceptMatcher, SubclassAxiom, TaxonomyReasoner};
    use std::collections::HashMap;

    fn c(s: &str) -> Concept {
        Concept::new(s)
    }

    fn catalog() -> Arc<dyn ServiceCatalog> {
        Arc::new(InMemoryCatalog::from_services(
            vec![
                Service::new(
                    "http://a.org/svc/geo",
                    vec![Operation::new("http://a.org/op/capital", vec![c("Country")], vec![c("Capital")])],
                ),
                Service::new(
                    "http://b.org/svc/wx",
                    vec![Operation::new("http://b.org/op/forecast", vec![c("City")], vec![c("Forecast")])],
                ),
            ],
            HashMap::new(),
        ))
    }

    fn matcher() -> Arc<dyn ConceptMatcher> {
        Arc::new(LogicConceptMatcher::new(Arc::new(TaxonomyReasoner::from_axioms(&[
            SubclassAxiom::new("Capital", "City"),
        ]))))
    }

    fn all_resources() -> BTreeSet<String> {
        [
            "http://a.org/svc/geo",
            "http://a.org/op/capital",
            "http://b.org/svc/wx",
            "http://b.org/op/forecast",
            "http://c.org/unknown",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    #[test]
    fn namespace_and_kind_filters() {
        let ns = NamespaceFilter::new("http://a.org/");
        assert_eq!(ns.apply(&all_resources()).len(), 2);

        let ops = ResourceKindFilter::new(catalog(), ResourceKind::Operation);
        let kept = ops.apply(&all_resources());
        assert_eq!(kept.len(), 2);
        assert!(!kept.contains("http://c.org/unknown"));
    }

    #[test]
    fn produces_filter_uses_matcher() {
        let f = ProducesConceptFilter::new(catalog(), matcher(), c("City"), MatchType::PLUGIN);
        let kept: Vec<String> = f.apply(&all_resources()).into_iter().collect();
        assert_eq!(kept, vec!["http://a.org/op/capital", "http://a.org/svc/geo"]);
    }

    #[test]
    fn sequential_application_equals_conjunction() {
        let a: Box<dyn Filter> = Box::new(NamespaceFilter::new("http://a.org/"));
        let b: Box<dyn Filter> = Box::new(ResourceKindFilter::new(catalog(), ResourceKind::Service));

        let sequential = b.apply(&a.apply(&all_resources()));
        let together = apply_all(&[a, b], &all_resources());

        let cat = catalog();
        let conjunction: BTreeSet<String> = all_resources()
            .into_iter()
            .filter(|r| {
                r.starts_with("http://a.org/")
                    && cat.resource_kind(r) == Some(ResourceKind::Service)
            })
            .collect();
        assert_eq!(sequential, conjunction);
        assert_eq!(together, conjunction);
    }

    #[test]
    fn predicate_filter_and_empty_chain() {
        let f = PredicateFilter::new("services", |uri: &str| uri.contains("/svc/"));
        assert_eq!(f.apply(&all_resources()).len(), 2);
        assert_eq!(apply_all(&[], &all_resources()), all_resources());
    }

    #[test]
    fn specs_deserialize_and_validate() {
        let registry = MatchTypeRegistry::with_builtins();
        let specs: Vec<FilterSpec> = serde_json::from_str(
            r#"[{"type":"namespace","prefix":"http://a.org/"},
                {"type":"resource_kind","kind":"operation"},
                {"type":"produces","concept":"City","min_type":"Exact"}]"#,
        )
        .unwrap();
        assert_eq!(specs.len(), 3);
        for spec in &specs {
            assert!(spec.build(&catalog(), &matcher(), &registry).is_ok());
        }

        let empty = FilterSpec::Namespace { prefix: " ".into() };
        let err = empty.validate(&registry).unwrap_err();
        assert_eq!(err.status_code(), 400);

        let bad_type = FilterSpec::Produces {
            concept: c("City"),
            min_type: Some("Nearly".into()),
        };
        assert!(matches!(
            bad_type.validate(&registry),
            Err(DiscoveryError::PluginMisconfigured { .. })
        ));
    }
}
