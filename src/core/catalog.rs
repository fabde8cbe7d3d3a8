//! # ServiceCatalog — Fronteira com o Catálogo de Serviços
//!
//! O catálogo é um **colaborador externo**: o núcleo apenas consulta
//! "quais operações requerem/produzem este conceito" e "quais conceitos
//! existem". O núcleo nunca altera o catálogo.
//!
//! [`InMemoryCatalog`] é a implementação usada pelo binário e pelos testes,
//! carregada do documento JSON via [`persistence`](crate::persistence).
//!
//! ## Armazenamento
//!
//! - **Serviços**: `BTreeMap<uri, Service>` — iteração determinística
//! - **Operações**: `BTreeMap<uri, Arc<Operation>>` — snapshots baratos para a busca
//! - **Índices reversos**: conceito → operações que o requerem / produzem
//! - **Uso**: contagem de invocações por recurso (alimenta o scorer de popularidade)
//!
//! Os índices reversos não são serializados e são reconstruídos em
//! [`rebuild_index()`](InMemoryCatalog::rebuild_index) após o load.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Concept, Operation, Service};

/// Tipo de recurso identificado por uma URI do catálogo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Service,
    Operation,
}

/// Contrato consumido pelo núcleo de descoberta.
pub trait ServiceCatalog: Send + Sync {
    /// Todas as operações do catálogo, em ordem de URI.
    fn operations(&self) -> Vec<Arc<Operation>>;

    /// Operações que requerem o conceito como entrada.
    fn operations_requiring(&self, concept: &Concept) -> Vec<Arc<Operation>>;

    /// Operações que produzem o conceito como saída.
    fn operations_producing(&self, concept: &Concept) -> Vec<Arc<Operation>>;

    /// Todos os conceitos citados em entradas ou saídas.
    fn concepts(&self) -> BTreeSet<Concept>;

    fn service(&self, uri: &str) -> Option<&Service>;

    fn operation(&self, uri: &str) -> Option<Arc<Operation>>;

    /// URI do serviço dono da operação.
    fn service_of(&self, operation_uri: &str) -> Option<&str>;

    /// Tipo do recurso, ou `None` se a URI não pertence ao catálogo.
    fn resource_kind(&self, uri: &str) -> Option<ResourceKind>;

    /// Texto legível do recurso (label ou fragmento da URI).
    fn resource_text(&self, uri: &str) -> Option<String>;

    /// Número de invocações registradas para o recurso.
    fn usage_count(&self, _uri: &str) -> Option<u64> {
        None
    }
}

/// Catálogo em memória.
#[derive(Default, Serialize, Deserialize)]
pub struct InMemoryCatalog {
    services: BTreeMap<String, Service>,

    #[serde(default)]
    usage: HashMap<String, u64>,

    #[serde(skip, default)]
    operations: BTreeMap<String, Arc<Operation>>,

    #[serde(skip, default)]
    operation_service: HashMap<String, String>,

    #[serde(skip, default)]
    requiring: HashMap<Concept, Vec<String>>,

    #[serde(skip, default)]
    producing: HashMap<Concept, Vec<String>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrói o catálogo a partir de serviços e contagens de uso.
    pub fn from_services(services: Vec<Service>, usage: HashMap<String, u64>) -> Self {
        let mut catalog = Self {
            usage,
            ..Self::default()
        };
        for service in services {
            catalog.services.insert(service.uri.clone(), service);
        }
        catalog.rebuild_index();
        catalog
    }

    /// Adiciona (ou substitui) um serviço e atualiza os índices.
    pub fn add_service(&mut self, service: Service) {
        tracing::debug!(uri = %service.uri, operations = service.operations.len(), "Catálogo: serviço armazenado");
        self.services.insert(service.uri.clone(), service);
        self.rebuild_index();
    }

    pub fn record_usage(&mut self, uri: &str, count: u64) {
        *self.usage.entry(uri.to_string()).or_default() += count;
    }

    /// Reconstrói operações e índices reversos a partir dos serviços.
    ///
    /// Deve ser chamado após desserialização. Uma URI de operação repetida
    /// em dois serviços fica com a última ocorrência (ordem de URI do serviço).
    pub fn rebuild_index(&mut self) {
        self.operations.clear();
        self.operation_service.clear();
        self.requiring.clear();
        self.producing.clear();

        for service in self.services.values() {
            for op in &service.operations {
                if self.operations.contains_key(&op.uri) {
                    tracing::warn!(operation = %op.uri, service = %service.uri, "Catálogo: URI de operação duplicada");
                }
                self.operations.insert(op.uri.clone(), Arc::new(op.clone()));
                self.operation_service
                    .insert(op.uri.clone(), service.uri.clone());
            }
        }

        for op in self.operations.values() {
            for input in op.distinct_inputs() {
                self.requiring
                    .entry(input.clone())
                    .or_default()
                    .push(op.uri.clone());
            }
            let outputs: BTreeSet<&Concept> = op.outputs.iter().collect();
            for output in outputs {
                self.producing
                    .entry(output.clone())
                    .or_default()
                    .push(op.uri.clone());
            }
        }
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    pub fn usage(&self) -> &HashMap<String, u64> {
        &self.usage
    }

    fn resolve(&self, uris: Option<&Vec<String>>) -> Vec<Arc<Operation>> {
        uris.map(|uris| {
            uris.iter()
                .filter_map(|uri| self.operations.get(uri).cloned())
                .collect()
        })
        .unwrap_or_default()
    }
}

impl ServiceCatalog for InMemoryCatalog {
    fn operations(&self) -> Vec<Arc<Operation>> {
        self.operations.values().cloned().collect()
    }

    fn operations_requiring(&self, concept: &Concept) -> Vec<Arc<Operation>> {
        self.resolve(self.requiring.get(concept))
    }

    fn operations_producing(&self, concept: &Concept) -> Vec<Arc<Operation>> {
        self.resolve(self.producing.get(concept))
    }

    fn concepts(&self) -> BTreeSet<Concept> {
        self.requiring
            .keys()
            .chain(self.producing.keys())
            .cloned()
            .collect()
    }

    fn service(&self, uri: &str) -> Option<&Service> {
        self.services.get(uri)
    }

    fn operation(&self, uri: &str) -> Option<Arc<Operation>> {
        self.operations.get(uri).cloned()
    }

    fn service_of(&self, operation_uri: &str) -> Option<&str> {
        self.operation_service.get(operation_uri).map(String::as_str)
    }

    fn resource_kind(&self, uri: &str) -> Option<ResourceKind> {
        if self.services.contains_key(uri) {
            Some(ResourceKind::Service)
        } else if self.operations.contains_key(uri) {
            Some(ResourceKind::Operation)
        } else {
            None
        }
    }

    fn resource_text(&self, uri: &str) -> Option<String> {
        if let Some(service) = self.services.get(uri) {
            return Some(service.display_text().to_string());
        }
        self.operations
            .get(uri)
            .map(|op| op.display_text().to_string())
    }

    fn usage_count(&self, uri: &str) -> Option<u64> {
        self.usage.get(uri).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> Concept {
        Concept::new(s)
    }

    fn sample() -> InMemoryCatalog {
        InMemoryCatalog::from_services(
            vec![
                Service::new(
                    "svc:geo",
                    vec![
                        Operation::new("op:lookup", vec![c("City")], vec![c("Coords")]),
                        Operation::new("op:reverse", vec![c("Coords")], vec![c("Address")]),
                    ],
                ),
                Service::new(
                    "svc:weather",
                    vec![Operation::new(
                        "op:forecast",
                        vec![c("Coords"), c("Coords")],
                        vec![c("Forecast")],
                    )],
                ),
            ],
            HashMap::from([("op:lookup".to_string(), 12)]),
        )
    }

    #[test]
    fn reverse_indexes_cover_inputs_and_outputs() {
        let catalog = sample();
        let requiring: Vec<String> = catalog
            .operations_requiring(&c("Coords"))
            .iter()
            .map(|op| op.uri.clone())
            .collect();
        assert_eq!(requiring, vec!["op:forecast", "op:reverse"]);
        assert_eq!(catalog.operations_producing(&c("Coords")).len(), 1);
        assert!(catalog.operations_requiring(&c("Unknown")).is_empty());
    }

    #[test]
    fn concepts_are_union_of_inputs_and_outputs() {
        let concepts = sample().concepts();
        let names: Vec<&str> = concepts.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["Address", "City", "Coords", "Forecast"]);
    }

    #[test]
    fn resource_lookups() {
        let catalog = sample();
        assert_eq!(catalog.resource_kind("svc:geo"), Some(ResourceKind::Service));
        assert_eq!(catalog.resource_kind("op:forecast"), Some(ResourceKind::Operation));
        assert_eq!(catalog.resource_kind("nope"), None);
        assert_eq!(catalog.service_of("op:forecast"), Some("svc:weather"));
        assert_eq!(catalog.usage_count("op:lookup"), Some(12));
        assert_eq!(catalog.usage_count("op:reverse"), None);
    }

    #[test]
    fn deserialized_catalog_needs_rebuild() {
        let json = serde_json::to_string(&sample()).unwrap();
        let mut loaded: InMemoryCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.operation_count(), 0);
        loaded.rebuild_index();
        assert_eq!(loaded.operation_count(), 3);
        assert_eq!(loaded.service_count(), 2);
    }
}
