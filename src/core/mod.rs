//! # Módulo Core — Tipos Fundamentais do Domínio
//!
//! Tipos sobre os quais todo o motor de descoberta é construído:
//!
//! - [`Concept`] — URI opaca de uma classe da ontologia
//! - [`MatchType`] — qualidade de match, com ordem total por rank
//! - [`MatchTypeRegistry`] — tipos conhecidos, extensível em tempo de execução
//! - [`Operation`] / [`Service`] — operações com entradas e saídas tipadas por conceitos
//! - [`ServiceCatalog`] — fronteira com o catálogo externo
//! - [`InMemoryCatalog`] — catálogo em memória com índices reversos
//! - [`Deadline`] — prazo e cancelamento para as chamadas longas
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use crate::core::{Concept, InMemoryCatalog, Operation, Service, ServiceCatalog};
//!
//! let mut catalog = InMemoryCatalog::new();
//! catalog.add_service(Service::new(
//!     "svc:geo",
//!     vec![Operation::new("op:lookup", vec![Concept::new("City")], vec![Concept::new("Coords")])],
//! ));
//! assert_eq!(catalog.operations_requiring(&Concept::new("City")).len(), 1);
//! ```

pub mod catalog;
pub mod concept;
pub mod deadline;
pub mod match_type;
pub mod operation;

pub use catalog::{InMemoryCatalog, ResourceKind, ServiceCatalog};
pub use concept::Concept;
pub use deadline::Deadline;
pub use match_type::{MatchType, MatchTypeRegistry};
pub use operation::{Operation, Service};
