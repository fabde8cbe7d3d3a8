//! # Módulo Discovery — Composição e Descoberta Direta
//!
//! - [`composition`] — busca em camadas de operações que se tornam
//!   invocáveis a partir de conceitos disponíveis
//! - [`io`] — operações/serviços que produzem ou consomem conceitos
//!
//! Ambos consomem um [`ConceptMatcher`](crate::matching::ConceptMatcher)
//! e um [`ServiceCatalog`](crate::core::ServiceCatalog) somente leitura.

pub mod composition;
pub mod io;

pub use composition::{CompositionOptions, CompositionOutcome, RelevantServicesFinder, Termination};
pub use io::{Coverage, DiscoveryHit, OperationDiscoverer};
