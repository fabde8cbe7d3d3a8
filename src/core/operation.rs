//! # Operation e Service — Modelo de Serviços
//!
//! Uma [`Operation`] é o ponto invocável de um serviço: tem uma lista
//! ordenada de conceitos de **entrada requeridos** e uma lista ordenada de
//! conceitos de **saída produzidos**. Um [`Service`] agrupa uma ou mais
//! operações e é dono exclusivo delas.
//!
//! ```text
//! Service "http://ex.org/svc/Geo"
//!   ├── Operation ".../Geo#lookup"   inputs: [City]        outputs: [Coordinates]
//!   └── Operation ".../Geo#reverse"  inputs: [Coordinates] outputs: [Address]
//! ```
//!
//! Durante uma requisição de descoberta operações são somente leitura —
//! o catálogo entrega snapshots via `Arc<Operation>`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Concept;

/// Operação invocável com entradas requeridas e saídas produzidas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// URI da operação.
    pub uri: String,
    /// Label legível (opcional; usado na relevância textual).
    #[serde(default)]
    pub label: Option<String>,
    /// Conceitos requeridos, em ordem de declaração.
    #[serde(default)]
    pub inputs: Vec<Concept>,
    /// Conceitos produzidos, em ordem de declaração.
    #[serde(default)]
    pub outputs: Vec<Concept>,
}

impl Operation {
    pub fn new(uri: impl Into<String>, inputs: Vec<Concept>, outputs: Vec<Concept>) -> Self {
        Self {
            uri: uri.into(),
            label: None,
            inputs,
            outputs,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Operação sem entradas — sempre invocável.
    pub fn is_trivially_invocable(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Entradas sem repetição, em ordem lexical.
    pub fn distinct_inputs(&self) -> BTreeSet<&Concept> {
        self.inputs.iter().collect()
    }

    /// Texto usado para relevância textual: label, ou fragmento da URI.
    pub fn display_text(&self) -> &str {
        self.label
            .as_deref()
            .unwrap_or_else(|| fragment_of(&self.uri))
    }
}

/// Grupo nomeado de operações.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// URI do serviço.
    pub uri: String,
    /// Label legível.
    #[serde(default)]
    pub label: Option<String>,
    /// Tipo/categoria declarada do serviço (ex: "rest", "wsdl").
    #[serde(default)]
    pub kind: Option<String>,
    /// Operações pertencentes a este serviço.
    pub operations: Vec<Operation>,
}

impl Service {
    pub fn new(uri: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            uri: uri.into(),
            label: None,
            kind: None,
            operations,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn display_text(&self) -> &str {
        self.label
            .as_deref()
            .unwrap_or_else(|| fragment_of(&self.uri))
    }
}

fn fragment_of(uri: &str) -> &str {
    uri.rsplit(|c: char| c == '#' || c == '/')
        .find(|s| !s.is_empty())
        .unwrap_or(uri)
}
