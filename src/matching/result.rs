//! # MatchResult — Resultado Imutável de um Match
//!
//! Tupla `{origem, destino, tipo, produzido por}`. Um match que falhou é
//! representado pela variante explícita [`MatchType::FAIL`], nunca por
//! ausência de resultado.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{Concept, MatchType};

/// Resultado de um match par-a-par entre dois conceitos.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub origin: Concept,
    pub destination: Concept,
    pub match_type: MatchType,
    /// Identificador do matcher que produziu o resultado.
    pub produced_by: String,
}

impl MatchResult {
    pub fn new(
        origin: Concept,
        destination: Concept,
        match_type: MatchType,
        produced_by: impl Into<String>,
    ) -> Self {
        Self {
            origin,
            destination,
            match_type,
            produced_by: produced_by.into(),
        }
    }

    /// Resultado `Fail` explícito.
    pub fn fail(origin: &Concept, destination: &Concept, produced_by: &str) -> Self {
        Self::new(
            origin.clone(),
            destination.clone(),
            MatchType::FAIL,
            produced_by,
        )
    }

    pub fn is_at_least(&self, min: &MatchType) -> bool {
        self.match_type.is_at_least(min)
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} →[{}] {} ({})",
            self.origin, self.match_type, self.destination, self.produced_by
        )
    }
}
