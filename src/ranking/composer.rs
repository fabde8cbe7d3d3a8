//! # UniformScoreComposer — Combinação de Pontuações
//!
//! Ponto de sincronização do pipeline: espera a saída de todos os scorers e
//! produz uma pontuação por recurso com **peso uniforme** `1/N`:
//!
//! ```text
//! composto(r) = Σ_s (1/N) · score_s(r)      score_s(r) ausente → 0
//! ```
//!
//! `N` é o número de scorers configurados, inclusive os que falharam. Um
//! scorer com erro contribui zero para todos os recursos; valores não
//! finitos (NaN, ∞) são tratados como ausentes.

use std::collections::{BTreeSet, HashMap};

use crate::error::Result;

/// Saída de um scorer, identificada pelo nome.
pub type ScorerOutput = (String, Result<HashMap<String, f64>>);

#[derive(Clone, Copy, Debug, Default)]
pub struct UniformScoreComposer;

impl UniformScoreComposer {
    /// Pontuação composta para cada recurso de `resources`.
    ///
    /// Sem scorers, todos os recursos ficam com 0.
    pub fn compose(&self, resources: &BTreeSet<String>, outputs: &[ScorerOutput]) -> HashMap<String, f64> {
        let mut composite: HashMap<String, f64> =
            resources.iter().map(|r| (r.clone(), 0.0)).collect();
        if outputs.is_empty() {
            return composite;
        }
        let weight = 1.0 / outputs.len() as f64;

        for (scorer, output) in outputs {
            let scores = match output {
                Ok(scores) => scores,
                Err(e) => {
                    tracing::warn!(scorer = %scorer, error = %e, "Scorer falhou; contribuição zerada");
                    continue;
                }
            };
            for (resource, total) in composite.iter_mut() {
                match scores.get(resource) {
                    Some(value) if value.is_finite() => *total += weight * value,
                    Some(value) => {
                        tracing::warn!(scorer = %scorer, resource = %resource, value, "Pontuação não finita ignorada");
                    }
                    None => {}
                }
            }
        }
        composite
    }
}
