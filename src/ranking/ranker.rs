//! # StandardRanker — Ordem Total Determinística
//!
//! Pontuação composta **decrescente**; empates desfeitos pela URI em ordem
//! lexical **crescente**. Rodar duas vezes sobre a mesma entrada dá a mesma
//! saída.

use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default)]
pub struct StandardRanker;

impl StandardRanker {
    pub fn rank(&self, scores: HashMap<String, f64>) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| Self::order(a, b));
        ranked
    }

    fn order(a: &(String, f64), b: &(String, f64)) -> Ordering {
        b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
    }
}
