//! # Deadline — Prazo e Cancelamento Cooperativo
//!
//! As duas chamadas potencialmente lentas do núcleo (construção da tabela
//! de matches e as rodadas da busca de composição) recebem um [`Deadline`].
//! Ele combina um instante opcional com uma flag de cancelamento
//! compartilhada; clones observam o mesmo cancelamento, então o trabalho
//! paralelo em andamento (rayon) para assim que qualquer dono cancela.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Prazo opcional + cancelamento compartilhado.
#[derive(Clone, Debug, Default)]
pub struct Deadline {
    at: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    /// Sem prazo; só expira se cancelado.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn at(instant: Instant) -> Self {
        Self {
            at: Some(instant),
            cancelled: Arc::default(),
        }
    }

    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout)
    }

    /// Prazo a partir de milissegundos de configuração (`None` = sem prazo).
    pub fn from_millis(millis: Option<u64>) -> Self {
        millis
            .map(|ms| Self::after(Duration::from_millis(ms)))
            .unwrap_or_default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// `true` se cancelado ou se o instante já passou.
    pub fn is_expired(&self) -> bool {
        self.is_cancelled() || self.at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_expires_until_cancelled() {
        let deadline = Deadline::none();
        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining(), None);
        let clone = deadline.clone();
        clone.cancel();
        assert!(deadline.is_expired());
    }

    #[test]
    fn past_instant_is_expired() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn from_millis_without_value_has_no_limit() {
        assert!(!Deadline::from_millis(None).is_expired());
        assert!(!Deadline::from_millis(Some(60_000)).is_expired());
    }
}
