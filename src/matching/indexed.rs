//! # IndexedConceptMatcher — Tabela de Matches Pré-calculada
//!
//! Transforma o match lógico (caro, consulta o reasoner) em **lookup O(1)**
//! sobre uma tabela materializada uma única vez:
//!
//! ```text
//!   construção                               consulta
//!   ──────────                               ────────
//!   delegate.list_matches_at_least_of_type   match_concepts(o, d)
//!        (vocabulário, limiar)                  │
//!              │                                ▼
//!              ▼                           snapshot.entries[o].matches[d]
//!   IndexSnapshot { o → { d → "Plugin" } }      │ ausente → Fail
//!              │                                ▼
//!              └──▶ IndexStore ◀────────── registry.lookup("Plugin")
//! ```
//!
//! ## Invariantes
//!
//! - População **no máximo uma vez** por instância: chamadas concorrentes
//!   são serializadas pelo `populate_guard`; a primeira constrói, as demais
//!   observam o índice pronto.
//! - Nenhum índice parcial é visível: a tabela só chega ao store depois de
//!   completa, e o store troca o snapshot atomicamente.
//! - Falha do delegate durante [`build`](IndexedConceptMatcher::build) é
//!   fatal ([`DiscoveryError::Configuration`]).
//! - Um snapshot persistido só é reaproveitado se `produced_by`, `threshold`
//!   e o vocabulário coincidirem; qualquer diferença força reconstrução.
//! - [`rebuild`](IndexedConceptMatcher::rebuild) reconstrói sob demanda;
//!   não há detecção automática de mudanças no catálogo em execução.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;

use super::{ConceptMatcher, IndexEntry, IndexSnapshot, IndexStore, MatchResult, MatchTable};
use crate::core::{Concept, Deadline, MatchType, MatchTypeRegistry};
use crate::error::{DiscoveryError, Result};

const MATCHER_ID: &str = "indexed";

/// Matcher servido de uma tabela pré-calculada a partir de um delegate.
pub struct IndexedConceptMatcher {
    delegate: Arc<dyn ConceptMatcher>,
    registry: Arc<MatchTypeRegistry>,
    store: Arc<dyn IndexStore>,
    vocabulary: BTreeSet<Concept>,
    threshold: MatchType,
    populate_guard: Mutex<()>,
}

impl IndexedConceptMatcher {
    /// Cria o matcher **sem** popular o índice.
    pub fn new(
        delegate: Arc<dyn ConceptMatcher>,
        registry: Arc<MatchTypeRegistry>,
        store: Arc<dyn IndexStore>,
        vocabulary: BTreeSet<Concept>,
        threshold: MatchType,
    ) -> Self {
        Self {
            delegate,
            registry,
            store,
            vocabulary,
            threshold,
            populate_guard: Mutex::new(()),
        }
    }

    /// Cria e popula o índice. Qualquer falha é fatal.
    pub fn build(
        delegate: Arc<dyn ConceptMatcher>,
        registry: Arc<MatchTypeRegistry>,
        store: Arc<dyn IndexStore>,
        vocabulary: &BTreeSet<Concept>,
        threshold: MatchType,
        deadline: &Deadline,
    ) -> Result<Self> {
        let matcher = Self::new(delegate, registry, store, vocabulary.clone(), threshold);
        matcher.populate(deadline).map_err(|e| match e {
            DiscoveryError::Configuration(_) => e,
            other => DiscoveryError::Configuration(format!(
                "falha ao popular o índice de matches: {other}"
            )),
        })?;
        Ok(matcher)
    }

    /// Popula o índice se ainda não estiver populado.
    ///
    /// Retorna `true` se esta chamada construiu a tabela e `false` se o
    /// índice já estava pronto (inclusive carregado do disco).
    pub fn populate(&self, deadline: &Deadline) -> Result<bool> {
        let _guard = self.populate_guard.lock();
        if let Some(existing) = self.store.snapshot() {
            if self.is_compatible(&existing) {
                tracing::debug!(store = self.store.name(), "Índice já populado");
                return Ok(false);
            }
            tracing::warn!(
                store = self.store.name(),
                produced_by = %existing.produced_by,
                threshold = %existing.threshold,
                stored_vocabulary = existing.vocabulary.len(),
                vocabulary = self.vocabulary.len(),
                "Índice persistido incompatível; reconstruindo"
            );
        }
        self.populate_locked(deadline)?;
        Ok(true)
    }

    /// Reconstrói a tabela e a troca atomicamente no store.
    ///
    /// Leitores concorrentes continuam vendo o snapshot anterior até a troca.
    pub fn rebuild(&self, deadline: &Deadline) -> Result<()> {
        let _guard = self.populate_guard.lock();
        self.populate_locked(deadline)
    }

    pub fn is_populated(&self) -> bool {
        self.store.is_populated()
    }

    pub fn threshold(&self) -> &MatchType {
        &self.threshold
    }

    pub fn vocabulary(&self) -> &BTreeSet<Concept> {
        &self.vocabulary
    }

    fn is_compatible(&self, snapshot: &IndexSnapshot) -> bool {
        snapshot.produced_by == self.delegate.id()
            && snapshot.threshold == self.threshold.name()
            && snapshot.vocabulary == self.vocabulary
    }

    fn populate_locked(&self, deadline: &Deadline) -> Result<()> {
        let started = Instant::now();
        let table =
            self.delegate
                .list_matches_at_least_of_type(&self.vocabulary, &self.threshold, deadline)?;

        let entries: HashMap<Concept, IndexEntry> = table
            .into_iter()
            .map(|(origin, row)| {
                let matches = row
                    .into_iter()
                    .map(|(destination, result)| (destination, result.match_type.name().to_string()))
                    .collect();
                (origin, IndexEntry { matches })
            })
            .collect();

        let snapshot = IndexSnapshot {
            built_at: Utc::now(),
            produced_by: self.delegate.id().to_string(),
            threshold: self.threshold.name().to_string(),
            vocabulary: self.vocabulary.clone(),
            entries,
        };
        let origins = snapshot.origin_count();
        let pairs = snapshot.pair_count();
        self.store.replace(snapshot)?;

        tracing::info!(
            origins,
            pairs,
            vocabulary = self.vocabulary.len(),
            threshold = %self.threshold,
            store = self.store.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Índice de matches populado"
        );
        Ok(())
    }

    fn resolve_name(&self, name: &str) -> MatchType {
        self.registry.lookup(name).unwrap_or_else(|| {
            tracing::warn!(match_type = %name, "Tipo de match desconhecido no índice; tratado como Fail");
            MatchType::FAIL
        })
    }

    fn result_for(&self, origin: &Concept, destination: &Concept, name: &str) -> MatchResult {
        MatchResult::new(
            origin.clone(),
            destination.clone(),
            self.resolve_name(name),
            MATCHER_ID,
        )
    }
}

impl ConceptMatcher for IndexedConceptMatcher {
    fn id(&self) -> &str {
        MATCHER_ID
    }

    fn match_types_supported(&self) -> Vec<MatchType> {
        let mut types: Vec<MatchType> = self
            .delegate
            .match_types_supported()
            .into_iter()
            .filter(|t| t.is_at_least(&self.threshold))
            .collect();
        types.push(MatchType::FAIL);
        types.sort();
        types.dedup();
        types
    }

    fn match_concepts(&self, origin: &Concept, destination: &Concept) -> MatchResult {
        let Some(snapshot) = self.store.snapshot() else {
            return MatchResult::fail(origin, destination, MATCHER_ID);
        };
        match snapshot
            .entries
            .get(origin)
            .and_then(|entry| entry.matches.get(destination))
        {
            Some(name) => self.result_for(origin, destination, name),
            None => MatchResult::fail(origin, destination, MATCHER_ID),
        }
    }

    fn list_matches_at_least_of_type(
        &self,
        concepts: &BTreeSet<Concept>,
        min_type: &MatchType,
        deadline: &Deadline,
    ) -> Result<MatchTable> {
        // abaixo do limiar a tabela está incompleta
        if !min_type.is_at_least(&self.threshold) {
            return self
                .delegate
                .list_matches_at_least_of_type(concepts, min_type, deadline);
        }
        let snapshot = self
            .store
            .snapshot()
            .ok_or_else(|| DiscoveryError::Unavailable("índice de matches não populado".into()))?;

        let mut table = MatchTable::new();
        for origin in concepts {
            if deadline.is_expired() {
                return Err(DiscoveryError::DeadlineExceeded("listagem de matches"));
            }
            let Some(entry) = snapshot.entries.get(origin) else {
                continue;
            };
            let row: HashMap<Concept, MatchResult> = entry
                .matches
                .iter()
                .filter(|(destination, _)| concepts.contains(*destination))
                .map(|(destination, name)| self.result_for(origin, destination, name))
                .filter(|result| result.is_at_least(min_type))
                .map(|result| (result.destination.clone(), result))
                .collect();
            if !row.is_empty() {
                table.insert(origin.clone(), row);
            }
        }
        Ok(table)
    }

    fn list_matches_within_range(
        &self,
        origin: &Concept,
        min_type: &MatchType,
        max_type: &MatchType,
    ) -> Result<BTreeMap<Concept, MatchResult>> {
        if min_type > max_type {
            return Err(DiscoveryError::InvalidQuery(format!(
                "intervalo vazio: {min_type} > {max_type}"
            )));
        }
        if !min_type.is_at_least(&self.threshold) {
            return self
                .delegate
                .list_matches_within_range(origin, min_type, max_type);
        }
        let snapshot = self
            .store
            .snapshot()
            .ok_or_else(|| DiscoveryError::Unavailable("índice de matches não populado".into()))?;

        Ok(snapshot
            .entries
            .get(origin)
            .map(|entry| {
                entry
                    .matches
                    .iter()
                    .map(|(destination, name)| self.result_for(origin, destination, name))
                    .filter(|r| r.is_at_least(min_type) && max_type.is_at_least(&r.match_type))
                    .map(|r| (r.destination.clone(), r))
                    .collect()
            })
            .unwrap_or_default())
    }
}
