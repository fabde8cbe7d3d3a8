//! # IndexStore — Armazenamento da Tabela de Matches
//!
//! O [`IndexedConceptMatcher`](super::IndexedConceptMatcher) não guarda a
//! tabela diretamente: ele lê e grava um [`IndexSnapshot`] num
//! [`IndexStore`]. Cada linha ([`IndexEntry`]) mapeia destino → **nome**
//! do tipo de match.
//!
//! | Store | Persistência | Warm start |
//! |-------|--------------|------------|
//! | [`InMemoryIndexStore`] | Nenhuma | Não |
//! | [`JsonFileIndexStore`] | Arquivo JSON (`data/index.json`) | Sim |
//!
//! ## Garantias
//!
//! - O snapshot é trocado **atomicamente** (`RwLock<Option<Arc<_>>>`): um
//!   leitor vê o snapshot antigo completo ou o novo completo, nunca uma mistura.
//! - Leituras concorrentes não bloqueiam umas às outras.
//! - No store de arquivo a escrita é write-then-rename; o snapshot em
//!   memória só é trocado depois que o arquivo foi gravado.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::Concept;
use crate::error::{DiscoveryError, Result};

/// Linha do índice: matches de uma origem.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Destino → nome do [`MatchType`](crate::core::MatchType).
    pub matches: HashMap<Concept, String>,
}

/// Tabela completa, como construída numa população.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub built_at: DateTime<Utc>,
    /// Matcher delegate que produziu a tabela.
    pub produced_by: String,
    /// Nome do tipo mínimo usado na população.
    pub threshold: String,
    /// Vocabulário sobre o qual a tabela foi calculada. Snapshots sem o
    /// campo desserializam com vocabulário vazio.
    #[serde(default)]
    pub vocabulary: BTreeSet<Concept>,
    pub entries: HashMap<Concept, IndexEntry>,
}

impl IndexSnapshot {
    pub fn origin_count(&self) -> usize {
        self.entries.len()
    }

    pub fn pair_count(&self) -> usize {
        self.entries.values().map(|e| e.matches.len()).sum()
    }
}

/// Armazenamento do snapshot do índice.
pub trait IndexStore: Send + Sync {
    fn name(&self) -> &str;

    /// Snapshot atual, se populado.
    fn snapshot(&self) -> Option<Arc<IndexSnapshot>>;

    /// Substitui o snapshot inteiro.
    fn replace(&self, snapshot: IndexSnapshot) -> Result<()>;

    fn is_populated(&self) -> bool {
        self.snapshot().is_some()
    }
}

/// Store em memória do processo.
#[derive(Default)]
pub struct InMemoryIndexStore {
    current: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexStore for InMemoryIndexStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.current.read().clone()
    }

    fn replace(&self, snapshot: IndexSnapshot) -> Result<()> {
        *self.current.write() = Some(Arc::new(snapshot));
        Ok(())
    }
}

/// Store que persiste o snapshot em JSON e mantém cópia em memória.
pub struct JsonFileIndexStore {
    path: PathBuf,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl JsonFileIndexStore {
    /// Abre o store; se o arquivo existir, carrega o snapshot persistido.
    ///
    /// # Erros
    ///
    /// [`DiscoveryError::Unavailable`] se o arquivo existir mas não puder
    /// ser lido ou desserializado.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let current = if path.exists() {
            let json = std::fs::read_to_string(&path).map_err(|e| {
                DiscoveryError::Unavailable(format!("falha ao ler {}: {e}", path.display()))
            })?;
            let snapshot: IndexSnapshot = serde_json::from_str(&json).map_err(|e| {
                DiscoveryError::Unavailable(format!("índice corrompido em {}: {e}", path.display()))
            })?;
            tracing::info!(
                path = %path.display(),
                origins = snapshot.origin_count(),
                built_at = %snapshot.built_at,
                "Índice carregado do disco"
            );
            Some(Arc::new(snapshot))
        } else {
            None
        };
        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IndexStore for JsonFileIndexStore {
    fn name(&self) -> &str {
        "json_file"
    }

    fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.current.read().clone()
    }

    fn replace(&self, snapshot: IndexSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string(&snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        *self.current.write() = Some(Arc::new(snapshot));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> IndexSnapshot {
        let mut entries = HashMap::new();
        entries.insert(
            Concept::new("Car"),
            IndexEntry {
                matches: HashMap::from([
                    (Concept::new("Car"), "Exact".to_string()),
                    (Concept::new("Vehicle"), "Plugin".to_string()),
                ]),
            },
        );
        IndexSnapshot {
            built_at: Utc::now(),
            produced_by: "logic".to_string(),
            threshold: "Plugin".to_string(),
            vocabulary: BTreeSet::from([Concept::new("Car"), Concept::new("Vehicle")]),
            entries,
        }
    }

    #[test]
    fn memory_store_starts_empty_and_swaps() {
        let store = InMemoryIndexStore::new();
        assert!(!store.is_populated());
        store.replace(snapshot()).unwrap();
        let current = store.snapshot().unwrap();
        assert_eq!(current.origin_count(), 1);
        assert_eq!(current.pair_count(), 2);
    }

    #[test]
    fn json_store_warm_starts_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.json");

        let store = JsonFileIndexStore::open(&path).unwrap();
        assert!(!store.is_populated());
        store.replace(snapshot()).unwrap();
        assert!(path.exists());

        let reopened = JsonFileIndexStore::open(&path).unwrap();
        let loaded = reopened.snapshot().unwrap();
        assert_eq!(loaded.entries, snapshot().entries);
        assert_eq!(loaded.threshold, "Plugin");
        assert_eq!(loaded.vocabulary, snapshot().vocabulary);
    }

    #[test]
    fn snapshot_without_vocabulary_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(
            &path,
            r#"{"built_at":"2026-01-01T00:00:00Z","produced_by":"logic","threshold":"Plugin","entries":{}}"#,
        )
        .unwrap();
        let store = JsonFileIndexStore::open(&path).unwrap();
        assert!(store.snapshot().unwrap().vocabulary.is_empty());
    }

    #[test]
    fn corrupted_file_is_reported_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonFileIndexStore::open(&path).err().unwrap();
        assert_eq!(err.status_code(), 503);
    }
}
