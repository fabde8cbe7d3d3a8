//! # Configuração do Motor de Descoberta
//!
//! Arquivo JSON lido de `$DISCOVERY_CONFIG` (padrão `data/config.json`).
//! Arquivo ausente significa configuração padrão; todos os campos são
//! opcionais.
//!
//! ```json
//! {
//!   "catalog_path": "data/catalog.json",
//!   "match_types": [{ "name": "NearPlugin", "description": "...", "rank": 350 }],
//!   "matcher": {
//!     "kind": "indexed",
//!     "index_threshold": "Plugin",
//!     "store": { "type": "json_file", "path": "data/index.json" },
//!     "build_deadline_ms": 30000
//!   },
//!   "composition": { "threshold": "Plugin", "max_rounds": 64, "deadline_ms": 2000, "worker_threads": 4 },
//!   "ranking": {
//!     "filters": [{ "type": "namespace", "prefix": "http://example.org/" }],
//!     "scorers": ["popularity", "text_relevance", "match_quality"],
//!     "max_results": 20
//!   }
//! }
//! ```
//!
//! [`DiscoveryConfig::validate`] roda no carregamento; um arquivo inválido
//! impede a inicialização.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{MatchType, MatchTypeRegistry};
use crate::error::{DiscoveryError, Result};
use crate::matching::{IndexStore, InMemoryIndexStore, JsonFileIndexStore, MatcherKind};
use crate::ranking::{FilterSpec, ScorerKind};

/// Variável de ambiente com o caminho do arquivo de configuração.
pub const CONFIG_ENV: &str = "DISCOVERY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "data/config.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub catalog_path: PathBuf,
    /// Tipos de match adicionais registrados na inicialização.
    pub match_types: Vec<CustomMatchType>,
    pub matcher: MatcherConfig,
    pub composition: CompositionConfig,
    pub ranking: RankingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomMatchType {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rank: u16,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub kind: MatcherKind,
    /// Tipo mínimo materializado no índice.
    pub index_threshold: String,
    pub store: StoreConfig,
    pub build_deadline_ms: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    #[default]
    Memory,
    JsonFile {
        path: PathBuf,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    pub threshold: String,
    pub max_rounds: usize,
    pub deadline_ms: Option<u64>,
    /// Tamanho do pool dedicado; `None` usa o pool global do rayon.
    pub worker_threads: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub filters: Vec<FilterSpec>,
    pub scorers: Vec<ScorerKind>,
    pub max_results: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("data/catalog.json"),
            match_types: Vec::new(),
            matcher: MatcherConfig::default(),
            composition: CompositionConfig::default(),
            ranking: RankingConfig::default(),
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            kind: MatcherKind::default(),
            index_threshold: MatchType::PLUGIN.name().to_string(),
            store: StoreConfig::default(),
            build_deadline_ms: None,
        }
    }
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            threshold: MatchType::PLUGIN.name().to_string(),
            max_rounds: 64,
            deadline_ms: None,
            worker_threads: None,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            scorers: vec![
                ScorerKind::Popularity,
                ScorerKind::TextRelevance,
                ScorerKind::MatchQuality,
            ],
            max_results: 20,
        }
    }
}

impl DiscoveryConfig {
    /// Carrega do caminho em `$DISCOVERY_CONFIG` ou do padrão.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(path)
    }

    /// Carrega e valida. Arquivo inexistente → configuração padrão.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Falha ao ler {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Falha ao desserializar {}", path.display()))?
        } else {
            tracing::info!("Nenhum {} encontrado, usando configuração padrão", path.display());
            Self::default()
        };
        config
            .validate()
            .with_context(|| format!("Configuração inválida em {}", path.display()))?;
        Ok(config)
    }

    /// Registro de tipos de match: pré-definidos + `match_types`.
    pub fn registry(&self) -> Result<MatchTypeRegistry> {
        let registry = MatchTypeRegistry::with_builtins();
        for custom in &self.match_types {
            registry.register(&custom.name, &custom.description, custom.rank)?;
        }
        Ok(registry)
    }

    pub fn validate(&self) -> Result<()> {
        let registry = self.registry()?;
        for (field, name) in [
            ("matcher.index_threshold", &self.matcher.index_threshold),
            ("composition.threshold", &self.composition.threshold),
        ] {
            if name.trim().is_empty() {
                return Err(DiscoveryError::Configuration(format!("{field} vazio")));
            }
            registry.resolve(name).map_err(|_| {
                DiscoveryError::Configuration(format!("{field}: tipo de match desconhecido '{name}'"))
            })?;
        }
        if self.composition.max_rounds == 0 {
            return Err(DiscoveryError::Configuration(
                "composition.max_rounds deve ser maior que zero".to_string(),
            ));
        }
        if self.composition.worker_threads == Some(0) {
            return Err(DiscoveryError::Configuration(
                "composition.worker_threads deve ser maior que zero".to_string(),
            ));
        }
        if self.ranking.max_results == 0 {
            return Err(DiscoveryError::Configuration(
                "ranking.max_results deve ser maior que zero".to_string(),
            ));
        }
        if let StoreConfig::JsonFile { path } = &self.matcher.store {
            if path.as_os_str().is_empty() {
                return Err(DiscoveryError::Configuration(
                    "matcher.store.path vazio".to_string(),
                ));
            }
        }
        for filter in &self.ranking.filters {
            filter.validate(&registry)?;
        }
        Ok(())
    }

    /// Tipo mínimo efetivo do índice.
    ///
    /// O índice responde `Fail` para tudo abaixo do seu limiar, então o
    /// limiar configurado é rebaixado até o menor tipo usado em consultas
    /// par-a-par: o limiar de composição e o `min_type` dos filtros
    /// `produces`.
    pub fn index_threshold(&self, registry: &MatchTypeRegistry) -> Result<MatchType> {
        let mut threshold = registry.resolve(&self.matcher.index_threshold)?;
        let mut required = vec![registry.resolve(&self.composition.threshold)?];
        for filter in &self.ranking.filters {
            if let FilterSpec::Produces { min_type, .. } = filter {
                required.push(match min_type {
                    Some(name) => registry.resolve(name)?,
                    None => MatchType::PLUGIN,
                });
            }
        }
        for min_type in required {
            if min_type < threshold {
                threshold = min_type;
            }
        }
        Ok(threshold)
    }

    /// Abre o store do índice configurado.
    pub fn open_store(&self) -> Result<Arc<dyn IndexStore>> {
        let store: Arc<dyn IndexStore> = match &self.matcher.store {
            StoreConfig::Memory => Arc::new(InMemoryIndexStore::new()),
            StoreConfig::JsonFile { path } => Arc::new(JsonFileIndexStore::open(path)?),
        };
        Ok(store)
    }
}
