//! # Scorers — Pontuação Independente de Recursos
//!
//! Cada [`Scorer`] recebe o conjunto filtrado e um parâmetro textual
//! opcional (ex: texto da consulta) e devolve `URI → pontuação`.
//!
//! Regra de falha suave: um recurso que o scorer **não sabe pontuar é
//! omitido** do mapa; o compositor trata a omissão como contribuição zero.
//! Um scorer que devolve `Err` tem sua contribuição inteira zerada, sem
//! derrubar os demais.
//!
//! | Scorer | Pontuação | Omite |
//! |--------|-----------|-------|
//! | [`PopularityScorer`] | `ln(1+uso) / ln(1+uso máximo)` | Recursos sem contagem de uso |
//! | [`TextRelevanceScorer`] | Fração dos termos da consulta presentes no texto do recurso | Tudo, se não houver consulta |
//! | [`MatchQualityScorer`] | `rank(melhor match) / rank(Exact)` | Recursos sem match |

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::core::{MatchType, ServiceCatalog};
use crate::error::{DiscoveryError, Result};
use crate::matching::MatchResult;

/// Estágio de pontuação do pipeline de ranking.
pub trait Scorer: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, resources: &BTreeSet<String>, parameter: Option<&str>)
        -> Result<HashMap<String, f64>>;
}

/// Popularidade pelo número de invocações registradas no catálogo.
pub struct PopularityScorer {
    catalog: Arc<dyn ServiceCatalog>,
}

impl PopularityScorer {
    pub fn new(catalog: Arc<dyn ServiceCatalog>) -> Self {
        Self { catalog }
    }
}

impl Scorer for PopularityScorer {
    fn name(&self) -> &str {
        "popularity"
    }

    fn apply(&self, resources: &BTreeSet<String>, _parameter: Option<&str>) -> Result<HashMap<String, f64>> {
        let counts: Vec<(&String, u64)> = resources
            .iter()
            .filter_map(|r| self.catalog.usage_count(r).map(|n| (r, n)))
            .collect();
        let max = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
        let denominator = (1.0 + max as f64).ln();
        Ok(counts
            .into_iter()
            .map(|(r, n)| {
                let score = if max == 0 {
                    0.0
                } else {
                    (1.0 + n as f64).ln() / denominator
                };
                (r.clone(), score)
            })
            .collect())
    }
}

/// Relevância textual entre a consulta e o label/fragmento do recurso.
///
/// O texto passa por NFD, remoção de acentos, separação de camelCase e
/// minúsculas antes da tokenização.
pub struct TextRelevanceScorer {
    catalog: Arc<dyn ServiceCatalog>,
    camel_re: Regex,
    split_re: Regex,
}

impl TextRelevanceScorer {
    pub fn new(catalog: Arc<dyn ServiceCatalog>) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| DiscoveryError::PluginMisconfigured {
                plugin: "text_relevance".to_string(),
                reason: e.to_string(),
            })
        };
        Ok(Self {
            catalog,
            camel_re: compile(r"(\p{Ll})(\p{Lu})")?,
            split_re: compile(r"[^\p{L}\p{N}]+")?,
        })
    }

    /// Termos normalizados do texto, sem tokens de um caractere.
    pub fn terms(&self, text: &str) -> HashSet<String> {
        let spaced = self.camel_re.replace_all(text, "$1 $2");
        let folded: String = spaced
            .nfd()
            .filter(|ch| !is_combining_mark(*ch))
            .collect::<String>()
            .to_lowercase();
        self.split_re
            .split(&folded)
            .filter(|t| t.chars().count() > 1)
            .map(str::to_string)
            .collect()
    }
}

impl Scorer for TextRelevanceScorer {
    fn name(&self) -> &str {
        "text_relevance"
    }

    fn apply(&self, resources: &BTreeSet<String>, parameter: Option<&str>) -> Result<HashMap<String, f64>> {
        let Some(query) = parameter else {
            return Ok(HashMap::new());
        };
        let wanted = self.terms(query);
        if wanted.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(resources
            .iter()
            .filter_map(|r| {
                let text = self.catalog.resource_text(r)?;
                let have = self.terms(&text);
                let hits = wanted.iter().filter(|t| have.contains(*t)).count();
                Some((r.clone(), hits as f64 / wanted.len() as f64))
            })
            .collect())
    }
}

/// Qualidade do melhor match que trouxe o recurso para os candidatos.
pub struct MatchQualityScorer {
    best_matches: Arc<HashMap<String, MatchResult>>,
}

impl MatchQualityScorer {
    pub fn new(best_matches: Arc<HashMap<String, MatchResult>>) -> Self {
        Self { best_matches }
    }
}

impl Scorer for MatchQualityScorer {
    fn name(&self) -> &str {
        "match_quality"
    }

    fn apply(&self, resources: &BTreeSet<String>, _parameter: Option<&str>) -> Result<HashMap<String, f64>> {
        let top = f64::from(MatchType::EXACT.rank());
        Ok(resources
            .iter()
            .filter_map(|r| {
                let best = self.best_matches.get(r)?;
                Some((r.clone(), (f64::from(best.match_type.rank()) / top).min(1.0)))
            })
            .collect())
    }
}

/// Scorers disponíveis por configuração.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    Popularity,
    TextRelevance,
    MatchQuality,
}

/// Dados de uma requisição de ranking necessários para instanciar scorers.
pub struct ScorerContext {
    pub catalog: Arc<dyn ServiceCatalog>,
    pub best_matches: Arc<HashMap<String, MatchResult>>,
}

impl ScorerKind {
    pub fn build(self, ctx: &ScorerContext) -> Result<Box<dyn Scorer>> {
        let scorer: Box<dyn Scorer> = match self {
            ScorerKind::Popularity => Box::new(PopularityScorer::new(Arc::clone(&ctx.catalog))),
            ScorerKind::TextRelevance => {
                Box::new(TextRelevanceScorer::new(Arc::clone(&ctx.catalog))?)
            }
            ScorerKind::MatchQuality => {
                Box::new(MatchQualityScorer::new(Arc::clone(&ctx.best_matches)))
            }
        };
        Ok(scorer)
    }
}
