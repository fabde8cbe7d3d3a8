//! # MatchType — Reticulado de Qualidade de Match
//!
//! Um [`MatchType`] descreve a **relação lógica** entre dois conceitos,
//! do "nenhuma relação" até "idênticos". Os valores formam uma ordem total
//! por `rank`:
//!
//! | Tipo | Rank | Significado (origem → destino) |
//! |------|------|--------------------------------|
//! | `Fail` | 0 | Nenhuma relação conhecida |
//! | `PartialSubsume` | 100 | Sobreposição parcial, origem mais geral |
//! | `PartialPlugin` | 200 | Sobreposição parcial, origem mais específica |
//! | `Subsume` | 300 | Origem é mais geral que o destino |
//! | `Plugin` | 400 | Origem é igual ou mais específica que o destino |
//! | `Exact` | 500 | Conceitos equivalentes |
//!
//! `Plugin` fica acima de `Subsume` porque um conceito mais específico
//! sempre satisfaz o contrato de quem requer o conceito mais geral.
//!
//! ## Extensibilidade
//!
//! Os ranks são espaçados de 100 em 100. Novos tipos são registrados em
//! tempo de execução no [`MatchTypeRegistry`] com rank explícito
//! ([`register`](MatchTypeRegistry::register)) ou com rank atribuído no
//! momento do registro entre dois tipos existentes
//! ([`register_between`](MatchTypeRegistry::register_between)). As
//! comparações existentes não mudam: só o rank importa.
//!
//! ## Exemplo
//!
//! ```rust
//! use crate::core::match_type::{self, MatchType, MatchTypeRegistry};
//!
//! let registry = MatchTypeRegistry::with_builtins();
//! let near = registry
//!     .register_between("NearPlugin", "Quase plugin", &MatchType::SUBSUME, &MatchType::PLUGIN)
//!     .unwrap();
//! assert!(near > MatchType::SUBSUME && near < MatchType::PLUGIN);
//! assert_eq!(match_type::best([&near, &MatchType::EXACT]), MatchType::EXACT);
//! ```

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};

/// Qualidade de um match entre dois conceitos.
///
/// Comparação (`Ord`) e igualdade consideram o `rank` e o nome; a
/// descrição é apenas informativa.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchType {
    name: Cow<'static, str>,
    description: Cow<'static, str>,
    rank: u16,
}

impl MatchType {
    pub const FAIL: MatchType = MatchType::builtin("Fail", "Nenhuma relação entre os conceitos", 0);
    pub const PARTIAL_SUBSUME: MatchType = MatchType::builtin(
        "PartialSubsume",
        "Sobreposição parcial; a origem é mais geral que o destino",
        100,
    );
    pub const PARTIAL_PLUGIN: MatchType = MatchType::builtin(
        "PartialPlugin",
        "Sobreposição parcial; a origem é mais específica que o destino",
        200,
    );
    pub const SUBSUME: MatchType = MatchType::builtin(
        "Subsume",
        "A origem é mais geral que o destino",
        300,
    );
    pub const PLUGIN: MatchType = MatchType::builtin(
        "Plugin",
        "A origem é igual ou mais específica que o destino",
        400,
    );
    pub const EXACT: MatchType = MatchType::builtin("Exact", "Os conceitos são equivalentes", 500);

    /// Tipos pré-definidos em ordem ascendente de rank.
    pub const BUILTINS: [MatchType; 6] = [
        MatchType::FAIL,
        MatchType::PARTIAL_SUBSUME,
        MatchType::PARTIAL_PLUGIN,
        MatchType::SUBSUME,
        MatchType::PLUGIN,
        MatchType::EXACT,
    ];

    const fn builtin(name: &'static str, description: &'static str, rank: u16) -> Self {
        Self {
            name: Cow::Borrowed(name),
            description: Cow::Borrowed(description),
            rank,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn rank(&self) -> u16 {
        self.rank
    }

    pub fn is_fail(&self) -> bool {
        self.rank == 0
    }

    /// `true` se este tipo tem rank maior ou igual ao de `min`.
    pub fn is_at_least(&self, min: &MatchType) -> bool {
        self.rank >= min.rank
    }
}

/// Compara dois tipos pelo rank: `Less`, `Equal` ou `Greater`.
pub fn compare(a: &MatchType, b: &MatchType) -> Ordering {
    a.rank.cmp(&b.rank)
}

/// Retorna o melhor (maior rank) tipo do conjunto, ou `Fail` se vazio.
pub fn best<'a>(types: impl IntoIterator<Item = &'a MatchType>) -> MatchType {
    types
        .into_iter()
        .max()
        .cloned()
        .unwrap_or(MatchType::FAIL)
}

impl PartialEq for MatchType {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && self.name == other.name
    }
}

impl Eq for MatchType {}

impl Hash for MatchType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank.hash(state);
        self.name.hash(state);
    }
}

impl PartialOrd for MatchType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MatchType {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other).then_with(|| self.name.cmp(&other.name))
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Registro dos tipos de match conhecidos pelo processo.
///
/// Criado uma vez com [`with_builtins`](MatchTypeRegistry::with_builtins)
/// e compartilhado via `Arc` pelo contexto de descoberta. O índice do
/// [`IndexedConceptMatcher`](crate::matching::IndexedConceptMatcher)
/// armazena apenas nomes; este registro reconstrói o tipo completo.
pub struct MatchTypeRegistry {
    by_name: RwLock<BTreeMap<String, MatchType>>,
}

impl MatchTypeRegistry {
    /// Registro com os seis tipos pré-definidos.
    pub fn with_builtins() -> Self {
        let by_name = MatchType::BUILTINS
            .iter()
            .map(|t| (t.name().to_string(), t.clone()))
            .collect();
        Self {
            by_name: RwLock::new(by_name),
        }
    }

    /// Registra um novo tipo com rank explícito.
    ///
    /// Rejeita rank 0 (reservado para `Fail`), nomes duplicados e ranks
    /// já ocupados — dois tipos distintos nunca comparam como iguais.
    pub fn register(&self, name: &str, description: &str, rank: u16) -> Result<MatchType> {
        let mut by_name = self.by_name.write();
        Self::insert(&mut by_name, name, description, rank)
    }

    /// Registra um tipo entre `lower` e o próximo tipo acima dele, que
    /// deve ser `upper`. O rank é o ponto médio do intervalo livre.
    ///
    /// Falha se `lower >= upper`, se existir outro tipo entre os dois, ou
    /// se não houver rank inteiro livre no intervalo. A verificação do
    /// intervalo e a inserção ocorrem sob o mesmo lock de escrita.
    pub fn register_between(
        &self,
        name: &str,
        description: &str,
        lower: &MatchType,
        upper: &MatchType,
    ) -> Result<MatchType> {
        if lower.rank >= upper.rank {
            return Err(DiscoveryError::Configuration(format!(
                "'{lower}' deve ter rank menor que '{upper}'"
            )));
        }
        let mut by_name = self.by_name.write();
        if let Some(between) = by_name
            .values()
            .find(|t| t.rank > lower.rank && t.rank < upper.rank)
        {
            return Err(DiscoveryError::Configuration(format!(
                "'{between}' já ocupa o intervalo entre '{lower}' e '{upper}'"
            )));
        }
        let rank = lower.rank + (upper.rank - lower.rank) / 2;
        if rank == lower.rank {
            return Err(DiscoveryError::Configuration(format!(
                "sem rank livre entre '{lower}' e '{upper}'"
            )));
        }
        Self::insert(&mut by_name, name, description, rank)
    }

    fn insert(
        by_name: &mut BTreeMap<String, MatchType>,
        name: &str,
        description: &str,
        rank: u16,
    ) -> Result<MatchType> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DiscoveryError::Configuration(
                "nome de tipo de match vazio".to_string(),
            ));
        }
        if rank == 0 {
            return Err(DiscoveryError::Configuration(format!(
                "rank 0 é reservado para Fail (tipo '{name}')"
            )));
        }
        if by_name.contains_key(name) {
            return Err(DiscoveryError::Configuration(format!(
                "tipo de match '{name}' já registrado"
            )));
        }
        if let Some(existing) = by_name.values().find(|t| t.rank == rank) {
            return Err(DiscoveryError::Configuration(format!(
                "rank {rank} já ocupado por '{}'",
                existing.name
            )));
        }

        let match_type = MatchType {
            name: Cow::Owned(name.to_string()),
            description: Cow::Owned(description.to_string()),
            rank,
        };
        tracing::debug!(match_type = %name, rank, "Tipo de match registrado");
        by_name.insert(name.to_string(), match_type.clone());
        Ok(match_type)
    }

    /// Busca um tipo pelo nome (case-sensitive).
    pub fn lookup(&self, name: &str) -> Option<MatchType> {
        self.by_name.read().get(name).cloned()
    }

    /// Como [`lookup`](Self::lookup), mas com erro para nomes desconhecidos.
    pub fn resolve(&self, name: &str) -> Result<MatchType> {
        self.lookup(name.trim())
            .ok_or_else(|| DiscoveryError::UnknownMatchType(name.to_string()))
    }

    /// Todos os tipos registrados, em ordem ascendente de rank.
    pub fn ordered(&self) -> Vec<MatchType> {
        let mut all: Vec<MatchType> = self.by_name.read().values().cloned().collect();
        all.sort();
        all
    }
}

impl Default for MatchTypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_order_is_ascending() {
        for pair in MatchType::BUILTINS.windows(2) {
            assert_eq!(compare(&pair[0], &pair[1]), Ordering::Less);
        }
        assert!(MatchType::PLUGIN > MatchType::SUBSUME);
        assert!(MatchType::PARTIAL_PLUGIN > MatchType::PARTIAL_SUBSUME);
    }

    #[test]
    fn fail_is_strictly_lowest() {
        for t in MatchType::BUILTINS.iter().skip(1) {
            assert_eq!(compare(&MatchType::FAIL, t), Ordering::Less);
        }
        assert!(MatchType::FAIL.is_fail());
    }

    #[test]
    fn ordering_is_transitive_across_builtins() {
        let types = MatchType::BUILTINS;
        for a in &types {
            for b in &types {
                for c in &types {
                    if a.rank() < b.rank() && b.rank() < c.rank() {
                        assert_eq!(compare(a, c), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn best_picks_maximum_and_defaults_to_fail() {
        let set = [MatchType::SUBSUME, MatchType::PLUGIN, MatchType::PARTIAL_PLUGIN];
        assert_eq!(best(&set), MatchType::PLUGIN);
        assert_eq!(best(std::iter::empty()), MatchType::FAIL);
    }

    #[test]
    fn register_keeps_existing_comparisons() {
        let registry = MatchTypeRegistry::with_builtins();
        let strong = registry.register("StrongPlugin", "Plugin forte", 450).unwrap();
        assert!(strong > MatchType::PLUGIN);
        assert!(strong < MatchType::EXACT);
        assert!(MatchType::PLUGIN > MatchType::SUBSUME);
        assert_eq!(registry.ordered().len(), 7);
        assert_eq!(registry.lookup("StrongPlugin"), Some(strong));
    }

    #[test]
    fn register_rejects_duplicates_and_reserved_rank() {
        let registry = MatchTypeRegistry::with_builtins();
        assert!(registry.register("Plugin", "dup", 401).is_err());
        assert!(registry.register("Other", "rank ocupado", 400).is_err());
        assert!(registry.register("Zero", "reservado", 0).is_err());
        assert!(registry.register("  ", "vazio", 42).is_err());
    }

    #[test]
    fn register_between_assigns_midpoint_rank() {
        let registry = MatchTypeRegistry::with_builtins();
        let mid = registry
            .register_between("Near", "quase", &MatchType::SUBSUME, &MatchType::PLUGIN)
            .unwrap();
        assert_eq!(mid.rank(), 350);
        // o intervalo Subsume..Plugin agora está ocupado
        assert!(registry
            .register_between("Again", "de novo", &MatchType::SUBSUME, &MatchType::PLUGIN)
            .is_err());
        assert!(registry
            .register_between("Upside", "invertido", &MatchType::EXACT, &MatchType::FAIL)
            .is_err());
    }

    #[test]
    fn concurrent_register_between_has_one_winner() {
        let registry = MatchTypeRegistry::with_builtins();
        let outcomes: Vec<Result<MatchType>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let registry = &registry;
                    scope.spawn(move || {
                        registry.register_between(
                            &format!("Near{i}"),
                            "quase",
                            &MatchType::SUBSUME,
                            &MatchType::PLUGIN,
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        for err in outcomes.iter().filter_map(|r| r.as_ref().err()) {
            assert!(err.to_string().contains("já ocupa o intervalo"), "{err}");
        }
        assert_eq!(registry.ordered().len(), 7);
    }

    #[test]
    fn resolve_unknown_name_is_error() {
        let registry = MatchTypeRegistry::with_builtins();
        assert_eq!(registry.resolve(" Plugin ").unwrap(), MatchType::PLUGIN);
        assert!(matches!(
            registry.resolve("Nope"),
            Err(DiscoveryError::UnknownMatchType(_))
        ));
    }
}
