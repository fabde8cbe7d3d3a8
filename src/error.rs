//! # Erros do Motor de Descoberta
//!
//! Taxonomia única de erros usada por todas as camadas do núcleo
//! (matching, composição e ranking). O binário e a camada de persistência
//! usam `anyhow` por cima desta enum.
//!
//! | Variante | Quando ocorre | Fatal? | Código |
//! |----------|---------------|--------|--------|
//! | `Configuration` | Delegate/catálogo indisponível na construção do índice | Sim | 500 |
//! | `Unsupported` | Matcher chamado para consulta que não implementa | Não | 501 |
//! | `InvalidQuery` / `EmptySeed` | Consulta de descoberta malformada | Não | 400 |
//! | `UnknownMatchType` | Nome de tipo de match desconhecido no registro | Não | 400 |
//! | `PluginMisconfigured` | Filtro/scorer com parâmetros inválidos | Não | 400 |
//! | `DeadlineExceeded` | Prazo do chamador expirou | Não | 504 |
//! | `Unavailable` | Reasoner ou store externo fora do ar | Não | 503 |
//!
//! Nenhuma variante corrompe o índice ou o catálogo: erros por requisição
//! são devolvidos ao chamador e o estado compartilhado permanece intacto.

use thiserror::Error;

/// Erro do motor de descoberta/composição.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Falha fatal na construção de um componente (ex: índice sem delegate).
    #[error("configuração inválida: {0}")]
    Configuration(String),

    /// O matcher não implementa a consulta pedida.
    #[error("matcher '{matcher}' não suporta a operação '{operation}'")]
    Unsupported {
        matcher: String,
        operation: &'static str,
    },

    /// Consulta de descoberta malformada.
    #[error("consulta de descoberta inválida: {0}")]
    InvalidQuery(String),

    /// Conjunto de conceitos semente vazio.
    #[error("o conjunto de conceitos semente está vazio")]
    EmptySeed,

    /// Nome de tipo de match não registrado.
    #[error("tipo de match desconhecido: {0}")]
    UnknownMatchType(String),

    /// Plugin de ranking (filtro ou scorer) mal configurado.
    #[error("plugin '{plugin}' mal configurado: {reason}")]
    PluginMisconfigured { plugin: String, reason: String },

    /// O prazo fornecido pelo chamador expirou.
    #[error("prazo excedido durante {0}")]
    DeadlineExceeded(&'static str),

    /// Colaborador externo (reasoner, store) indisponível.
    #[error("colaborador externo indisponível: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DiscoveryError {
    /// Código de status no estilo HTTP para a fronteira REST.
    pub fn status_code(&self) -> u16 {
        match self {
            DiscoveryError::InvalidQuery(_)
            | DiscoveryError::EmptySeed
            | DiscoveryError::UnknownMatchType(_)
            | DiscoveryError::PluginMisconfigured { .. } => 400,
            DiscoveryError::Unsupported { .. } => 501,
            DiscoveryError::Unavailable(_) => 503,
            DiscoveryError::DeadlineExceeded(_) => 504,
            DiscoveryError::Configuration(_)
            | DiscoveryError::Io(_)
            | DiscoveryError::Json(_) => 500,
        }
    }

    /// `true` para erros que impedem a construção do componente.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DiscoveryError::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
