//! # Concept — Identificador Opaco de Ontologia
//!
//! Um [`Concept`] é a unidade mínima de tipagem de entradas e saídas de
//! operações: a URI de uma classe da ontologia. O núcleo nunca inspeciona
//! a estrutura da URI — igualdade é igualdade de string.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use crate::core::Concept;
//!
//! let pessoa = Concept::new("http://example.org/onto#Person");
//! assert_eq!(pessoa.fragment(), "Person");
//! assert!(Concept::parse("   ").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};

/// URI de um conceito de ontologia.
///
/// Serializado de forma transparente como string JSON. A ordenação é
/// lexical, o que dá iteração determinística em `BTreeSet<Concept>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Concept(String);

impl Concept {
    /// Cria um conceito sem validação.
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Cria um conceito rejeitando URIs vazias ou só com espaços.
    ///
    /// Usado na fronteira de entrada (consultas de descoberta), onde um
    /// identificador vazio indica consulta malformada.
    pub fn parse(uri: &str) -> Result<Self> {
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return Err(DiscoveryError::InvalidQuery(
                "URI de conceito vazia".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fragmento legível da URI: o trecho após o último `#` ou `/`.
    ///
    /// Usado pelo scorer de relevância textual quando o recurso não tem label.
    pub fn fragment(&self) -> &str {
        self.0
            .rsplit(|c: char| c == '#' || c == '/')
            .find(|s| !s.is_empty())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Concept {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Concept {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Concept {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
