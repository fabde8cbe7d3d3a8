//! # Persistência — Documento de Catálogo em Disco
//!
//! O catálogo (serviços, taxonomia de conceitos e contagens de uso) é lido
//! de um único documento JSON, por padrão `data/catalog.json`:
//!
//! ```json
//! {
//!   "services": [{ "uri": "svc:geo", "operations": [
//!       { "uri": "op:lookup", "inputs": ["geo#City"], "outputs": ["geo#Coords"] } ] }],
//!   "taxonomy": [{ "sub": "geo#Capital", "sup": "geo#City" }],
//!   "usage": { "op:lookup": 42 }
//! }
//! ```
//!
//! Os índices reversos do [`InMemoryCatalog`] não são persistidos; são
//! reconstruídos em [`CatalogDocument::into_parts`].

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{InMemoryCatalog, Service};
use crate::matching::{SubclassAxiom, TaxonomyReasoner};

/// Conteúdo do arquivo de catálogo.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub taxonomy: Vec<SubclassAxiom>,
    #[serde(default)]
    pub usage: HashMap<String, u64>,
}

impl CatalogDocument {
    /// Catálogo indexado e reasoner construídos a partir do documento.
    pub fn into_parts(self) -> (InMemoryCatalog, TaxonomyReasoner) {
        let reasoner = TaxonomyReasoner::from_axioms(&self.taxonomy);
        let catalog = InMemoryCatalog::from_services(self.services, self.usage);
        (catalog, reasoner)
    }
}

/// Carrega o documento, ou um documento vazio se o arquivo não existir.
///
/// # Erros
///
/// Retorna erro se o arquivo existir mas estiver corrompido.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<CatalogDocument> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!("Nenhum {} encontrado, iniciando catálogo vazio", path.display());
        return Ok(CatalogDocument::default());
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Falha ao ler {}", path.display()))?;
    let doc: CatalogDocument = serde_json::from_str(&json)
        .with_context(|| format!("Falha ao desserializar {}", path.display()))?;
    tracing::info!(
        services = doc.services.len(),
        axioms = doc.taxonomy.len(),
        "Catálogo carregado"
    );
    Ok(doc)
}

/// Salva o documento como JSON pretty-printed (write-then-rename).
pub fn save_catalog(path: impl AsRef<Path>, doc: &CatalogDocument) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Falha ao criar diretório {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(doc).context("Falha ao serializar catálogo")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("Falha ao escrever {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Falha ao gravar {}", path.display()))?;
    Ok(())
}
