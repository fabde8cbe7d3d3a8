#![allow(dead_code, unused_imports)]
#![allow(rustdoc::broken_intra_doc_links, rustdoc::invalid_html_tags)]
//! # Service Discovery — Descoberta Semântica de Serviços
//!
//! **Ponto de entrada** do motor de descoberta. Lê a configuração e o
//! catálogo do disco, monta o [`DiscoveryContext`] e executa uma consulta
//! passada pela linha de comando, imprimindo a resposta em JSON.
//!
//! ## Fluxo de Inicialização
//!
//! ```text
//! main()
//!   ├── Configura tracing/logging (RUST_LOG)
//!   ├── Carrega DiscoveryConfig ($DISCOVERY_CONFIG ou data/config.json)
//!   ├── Carrega CatalogDocument (catalog_path)
//!   ├── spawn_blocking:
//!   │     ├── Monta registro de tipos de match
//!   │     ├── Constrói matcher (popula índice se `indexed`)
//!   │     ├── Executa a descoberta
//!   └── Imprime DiscoveryResponse (JSON)
//! ```
//!
//! ## Exemplo de Uso
//!
//! ```bash
//! # Sementes posicionais, saídas desejadas e texto opcionais
//! cargo run -- geo#Address --output wx#Forecast --text "weather forecast" --limit 5
//!
//! # Reconstrói o índice persistido antes de consultar
//! cargo run -- geo#Address --rebuild-index
//!
//! # Logs detalhados
//! RUST_LOG=debug cargo run -- geo#Address
//! ```

/// Módulo `core` — conceitos, tipos de match, operações, catálogo, prazos.
mod core;

/// Módulo `config` — configuração JSON do motor.
mod config;

/// Módulo `context` — contexto explícito com todos os componentes montados.
mod context;

/// Módulo `discovery` — busca de composição e descoberta por entradas/saídas.
mod discovery;

/// Módulo `error` — erros de domínio com classificação fatal/recuperável.
mod error;

/// Módulo `matching` — matchers de conceitos (lógico e indexado).
mod matching;

/// Módulo `persistence` — documento de catálogo em JSON.
mod persistence;

/// Módulo `ranking` — filtros, scorers, compositor e ranker.
mod ranking;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::DiscoveryConfig;
use crate::context::{DiscoveryContext, DiscoveryQuery};
use crate::core::{Concept, Deadline};

/// Argumentos da linha de comando.
#[derive(Debug, Default)]
struct CliArgs {
    query: DiscoveryQuery,
    rebuild_index: bool,
}

/// Interpreta os argumentos da linha de comando.
///
/// Argumentos posicionais são sementes; `--output`, `--text` e `--limit`
/// recebem um valor cada; `--rebuild-index` não recebe valor.
fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let query = &mut cli.query;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--output" | "-o" => {
                let value = args.next().context("--output exige um conceito")?;
                query.requested_outputs.push(Concept::parse(&value)?);
            }
            "--text" | "-t" => {
                query.text = Some(args.next().context("--text exige um valor")?);
            }
            "--limit" | "-n" => {
                let value = args.next().context("--limit exige um número")?;
                query.max_results = Some(
                    value
                        .parse()
                        .with_context(|| format!("--limit inválido: '{value}'"))?,
                );
            }
            "--rebuild-index" => cli.rebuild_index = true,
            flag if flag.starts_with("--") => bail!("opção desconhecida: {flag}"),
            seed => query.seeds.push(Concept::parse(seed)?),
        }
    }
    Ok(cli)
}

/// Função principal assíncrona.
///
/// O trabalho de descoberta é CPU-bound (reasoner, índice, rayon) e roda
/// em `spawn_blocking` para não ocupar o runtime tokio.
///
/// # Erros
///
/// Retorna erro se a configuração ou o catálogo forem inválidos, se o
/// matcher não puder ser construído ou se a consulta for rejeitada.
#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controla o nível; padrão info.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("🔎 Service Discovery — Starting...");

    let CliArgs {
        query,
        rebuild_index,
    } = parse_args(std::env::args().skip(1))?;
    let config = DiscoveryConfig::load()?;
    let document = persistence::load_catalog(&config.catalog_path)?;

    let response = tokio::task::spawn_blocking(move || -> Result<_> {
        let (catalog, reasoner) = document.into_parts();
        let ctx = DiscoveryContext::build(config, Arc::new(catalog), Arc::new(reasoner))?;
        if rebuild_index {
            let deadline = Deadline::from_millis(ctx.config().matcher.build_deadline_ms);
            if !ctx.rebuild_index(&deadline)? {
                tracing::warn!("--rebuild-index ignorado: matcher configurado não é indexado");
            }
        }
        tracing::info!("✅ Contexto pronto");
        Ok(ctx.discover(&query)?)
    })
    .await
    .context("Tarefa de descoberta abortada")??;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
