//! # Módulo Ranking — Pipeline de Ordenação de Candidatos
//!
//! | Estágio | Tipo | Composição |
//! |---------|------|------------|
//! | Filtro | [`Filter`] | Interseção |
//! | Scorer | [`Scorer`] | Independentes, com parâmetro textual opcional |
//! | Compositor | [`UniformScoreComposer`] | Peso `1/N`, ausente = 0 |
//! | Ranker | [`StandardRanker`] | Score ↓, URI ↑ |
//!
//! As variantes configuráveis formam registros fechados ([`FilterSpec`],
//! [`ScorerKind`]); não há carregamento dinâmico de plugins.

pub mod composer;
pub mod filter;
pub mod pipeline;
pub mod ranker;
pub mod scorer;

pub use composer::UniformScoreComposer;
pub use filter::{
    Filter, FilterSpec, NamespaceFilter, PredicateFilter, ProducesConceptFilter,
    ResourceKindFilter,
};
pub use pipeline::{RankedResource, RankingPipeline};
pub use ranker::StandardRanker;
pub use scorer::{
    MatchQualityScorer, PopularityScorer, Scorer, ScorerContext, ScorerKind, TextRelevanceScorer,
};
