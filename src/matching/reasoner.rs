//! # Reasoner — Fronteira com o Raciocínio de Ontologia
//!
//! O cálculo de subsunção é **externo** ao núcleo. O contrato consumido é
//! apenas: "qual a relação entre A e B" e "quais as super/subclasses de C".
//! Como o reasoner real pode estar fora do ar, todas as chamadas são
//! falíveis; o [`LogicConceptMatcher`](super::LogicConceptMatcher)
//! converte falhas em `Fail` no match par-a-par.
//!
//! [`TaxonomyReasoner`] é uma hierarquia de subclasses em memória, com
//! fecho transitivo calculado na construção. Carregada do documento de
//! catálogo (`taxonomy`), atende o binário e os testes.
//!
//! ```text
//! Vehicle
//!   └── Car              Car ⊑ Vehicle
//!        └── SportsCar   SportsCar ⊑ Car ⊑ Vehicle
//! ```

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::Concept;
use crate::error::Result;

/// Relação lógica entre dois conceitos, do ponto de vista do primeiro.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    /// Mesmo conceito (ou equivalentes).
    Equivalent,
    /// O primeiro é subclasse estrita do segundo (mais específico).
    Subclass,
    /// O primeiro é superclasse estrita do segundo (mais geral).
    Superclass,
    Unrelated,
}

/// Contrato do reasoner externo.
pub trait Reasoner: Send + Sync {
    /// Todos os conceitos conhecidos pela ontologia.
    fn concepts(&self) -> Result<BTreeSet<Concept>>;

    fn relation(&self, a: &Concept, b: &Concept) -> Result<Relation>;

    /// Superclasses estritas (transitivas) do conceito.
    fn superclasses_of(&self, concept: &Concept) -> Result<BTreeSet<Concept>>;

    /// Subclasses estritas (transitivas) do conceito.
    fn subclasses_of(&self, concept: &Concept) -> Result<BTreeSet<Concept>>;
}

/// Axioma `sub ⊑ sup` como aparece no documento de catálogo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubclassAxiom {
    pub sub: Concept,
    pub sup: Concept,
}

impl SubclassAxiom {
    pub fn new(sub: impl Into<Concept>, sup: impl Into<Concept>) -> Self {
        Self {
            sub: sub.into(),
            sup: sup.into(),
        }
    }
}

/// Hierarquia de subclasses em memória com fecho transitivo.
#[derive(Debug, Default)]
pub struct TaxonomyReasoner {
    ancestors: HashMap<Concept, HashSet<Concept>>,
    descendants: HashMap<Concept, HashSet<Concept>>,
}

impl TaxonomyReasoner {
    /// Constrói o fecho transitivo a partir dos axiomas.
    ///
    /// Ciclos (`A ⊑ B ⊑ A`) são tolerados: cada conceito do ciclo passa a
    /// ser ancestral do outro e [`relation`](Reasoner::relation) os trata
    /// como equivalentes.
    pub fn from_axioms(axioms: &[SubclassAxiom]) -> Self {
        let mut parents: HashMap<&Concept, Vec<&Concept>> = HashMap::new();
        let mut all: HashSet<&Concept> = HashSet::new();
        for axiom in axioms {
            parents.entry(&axiom.sub).or_default().push(&axiom.sup);
            all.insert(&axiom.sub);
            all.insert(&axiom.sup);
        }

        let mut ancestors: HashMap<Concept, HashSet<Concept>> = HashMap::new();
        for concept in &all {
            // BFS sobre os pais diretos
            let mut seen: HashSet<Concept> = HashSet::new();
            let mut queue: VecDeque<&Concept> = parents
                .get(concept)
                .map(|p| p.iter().copied().collect())
                .unwrap_or_default();
            while let Some(next) = queue.pop_front() {
                if next == *concept || !seen.insert(next.clone()) {
                    continue;
                }
                if let Some(grand) = parents.get(next) {
                    queue.extend(grand.iter().copied());
                }
            }
            ancestors.insert((*concept).clone(), seen);
        }

        let mut descendants: HashMap<Concept, HashSet<Concept>> = HashMap::new();
        for (concept, sups) in &ancestors {
            descendants.entry(concept.clone()).or_default();
            for sup in sups {
                descendants
                    .entry(sup.clone())
                    .or_default()
                    .insert(concept.clone());
            }
        }

        tracing::debug!(concepts = ancestors.len(), axioms = axioms.len(), "Taxonomia construída");
        Self {
            ancestors,
            descendants,
        }
    }

    fn is_strict_subclass(&self, sub: &Concept, sup: &Concept) -> bool {
        self.ancestors
            .get(sub)
            .is_some_and(|sups| sups.contains(sup))
    }
}

impl Reasoner for TaxonomyReasoner {
    fn concepts(&self) -> Result<BTreeSet<Concept>> {
        Ok(self.ancestors.keys().cloned().collect())
    }

    fn relation(&self, a: &Concept, b: &Concept) -> Result<Relation> {
        if a == b {
            return Ok(Relation::Equivalent);
        }
        let down = self.is_strict_subclass(a, b);
        let up = self.is_strict_subclass(b, a);
        Ok(match (down, up) {
            (true, true) => Relation::Equivalent,
            (true, false) => Relation::Subclass,
            (false, true) => Relation::Superclass,
            (false, false) => Relation::Unrelated,
        })
    }

    fn superclasses_of(&self, concept: &Concept) -> Result<BTreeSet<Concept>> {
        Ok(self
            .ancestors
            .get(concept)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn subclasses_of(&self, concept: &Concept) -> Result<BTreeSet<Concept>> {
        Ok(self
            .descendants
            .get(concept)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }
}
