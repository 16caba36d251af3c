//! The mechanism database and its validating builder.

use std::error::Error;
use std::fmt;

use cinder_core::{ElementId, ReactionId, SpeciesId};
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::reaction::{Arrhenius, Reaction, SpeciesCoeff};
use crate::species::Species;

/// Errors detected while building a [`Mechanism`].
#[derive(Clone, Debug, PartialEq)]
pub enum MechanismError {
    /// An element symbol was registered twice.
    DuplicateElement {
        /// The repeated symbol.
        symbol: String,
    },
    /// A species name was registered twice.
    DuplicateSpecies {
        /// The repeated name.
        name: String,
    },
    /// A species composition references an unregistered element.
    UnknownElement {
        /// The unregistered symbol.
        symbol: String,
    },
    /// A reaction references an unregistered species.
    UnknownSpecies {
        /// The unregistered name.
        name: String,
    },
    /// A reaction has an empty reactant or product side.
    EmptySide {
        /// Zero-based index of the reaction in registration order.
        index: usize,
    },
    /// A reaction has a zero stoichiometric coefficient.
    ZeroCoefficient {
        /// Zero-based index of the reaction in registration order.
        index: usize,
    },
    /// A species appears more than once on one side of a reaction.
    /// Repeated participation is expressed through the coefficient.
    DuplicateParticipant {
        /// Zero-based index of the reaction in registration order.
        index: usize,
        /// The repeated species name.
        name: String,
    },
    /// A rate expression has a non-finite or non-positive pre-exponential
    /// factor.
    InvalidRate {
        /// Zero-based index of the reaction in registration order.
        index: usize,
        /// The offending pre-exponential factor.
        a: f64,
    },
    /// The mechanism has no species.
    NoSpecies,
    /// The mechanism has no reactions.
    NoReactions,
}

impl fmt::Display for MechanismError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateElement { symbol } => write!(f, "duplicate element '{symbol}'"),
            Self::DuplicateSpecies { name } => write!(f, "duplicate species '{name}'"),
            Self::UnknownElement { symbol } => write!(f, "unknown element '{symbol}'"),
            Self::UnknownSpecies { name } => write!(f, "unknown species '{name}'"),
            Self::EmptySide { index } => {
                write!(f, "reaction {index} has an empty reactant or product side")
            }
            Self::ZeroCoefficient { index } => {
                write!(f, "reaction {index} has a zero stoichiometric coefficient")
            }
            Self::DuplicateParticipant { index, name } => {
                write!(
                    f,
                    "reaction {index} lists species '{name}' twice on one side"
                )
            }
            Self::InvalidRate { index, a } => {
                write!(
                    f,
                    "reaction {index} pre-exponential factor must be finite and positive, got {a}"
                )
            }
            Self::NoSpecies => write!(f, "mechanism has no species"),
            Self::NoReactions => write!(f, "mechanism has no reactions"),
        }
    }
}

impl Error for MechanismError {}

/// Read-only species/reaction database.
///
/// Built once through [`MechanismBuilder`], then shared immutably across
/// all chemistry workers for the lifetime of the run.
#[derive(Clone, Debug)]
pub struct Mechanism {
    elements: Vec<String>,
    species: Vec<Species>,
    reactions: Vec<Reaction>,
    species_index: IndexMap<String, SpeciesId>,
    element_index: IndexMap<String, ElementId>,
}

impl Mechanism {
    /// Number of species (`Ns`).
    pub fn n_species(&self) -> usize {
        self.species.len()
    }

    /// Number of reactions.
    pub fn n_reactions(&self) -> usize {
        self.reactions.len()
    }

    /// Number of registered elements.
    pub fn n_elements(&self) -> usize {
        self.elements.len()
    }

    /// The species record for `id`.
    pub fn species(&self, id: SpeciesId) -> &Species {
        &self.species[id.index()]
    }

    /// All species, in registration order.
    pub fn species_iter(&self) -> impl Iterator<Item = (SpeciesId, &Species)> {
        self.species
            .iter()
            .enumerate()
            .map(|(i, s)| (SpeciesId(i as u32), s))
    }

    /// The reaction record for `id`.
    pub fn reaction(&self, id: ReactionId) -> &Reaction {
        &self.reactions[id.index()]
    }

    /// All reactions, in registration order.
    pub fn reactions_iter(&self) -> impl Iterator<Item = (ReactionId, &Reaction)> {
        self.reactions
            .iter()
            .enumerate()
            .map(|(i, r)| (ReactionId(i as u32), r))
    }

    /// Look up a species by name.
    pub fn species_named(&self, name: &str) -> Option<SpeciesId> {
        self.species_index.get(name).copied()
    }

    /// Look up an element by symbol.
    pub fn element_named(&self, symbol: &str) -> Option<ElementId> {
        self.element_index.get(symbol).copied()
    }

    /// The symbol of element `id`.
    pub fn element_symbol(&self, id: ElementId) -> &str {
        &self.elements[id.index()]
    }
}

/// Builder for [`Mechanism`] with registration-time validation.
///
/// Species compositions and reaction sides reference elements and
/// species by name; resolution errors are reported from [`build`]
/// together with structural checks.
///
/// [`build`]: MechanismBuilder::build
pub struct MechanismBuilder {
    elements: Vec<String>,
    species: Vec<(String, Vec<(String, u32)>)>,
    reactions: Vec<PendingReaction>,
}

struct PendingReaction {
    lhs: Vec<(String, u32)>,
    rhs: Vec<(String, u32)>,
    forward: Arrhenius,
    reverse: Option<Arrhenius>,
}

impl MechanismBuilder {
    /// Start an empty mechanism.
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            species: Vec::new(),
            reactions: Vec::new(),
        }
    }

    /// Register an element by symbol.
    pub fn element(mut self, symbol: &str) -> Self {
        self.elements.push(symbol.to_string());
        self
    }

    /// Register a species with its elemental composition
    /// (`(element symbol, atom count)` pairs).
    pub fn species(mut self, name: &str, composition: &[(&str, u32)]) -> Self {
        self.species.push((
            name.to_string(),
            composition
                .iter()
                .map(|(e, n)| (e.to_string(), *n))
                .collect(),
        ));
        self
    }

    /// Register an irreversible reaction `lhs → rhs`.
    pub fn reaction(mut self, lhs: &[(&str, u32)], rhs: &[(&str, u32)], forward: Arrhenius) -> Self {
        self.reactions.push(PendingReaction {
            lhs: own_side(lhs),
            rhs: own_side(rhs),
            forward,
            reverse: None,
        });
        self
    }

    /// Register a reversible reaction `lhs ⇌ rhs` with explicit forward
    /// and reverse rate expressions.
    pub fn reversible_reaction(
        mut self,
        lhs: &[(&str, u32)],
        rhs: &[(&str, u32)],
        forward: Arrhenius,
        reverse: Arrhenius,
    ) -> Self {
        self.reactions.push(PendingReaction {
            lhs: own_side(lhs),
            rhs: own_side(rhs),
            forward,
            reverse: Some(reverse),
        });
        self
    }

    /// Resolve names, validate, and produce the immutable [`Mechanism`].
    pub fn build(self) -> Result<Mechanism, MechanismError> {
        let mut element_index = IndexMap::new();
        for (i, symbol) in self.elements.iter().enumerate() {
            if element_index
                .insert(symbol.clone(), ElementId(i as u32))
                .is_some()
            {
                return Err(MechanismError::DuplicateElement {
                    symbol: symbol.clone(),
                });
            }
        }

        let mut species_index = IndexMap::new();
        let mut species = Vec::with_capacity(self.species.len());
        for (i, (name, composition)) in self.species.iter().enumerate() {
            if species_index
                .insert(name.clone(), SpeciesId(i as u32))
                .is_some()
            {
                return Err(MechanismError::DuplicateSpecies { name: name.clone() });
            }
            let mut resolved: SmallVec<[(ElementId, u32); 4]> = SmallVec::new();
            for (symbol, count) in composition {
                let id = element_index.get(symbol).copied().ok_or_else(|| {
                    MechanismError::UnknownElement {
                        symbol: symbol.clone(),
                    }
                })?;
                resolved.push((id, *count));
            }
            species.push(Species {
                name: name.clone(),
                composition: resolved,
            });
        }
        if species.is_empty() {
            return Err(MechanismError::NoSpecies);
        }

        let mut reactions = Vec::with_capacity(self.reactions.len());
        for (index, pending) in self.reactions.into_iter().enumerate() {
            if pending.lhs.is_empty() || pending.rhs.is_empty() {
                return Err(MechanismError::EmptySide { index });
            }
            for k in [&pending.forward]
                .into_iter()
                .chain(pending.reverse.as_ref())
            {
                if !k.a.is_finite() || k.a <= 0.0 {
                    return Err(MechanismError::InvalidRate { index, a: k.a });
                }
            }
            let lhs = resolve_side(&pending.lhs, &species_index, index)?;
            let rhs = resolve_side(&pending.rhs, &species_index, index)?;
            reactions.push(Reaction {
                lhs,
                rhs,
                forward: pending.forward,
                reverse: pending.reverse,
            });
        }
        if reactions.is_empty() {
            return Err(MechanismError::NoReactions);
        }

        Ok(Mechanism {
            elements: self.elements,
            species,
            reactions,
            species_index,
            element_index,
        })
    }
}

impl Default for MechanismBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn own_side(side: &[(&str, u32)]) -> Vec<(String, u32)> {
    side.iter().map(|(s, n)| (s.to_string(), *n)).collect()
}

fn resolve_side(
    side: &[(String, u32)],
    species_index: &IndexMap<String, SpeciesId>,
    index: usize,
) -> Result<SmallVec<[SpeciesCoeff; 4]>, MechanismError> {
    let mut resolved = SmallVec::new();
    for (name, coeff) in side {
        if *coeff == 0 {
            return Err(MechanismError::ZeroCoefficient { index });
        }
        let species = species_index.get(name).copied().ok_or_else(|| {
            MechanismError::UnknownSpecies { name: name.clone() }
        })?;
        if resolved.iter().any(|sc: &SpeciesCoeff| sc.species == species) {
            return Err(MechanismError::DuplicateParticipant {
                index,
                name: name.clone(),
            });
        }
        resolved.push(SpeciesCoeff {
            species,
            coeff: *coeff,
        });
    }
    Ok(resolved)
}
