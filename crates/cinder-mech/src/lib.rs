//! Reaction mechanism database and rate evaluation.
//!
//! A [`Mechanism`] is the read-only species/reaction database built once
//! at setup through [`MechanismBuilder`] and shared (`Arc`) across the
//! chemistry workers. It exposes per-reaction stoichiometry, modified
//! Arrhenius rate expressions, the elemental composition of each species
//! (consumed by reduction heuristics), and the ODE right-hand side:
//! [`Mechanism::omega`] for concentration rates and
//! [`Mechanism::jacobian`] for their analytic derivatives.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod mechanism;
pub mod reaction;
pub mod species;

mod rates;

pub use mechanism::{Mechanism, MechanismBuilder, MechanismError};
pub use reaction::{Arrhenius, Reaction, SpeciesCoeff};
pub use species::Species;
