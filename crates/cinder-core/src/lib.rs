//! Core types and errors for the cinder adaptive chemistry framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the strongly-typed identifiers, the per-cell thermochemical state,
//! and the error taxonomy shared by the reduction, tabulation, and
//! integration crates.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod state;

pub use error::{IntegrateError, ReduceError, SolveError, StateError};
pub use id::{CellId, ElementId, ReactionId, SpeciesId};
pub use state::CellState;
