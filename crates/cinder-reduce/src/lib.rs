//! Mechanism reduction: per-cell selection of the active species subset.
//!
//! A [`ReductionMethod`] inspects one cell's state and classifies every
//! species as active or inactive, producing the bidirectional index maps
//! the orchestrator uses to shuttle compositions between the full and
//! reduced spaces. Variants differ only in their relevance heuristic;
//! [`DirectedRelationGraph`] propagates rate-coupling coefficients from a
//! search-initiating set, while [`FullMechanism`] keeps everything active
//! (reduction disabled).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod active;
pub mod drg;
pub mod full;
pub mod method;

pub use active::ActiveSet;
pub use drg::{DirectedRelationGraph, DirectedRelationGraphBuilder};
pub use full::FullMechanism;
pub use method::ReductionMethod;
