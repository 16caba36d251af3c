//! Per-cell adaptive chemistry orchestration.
//!
//! [`ChemistryEngine`] wires a shared [`Mechanism`](cinder_mech::Mechanism)
//! together with three swappable strategies — mechanism reduction,
//! tabulation, and stiff integration — into the per-cell pipeline:
//! reduce → project → cache lookup → (integrate and grow the cache on a
//! miss) → scatter back → account. Cells are independent given their
//! frozen temperature and pressure, so [`ChemistryEngine::solve_batch`]
//! fans them out across a worker pool; the tabulation cache is the only
//! shared mutable state and sits behind a read-write lock.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod config;
pub mod engine;
pub mod metrics;

mod reduced;

pub use batch::BatchOutcome;
pub use config::{ConfigError, EngineConfig};
pub use engine::{ChemistryEngine, Workspace};
pub use metrics::ChemistryMetrics;
