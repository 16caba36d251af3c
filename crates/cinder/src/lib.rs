//! Cinder: adaptive per-cell chemistry for reacting-flow simulations.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all cinder sub-crates. For most users, adding `cinder` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use cinder::prelude::*;
//! use std::sync::{Arc, RwLock};
//!
//! // A → B, first order.
//! let mechanism = Arc::new(
//!     MechanismBuilder::new()
//!         .element("X")
//!         .species("A", &[("X", 1)])
//!         .species("B", &[("X", 1)])
//!         .reaction(&[("A", 1)], &[("B", 1)], Arrhenius::constant(1.0))
//!         .build()
//!         .unwrap(),
//! );
//!
//! // Adaptive pieces: rate-coupling reduction and an ISAT cache.
//! let mut config = EngineConfig::new(mechanism);
//! config.reduction = Box::new(DirectedRelationGraph::builder().build().unwrap());
//! config.tabulation = Arc::new(RwLock::new(IsatTable::builder().build().unwrap()));
//! let engine = ChemistryEngine::new(config).unwrap();
//!
//! // Advance one cell by 0.1 s.
//! let mut ws = engine.workspace();
//! let mut state = CellState::new(vec![1.0, 0.0], 1000.0, 101_325.0, 0.0);
//! let dt_chem = engine.solve_cell(&mut ws, CellId(0), &mut state, 0.1).unwrap();
//! assert!(dt_chem > 0.0);
//! assert!((state.composition[0] - (-0.1f64).exp()).abs() < 1e-4);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cinder-core` | IDs, cell state, error taxonomy |
//! | [`mech`] | `cinder-mech` | Mechanism database and rate evaluation |
//! | [`ode`] | `cinder-ode` | Stiff integration schemes |
//! | [`reduce`] | `cinder-reduce` | Reduction strategies and index maps |
//! | [`tab`] | `cinder-tab` | Tabulation cache and persistence |
//! | [`engine`] | `cinder-engine` | The per-cell orchestrator |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, IDs, and errors (`cinder-core`).
pub use cinder_core as types;

/// Mechanism database and rate evaluation (`cinder-mech`).
pub use cinder_mech as mech;

/// Stiff ODE integration (`cinder-ode`).
pub use cinder_ode as ode;

/// Mechanism reduction strategies (`cinder-reduce`).
pub use cinder_reduce as reduce;

/// Tabulation cache and persistence (`cinder-tab`).
pub use cinder_tab as tab;

/// Per-cell chemistry orchestration (`cinder-engine`).
pub use cinder_engine as engine;

/// The most commonly used types, re-exported flat.
pub mod prelude {
    pub use cinder_core::{CellId, CellState, SolveError};
    pub use cinder_engine::{BatchOutcome, ChemistryEngine, ChemistryMetrics, EngineConfig};
    pub use cinder_mech::{Arrhenius, Mechanism, MechanismBuilder};
    pub use cinder_ode::{SemiImplicitSolver, StiffIntegrator};
    pub use cinder_reduce::{DirectedRelationGraph, FullMechanism, ReductionMethod};
    pub use cinder_tab::{IsatTable, NoTabulation, TabulationMethod};
}
