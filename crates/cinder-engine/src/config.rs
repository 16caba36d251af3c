//! Engine configuration, validation, and error types.

use std::error::Error;
use std::fmt;
use std::sync::{Arc, RwLock};

use cinder_mech::Mechanism;
use cinder_ode::{SemiImplicitSolver, StiffIntegrator};
use cinder_reduce::{FullMechanism, ReductionMethod};
use cinder_tab::{NoTabulation, TabulationMethod};

/// Errors detected during [`EngineConfig::validate()`].
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// `dt_chem_fraction` is NaN, infinite, zero, negative, or above 1.
    InvalidDtChemFraction {
        /// The offending value.
        value: f64,
    },
    /// An explicit worker count of zero was configured.
    ZeroWorkers,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDtChemFraction { value } => {
                write!(f, "dt_chem_fraction must be in (0, 1], got {value}")
            }
            Self::ZeroWorkers => write!(f, "workers must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

/// Complete configuration for constructing a [`ChemistryEngine`].
///
/// [`new`](EngineConfig::new) picks the reference strategies — full
/// mechanism, no tabulation, the default semi-implicit solver — so the
/// adaptive pieces are opted into field by field.
///
/// The tabulation slot is shared (`Arc`) rather than owned: callers who
/// persist the cache across restarts keep their own handle to the
/// concrete table and hand the engine a clone.
///
/// [`ChemistryEngine`]: crate::engine::ChemistryEngine
pub struct EngineConfig {
    /// The reaction mechanism, shared across workers.
    pub mechanism: Arc<Mechanism>,
    /// Mechanism reduction strategy.
    pub reduction: Box<dyn ReductionMethod>,
    /// Tabulation strategy, shared with the caller.
    pub tabulation: Arc<RwLock<dyn TabulationMethod>>,
    /// Stiff integration scheme.
    pub integrator: Box<dyn StiffIntegrator>,
    /// Worker threads for [`solve_batch`]. `None` = auto-detect
    /// (`available_parallelism / 2`, clamped to `[2, 16]`).
    ///
    /// [`solve_batch`]: crate::engine::ChemistryEngine::solve_batch
    pub workers: Option<usize>,
    /// Fraction of the requested step used as the integrator's first
    /// sub-step for cells with no chemical-time history.
    pub dt_chem_fraction: f64,
}

impl EngineConfig {
    /// Configuration with the reference strategies for `mechanism`.
    pub fn new(mechanism: Arc<Mechanism>) -> Self {
        Self {
            mechanism,
            reduction: Box::new(FullMechanism),
            tabulation: Arc::new(RwLock::new(NoTabulation)),
            integrator: Box::new(
                SemiImplicitSolver::builder()
                    .build()
                    .expect("default solver configuration is valid"),
            ),
            workers: None,
            dt_chem_fraction: 0.1,
        }
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dt_chem_fraction.is_finite()
            || self.dt_chem_fraction <= 0.0
            || self.dt_chem_fraction > 1.0
        {
            return Err(ConfigError::InvalidDtChemFraction {
                value: self.dt_chem_fraction,
            });
        }
        if self.workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    /// Resolve the worker count, applying auto-detection if `None`.
    /// Explicit values are clamped to `[1, 64]`.
    pub(crate) fn resolved_workers(&self) -> usize {
        match self.workers {
            Some(n) => n.clamp(1, 64),
            None => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                (cpus / 2).clamp(2, 16)
            }
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("species", &self.mechanism.n_species())
            .field("reactions", &self.mechanism.n_reactions())
            .field("reduction", &self.reduction.name())
            .field("integrator", &self.integrator.name())
            .field("workers", &self.workers)
            .field("dt_chem_fraction", &self.dt_chem_fraction)
            .finish()
    }
}
