//! Error taxonomy for the chemistry layer.
//!
//! Split by recoverability: [`ReduceError`] is consumed by the engine's
//! full-mechanism fallback and never escapes; [`StateError`] and
//! [`IntegrateError`] are fatal for the cell solve and are wrapped into
//! [`SolveError`] together with the cell they occurred in.

use std::error::Error;
use std::fmt;

use crate::id::{CellId, ReactionId, SpeciesId};

/// A cell state rejected at the solve boundary.
///
/// The chemistry layer refuses to process malformed inputs rather than
/// risk corrupting rate evaluation downstream.
#[derive(Clone, Debug, PartialEq)]
pub enum StateError {
    /// The composition vector has zero length.
    EmptyComposition,
    /// The composition vector length does not match the mechanism.
    LengthMismatch {
        /// Species count of the mechanism being solved.
        expected: usize,
        /// Length of the supplied composition vector.
        found: usize,
    },
    /// A concentration is NaN or infinite.
    NonFiniteConcentration {
        /// The offending species.
        species: SpeciesId,
        /// The offending value.
        value: f64,
    },
    /// A concentration is negative.
    NegativeConcentration {
        /// The offending species.
        species: SpeciesId,
        /// The offending value.
        value: f64,
    },
    /// Temperature is NaN, infinite, zero, or negative.
    InvalidTemperature {
        /// The offending value.
        value: f64,
    },
    /// Pressure is NaN, infinite, zero, or negative.
    InvalidPressure {
        /// The offending value.
        value: f64,
    },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyComposition => write!(f, "composition vector is empty"),
            Self::LengthMismatch { expected, found } => {
                write!(
                    f,
                    "composition vector has {found} entries, mechanism has {expected} species"
                )
            }
            Self::NonFiniteConcentration { species, value } => {
                write!(f, "species {species} concentration is not finite ({value})")
            }
            Self::NegativeConcentration { species, value } => {
                write!(f, "species {species} concentration is negative ({value})")
            }
            Self::InvalidTemperature { value } => {
                write!(f, "temperature must be finite and positive, got {value}")
            }
            Self::InvalidPressure { value } => {
                write!(f, "pressure must be finite and positive, got {value}")
            }
        }
    }
}

impl Error for StateError {}

/// Errors from a mechanism reduction pass.
///
/// Always recoverable: the engine falls back to the full species set for
/// the offending cell and records the fallback in its metrics.
#[derive(Clone, Debug, PartialEq)]
pub enum ReduceError {
    /// A coupling coefficient evaluated to NaN or infinity.
    NonFiniteCoupling {
        /// The reaction whose rate produced the bad coupling.
        reaction: ReactionId,
    },
    /// No species qualified for the search-initiating set.
    NoViableTargets,
}

impl fmt::Display for ReduceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteCoupling { reaction } => {
                write!(f, "non-finite coupling coefficient from reaction {reaction}")
            }
            Self::NoViableTargets => write!(f, "no viable search-initiating species"),
        }
    }
}

impl Error for ReduceError {}

/// Errors from the stiff ODE integrator.
///
/// Terminal for the cell solve: continuing past a failed integration
/// would propagate physically invalid composition into the flow solve.
#[derive(Clone, Debug, PartialEq)]
pub enum IntegrateError {
    /// The local error tolerance could not be met within the sub-step budget.
    ToleranceNotMet {
        /// Sub-steps attempted before giving up.
        sub_steps: u32,
        /// The last (rejected) sub-step size.
        last_dt: f64,
    },
    /// The linearized system matrix was singular at the attempted sub-step.
    SingularMatrix {
        /// The sub-step size at which factorization failed.
        sub_dt: f64,
    },
    /// The right-hand side produced a NaN or infinite derivative.
    NonFiniteDerivative {
        /// Reduced-space index of the offending component.
        index: usize,
    },
}

impl fmt::Display for IntegrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToleranceNotMet { sub_steps, last_dt } => {
                write!(
                    f,
                    "tolerance not met after {sub_steps} sub-steps (last dt {last_dt:e})"
                )
            }
            Self::SingularMatrix { sub_dt } => {
                write!(f, "singular system matrix at sub-step {sub_dt:e}")
            }
            Self::NonFiniteDerivative { index } => {
                write!(f, "non-finite derivative at component {index}")
            }
        }
    }
}

impl Error for IntegrateError {}

/// Fatal errors from a per-cell chemistry solve.
///
/// Recoverable conditions (reduction failure, tabulation inconsistency)
/// are handled inside the engine and never appear here.
#[derive(Clone, Debug, PartialEq)]
pub enum SolveError {
    /// The supplied cell state failed boundary validation.
    InvalidState {
        /// The cell whose state was rejected.
        cell: CellId,
        /// What was wrong with it.
        source: StateError,
    },
    /// The requested time step is NaN, infinite, zero, or negative.
    InvalidTimeStep {
        /// The cell the step was requested for.
        cell: CellId,
        /// The offending value.
        value: f64,
    },
    /// The stiff integrator could not advance the cell.
    IntegrationFailed {
        /// The cell whose solve failed.
        cell: CellId,
        /// The underlying integrator error.
        source: IntegrateError,
    },
}

impl SolveError {
    /// The cell this error occurred in.
    pub fn cell(&self) -> CellId {
        match self {
            Self::InvalidState { cell, .. }
            | Self::InvalidTimeStep { cell, .. }
            | Self::IntegrationFailed { cell, .. } => *cell,
        }
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState { cell, source } => {
                write!(f, "invalid state in cell {cell}: {source}")
            }
            Self::InvalidTimeStep { cell, value } => {
                write!(
                    f,
                    "time step for cell {cell} must be finite and positive, got {value}"
                )
            }
            Self::IntegrationFailed { cell, source } => {
                write!(f, "integration failed in cell {cell}: {source}")
            }
        }
    }
}

impl Error for SolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidState { source, .. } => Some(source),
            Self::IntegrationFailed { source, .. } => Some(source),
            Self::InvalidTimeStep { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solve_error_reports_cell() {
        let err = SolveError::InvalidTimeStep {
            cell: CellId(7),
            value: -1.0,
        };
        assert_eq!(err.cell(), CellId(7));
        let msg = format!("{err}");
        assert!(msg.contains("cell 7"));
        assert!(msg.contains("-1"));
    }

    #[test]
    fn integration_failure_chains_source() {
        let err = SolveError::IntegrationFailed {
            cell: CellId(3),
            source: IntegrateError::ToleranceNotMet {
                sub_steps: 1000,
                last_dt: 1e-12,
            },
        };
        assert!(err.source().is_some());
        assert!(format!("{err}").contains("1000 sub-steps"));
    }

    #[test]
    fn state_error_display() {
        let err = StateError::NegativeConcentration {
            species: SpeciesId(2),
            value: -0.5,
        };
        assert!(format!("{err}").contains("species 2"));
    }
}
