//! The [`ReductionMethod`] trait.

use cinder_core::ReduceError;
use cinder_mech::Mechanism;

use crate::active::ActiveSet;

/// A mechanism reduction strategy.
///
/// # Contract
///
/// - `reduce()` receives `active` already [`reset`](ActiveSet::reset)
///   for the mechanism and MUST leave at least one species active, even
///   for pathological near-zero compositions — a degenerate ODE system
///   is never an acceptable outcome.
/// - Reactions whose stoichiometry is not fully contained in the active
///   set MUST be disabled (see
///   [`ActiveSet::mask_incomplete_reactions`]).
/// - `&self` — strategies are stateless; one instance serves every
///   worker concurrently.
/// - An `Err` is recoverable: the orchestrator falls back to the full
///   species set for that cell and continues.
pub trait ReductionMethod: Send + Sync {
    /// Strategy name for diagnostics.
    fn name(&self) -> &str;

    /// Classify species for one cell at composition `c`, temperature
    /// `t`, and pressure `p`.
    fn reduce(
        &self,
        mech: &Mechanism,
        c: &[f64],
        t: f64,
        p: f64,
        active: &mut ActiveSet,
    ) -> Result<(), ReduceError>;
}
