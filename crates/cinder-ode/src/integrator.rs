//! The [`StiffIntegrator`] trait and per-call [`StepProfile`].

use cinder_core::IntegrateError;

use crate::system::OdeSystem;

/// What a successful integration actually did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepProfile {
    /// Total time advanced; equals the requested step on success.
    pub advanced: f64,
    /// Suggested initial sub-step for the next call — the classic
    /// adaptive step-size continuation fed back as the cell's
    /// characteristic chemical time.
    pub sub_dt_used: f64,
    /// Number of sub-step attempts, rejections included.
    pub sub_steps: u32,
}

/// A stiff ODE integration scheme.
///
/// Advances a composition vector over a requested time step, subdividing
/// adaptively when local error exceeds tolerance. Implementations are
/// stateless (`&self`) so a single instance can serve every worker.
pub trait StiffIntegrator: Send + Sync {
    /// Scheme name for diagnostics.
    fn name(&self) -> &str;

    /// Advance `c` by `delta_t`, starting with sub-step `dt_init`.
    ///
    /// `c` is updated in place on success and left unspecified on error
    /// (the orchestrator treats any error as terminal for the cell and
    /// discards the buffer). `dt_init` that is non-positive or larger
    /// than `delta_t` is clamped.
    fn integrate(
        &self,
        system: &dyn OdeSystem,
        c: &mut [f64],
        delta_t: f64,
        dt_init: f64,
    ) -> Result<StepProfile, IntegrateError>;
}
