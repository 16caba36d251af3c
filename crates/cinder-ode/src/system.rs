//! The [`OdeSystem`] trait: what the integrator needs from a chemistry
//! system.

use nalgebra::DMatrix;

/// An autonomous ODE system `dc/dt = f(c)`.
///
/// # Contract
///
/// - `derivatives()` and `jacobian()` MUST be pure functions of `c`;
///   temperature, pressure, and any frozen composition are captured by
///   the implementor at construction.
/// - `jacobian()` receives a square matrix of dimension `dim()` and
///   overwrites it completely.
/// - `&self` — systems are stateless views; the integrator may call
///   either method any number of times per sub-step.
pub trait OdeSystem {
    /// Number of state components.
    fn dim(&self) -> usize;

    /// Evaluate `f(c)` into `dcdt`.
    fn derivatives(&self, c: &[f64], dcdt: &mut [f64]);

    /// Evaluate `∂f/∂c` at `c` into `jac`.
    fn jacobian(&self, c: &[f64], jac: &mut DMatrix<f64>);
}
