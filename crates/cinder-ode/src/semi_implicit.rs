//! Linearized (semi-implicit) Euler integration with step-doubling
//! error control.
//!
//! Each sub-step solves `(I − h·J)·Δ = h·f(c)` and advances `c + Δ`.
//! The local error is estimated by comparing one full step against two
//! half steps; the accepted value is the Richardson extrapolation of the
//! pair, giving second-order accuracy from a first-order scheme. The
//! implicit treatment of the linearized term keeps the scheme stable on
//! the stiff time scales of chemistry without a full Newton iteration.

use cinder_core::IntegrateError;
use nalgebra::{DMatrix, DVector};

use crate::integrator::{StepProfile, StiffIntegrator};
use crate::system::OdeSystem;

/// Step-size controller safety factor.
const SAFETY: f64 = 0.9;
/// Most a rejected or accepted step may shrink in one adjustment.
const MIN_SCALE: f64 = 0.2;
/// Most an accepted step may grow in one adjustment.
const MAX_SCALE: f64 = 5.0;
/// Remaining-time fraction below which the step is considered complete.
const TIME_EPS: f64 = 1e-12;

/// Adaptive linearized Euler solver.
///
/// Construct via [`SemiImplicitSolver::builder`].
#[derive(Clone, Debug)]
pub struct SemiImplicitSolver {
    rel_tol: f64,
    abs_tol: f64,
    max_sub_steps: u32,
}

/// Builder for [`SemiImplicitSolver`].
pub struct SemiImplicitSolverBuilder {
    rel_tol: f64,
    abs_tol: f64,
    max_sub_steps: u32,
}

impl SemiImplicitSolver {
    /// Create a builder with the default tolerances
    /// (`rel_tol = 1e-6`, `abs_tol = 1e-12`, `max_sub_steps = 10_000`).
    pub fn builder() -> SemiImplicitSolverBuilder {
        SemiImplicitSolverBuilder {
            rel_tol: 1e-6,
            abs_tol: 1e-12,
            max_sub_steps: 10_000,
        }
    }

    /// Relative error tolerance per component.
    pub fn rel_tol(&self) -> f64 {
        self.rel_tol
    }

    /// Absolute error tolerance per component.
    pub fn abs_tol(&self) -> f64 {
        self.abs_tol
    }

    /// Sub-step attempt budget before the solve is declared failed.
    pub fn max_sub_steps(&self) -> u32 {
        self.max_sub_steps
    }

    /// One linearized step of size `h` from `c` with derivatives `f`
    /// and Jacobian `jac` evaluated at the step origin.
    fn linearized_step(
        c: &[f64],
        f: &[f64],
        jac: &DMatrix<f64>,
        h: f64,
    ) -> Result<Vec<f64>, IntegrateError> {
        let n = c.len();
        let m = DMatrix::identity(n, n) - jac * h;
        let rhs = DVector::from_iterator(n, f.iter().map(|v| v * h));
        let delta = m
            .lu()
            .solve(&rhs)
            .ok_or(IntegrateError::SingularMatrix { sub_dt: h })?;
        Ok((0..n).map(|i| c[i] + delta[i]).collect())
    }
}

impl SemiImplicitSolverBuilder {
    /// Set the relative error tolerance. Must be finite and positive.
    pub fn rel_tol(mut self, tol: f64) -> Self {
        self.rel_tol = tol;
        self
    }

    /// Set the absolute error tolerance. Must be finite and positive.
    pub fn abs_tol(mut self, tol: f64) -> Self {
        self.abs_tol = tol;
        self
    }

    /// Set the sub-step attempt budget. Must be at least 1.
    pub fn max_sub_steps(mut self, n: u32) -> Self {
        self.max_sub_steps = n;
        self
    }

    /// Build the solver, validating all configuration.
    pub fn build(self) -> Result<SemiImplicitSolver, String> {
        if !self.rel_tol.is_finite() || self.rel_tol <= 0.0 {
            return Err(format!(
                "rel_tol must be finite and positive, got {}",
                self.rel_tol
            ));
        }
        if !self.abs_tol.is_finite() || self.abs_tol <= 0.0 {
            return Err(format!(
                "abs_tol must be finite and positive, got {}",
                self.abs_tol
            ));
        }
        if self.max_sub_steps == 0 {
            return Err("max_sub_steps must be at least 1".to_string());
        }
        Ok(SemiImplicitSolver {
            rel_tol: self.rel_tol,
            abs_tol: self.abs_tol,
            max_sub_steps: self.max_sub_steps,
        })
    }
}

impl StiffIntegrator for SemiImplicitSolver {
    fn name(&self) -> &str {
        "SemiImplicitEuler"
    }

    fn integrate(
        &self,
        system: &dyn OdeSystem,
        c: &mut [f64],
        delta_t: f64,
        dt_init: f64,
    ) -> Result<StepProfile, IntegrateError> {
        let n = system.dim();
        debug_assert_eq!(c.len(), n);

        let mut advanced = 0.0;
        let mut dt = if dt_init.is_finite() && dt_init > 0.0 {
            dt_init.min(delta_t)
        } else {
            delta_t
        };
        let mut sub_steps = 0u32;

        let mut f0 = vec![0.0; n];
        let mut f_mid = vec![0.0; n];
        let mut jac = DMatrix::zeros(n, n);

        loop {
            let remaining = delta_t - advanced;
            if remaining <= delta_t * TIME_EPS {
                break;
            }
            if sub_steps >= self.max_sub_steps {
                return Err(IntegrateError::ToleranceNotMet {
                    sub_steps,
                    last_dt: dt,
                });
            }
            dt = dt.min(remaining);
            if dt <= delta_t * TIME_EPS {
                return Err(IntegrateError::ToleranceNotMet {
                    sub_steps,
                    last_dt: dt,
                });
            }

            system.derivatives(c, &mut f0);
            check_finite(&f0)?;
            system.jacobian(c, &mut jac);

            // One full step and two half steps, all linearized about the
            // step origin (the Jacobian is reused for the second half).
            let full = Self::linearized_step(c, &f0, &jac, dt)?;
            let half = Self::linearized_step(c, &f0, &jac, dt / 2.0)?;
            system.derivatives(&half, &mut f_mid);
            check_finite(&f_mid)?;
            let half2 = Self::linearized_step(&half, &f_mid, &jac, dt / 2.0)?;

            let mut err = 0.0_f64;
            for i in 0..n {
                let scale = self.abs_tol + self.rel_tol * half2[i].abs().max(full[i].abs());
                err = err.max((half2[i] - full[i]).abs() / scale);
            }
            sub_steps += 1;

            if err <= 1.0 {
                // Accept the Richardson extrapolation; truncate the tiny
                // negative excursions the extrapolation can introduce.
                for i in 0..n {
                    c[i] = (2.0 * half2[i] - full[i]).max(0.0);
                }
                advanced += dt;
                let grow = if err > 0.0 {
                    SAFETY * (1.0 / err).sqrt()
                } else {
                    MAX_SCALE
                };
                dt *= grow.min(MAX_SCALE);
            } else {
                dt *= (SAFETY * (1.0 / err).sqrt()).clamp(MIN_SCALE, SAFETY);
            }
        }

        Ok(StepProfile {
            advanced,
            sub_dt_used: dt,
            sub_steps,
        })
    }
}

fn check_finite(f: &[f64]) -> Result<(), IntegrateError> {
    for (index, v) in f.iter().enumerate() {
        if !v.is_finite() {
            return Err(IntegrateError::NonFiniteDerivative { index });
        }
    }
    Ok(())
}
