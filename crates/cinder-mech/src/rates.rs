//! The ODE right-hand side: net production rates and their Jacobian.
//!
//! Both entry points are pure functions of the composition vector and
//! temperature. Rate laws are concentration-based mass action, so
//! pressure never enters the evaluation; it still participates in the
//! tabulation key upstream.

use cinder_core::{ReactionId, SpeciesId};
use nalgebra::DMatrix;

use crate::mechanism::Mechanism;
use crate::reaction::SpeciesCoeff;

impl Mechanism {
    /// Net molar rate `q` of reaction `id` at composition `c` and
    /// temperature `t`: forward mass-action rate minus the explicit
    /// reverse rate when one is present.
    pub fn reaction_rate(&self, id: ReactionId, c: &[f64], t: f64) -> f64 {
        let r = self.reaction(id);
        let mut q = r.forward.rate(t) * mass_action(&r.lhs, c);
        if let Some(reverse) = &r.reverse {
            q -= reverse.rate(t) * mass_action(&r.rhs, c);
        }
        q
    }

    /// Net production rate of every species: `dcdt[i] = Σ_r ν_{i,r} q_r`.
    ///
    /// Reactions flagged in `disabled` are skipped entirely, which is how
    /// the reduced system excludes reactions whose stoichiometry is not
    /// fully contained in the active set.
    pub fn omega(&self, c: &[f64], t: f64, disabled: Option<&[bool]>, dcdt: &mut [f64]) {
        dcdt.fill(0.0);
        for (id, r) in self.reactions_iter() {
            if disabled.is_some_and(|d| d[id.index()]) {
                continue;
            }
            let q = self.reaction_rate(id, c, t);
            for sc in &r.lhs {
                dcdt[sc.species.index()] -= sc.coeff as f64 * q;
            }
            for sc in &r.rhs {
                dcdt[sc.species.index()] += sc.coeff as f64 * q;
            }
        }
    }

    /// Analytic Jacobian of [`omega`](Mechanism::omega):
    /// `jac[(i, j)] = ∂(dc_i/dt)/∂c_j`.
    ///
    /// `jac` must be a square matrix of dimension `n_species`; it is
    /// overwritten. Zero concentrations are handled exactly: the
    /// derivative of `c^ν` at `c = 0` is zero for `ν > 1` and the product
    /// of the remaining factors for `ν = 1`.
    pub fn jacobian(&self, c: &[f64], t: f64, disabled: Option<&[bool]>, jac: &mut DMatrix<f64>) {
        jac.fill(0.0);
        for (id, r) in self.reactions_iter() {
            if disabled.is_some_and(|d| d[id.index()]) {
                continue;
            }
            let kf = r.forward.rate(t);
            let kr = r.reverse.as_ref().map(|k| k.rate(t));
            // dq/dc_j is nonzero only for species appearing on a side.
            for sc in &r.lhs {
                let j = sc.species;
                let dq = mass_action_derivative(kf, &r.lhs, j, c);
                accumulate_column(jac, r, j, dq);
            }
            if let Some(kr) = kr {
                for sc in &r.rhs {
                    let j = sc.species;
                    let dq = -mass_action_derivative(kr, &r.rhs, j, c);
                    accumulate_column(jac, r, j, dq);
                }
            }
        }
    }
}

/// `Π c_i^ν_i` over one reaction side.
fn mass_action(side: &[SpeciesCoeff], c: &[f64]) -> f64 {
    let mut product = 1.0;
    for sc in side {
        product *= c[sc.species.index()].powi(sc.coeff as i32);
    }
    product
}

/// `∂/∂c_j (k · Π c_i^ν_i)` for one reaction side. Zero when `j` does
/// not appear on the side.
fn mass_action_derivative(k: f64, side: &[SpeciesCoeff], j: SpeciesId, c: &[f64]) -> f64 {
    let mut derivative = k;
    let mut appears = false;
    for sc in side {
        let conc = c[sc.species.index()];
        if sc.species == j {
            appears = true;
            derivative *= sc.coeff as f64 * conc.powi(sc.coeff as i32 - 1);
        } else {
            derivative *= conc.powi(sc.coeff as i32);
        }
    }
    if appears {
        derivative
    } else {
        0.0
    }
}

/// Scatter `dq/dc_j` into column `j` weighted by each species' net
/// stoichiometric coefficient.
fn accumulate_column(
    jac: &mut DMatrix<f64>,
    r: &crate::reaction::Reaction,
    j: SpeciesId,
    dq: f64,
) {
    for sc in &r.lhs {
        jac[(sc.species.index(), j.index())] -= sc.coeff as f64 * dq;
    }
    for sc in &r.rhs {
        jac[(sc.species.index(), j.index())] += sc.coeff as f64 * dq;
    }
}
