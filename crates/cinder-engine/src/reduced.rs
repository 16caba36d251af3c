//! The reduced-space view of a mechanism handed to the integrator.

use std::cell::RefCell;

use cinder_mech::Mechanism;
use cinder_ode::OdeSystem;
use cinder_reduce::ActiveSet;
use nalgebra::DMatrix;

/// An [`OdeSystem`] over the active species of one cell.
///
/// Reduced vectors are scattered onto the frozen full-space base
/// composition before rate evaluation, so inactive species contribute
/// their frozen concentrations to enabled reactions while never being
/// integrated themselves. Scratch buffers live behind `RefCell` because
/// the integrator drives the system through `&self`; a system is only
/// ever used by the worker that built it.
pub(crate) struct ReducedSystem<'a> {
    mech: &'a Mechanism,
    active: &'a ActiveSet,
    temperature: f64,
    base: &'a [f64],
    full_c: RefCell<Vec<f64>>,
    full_dcdt: RefCell<Vec<f64>>,
    full_jac: RefCell<DMatrix<f64>>,
}

impl<'a> ReducedSystem<'a> {
    pub(crate) fn new(
        mech: &'a Mechanism,
        active: &'a ActiveSet,
        base: &'a [f64],
        temperature: f64,
    ) -> Self {
        let n = mech.n_species();
        Self {
            mech,
            active,
            temperature,
            base,
            full_c: RefCell::new(vec![0.0; n]),
            full_dcdt: RefCell::new(vec![0.0; n]),
            full_jac: RefCell::new(DMatrix::zeros(n, n)),
        }
    }
}

impl OdeSystem for ReducedSystem<'_> {
    fn dim(&self) -> usize {
        self.active.n_active()
    }

    fn derivatives(&self, c: &[f64], dcdt: &mut [f64]) {
        let mut full_c = self.full_c.borrow_mut();
        full_c.copy_from_slice(self.base);
        self.active.scatter(c, &mut full_c);

        let mut full_dcdt = self.full_dcdt.borrow_mut();
        self.mech.omega(
            &full_c,
            self.temperature,
            Some(self.active.reactions_disabled()),
            &mut full_dcdt,
        );

        for slot in 0..self.dim() {
            dcdt[slot] = full_dcdt[self.active.complete_index(slot).index()];
        }
    }

    fn jacobian(&self, c: &[f64], jac: &mut DMatrix<f64>) {
        let mut full_c = self.full_c.borrow_mut();
        full_c.copy_from_slice(self.base);
        self.active.scatter(c, &mut full_c);

        let mut full_jac = self.full_jac.borrow_mut();
        self.mech.jacobian(
            &full_c,
            self.temperature,
            Some(self.active.reactions_disabled()),
            &mut full_jac,
        );

        let n = self.dim();
        for si in 0..n {
            let fi = self.active.complete_index(si).index();
            for sj in 0..n {
                let fj = self.active.complete_index(sj).index();
                jac[(si, sj)] = full_jac[(fi, fj)];
            }
        }
    }
}
