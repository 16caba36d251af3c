//! Reduction disabled: every species stays active.

use cinder_core::ReduceError;
use cinder_mech::Mechanism;

use crate::active::ActiveSet;
use crate::method::ReductionMethod;

/// The identity reduction: all species active, no reactions disabled.
///
/// Used when reduction is switched off, and by the orchestrator as the
/// fallback when a real strategy fails on a cell.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullMechanism;

impl ReductionMethod for FullMechanism {
    fn name(&self) -> &str {
        "FullMechanism"
    }

    fn reduce(
        &self,
        _mech: &Mechanism,
        _c: &[f64],
        _t: f64,
        _p: f64,
        active: &mut ActiveSet,
    ) -> Result<(), ReduceError> {
        active.activate_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_core::ReactionId;
    use cinder_mech::{Arrhenius, MechanismBuilder};

    #[test]
    fn keeps_everything_active() {
        let mech = MechanismBuilder::new()
            .element("X")
            .species("A", &[("X", 1)])
            .species("B", &[("X", 1)])
            .reaction(&[("A", 1)], &[("B", 1)], Arrhenius::constant(1.0))
            .build()
            .unwrap();
        let mut active = ActiveSet::new(mech.n_species(), mech.n_reactions());
        FullMechanism
            .reduce(&mech, &[1.0, 0.0], 1000.0, 1e5, &mut active)
            .unwrap();
        assert_eq!(active.n_active(), 2);
        assert!(!active.reaction_disabled(ReactionId(0)));
    }
}
