//! Directed-relation-graph reduction.
//!
//! Couples species through the reactions they share: the relevance of B
//! to an already-retained A is the fraction of A's total turnover that
//! flows through reactions also involving B. Species whose relevance to
//! the retained front exceeds the threshold are activated and explored
//! in turn, a breadth-first closure over the relation graph.

use cinder_core::{ReduceError, SpeciesId};
use cinder_mech::Mechanism;
use smallvec::SmallVec;

use crate::active::ActiveSet;
use crate::method::ReductionMethod;

/// Directed-relation-graph reduction strategy.
///
/// Construct via [`DirectedRelationGraph::builder`]. The
/// search-initiating set can be fixed explicitly (fuel/oxidizer targets)
/// or derived per call from the elemental composition: for each element,
/// the highest-concentration species carrying it. The
/// highest-concentration species overall is always retained, so the
/// reduced system never degenerates even when every target is depleted.
#[derive(Clone, Debug)]
pub struct DirectedRelationGraph {
    threshold: f64,
    targets: Vec<SpeciesId>,
}

/// Builder for [`DirectedRelationGraph`].
pub struct DirectedRelationGraphBuilder {
    threshold: f64,
    targets: Vec<SpeciesId>,
}

impl DirectedRelationGraph {
    /// Create a builder with the default threshold of `0.01` and no
    /// explicit targets.
    pub fn builder() -> DirectedRelationGraphBuilder {
        DirectedRelationGraphBuilder {
            threshold: 0.01,
            targets: Vec::new(),
        }
    }

    /// The retention threshold on the coupling coefficient.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Seed species for this cell: explicit targets when configured,
    /// otherwise one carrier per element, plus the global maximum.
    fn seeds(&self, mech: &Mechanism, c: &[f64]) -> Result<SmallVec<[SpeciesId; 8]>, ReduceError> {
        let mut seeds: SmallVec<[SpeciesId; 8]> = SmallVec::new();
        if self.targets.is_empty() {
            for e in 0..mech.n_elements() {
                let element = cinder_core::ElementId(e as u32);
                let carrier = mech
                    .species_iter()
                    .filter(|(id, s)| s.contains(element) && c[id.index()] > 0.0)
                    .max_by(|(a, _), (b, _)| {
                        c[a.index()]
                            .partial_cmp(&c[b.index()])
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .map(|(id, _)| id);
                if let Some(id) = carrier {
                    if !seeds.contains(&id) {
                        seeds.push(id);
                    }
                }
            }
        } else {
            for &id in &self.targets {
                if id.index() < mech.n_species() && !seeds.contains(&id) {
                    seeds.push(id);
                }
            }
            if seeds.is_empty() {
                return Err(ReduceError::NoViableTargets);
            }
        }

        // The carrier guarantee: the most abundant species always stays.
        let carrier = (0..mech.n_species())
            .map(|i| SpeciesId(i as u32))
            .max_by(|a, b| {
                c[a.index()]
                    .partial_cmp(&c[b.index()])
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("mechanism has at least one species");
        if !seeds.contains(&carrier) {
            seeds.push(carrier);
        }
        Ok(seeds)
    }
}

impl DirectedRelationGraphBuilder {
    /// Set the retention threshold. Must be in `(0, 1]`.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Add an explicit search-initiating species.
    pub fn target(mut self, species: SpeciesId) -> Self {
        self.targets.push(species);
        self
    }

    /// Build the strategy, validating the configuration.
    pub fn build(self) -> Result<DirectedRelationGraph, String> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 || self.threshold > 1.0 {
            return Err(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            ));
        }
        Ok(DirectedRelationGraph {
            threshold: self.threshold,
            targets: self.targets,
        })
    }
}

impl ReductionMethod for DirectedRelationGraph {
    fn name(&self) -> &str {
        "DirectedRelationGraph"
    }

    fn reduce(
        &self,
        mech: &Mechanism,
        c: &[f64],
        t: f64,
        _p: f64,
        active: &mut ActiveSet,
    ) -> Result<(), ReduceError> {
        let n_species = mech.n_species();
        let n_reactions = mech.n_reactions();

        // Net reaction rates at the current state.
        let mut rates = vec![0.0; n_reactions];
        for (id, _) in mech.reactions_iter() {
            let q = mech.reaction_rate(id, c, t);
            if !q.is_finite() {
                return Err(ReduceError::NonFiniteCoupling { reaction: id });
            }
            rates[id.index()] = q;
        }

        // Species → reactions adjacency.
        let mut adjacency: Vec<SmallVec<[u32; 8]>> = vec![SmallVec::new(); n_species];
        for (id, reaction) in mech.reactions_iter() {
            for s in reaction.participants() {
                let list = &mut adjacency[s.index()];
                if !list.contains(&id.0) {
                    list.push(id.0);
                }
            }
        }

        // Breadth-first closure from the seeds.
        let mut frontier: Vec<SpeciesId> = Vec::new();
        for seed in self.seeds(mech, c)? {
            if active.activate(seed) {
                frontier.push(seed);
            }
        }

        while let Some(a) = frontier.pop() {
            // Total turnover of A and the share flowing through each
            // co-participant B.
            let mut denominator = 0.0;
            for &ri in &adjacency[a.index()] {
                let reaction = mech.reaction(cinder_core::ReactionId(ri));
                let nu = reaction.net_coeff(a).unsigned_abs() as f64;
                denominator += (nu * rates[ri as usize]).abs();
            }
            if denominator <= 0.0 {
                continue;
            }
            for &ri in &adjacency[a.index()] {
                let id = cinder_core::ReactionId(ri);
                let reaction = mech.reaction(id);
                let nu = reaction.net_coeff(a).unsigned_abs() as f64;
                let contribution = (nu * rates[ri as usize]).abs();
                if contribution / denominator < self.threshold {
                    continue;
                }
                for b in reaction.participants() {
                    if active.activate(b) {
                        frontier.push(b);
                    }
                }
            }
        }

        active.mask_incomplete_reactions(mech);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_core::ReactionId;
    use cinder_mech::{Arrhenius, MechanismBuilder};
    use proptest::prelude::*;

    /// A → B plus an inert species Z with its own element and a single
    /// consuming reaction, so Z only matters when it is present.
    fn decay_with_inert() -> Mechanism {
        MechanismBuilder::new()
            .element("X")
            .element("Y")
            .species("A", &[("X", 1)])
            .species("B", &[("X", 1)])
            .species("Z", &[("Y", 1)])
            .reaction(&[("A", 1)], &[("B", 1)], Arrhenius::constant(1.0))
            .reaction(&[("Z", 1)], &[("B", 1)], Arrhenius::constant(0.1))
            .build()
            .unwrap()
    }

    fn reduce(mech: &Mechanism, c: &[f64]) -> ActiveSet {
        let drg = DirectedRelationGraph::builder().build().unwrap();
        let mut active = ActiveSet::new(mech.n_species(), mech.n_reactions());
        drg.reduce(mech, c, 1000.0, 101_325.0, &mut active).unwrap();
        active
    }

    #[test]
    fn builder_rejects_bad_threshold() {
        assert!(DirectedRelationGraph::builder()
            .threshold(0.0)
            .build()
            .is_err());
        assert!(DirectedRelationGraph::builder()
            .threshold(1.5)
            .build()
            .is_err());
        assert!(DirectedRelationGraph::builder()
            .threshold(f64::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn coupled_product_is_retained() {
        let mech = decay_with_inert();
        let active = reduce(&mech, &[1.0, 0.0, 0.0]);
        assert!(active.is_active(SpeciesId(0)), "A is the seed");
        assert!(active.is_active(SpeciesId(1)), "B is coupled through A's only reaction");
    }

    #[test]
    fn depleted_uncoupled_species_is_dropped() {
        let mech = decay_with_inert();
        let active = reduce(&mech, &[1.0, 0.0, 0.0]);
        assert!(!active.is_active(SpeciesId(2)), "Z at zero concentration has no coupling");
        assert!(!active.reaction_disabled(ReactionId(0)));
        assert!(
            active.reaction_disabled(ReactionId(1)),
            "the Z-consuming reaction must be disabled with Z inactive"
        );
    }

    #[test]
    fn present_species_is_retained_through_its_element() {
        let mech = decay_with_inert();
        let active = reduce(&mech, &[1.0, 0.0, 0.5]);
        assert!(active.is_active(SpeciesId(2)), "Z is seeded as the Y carrier");
    }

    #[test]
    fn all_zero_composition_is_non_degenerate() {
        let mech = decay_with_inert();
        let active = reduce(&mech, &[0.0, 0.0, 0.0]);
        assert!(active.n_active() >= 1);
    }

    #[test]
    fn explicit_targets_override_seeding() {
        let mech = decay_with_inert();
        let drg = DirectedRelationGraph::builder()
            .target(SpeciesId(2))
            .build()
            .unwrap();
        let mut active = ActiveSet::new(mech.n_species(), mech.n_reactions());
        drg.reduce(&mech, &[0.0, 0.0, 1.0], 1000.0, 1e5, &mut active)
            .unwrap();
        assert!(active.is_active(SpeciesId(2)));
        // Z -> B couples B in.
        assert!(active.is_active(SpeciesId(1)));
    }

    #[test]
    fn out_of_range_targets_are_an_error() {
        let mech = decay_with_inert();
        let drg = DirectedRelationGraph::builder()
            .target(SpeciesId(99))
            .build()
            .unwrap();
        let mut active = ActiveSet::new(mech.n_species(), mech.n_reactions());
        let result = drg.reduce(&mech, &[1.0, 0.0, 0.0], 1000.0, 1e5, &mut active);
        assert_eq!(result, Err(ReduceError::NoViableTargets));
    }

    proptest! {
        /// Non-degeneracy and map invertibility over random states.
        #[test]
        fn reduction_outputs_are_well_formed(
            ca in 0.0_f64..2.0,
            cb in 0.0_f64..2.0,
            cz in 0.0_f64..2.0,
            t in 300.0_f64..3000.0,
        ) {
            let mech = decay_with_inert();
            let drg = DirectedRelationGraph::builder().build().unwrap();
            let mut active = ActiveSet::new(mech.n_species(), mech.n_reactions());
            drg.reduce(&mech, &[ca, cb, cz], t, 1e5, &mut active).unwrap();
            prop_assert!(active.n_active() >= 1);
            for slot in 0..active.n_active() {
                let full = active.complete_index(slot);
                prop_assert_eq!(active.simplified_index(full), Some(slot as u32));
            }
        }
    }
}
