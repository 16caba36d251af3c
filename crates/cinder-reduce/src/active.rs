//! The [`ActiveSet`]: bidirectional index maps between the full species
//! space and the per-cell reduced space.
//!
//! Rebuilt every cell but never reallocated: the buffers are sized to
//! the worst case (`Ns`) once and reused, since this lives in the hot
//! per-cell loop.

use cinder_core::{ReactionId, SpeciesId};
use cinder_mech::Mechanism;

/// Active/inactive classification of species for one cell, with the
/// index maps to move between full and reduced composition vectors.
///
/// # Invariants
///
/// - `simplified_to_complete[complete_to_simplified[i]] == i` for every
///   active full index `i` (the maps are mutual inverses restricted to
///   the active set).
/// - `n_active() == simplified_to_complete.len()`.
/// - Reduced slots are assigned in activation order.
#[derive(Clone, Debug)]
pub struct ActiveSet {
    complete_to_simplified: Vec<Option<u32>>,
    simplified_to_complete: Vec<u32>,
    reactions_disabled: Vec<bool>,
}

impl ActiveSet {
    /// Create an all-inactive set sized for `n_species` and `n_reactions`.
    pub fn new(n_species: usize, n_reactions: usize) -> Self {
        Self {
            complete_to_simplified: vec![None; n_species],
            simplified_to_complete: Vec::with_capacity(n_species),
            reactions_disabled: vec![false; n_reactions],
        }
    }

    /// Clear all classifications and re-size for a (possibly different)
    /// mechanism, reusing the existing allocations where they fit.
    pub fn reset(&mut self, n_species: usize, n_reactions: usize) {
        self.complete_to_simplified.clear();
        self.complete_to_simplified.resize(n_species, None);
        self.simplified_to_complete.clear();
        self.reactions_disabled.clear();
        self.reactions_disabled.resize(n_reactions, false);
    }

    /// Number of species in the full space.
    pub fn n_species(&self) -> usize {
        self.complete_to_simplified.len()
    }

    /// Number of active species (`NsDAC`).
    pub fn n_active(&self) -> usize {
        self.simplified_to_complete.len()
    }

    /// Whether `species` is active.
    pub fn is_active(&self, species: SpeciesId) -> bool {
        self.complete_to_simplified[species.index()].is_some()
    }

    /// Mark `species` active, assigning it the next reduced slot.
    /// Returns `false` if it was already active.
    pub fn activate(&mut self, species: SpeciesId) -> bool {
        if self.is_active(species) {
            return false;
        }
        let slot = self.simplified_to_complete.len() as u32;
        self.complete_to_simplified[species.index()] = Some(slot);
        self.simplified_to_complete.push(species.0);
        true
    }

    /// Mark every species active, in full-space order.
    pub fn activate_all(&mut self) {
        for i in 0..self.n_species() {
            self.activate(SpeciesId(i as u32));
        }
    }

    /// The reduced slot of `species`, if active.
    pub fn simplified_index(&self, species: SpeciesId) -> Option<u32> {
        self.complete_to_simplified[species.index()]
    }

    /// The full-space species occupying reduced `slot`.
    pub fn complete_index(&self, slot: usize) -> SpeciesId {
        SpeciesId(self.simplified_to_complete[slot])
    }

    /// Active species in reduced-slot order.
    pub fn active_species(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        self.simplified_to_complete.iter().map(|&i| SpeciesId(i))
    }

    /// Mark `reaction` excluded from the reduced system.
    pub fn disable_reaction(&mut self, reaction: ReactionId) {
        self.reactions_disabled[reaction.index()] = true;
    }

    /// Whether `reaction` is excluded.
    pub fn reaction_disabled(&self, reaction: ReactionId) -> bool {
        self.reactions_disabled[reaction.index()]
    }

    /// The per-reaction exclusion mask, indexed by `ReactionId`.
    pub fn reactions_disabled(&self) -> &[bool] {
        &self.reactions_disabled
    }

    /// Disable every reaction whose stoichiometry is not fully contained
    /// in the active set. The reduced system can only evolve active
    /// species, so a reaction touching an inactive one must not fire.
    pub fn mask_incomplete_reactions(&mut self, mech: &Mechanism) {
        for (id, reaction) in mech.reactions_iter() {
            if reaction.participants().any(|s| !self.is_active(s)) {
                self.reactions_disabled[id.index()] = true;
            }
        }
    }

    /// Gather the active entries of `full` into `reduced`
    /// (reduced-slot order). `reduced` is cleared and refilled.
    pub fn project(&self, full: &[f64], reduced: &mut Vec<f64>) {
        reduced.clear();
        reduced.extend(self.simplified_to_complete.iter().map(|&i| full[i as usize]));
    }

    /// Scatter `reduced` back into the active entries of `full`.
    /// Inactive species are left untouched (frozen for the step).
    pub fn scatter(&self, reduced: &[f64], full: &mut [f64]) {
        for (slot, &i) in self.simplified_to_complete.iter().enumerate() {
            full[i as usize] = reduced[slot];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn activation_assigns_slots_in_order() {
        let mut set = ActiveSet::new(5, 2);
        assert!(set.activate(SpeciesId(3)));
        assert!(set.activate(SpeciesId(0)));
        assert!(!set.activate(SpeciesId(3)), "re-activation is a no-op");
        assert_eq!(set.n_active(), 2);
        assert_eq!(set.simplified_index(SpeciesId(3)), Some(0));
        assert_eq!(set.simplified_index(SpeciesId(0)), Some(1));
        assert_eq!(set.simplified_index(SpeciesId(1)), None);
        assert_eq!(set.complete_index(0), SpeciesId(3));
        assert_eq!(set.complete_index(1), SpeciesId(0));
    }

    #[test]
    fn reset_clears_everything() {
        let mut set = ActiveSet::new(3, 1);
        set.activate(SpeciesId(1));
        set.disable_reaction(ReactionId(0));
        set.reset(4, 2);
        assert_eq!(set.n_species(), 4);
        assert_eq!(set.n_active(), 0);
        assert!(!set.reaction_disabled(ReactionId(0)));
        assert!(!set.reaction_disabled(ReactionId(1)));
    }

    #[test]
    fn project_then_scatter_freezes_inactive() {
        let mut set = ActiveSet::new(4, 0);
        set.activate(SpeciesId(2));
        set.activate(SpeciesId(0));

        let full = [10.0, 20.0, 30.0, 40.0];
        let mut reduced = Vec::new();
        set.project(&full, &mut reduced);
        assert_eq!(reduced, vec![30.0, 10.0]);

        let mut out = [0.0, 99.0, 0.0, 77.0];
        set.scatter(&reduced, &mut out);
        assert_eq!(out, [10.0, 99.0, 30.0, 77.0]);
    }

    #[test]
    fn activate_all_is_identity_mapping() {
        let mut set = ActiveSet::new(3, 0);
        set.activate_all();
        assert_eq!(set.n_active(), 3);
        for i in 0..3 {
            assert_eq!(set.simplified_index(SpeciesId(i)), Some(i));
        }
    }

    proptest! {
        /// The two maps are mutual inverses restricted to the active set,
        /// regardless of activation order or duplicates.
        #[test]
        fn index_maps_are_mutual_inverses(
            n_species in 1_usize..40,
            picks in proptest::collection::vec(0_u32..40, 0..80),
        ) {
            let mut set = ActiveSet::new(n_species, 0);
            for p in picks {
                let id = SpeciesId(p % n_species as u32);
                set.activate(id);
            }
            prop_assert_eq!(set.n_active(), set.active_species().count());
            for slot in 0..set.n_active() {
                let full = set.complete_index(slot);
                prop_assert_eq!(set.simplified_index(full), Some(slot as u32));
            }
            for i in 0..n_species {
                let id = SpeciesId(i as u32);
                if let Some(slot) = set.simplified_index(id) {
                    prop_assert_eq!(set.complete_index(slot as usize), id);
                }
            }
        }
    }
}
