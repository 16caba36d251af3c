//! Species records: name and elemental composition.

use cinder_core::ElementId;
use smallvec::SmallVec;

/// One chemical species in a mechanism.
///
/// Carries only what the chemistry layer needs: a display name and the
/// elemental composition used by reduction heuristics to pick their
/// search-initiating set. Thermodynamic properties are evaluated by an
/// external collaborator and never stored here.
#[derive(Clone, Debug, PartialEq)]
pub struct Species {
    /// Display name, unique within the mechanism.
    pub name: String,
    /// Element → atom count pairs. Inline up to 4 elements, which covers
    /// every species in typical combustion mechanisms.
    pub composition: SmallVec<[(ElementId, u32); 4]>,
}

impl Species {
    /// Atom count of `element` in this species, zero if absent.
    pub fn atoms_of(&self, element: ElementId) -> u32 {
        self.composition
            .iter()
            .find(|(e, _)| *e == element)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Whether this species contains `element`.
    pub fn contains(&self, element: ElementId) -> bool {
        self.atoms_of(element) > 0
    }
}
