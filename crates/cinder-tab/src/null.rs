//! Tabulation disabled: every lookup misses.

use nalgebra::DMatrix;

use crate::method::{AddOutcome, Retrieved, TabulationMethod};

/// The no-op tabulation strategy.
///
/// Every retrieve misses and every add is discarded, so each cell is
/// integrated directly — the reference behavior the cached path is
/// validated against.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTabulation;

impl TabulationMethod for NoTabulation {
    fn name(&self) -> &str {
        "NoTabulation"
    }

    fn retrieve(&self, _query: &[f64]) -> Option<Retrieved> {
        None
    }

    fn add(&mut self, _query: &[f64], _output: &[f64], _gradient: &DMatrix<f64>) -> AddOutcome {
        AddOutcome::default()
    }

    fn len(&self) -> usize {
        0
    }

    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_misses_and_never_stores() {
        let mut tab = NoTabulation;
        assert!(tab.retrieve(&[1.0]).is_none());
        let outcome = tab.add(&[1.0], &[2.0], &DMatrix::zeros(1, 1));
        assert_eq!(outcome, AddOutcome::default());
        assert!(tab.is_empty());
        assert!(tab.retrieve(&[1.0]).is_none());
    }
}
