//! Tabulation entries and their ellipsoidal validity regions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::{DMatrix, DVector};

/// Stable arena index of a tabulation entry.
///
/// Indices survive tree restructuring; an ID is only invalidated by
/// explicit eviction, after which the slot may be reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u32);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One tabulated chemistry result.
///
/// Stores the input point `phi`, the integrated output, the sensitivity
/// (mapping gradient) of the output with respect to the input, and the
/// per-axis radii of the axis-aligned ellipsoid of accuracy. The region
/// is the only part mutated after insertion: it grows when nearby
/// queries prove the extrapolation accurate and shrinks when a covered
/// query proves it wrong.
///
/// Hit bookkeeping uses relaxed atomics so retrieval stays a shared
/// (`&self`) operation across concurrent readers.
#[derive(Debug)]
pub struct Entry {
    pub(crate) phi: DVector<f64>,
    pub(crate) output: DVector<f64>,
    pub(crate) gradient: DMatrix<f64>,
    pub(crate) radii: DVector<f64>,
    pub(crate) hits: AtomicU64,
    pub(crate) last_used: AtomicU64,
    /// Node index of the leaf currently holding this entry.
    pub(crate) leaf: u32,
}

impl Entry {
    pub(crate) fn new(
        phi: DVector<f64>,
        output: DVector<f64>,
        gradient: DMatrix<f64>,
        radii: DVector<f64>,
        stamp: u64,
    ) -> Self {
        debug_assert_eq!(gradient.nrows(), output.len());
        debug_assert_eq!(gradient.ncols(), phi.len());
        debug_assert_eq!(radii.len(), phi.len());
        Self {
            phi,
            output,
            gradient,
            radii,
            hits: AtomicU64::new(0),
            last_used: AtomicU64::new(stamp),
            leaf: u32::MAX,
        }
    }

    /// The stored input point.
    pub fn phi(&self) -> &[f64] {
        self.phi.as_slice()
    }

    /// The stored output.
    pub fn output(&self) -> &[f64] {
        self.output.as_slice()
    }

    /// Validity radii along each input axis.
    pub fn radii(&self) -> &[f64] {
        self.radii.as_slice()
    }

    /// Number of times this entry satisfied a retrieve.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Squared distance of `q` from the stored point in the region's own
    /// metric; `<= 1` means `q` is inside the ellipsoid of accuracy.
    pub fn distance2(&self, q: &[f64]) -> f64 {
        debug_assert_eq!(q.len(), self.phi.len());
        let mut d2 = 0.0;
        for i in 0..q.len() {
            let d = (q[i] - self.phi[i]) / self.radii[i];
            d2 += d * d;
        }
        d2
    }

    /// Whether `q` lies inside the validity region.
    pub fn contains(&self, q: &[f64]) -> bool {
        self.distance2(q) <= 1.0
    }

    /// Linear extrapolation of the stored mapping to `q`:
    /// `output + gradient · (q − phi)`.
    pub fn extrapolate(&self, q: &[f64]) -> DVector<f64> {
        let dq = DVector::from_iterator(q.len(), q.iter().zip(self.phi.iter()).map(|(a, b)| a - b));
        &self.output + &self.gradient * dq
    }

    /// Uniformly scale the region so that `q` falls just inside it.
    /// Only meaningful when `q` is currently outside.
    pub(crate) fn grow_to_include(&mut self, q: &[f64]) {
        let d2 = self.distance2(q);
        if d2 <= 1.0 {
            return;
        }
        let factor = d2.sqrt() * 1.01;
        self.radii *= factor;
    }

    /// Uniformly scale the region so that `q` falls just outside it.
    /// Only meaningful when `q` is currently inside; a query coincident
    /// with the stored point cannot be excluded and the shrink factor is
    /// floored to keep the region non-degenerate.
    pub(crate) fn shrink_to_exclude(&mut self, q: &[f64]) {
        let d2 = self.distance2(q);
        if d2 > 1.0 {
            return;
        }
        let factor = (d2.sqrt() * 0.99).max(1e-6);
        self.radii *= factor;
    }

    pub(crate) fn touch(&self, stamp: u64) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.last_used.store(stamp, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    fn entry() -> Entry {
        Entry::new(
            dvector![1.0, 2.0],
            dvector![10.0],
            DMatrix::from_row_slice(1, 2, &[2.0, -1.0]),
            dvector![0.1, 0.2],
            0,
        )
    }

    #[test]
    fn distance_uses_region_metric() {
        let e = entry();
        assert_eq!(e.distance2(&[1.0, 2.0]), 0.0);
        // One radius along the first axis.
        assert!((e.distance2(&[1.1, 2.0]) - 1.0).abs() < 1e-12);
        assert!(e.contains(&[1.05, 2.05]));
        assert!(!e.contains(&[1.2, 2.0]));
    }

    #[test]
    fn extrapolation_applies_gradient() {
        let e = entry();
        let out = e.extrapolate(&[1.05, 1.9]);
        // 10 + 2*0.05 + (-1)*(-0.1) = 10.2
        assert!((out[0] - 10.2).abs() < 1e-12);
    }

    #[test]
    fn grow_then_contains() {
        let mut e = entry();
        let q = [1.5, 2.0];
        assert!(!e.contains(&q));
        e.grow_to_include(&q);
        assert!(e.contains(&q));
    }

    #[test]
    fn shrink_then_excludes() {
        let mut e = entry();
        let q = [1.05, 2.0];
        assert!(e.contains(&q));
        e.shrink_to_exclude(&q);
        assert!(!e.contains(&q));
    }

    #[test]
    fn shrink_at_stored_point_stays_nondegenerate() {
        let mut e = entry();
        e.shrink_to_exclude(&[1.0, 2.0]);
        assert!(e.radii.iter().all(|&r| r > 0.0));
    }
}
