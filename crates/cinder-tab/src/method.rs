//! The [`TabulationMethod`] trait.

use nalgebra::DMatrix;

use crate::entry::EntryId;

/// A successful cache retrieval.
#[derive(Clone, Debug, PartialEq)]
pub struct Retrieved {
    /// The extrapolated output for the query point.
    pub output: Vec<f64>,
    /// The entry that satisfied the query.
    pub entry: EntryId,
}

/// What an [`add`](TabulationMethod::add) actually did to the table.
///
/// More than one field can be set at once: repairing an inconsistent
/// entry shrinks it *and* inserts the fresh result, and inserting at
/// capacity evicts first.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AddOutcome {
    /// A new entry was created for the query point.
    pub inserted: Option<EntryId>,
    /// An existing entry's region was grown to cover the query point.
    pub grew: Option<EntryId>,
    /// An existing entry's region was shrunk because it covered the
    /// query but predicted it inaccurately.
    pub shrank: Option<EntryId>,
    /// An entry was evicted to make room.
    pub evicted: Option<EntryId>,
}

impl AddOutcome {
    /// Whether the query is now covered without a new entry (the
    /// existing region already predicted it accurately).
    pub fn covered_in_place(&self) -> bool {
        self.inserted.is_none() && self.shrank.is_none()
    }
}

/// A tabulation strategy: cache keyed by input-space proximity.
///
/// # Contract
///
/// - `retrieve()` returns a hit only when the query lies inside some
///   entry's validity region under that region's own metric; with
///   several overlapping candidates the nearest wins. Retrieval is a
///   shared operation — no observable mutation beyond hit-count
///   bookkeeping — so concurrent readers are safe.
/// - `add()` is the only structural mutation and must leave every
///   previously valid retrieve valid unless its entry was explicitly
///   evicted.
/// - Query layout is fixed for the lifetime of the table (first `add`
///   pins the dimensions).
pub trait TabulationMethod: Send + Sync {
    /// Strategy name for diagnostics.
    fn name(&self) -> &str;

    /// Look the query point up; `None` is a miss.
    fn retrieve(&self, query: &[f64]) -> Option<Retrieved>;

    /// Ingest a freshly integrated result: the query point, its
    /// integrated output, and the sensitivity of output w.r.t. query.
    fn add(&mut self, query: &[f64], output: &[f64], gradient: &DMatrix<f64>) -> AddOutcome;

    /// Number of live entries.
    fn len(&self) -> usize;

    /// Whether the table holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    fn clear(&mut self);
}
