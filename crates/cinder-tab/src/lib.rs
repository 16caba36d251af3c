//! In-situ adaptive tabulation: a cache of integrated chemistry results
//! with local validity regions.
//!
//! A [`TabulationMethod`] answers "can this query be satisfied from
//! cache?" A hit returns the stored result corrected by linear
//! extrapolation from the entry's sensitivity matrix; a miss is followed
//! by a fresh integration whose result is fed back through
//! [`TabulationMethod::add`] to grow the cache. [`IsatTable`] is the
//! production implementation — a binary space partition over
//! arena-indexed entries — and [`NoTabulation`] disables caching.
//!
//! Tables persist across the whole run (and optionally across restarts
//! via [`codec`]); everything else in the chemistry layer is rebuilt
//! per cell.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod entry;
pub mod isat;
pub mod method;
pub mod null;

pub use codec::{read_table, write_table, StoreError, FORMAT_VERSION, MAGIC};
pub use entry::{Entry, EntryId};
pub use isat::{IsatTable, IsatTableBuilder};
pub use method::{AddOutcome, Retrieved, TabulationMethod};
pub use null::NoTabulation;
