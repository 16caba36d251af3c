//! Binary persistence for [`IsatTable`] restart continuity.
//!
//! All integers and floats are little-endian. The format is
//! intentionally simple — no compression, no alignment padding, no
//! self-describing schema:
//!
//! ```text
//! [MAGIC "CTAB"] [VERSION u8]
//! [dim_in u32] [dim_out u32] [count u32]
//! [entry 1] ... [entry count]
//! ```
//!
//! Each entry is `phi` (`dim_in` f64), `output` (`dim_out` f64), the
//! gradient in row-major order (`dim_out * dim_in` f64), the validity
//! radii (`dim_in` f64), and the hit count (u64). A loaded table is
//! immediately queryable; retrieval correctness does not depend on the
//! order entries were written.

use std::error::Error;
use std::fmt;
use std::io::{self, Read, Write};

use nalgebra::{DMatrix, DVector};

use crate::isat::IsatTable;
use crate::method::TabulationMethod;

/// Magic bytes at the start of every table file.
pub const MAGIC: [u8; 4] = *b"CTAB";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;

/// Errors from table persistence.
#[derive(Debug)]
pub enum StoreError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The stream does not start with the expected `b"CTAB"` magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the stream.
        found: u8,
    },
    /// An entry could not be decoded (truncated or corrupt data).
    MalformedEntry {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// The stream holds more entries than the target table's capacity.
    CapacityExceeded {
        /// Entries in the stream.
        count: usize,
        /// The target table's capacity.
        capacity: usize,
    },
    /// The target table already holds entries.
    TableNotEmpty,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"CTAB\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::MalformedEntry { detail } => write!(f, "malformed entry: {detail}"),
            Self::CapacityExceeded { count, capacity } => {
                write!(f, "stream holds {count} entries, table capacity is {capacity}")
            }
            Self::TableNotEmpty => write!(f, "target table already holds entries"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ── Primitive writers/readers ───────────────────────────────────

fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), StoreError> {
    w.write_all(&[v])?;
    Ok(())
}

fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), StoreError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), StoreError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), StoreError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn read_u8(r: &mut dyn Read) -> Result<u8, StoreError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32_le(r: &mut dyn Read) -> Result<u32, StoreError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le(r: &mut dyn Read) -> Result<u64, StoreError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64_le(r: &mut dyn Read) -> Result<f64, StoreError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_f64_vec(r: &mut dyn Read, len: usize) -> Result<Vec<f64>, StoreError> {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(read_f64_le(r)?);
    }
    Ok(out)
}

// ── Table serialization ─────────────────────────────────────────

/// Write `table` to `w`. An empty table writes a valid header with a
/// zero entry count.
pub fn write_table(w: &mut dyn Write, table: &IsatTable) -> Result<(), StoreError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;

    let (dim_in, dim_out) = table.dims().unwrap_or((0, 0));
    write_u32_le(w, dim_in as u32)?;
    write_u32_le(w, dim_out as u32)?;
    write_u32_le(w, table.len() as u32)?;

    for (_, entry) in table.entries() {
        for &v in entry.phi() {
            write_f64_le(w, v)?;
        }
        for &v in entry.output() {
            write_f64_le(w, v)?;
        }
        for row in 0..dim_out {
            for col in 0..dim_in {
                write_f64_le(w, entry_gradient(entry, row, col))?;
            }
        }
        for &v in entry.radii() {
            write_f64_le(w, v)?;
        }
        write_u64_le(w, entry.hits())?;
    }
    Ok(())
}

fn entry_gradient(entry: &crate::entry::Entry, row: usize, col: usize) -> f64 {
    entry.gradient[(row, col)]
}

/// Read a serialized table from `r` into `table`, which must be empty.
///
/// Stored radii are restored as-is, so the loaded regions reproduce the
/// grow/shrink history of the saved run; only eviction history differs
/// across a save/load cycle.
pub fn read_table(r: &mut dyn Read, table: &mut IsatTable) -> Result<(), StoreError> {
    if !table.is_empty() {
        return Err(StoreError::TableNotEmpty);
    }

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(StoreError::InvalidMagic);
    }
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion { found: version });
    }

    let dim_in = read_u32_le(r)? as usize;
    let dim_out = read_u32_le(r)? as usize;
    let count = read_u32_le(r)? as usize;

    if count > table.capacity() {
        return Err(StoreError::CapacityExceeded {
            count,
            capacity: table.capacity(),
        });
    }

    for i in 0..count {
        let phi = read_f64_vec(r, dim_in)?;
        let output = read_f64_vec(r, dim_out)?;
        let gradient = read_f64_vec(r, dim_out * dim_in)?;
        let radii = read_f64_vec(r, dim_in)?;
        let hits = read_u64_le(r)?;

        if phi.iter().chain(&output).chain(&gradient).any(|v| !v.is_finite()) {
            return Err(StoreError::MalformedEntry {
                detail: format!("entry {i} holds a non-finite value"),
            });
        }
        if radii.iter().any(|&v| !v.is_finite() || v <= 0.0) {
            return Err(StoreError::MalformedEntry {
                detail: format!("entry {i} holds a non-positive validity radius"),
            });
        }

        table.insert_raw(
            DVector::from_vec(phi),
            DVector::from_vec(output),
            DMatrix::from_row_slice(dim_out, dim_in, &gradient),
            DVector::from_vec(radii),
            hits,
        );
    }
    Ok(())
}
