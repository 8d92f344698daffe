//! # Error Kinds
//!
//! The directory engine reports failures through [`eyre::Result`], with a
//! typed [`DirError`] installed as the root cause wherever the failure kind
//! is part of the contract with the enclosing filesystem. Callers that need
//! to map a failure to an errno (ENAMETOOLONG, EIO) downcast the report:
//!
//! ```ignore
//! match dir.add_entry(name, id, kind) {
//!     Err(report) => match report.downcast_ref::<DirError>() {
//!         Some(DirError::NameTooLong { .. }) => Errno::ENAMETOOLONG,
//!         Some(DirError::Corrupted { .. }) => Errno::EIO,
//!         _ => Errno::EIO,
//!     },
//!     ...
//! }
//! ```
//!
//! The engine never repairs corruption. A `Corrupted` failure aborts the
//! current operation and leaves the cache as-is; the caller must discard the
//! directory instance and rely on the validators on reopen.

use std::io;

use thiserror::Error;

/// Failure kinds surfaced to the enclosing filesystem.
#[derive(Debug, Error)]
pub enum DirError {
    /// A detected violation of an on-disk invariant: short read, bad page
    /// flag, out-of-range page, depth exceeded, broken free-list linkage,
    /// unsorted entries, dangling child pointer, or a parent mismatch in
    /// the node cache.
    #[error("directory corrupted: {details}")]
    Corrupted { details: String },

    /// An external name exceeds the on-disk name field.
    #[error("filename of {length} bytes exceeds limit of {max}")]
    NameTooLong { length: usize, max: usize },

    /// An index past the end of a node's entry or child list. Indicates a
    /// programming error rather than bad data.
    #[error("index {index} out of range for length {len}")]
    OutOfRange { index: usize, len: usize },

    /// Pass-through from the underlying stream.
    #[error("stream I/O failed")]
    Io(#[from] io::Error),
}

impl DirError {
    pub fn name_too_long(length: usize, max: usize) -> Self {
        DirError::NameTooLong { length, max }
    }

    pub fn out_of_range(index: usize, len: usize) -> Self {
        DirError::OutOfRange { index, len }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupted_reports_details() {
        let err = corrupted!("page {} has flag {}", 3, 7);
        assert_eq!(
            err.to_string(),
            "directory corrupted: page 3 has flag 7"
        );
    }

    #[test]
    fn kinds_survive_eyre_downcast() {
        let report = eyre::Report::new(DirError::name_too_long(300, 255));
        let kind = report.downcast_ref::<DirError>();
        assert!(matches!(kind, Some(DirError::NameTooLong { length: 300, .. })));
    }

    #[test]
    fn io_errors_convert() {
        let err: DirError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(matches!(err, DirError::Io(_)));
    }
}
