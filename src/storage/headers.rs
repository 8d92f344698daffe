//! # Directory Header
//!
//! Four stream-wide scalars describe a directory: the root page of its
//! B-tree, the head and length of its free-page list, and the format flags
//! that select the filename comparator. They are not stored inside the
//! paged stream itself; the enclosing filesystem persists the 16-byte record
//! produced by [`DirHeader::write_to`] alongside its other per-file
//! metadata and hands it back on open.
//!
//! All fields are little-endian, matching the rest of the on-disk format.
//! A fresh directory has no root, no free pages, and whatever flags the
//! filesystem was created with.

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{DIR_HEADER_SIZE, INVALID_PAGE};

/// The per-directory scalars shared by the allocator and the tree engine.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct DirHeader {
    root_page: U32,
    start_free_page: U32,
    num_free_page: U32,
    flags: U32,
}

const _: () = assert!(std::mem::size_of::<DirHeader>() == DIR_HEADER_SIZE);

impl DirHeader {
    /// Header of a fresh, empty directory.
    pub fn new() -> Self {
        Self::with_flags(0)
    }

    /// Header of a fresh directory with the given format flags.
    pub fn with_flags(flags: u32) -> Self {
        Self {
            root_page: U32::new(INVALID_PAGE),
            start_free_page: U32::new(INVALID_PAGE),
            num_free_page: U32::new(0),
            flags: U32::new(flags),
        }
    }

    /// Decodes a header from persisted filesystem metadata.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ensure!(
            bytes.len() >= DIR_HEADER_SIZE,
            "buffer too small for DirHeader: {} < {}",
            bytes.len(),
            DIR_HEADER_SIZE
        );
        let header = Self::read_from_bytes(&bytes[..DIR_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse DirHeader: {:?}", e))?;
        Ok(header)
    }

    /// Encodes the header for the filesystem metadata layer.
    pub fn write_to(&self, bytes: &mut [u8]) -> Result<()> {
        ensure!(
            bytes.len() >= DIR_HEADER_SIZE,
            "buffer too small for DirHeader: {} < {}",
            bytes.len(),
            DIR_HEADER_SIZE
        );
        bytes[..DIR_HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    zerocopy_accessors! {
        root_page: u32,
        start_free_page: u32,
        num_free_page: u32,
        flags: u32,
    }
}

impl Default for DirHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_header_has_no_root_and_no_free_pages() {
        let header = DirHeader::new();

        assert_eq!(header.root_page(), INVALID_PAGE);
        assert_eq!(header.start_free_page(), INVALID_PAGE);
        assert_eq!(header.num_free_page(), 0);
        assert_eq!(header.flags(), 0);
    }

    #[test]
    fn header_round_trips_through_bytes() {
        let mut header = DirHeader::with_flags(3);
        header.set_root_page(7);
        header.set_start_free_page(9);
        header.set_num_free_page(2);

        let mut buf = [0u8; DIR_HEADER_SIZE];
        header.write_to(&mut buf).unwrap();

        let decoded = DirHeader::from_bytes(&buf).unwrap();
        assert_eq!(decoded.root_page(), 7);
        assert_eq!(decoded.start_free_page(), 9);
        assert_eq!(decoded.num_free_page(), 2);
        assert_eq!(decoded.flags(), 3);
    }

    #[test]
    fn header_encoding_is_little_endian() {
        let mut header = DirHeader::new();
        header.set_root_page(0x0102_0304);

        let mut buf = [0u8; DIR_HEADER_SIZE];
        header.write_to(&mut buf).unwrap();

        assert_eq!(&buf[0..4], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn from_bytes_rejects_short_buffer() {
        assert!(DirHeader::from_bytes(&[0u8; 8]).is_err());
    }
}
