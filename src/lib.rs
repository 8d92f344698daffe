//! # cipherdir - Encrypted Filesystem Directory Engine
//!
//! cipherdir implements the full-format directory engine of an encrypting
//! user-space filesystem: each directory is a paged B-tree persisted inside
//! an encrypted sparse stream, sharing that stream with a free-page
//! allocator and served through a write-back node cache.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cipherdir::{BtreeDirectory, DirHeader, FileStream};
//!
//! let stream = FileStream::create("directory.stream")?;
//! let mut dir = BtreeDirectory::open(stream, DirHeader::new());
//!
//! dir.add_entry("report.txt", file_id, FILE_TYPE_REGULAR)?;
//! let entry = dir.get_entry("report.txt")?;
//! dir.flush()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Enclosing filesystem (FUSE ops, locks, │
//! │  key management)      [not this crate]  │
//! ├─────────────────────────────────────────┤
//! │        BtreeDirectory (btree::tree)     │
//! ├──────────────────┬──────────────────────┤
//! │  NodeCache       │  Node codec          │
//! │  (btree::cache)  │  (btree::node)       │
//! ├──────────────────┴──────────────────────┤
//! │  Free-page allocator │ DirHeader        │
//! │  (storage::allocator)│ (storage)        │
//! ├─────────────────────────────────────────┤
//! │  PagedStream (storage::stream or the    │
//! │  encrypted stream layer below)          │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Contract with the Enclosing Filesystem
//!
//! - One directory instance is driven by one thread at a time; the caller
//!   holds a per-directory exclusive lock across engine calls.
//! - The four header scalars live in the filesystem's own metadata, not in
//!   the paged stream; persist [`DirHeader`] alongside it.
//! - Operations are not crash-atomic. On reopen, run
//!   `validate_btree_structure` and `validate_free_list` and refuse to
//!   mount a directory that fails either.
//! - Filename ordering is injected. Pick the comparator from the header
//!   flags ([`BtreeDirectory::open`] does) and never change it for an
//!   existing tree.
//!
//! ## Module Overview
//!
//! - [`btree`]: node codec, node cache, and the B-tree engine
//! - [`storage`]: paged stream trait and implementations, free-page
//!   allocator, directory header
//! - [`comparator`]: the four filename orderings
//! - [`config`]: on-disk format constants
//! - [`error`]: typed failure kinds

#[macro_use]
mod macros;

pub mod btree;
pub mod comparator;
pub mod config;
pub mod error;
pub mod storage;

pub use btree::{BtreeDirectory, DirEntry, Node, NodeCache};
pub use comparator::{
    comparator_for_flags, BinaryNameComparator, CaseFoldComparator, CaseFoldNfcComparator,
    NameComparator, NfcComparator,
};
pub use error::DirError;
pub use storage::{DirHeader, FileStream, MemoryStream, PagedStream};
