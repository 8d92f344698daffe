//! # Directory Engine Constants
//!
//! This module centralizes every numeric constant of the on-disk format,
//! grouping interdependent values together so that a change to one is checked
//! against the others at compile time.
//!
//! ## Dependency Graph
//!
//! ```text
//! BLOCK_SIZE (4096 bytes)
//!       │
//!       ├─> MAX_NUM_ENTRIES (derived: how many entries plus child pointers
//!       │     fit in one block after the node header)
//!       │
//!       └─> every stream offset (page p occupies [p*BLOCK_SIZE, (p+1)*BLOCK_SIZE))
//!
//! MAX_FILENAME_LENGTH (255 bytes)
//!       │
//!       └─> ENTRY_SIZE (derived: NUL-terminated name field + id + type)
//!             │
//!             └─> MAX_NUM_ENTRIES
//! ```
//!
//! ## Critical Invariants
//!
//! Enforced by compile-time assertions below:
//!
//! 1. `BLOCK_SIZE` is a power of two
//! 2. `MAX_NUM_ENTRIES >= 4` (the rebalancing algorithms assume a minimum
//!    fanout; smaller blocks would need a different node layout)
//! 3. A maximally full node, encoded, fits in one block

/// Size of one page of the underlying stream. All I/O issued by the engine
/// is aligned to this and a multiple of it.
pub const BLOCK_SIZE: usize = 4096;

/// Sentinel page number meaning "none". Used for absent roots, absent
/// parents, and free-list termination.
pub const INVALID_PAGE: u32 = u32::MAX;

/// Longest filename storable in a directory entry, exclusive of the trailing
/// NUL in the on-disk form.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Width of the opaque file identifier carried by each entry.
pub const ID_SIZE: usize = 32;

/// Bytes of node header preceding the child and entry arrays:
/// u32 flag + u16 child count + u16 entry count.
pub const NODE_HEADER_SIZE: usize = 8;

/// Encoded size of one directory entry: NUL-padded name field, id, type.
pub const ENTRY_SIZE: usize = MAX_FILENAME_LENGTH + 1 + ID_SIZE + 4;

/// Largest number of entries whose encoding, together with one more child
/// pointer than entries, fits in a single block.
pub const MAX_NUM_ENTRIES: usize = (BLOCK_SIZE - NODE_HEADER_SIZE - 4) / (ENTRY_SIZE + 4);

/// Upper bound on child pointers per node.
pub const MAX_NUM_CHILDREN: usize = MAX_NUM_ENTRIES + 1;

/// Depth limit enforced on every traversal. A well-formed tree of this depth
/// would hold far more entries than any directory; exceeding it means the
/// page graph contains a cycle.
pub const BTREE_MAX_DEPTH: usize = 32;

/// First 4 bytes of a free page.
pub const FREE_PAGE_FLAG: u32 = 0;

/// First 4 bytes of a page holding a live node.
pub const LIVE_NODE_FLAG: u32 = 1;

/// Header flag bit: filenames compare case-insensitively.
pub const FLAG_CASE_FOLD: u32 = 1 << 0;

/// Header flag bit: filenames compare under Unicode NFC normalization.
pub const FLAG_NFC: u32 = 1 << 1;

/// Size of the persisted header record (four u32 scalars).
pub const DIR_HEADER_SIZE: usize = 16;

const _: () = assert!(BLOCK_SIZE.is_power_of_two());
const _: () = assert!(MAX_NUM_ENTRIES >= 4);
const _: () = assert!(
    NODE_HEADER_SIZE + 4 * MAX_NUM_CHILDREN + ENTRY_SIZE * MAX_NUM_ENTRIES <= BLOCK_SIZE
);
const _: () = assert!(ENTRY_SIZE == 292);
