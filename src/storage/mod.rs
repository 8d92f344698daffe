//! # Storage Module
//!
//! The foundation under the directory B-tree: a block-oriented view of the
//! directory's backing stream, the free-page allocator threaded through that
//! stream, and the small header record tying both to the tree.
//!
//! ## Architecture Overview
//!
//! ```text
//! +--------------------------------------+
//! |        B-Tree Engine (btree)         |
//! +-------------------+------------------+
//! | Free-Page         |  Directory       |
//! | Allocator         |  Header          |
//! +-------------------+------------------+
//! |     PagedStream (FileStream /        |
//! |     MemoryStream / encrypted layer)  |
//! +--------------------------------------+
//! ```
//!
//! The stream below may be an encrypted sparse stream; nothing here assumes
//! more than block-aligned reads, writes and resizes. Each page of
//! [`BLOCK_SIZE`](crate::config::BLOCK_SIZE) bytes is either a live tree
//! node, a member of the free list, or beyond the end of the stream.

mod allocator;
mod headers;
mod stream;

pub use allocator::{
    allocate_page, deallocate_page, read_free_page, validate_free_list, write_free_page, FreePage,
};
pub use headers::DirHeader;
pub use stream::{FileStream, MemoryStream, PagedStream};
