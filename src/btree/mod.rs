//! # B-Tree Directory Module
//!
//! The full-format directory engine: node representation and block codec,
//! the write-back node cache, and the tree algorithms themselves.
//!
//! ## Node Layout
//!
//! Each node occupies one block. Entries are kept sorted under the
//! directory's injected comparator; an internal node with entries
//! `e[0..k]` has children `c[0..k+1]` with every key in subtree `c[i]`
//! strictly below `e[i]` and every key in `c[i+1]` strictly above.
//! Non-root nodes stay between half-full and full; all leaves sit at the
//! same depth.
//!
//! ## Ownership
//!
//! The [`NodeCache`] owns every resident node. Engine routines address
//! nodes by page number and re-borrow per use, so recursive descents and
//! rebalancing cannot hold dangling references across cache mutations.
//! Parent links are in-memory back-edges reconstructed from traversal
//! hints, never persisted.

mod cache;
mod node;
mod tree;

pub use cache::NodeCache;
pub use node::{ChildVec, DirEntry, Node};
pub use tree::BtreeDirectory;
