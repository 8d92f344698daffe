//! # Node Cache
//!
//! A write-back cache mapping page numbers to owned [`Node`]s. The tree
//! engine never holds node references across its own recursive steps;
//! it passes page numbers around and re-borrows from the cache at each use
//! site, so the cache is the single owner of every live node.
//!
//! ## Write-Back Discipline
//!
//! Mutating accessors on [`Node`] set the dirty flag; [`NodeCache::flush`]
//! encodes and writes every dirty node and clears the flags. The cache has
//! no size bound: a directory operation touches at most a few dozen nodes
//! (one path to a leaf plus rebalancing siblings), and the enclosing
//! filesystem flushes and clears between bursts of operations.
//!
//! ## Parent Hints
//!
//! [`NodeCache::get`] takes the page number the caller believes is the
//! node's parent. On a miss the freshly decoded node adopts the hint, since
//! parent back-edges are not persisted. On a hit the hint is checked
//! against the cached back-edge; a mismatch means two internal nodes claim
//! the same child, which is corruption, not a recoverable state.

use eyre::{ensure, Result};
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;

use crate::config::{BLOCK_SIZE, INVALID_PAGE};
use crate::storage::PagedStream;

use super::node::Node;

/// Process-local owner of the directory's in-memory nodes.
#[derive(Debug, Default)]
pub struct NodeCache {
    nodes: HashMap<u32, Node>,
}

impl NodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node at `num`, reading and decoding the page on a miss.
    ///
    /// `parent_hint` is the caller's idea of the node's parent, or
    /// [`INVALID_PAGE`] to skip the consistency check (used when the caller
    /// knows only that the node is resident).
    pub fn get<S: PagedStream>(
        &mut self,
        stream: &S,
        parent_hint: u32,
        num: u32,
    ) -> Result<&mut Node> {
        ensure!(
            num != INVALID_PAGE,
            corrupted!("attempted to load a node from the invalid page")
        );
        match self.nodes.entry(num) {
            Entry::Occupied(occupied) => {
                let node = occupied.into_mut();
                ensure!(
                    parent_hint == INVALID_PAGE || parent_hint == node.parent_page_number(),
                    corrupted!(
                        "page {num} is referenced by page {parent_hint} but cached under parent {}",
                        node.parent_page_number()
                    )
                );
                Ok(node)
            }
            Entry::Vacant(vacant) => {
                let mut block = [0u8; BLOCK_SIZE];
                let read = stream.read(&mut block, num as u64 * BLOCK_SIZE as u64)?;
                ensure!(
                    read == BLOCK_SIZE,
                    corrupted!("short read of node page {num}: {read} of {BLOCK_SIZE} bytes")
                );
                let node = Node::from_block(num, parent_hint, &block)?;
                Ok(vacant.insert(node))
            }
        }
    }

    /// Returns the cached node at `num` without touching the stream.
    pub fn peek(&self, num: u32) -> Option<&Node> {
        self.nodes.get(&num)
    }

    /// Mutable variant of [`peek`](Self::peek).
    pub fn peek_mut(&mut self, num: u32) -> Option<&mut Node> {
        self.nodes.get_mut(&num)
    }

    /// Installs a brand-new empty dirty node at `num`, replacing whatever
    /// stale entry might remain there. Used for freshly allocated pages,
    /// which are never decoded.
    pub fn insert_new(&mut self, parent: u32, num: u32) -> &mut Node {
        let mut node = Node::new(parent, num);
        node.mark_dirty();
        match self.nodes.entry(num) {
            Entry::Occupied(occupied) => {
                let slot = occupied.into_mut();
                *slot = node;
                slot
            }
            Entry::Vacant(vacant) => vacant.insert(node),
        }
    }

    /// Removes and returns the node at `num`, transferring ownership to the
    /// caller. Used when a node is dissolved into a sibling.
    pub fn take(&mut self, num: u32) -> Option<Node> {
        self.nodes.remove(&num)
    }

    /// Puts an owned node back, replacing any cached entry for its page.
    pub fn install(&mut self, node: Node) {
        self.nodes.insert(node.page_number(), node);
    }

    /// Drops the node at `num` without writing it back. Used after its page
    /// has been returned to the allocator.
    pub fn invalidate(&mut self, num: u32) {
        self.nodes.remove(&num);
    }

    /// Writes every dirty node back to the stream and clears the flags.
    pub fn flush<S: PagedStream>(&mut self, stream: &mut S) -> Result<()> {
        for node in self.nodes.values_mut() {
            if !node.is_dirty() {
                continue;
            }
            ensure!(
                node.page_number() != INVALID_PAGE,
                corrupted!("dirty node without a page number")
            );
            let mut block = [0u8; BLOCK_SIZE];
            node.to_block(&mut block)?;
            stream.write(&block, node.page_number() as u64 * BLOCK_SIZE as u64)?;
            node.clear_dirty();
        }
        Ok(())
    }

    /// Flushes, then drops every cached node.
    pub fn clear<S: PagedStream>(&mut self, stream: &mut S) -> Result<()> {
        self.flush(stream)?;
        self.nodes.clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over the cached nodes in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ID_SIZE;
    use crate::error::DirError;
    use crate::storage::{allocate_page, DirHeader, MemoryStream};

    use super::super::node::DirEntry;

    fn stream_with_pages(n: u32) -> MemoryStream {
        let mut stream = MemoryStream::new();
        let mut header = DirHeader::new();
        for _ in 0..n {
            allocate_page(&mut stream, &mut header).unwrap();
        }
        stream
    }

    fn named(name: &str) -> DirEntry {
        DirEntry {
            filename: name.to_owned(),
            id: [0u8; ID_SIZE],
            entry_type: 0,
        }
    }

    #[test]
    fn miss_reads_and_installs_with_hinted_parent() {
        let mut stream = stream_with_pages(2);
        let mut cache = NodeCache::new();

        let node = cache.insert_new(INVALID_PAGE, 1);
        node.entries_mut().push(named("a"));
        cache.flush(&mut stream).unwrap();
        cache.invalidate(1);

        let node = cache.get(&stream, 7, 1).unwrap();
        assert_eq!(node.parent_page_number(), 7);
        assert_eq!(node.entries().len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn hit_with_mismatched_parent_hint_is_corruption() {
        let stream = stream_with_pages(1);
        let mut cache = NodeCache::new();
        cache.insert_new(3, 0);

        assert!(cache.get(&stream, 3, 0).is_ok());
        assert!(cache.get(&stream, INVALID_PAGE, 0).is_ok());
        let err = cache.get(&stream, 4, 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DirError>(),
            Some(DirError::Corrupted { .. })
        ));
    }

    #[test]
    fn get_of_invalid_page_is_corruption() {
        let stream = stream_with_pages(1);
        let mut cache = NodeCache::new();
        assert!(cache.get(&stream, 0, INVALID_PAGE).is_err());
    }

    #[test]
    fn get_past_stream_end_is_corruption() {
        let stream = stream_with_pages(1);
        let mut cache = NodeCache::new();
        let err = cache.get(&stream, INVALID_PAGE, 5).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DirError>(),
            Some(DirError::Corrupted { .. })
        ));
    }

    #[test]
    fn flush_writes_dirty_nodes_and_clears_flags() {
        let mut stream = stream_with_pages(1);
        let mut cache = NodeCache::new();
        cache.insert_new(INVALID_PAGE, 0).entries_mut().push(named("z"));

        cache.flush(&mut stream).unwrap();
        assert!(cache.iter().all(|n| !n.is_dirty()));

        let mut block = [0u8; BLOCK_SIZE];
        stream.read(&mut block, 0).unwrap();
        let on_disk = Node::from_block(0, INVALID_PAGE, &block).unwrap();
        assert_eq!(on_disk.entries()[0].filename, "z");
    }

    #[test]
    fn invalidate_discards_unwritten_changes() {
        let mut stream = stream_with_pages(1);
        let mut cache = NodeCache::new();
        cache.insert_new(INVALID_PAGE, 0).entries_mut().push(named("gone"));
        cache.invalidate(0);

        cache.flush(&mut stream).unwrap();
        let mut block = [0u8; BLOCK_SIZE];
        stream.read(&mut block, 0).unwrap();
        assert_eq!(&block[0..4], &0u32.to_le_bytes(), "page was never written");
    }

    #[test]
    fn clear_flushes_then_empties() {
        let mut stream = stream_with_pages(1);
        let mut cache = NodeCache::new();
        cache.insert_new(INVALID_PAGE, 0).entries_mut().push(named("kept"));

        cache.clear(&mut stream).unwrap();
        assert!(cache.is_empty());

        let mut block = [0u8; BLOCK_SIZE];
        stream.read(&mut block, 0).unwrap();
        let on_disk = Node::from_block(0, INVALID_PAGE, &block).unwrap();
        assert_eq!(on_disk.entries()[0].filename, "kept");
    }

    #[test]
    fn take_and_install_round_trip_ownership() {
        let stream = stream_with_pages(1);
        let mut cache = NodeCache::new();
        cache.insert_new(INVALID_PAGE, 0);

        let mut node = cache.take(0).unwrap();
        assert!(cache.peek(0).is_none());
        node.entries_mut().push(named("back"));
        cache.install(node);

        assert_eq!(cache.get(&stream, INVALID_PAGE, 0).unwrap().entries().len(), 1);
    }
}
