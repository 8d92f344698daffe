//! # Directory B-Tree Engine
//!
//! The full-format directory stores its entries in a B-tree whose nodes
//! each occupy one page of the backing stream. This module implements the
//! tree operations: lookup, insertion with split propagation, removal with
//! merge and rotation, traversal, structural validation and a Graphviz
//! dump for diagnostics.
//!
//! ## Architecture Overview
//!
//! ```text
//! BtreeDirectory
//! ├── stream:     PagedStream      (block I/O, possibly encrypted below)
//! ├── header:     DirHeader        (root page, free list head and length)
//! ├── cache:      NodeCache        (owns every resident node)
//! └── comparator: NameComparator   (total order over filenames)
//! ```
//!
//! Engine routines pass page numbers between each other and re-borrow the
//! node from the cache at every use site. Nothing holds a node reference
//! across a call that might load, evict or allocate, so re-entrant cache
//! lookups cannot invalidate anything.
//!
//! ## Insertion
//!
//! ```text
//! 1. Descend to the leaf where the name belongs (binary search per node)
//! 2. Insert the entry in sorted position
//! 3. While a node exceeds the entry limit:
//!    - allocate a sibling page, move the upper half of entries (and
//!      children) there
//!    - promote the median entry into the parent, with the sibling as the
//!      new right child
//!    - at the root, grow a new root holding just the promoted entry
//! ```
//!
//! ## Removal
//!
//! ```text
//! 1. Locate the entry
//! 2. In an internal node, overwrite the slot with its in-order
//!    predecessor (rightmost entry of the left subtree), popped from its
//!    leaf
//! 3. From the affected leaf upward, while a non-root node is below the
//!    minimum fill:
//!    - if it and a neighbouring sibling fit in one node: merge them,
//!      pulling the separator down from the parent
//!    - otherwise: redistribute entries evenly between the two, rotating
//!      the new median into the separator slot
//! 4. A root left with no entries and one child hands the root role to
//!    that child and frees its own page
//! ```
//!
//! ## Failure Model
//!
//! Operations are synchronous and not crash-atomic; a fault mid-operation
//! can leave the stream reflecting a partially rewritten tree. The
//! validators exist so the enclosing filesystem can refuse to mount such a
//! directory. Detected inconsistencies abort the operation with
//! [`DirError::Corrupted`]; the cache is left as-is and the instance must
//! be discarded.

use std::cmp::Ordering;
use std::io::Write;

use eyre::{bail, ensure, Result};
use tracing::debug;

use crate::comparator::{comparator_for_flags, NameComparator};
use crate::config::{BTREE_MAX_DEPTH, ID_SIZE, INVALID_PAGE, MAX_FILENAME_LENGTH, MAX_NUM_ENTRIES};
use crate::error::DirError;
use crate::storage::{allocate_page, deallocate_page, validate_free_list, DirHeader, PagedStream};

use super::cache::NodeCache;
use super::node::{ChildVec, DirEntry, Node};

/// Binary search over a node's sorted entries. Returns the index of the
/// first entry not less than `name` and whether it is an exact match.
fn lower_bound(cmp: &dyn NameComparator, entries: &[DirEntry], name: &str) -> (usize, bool) {
    let index = entries.partition_point(|e| cmp.compare(&e.filename, name) == Ordering::Less);
    let found = entries
        .get(index)
        .is_some_and(|e| cmp.compare(&e.filename, name) == Ordering::Equal);
    (index, found)
}

/// The full-format directory: a paged B-tree over an opaque stream.
pub struct BtreeDirectory<S: PagedStream> {
    stream: S,
    header: DirHeader,
    cache: NodeCache,
    comparator: Box<dyn NameComparator>,
    max_entries: usize,
}

impl<S: PagedStream> BtreeDirectory<S> {
    /// Builds a directory over `stream` with an explicitly chosen
    /// comparator. The comparator must match the one the tree was written
    /// under; [`open`](Self::open) derives it from the header instead.
    pub fn new(stream: S, header: DirHeader, comparator: Box<dyn NameComparator>) -> Self {
        Self {
            stream,
            header,
            cache: NodeCache::new(),
            comparator,
            max_entries: MAX_NUM_ENTRIES,
        }
    }

    /// Builds a directory whose comparator is selected by the header's
    /// format flags.
    pub fn open(stream: S, header: DirHeader) -> Self {
        let comparator = comparator_for_flags(header.flags());
        Self::new(stream, header, comparator)
    }

    /// Lowers the per-node entry limit. Intended for tests that need deep
    /// trees from few entries; the on-disk format is unaffected because
    /// node counts are explicit in every block.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.clamp(4, MAX_NUM_ENTRIES);
        self
    }

    pub fn header(&self) -> &DirHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut DirHeader {
        &mut self.header
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn cache(&self) -> &NodeCache {
        &self.cache
    }

    fn min_entries(&self) -> usize {
        self.max_entries / 2
    }

    fn check_name(&self, name: &str) -> Result<()> {
        ensure!(
            name.len() <= MAX_FILENAME_LENGTH,
            DirError::name_too_long(name.len(), MAX_FILENAME_LENGTH)
        );
        Ok(())
    }

    fn load(&mut self, parent_hint: u32, num: u32) -> Result<&mut Node> {
        self.cache.get(&self.stream, parent_hint, num)
    }

    /// Descends from the root to the node owning `name`. Returns the node's
    /// page, the entry index (insertion point when absent) and whether the
    /// name was found; `None` when the tree has no root.
    fn find_node(&mut self, name: &str) -> Result<Option<(u32, usize, bool)>> {
        let root = self.header.root_page();
        if root == INVALID_PAGE {
            return Ok(None);
        }
        let mut parent = INVALID_PAGE;
        let mut num = root;
        for _ in 0..BTREE_MAX_DEPTH {
            let n = self.cache.get(&self.stream, parent, num)?;
            let (index, found) = lower_bound(&*self.comparator, n.entries(), name);
            if found {
                return Ok(Some((num, index, true)));
            }
            if n.is_leaf() {
                return Ok(Some((num, index, false)));
            }
            let children = n.children();
            let next = *children
                .get(index)
                .ok_or_else(|| corrupted!("node {num} lacks a child at slot {index}"))?;
            parent = num;
            num = next;
        }
        bail!(corrupted!(
            "lookup exceeded {BTREE_MAX_DEPTH} levels; the page graph contains a cycle"
        ))
    }

    /// Looks up `name`, returning its id and type.
    pub fn get_entry(&mut self, name: &str) -> Result<Option<([u8; ID_SIZE], u32)>> {
        self.check_name(name)?;
        match self.find_node(name)? {
            Some((num, index, true)) => {
                let n = self.load(INVALID_PAGE, num)?;
                let e = n.entry(index)?;
                Ok(Some((e.id, e.entry_type)))
            }
            _ => Ok(None),
        }
    }

    /// Inserts a new entry. Returns `false`, mutating nothing, when the
    /// name is already present under the directory's comparator.
    pub fn add_entry(&mut self, name: &str, id: [u8; ID_SIZE], entry_type: u32) -> Result<bool> {
        self.check_name(name)?;
        let entry = DirEntry {
            filename: name.to_owned(),
            id,
            entry_type,
        };
        match self.find_node(name)? {
            Some((_, _, true)) => Ok(false),
            None => {
                let page = allocate_page(&mut self.stream, &mut self.header)?;
                self.header.set_root_page(page);
                let root = self.cache.insert_new(INVALID_PAGE, page);
                root.entries_mut().push(entry);
                debug!(page, "created root node");
                Ok(true)
            }
            Some((leaf, _, false)) => {
                self.insert_and_balance(leaf, entry, INVALID_PAGE, 0)?;
                Ok(true)
            }
        }
    }

    /// Inserts `entry` into the node at `num` in sorted position, with
    /// `additional_child` (when valid) spliced in to its right, then splits
    /// upward while the node overflows. Assumes every ancestor of the node
    /// is resident, which holds because all callers descend from the root.
    fn insert_and_balance(
        &mut self,
        num: u32,
        entry: DirEntry,
        additional_child: u32,
        depth: usize,
    ) -> Result<()> {
        ensure!(
            depth < BTREE_MAX_DEPTH,
            corrupted!("split propagation exceeded {BTREE_MAX_DEPTH} levels")
        );

        let overflow = {
            let max_entries = self.max_entries;
            let n = self.cache.get(&self.stream, INVALID_PAGE, num)?;
            let (index, _) = lower_bound(&*self.comparator, n.entries(), &entry.filename);
            if additional_child != INVALID_PAGE && !n.is_leaf() {
                n.children_mut().insert(index + 1, additional_child);
            }
            n.entries_mut().insert(index, entry);
            n.entries().len() > max_entries
        };
        if !overflow {
            return Ok(());
        }

        let sibling_page = allocate_page(&mut self.stream, &mut self.header)?;
        let (parent, promoted, moved_entries, moved_children) = {
            let n = self.cache.get(&self.stream, INVALID_PAGE, num)?;
            let mid = n.entries().len() / 2;
            let moved_entries = n.entries_mut().split_off(mid + 1);
            let promoted = match n.entries_mut().pop() {
                Some(e) => e,
                None => bail!(corrupted!("split of node {num} found no median entry")),
            };
            let moved_children: ChildVec = if n.is_leaf() {
                ChildVec::new()
            } else {
                n.children_mut().drain(mid + 1..).collect()
            };
            (n.parent_page_number(), promoted, moved_entries, moved_children)
        };
        debug!(
            page = num,
            sibling = sibling_page,
            promoted = %promoted.filename,
            "split overflowing node"
        );

        self.reparent_resident_children(&moved_children, sibling_page);
        let sibling = self.cache.insert_new(parent, sibling_page);
        *sibling.entries_mut() = moved_entries;
        *sibling.children_mut() = moved_children;

        if parent == INVALID_PAGE {
            let root_page = allocate_page(&mut self.stream, &mut self.header)?;
            let root = self.cache.insert_new(INVALID_PAGE, root_page);
            root.children_mut().push(num);
            root.children_mut().push(sibling_page);
            root.entries_mut().push(promoted);
            self.header.set_root_page(root_page);
            self.set_resident_parent(num, root_page)?;
            self.set_resident_parent(sibling_page, root_page)?;
            debug!(page = root_page, "grew new root");
            Ok(())
        } else {
            self.insert_and_balance(parent, promoted, sibling_page, depth + 1)
        }
    }

    /// Removes `name`, returning its id and type when it was present.
    pub fn remove_entry(&mut self, name: &str) -> Result<Option<([u8; ID_SIZE], u32)>> {
        self.check_name(name)?;
        let (num, index) = match self.find_node(name)? {
            Some((num, index, true)) => (num, index),
            _ => return Ok(None),
        };
        let (id, entry_type) = {
            let n = self.load(INVALID_PAGE, num)?;
            let e = n.entry(index)?;
            (e.id, e.entry_type)
        };
        let leaf = self.replace_with_predecessor(num, index)?;
        self.balance_up(leaf, 0)?;
        Ok(Some((id, entry_type)))
    }

    /// Deletes the entry at `index` of the node at `num`. For a leaf that
    /// is a plain removal; for an internal node the slot is refilled with
    /// the in-order predecessor popped from the rightmost leaf of the left
    /// subtree. Returns the leaf that lost an entry.
    fn replace_with_predecessor(&mut self, num: u32, index: usize) -> Result<u32> {
        let first_child = {
            let n = self.load(INVALID_PAGE, num)?;
            if n.is_leaf() {
                let len = n.entries().len();
                ensure!(index < len, DirError::out_of_range(index, len));
                n.entries_mut().remove(index);
                return Ok(num);
            }
            let children_len = n.children().len();
            *n.children()
                .get(index)
                .ok_or_else(|| DirError::out_of_range(index, children_len))?
        };

        let mut parent_hint = num;
        let mut cur = first_child;
        let mut leaf = INVALID_PAGE;
        for _ in 0..BTREE_MAX_DEPTH {
            let (is_leaf, last_child) = {
                let c = self.cache.get(&self.stream, parent_hint, cur)?;
                (c.is_leaf(), c.children().last().copied())
            };
            if is_leaf {
                leaf = cur;
                break;
            }
            let next =
                last_child.ok_or_else(|| corrupted!("internal node {cur} has no children"))?;
            parent_hint = cur;
            cur = next;
        }
        ensure!(
            leaf != INVALID_PAGE,
            corrupted!("predecessor descent exceeded {BTREE_MAX_DEPTH} levels")
        );

        let predecessor = {
            let c = self.load(INVALID_PAGE, leaf)?;
            match c.entries_mut().pop() {
                Some(e) => e,
                None => bail!(corrupted!("leaf {leaf} empty while donating a predecessor")),
            }
        };
        let n = self.load(INVALID_PAGE, num)?;
        let len = n.entries().len();
        let slot = n
            .entries_mut()
            .get_mut(index)
            .ok_or_else(|| DirError::out_of_range(index, len))?;
        *slot = predecessor;
        Ok(leaf)
    }

    /// Restores the fill invariant from the node at `num` upward. Assumes
    /// every ancestor is resident.
    fn balance_up(&mut self, num: u32, depth: usize) -> Result<()> {
        ensure!(
            depth < BTREE_MAX_DEPTH,
            corrupted!("rebalancing exceeded {BTREE_MAX_DEPTH} levels")
        );

        let (parent, entry_count, child_count, only_child) = {
            let n = self.load(INVALID_PAGE, num)?;
            (
                n.parent_page_number(),
                n.entries().len(),
                n.children().len(),
                n.children().first().copied(),
            )
        };

        if parent == INVALID_PAGE && entry_count == 0 && child_count > 0 {
            ensure!(
                child_count == 1,
                corrupted!("drained root {num} still has {child_count} children")
            );
            let child = match only_child {
                Some(c) => c,
                None => bail!(corrupted!("drained root {num} lost its child")),
            };
            self.reparent_resident_children(&[child], INVALID_PAGE);
            self.header.set_root_page(child);
            self.drop_node(num)?;
            debug!(page = child, "collapsed root into its only child");
            return Ok(());
        }
        if parent == INVALID_PAGE || entry_count >= self.min_entries() {
            return Ok(());
        }

        let (separator_index, sibling) = self.find_sibling(parent, num)?;
        self.load(parent, sibling)?;

        let node_last = {
            let n = self.load(INVALID_PAGE, num)?;
            match n.entries().last() {
                Some(e) => e.filename.clone(),
                None => bail!(corrupted!("underfull node {num} has no entries to compare")),
            }
        };
        let (sibling_first, sibling_count) = {
            let s = self.load(INVALID_PAGE, sibling)?;
            match s.entries().first() {
                Some(e) => (e.filename.clone(), s.entries().len()),
                None => bail!(corrupted!("sibling {sibling} has no entries to compare")),
            }
        };
        let node_is_left =
            self.comparator.compare(&node_last, &sibling_first) == Ordering::Less;
        let (left, right) = if node_is_left {
            (num, sibling)
        } else {
            (sibling, num)
        };

        if entry_count + sibling_count < self.max_entries {
            self.merge(left, right, parent, separator_index)?;
        } else {
            self.rotate(left, right, parent, separator_index)?;
        }

        self.balance_up(parent, depth + 1)
    }

    /// Picks the rebalancing partner for the node at `num`: its right
    /// neighbour, or the left one when it is the last child. Returns the
    /// separator's index in the parent (always that of the left-hand child
    /// of the pair) and the sibling's page.
    fn find_sibling(&mut self, parent: u32, num: u32) -> Result<(usize, u32)> {
        let p = self
            .cache
            .peek(parent)
            .ok_or_else(|| corrupted!("parent {parent} not resident during rebalance"))?;
        let children = p.children();
        let position = children
            .iter()
            .position(|&c| c == num)
            .ok_or_else(|| corrupted!("node {num} missing from children of parent {parent}"))?;
        if position + 1 == children.len() {
            ensure!(
                position > 0,
                corrupted!("internal node {parent} has a single child")
            );
            Ok((position - 1, children[position - 1]))
        } else {
            Ok((position, children[position + 1]))
        }
    }

    /// Folds `right` into `left`, pulling the separator down from the
    /// parent, and frees `right`'s page.
    fn merge(&mut self, left: u32, right: u32, parent: u32, separator_index: usize) -> Result<()> {
        debug!(left, right, "merging sibling nodes");

        let separator = {
            let p = self.load(INVALID_PAGE, parent)?;
            let len = p.entries().len();
            ensure!(
                separator_index < len,
                DirError::out_of_range(separator_index, len)
            );
            let separator = p.entries_mut().remove(separator_index);
            let right_pos = p
                .children()
                .iter()
                .position(|&c| c == right)
                .ok_or_else(|| corrupted!("node {right} missing from children of {parent}"))?;
            p.children_mut().remove(right_pos);
            separator
        };

        let right_node = self
            .cache
            .take(right)
            .ok_or_else(|| corrupted!("node {right} not resident during merge"))?;
        let (right_entries, right_children) = right_node.into_contents();
        self.reparent_resident_children(&right_children, left);

        let l = self.load(INVALID_PAGE, left)?;
        l.entries_mut().push(separator);
        l.entries_mut().extend(right_entries);
        l.children_mut().extend(right_children);

        deallocate_page(&mut self.stream, &mut self.header, right)
    }

    /// Redistributes the combined entries of `left` and `right` evenly,
    /// rewriting the parent's separator with the new median. The parent's
    /// entry count is unchanged, so rebalancing stops here.
    fn rotate(&mut self, left: u32, right: u32, parent: u32, separator_index: usize) -> Result<()> {
        debug!(left, right, "rotating entries between siblings");

        let separator = {
            let p = self.load(INVALID_PAGE, parent)?;
            p.entry(separator_index)?.clone()
        };
        let mut right_node = self
            .cache
            .take(right)
            .ok_or_else(|| corrupted!("node {right} not resident during rotate"))?;

        let (new_separator, left_children, right_children) = {
            let l = self.load(INVALID_PAGE, left)?;

            let mut pooled =
                Vec::with_capacity(l.entries().len() + right_node.entries().len() + 1);
            pooled.append(l.entries_mut());
            pooled.push(separator);
            pooled.append(right_node.entries_mut());

            let middle = pooled.len() / 2;
            *right_node.entries_mut() = pooled.split_off(middle + 1);
            let new_separator = match pooled.pop() {
                Some(e) => e,
                None => bail!(corrupted!("rotation between {left} and {right} lost its median")),
            };
            *l.entries_mut() = pooled;

            if !l.children().is_empty() && !right_node.children().is_empty() {
                let mut children: ChildVec = ChildVec::new();
                children.extend(l.children_mut().drain(..));
                children.extend(right_node.children_mut().drain(..));
                *right_node.children_mut() = children.drain(middle + 1..).collect();
                *l.children_mut() = children;
                (
                    new_separator,
                    l.children().to_vec(),
                    right_node.children().to_vec(),
                )
            } else {
                (new_separator, Vec::new(), Vec::new())
            }
        };

        {
            let p = self.load(INVALID_PAGE, parent)?;
            let len = p.entries().len();
            let slot = p
                .entries_mut()
                .get_mut(separator_index)
                .ok_or_else(|| DirError::out_of_range(separator_index, len))?;
            *slot = new_separator;
        }

        self.cache.install(right_node);
        self.reparent_resident_children(&left_children, left);
        self.reparent_resident_children(&right_children, right);
        Ok(())
    }

    /// Updates the parent back-edge of every listed child that is resident.
    /// Children not in the cache pick up the correct parent from the hint
    /// when they are next read.
    fn reparent_resident_children(&mut self, children: &[u32], parent: u32) {
        for &child in children {
            if let Some(node) = self.cache.peek_mut(child) {
                node.set_parent_page_number(parent);
            }
        }
    }

    /// Sets the parent back-edge of a node that must be resident.
    fn set_resident_parent(&mut self, num: u32, parent: u32) -> Result<()> {
        match self.cache.peek_mut(num) {
            Some(node) => {
                node.set_parent_page_number(parent);
                Ok(())
            }
            None => bail!(corrupted!("node {num} not resident while repointing parent")),
        }
    }

    /// Discards a node and returns its page to the allocator.
    fn drop_node(&mut self, num: u32) -> Result<()> {
        self.cache.invalidate(num);
        deallocate_page(&mut self.stream, &mut self.header, num)
    }

    /// Calls `callback` for every entry. Order is unspecified.
    pub fn iterate<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(&str, &[u8; ID_SIZE], u32),
    {
        let root = self.header.root_page();
        if root == INVALID_PAGE {
            return Ok(());
        }
        self.iterate_node(root, INVALID_PAGE, 0, &mut callback)
    }

    fn iterate_node<F>(
        &mut self,
        num: u32,
        parent_hint: u32,
        depth: usize,
        callback: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&str, &[u8; ID_SIZE], u32),
    {
        ensure!(
            depth < BTREE_MAX_DEPTH,
            corrupted!("iteration exceeded {BTREE_MAX_DEPTH} levels")
        );
        let (entries, children) = {
            let n = self.cache.get(&self.stream, parent_hint, num)?;
            (n.entries().to_vec(), n.children().to_vec())
        };
        for e in &entries {
            callback(&e.filename, &e.id, e.entry_type);
        }
        for &child in &children {
            self.iterate_node(child, num, depth + 1, callback)?;
        }
        Ok(())
    }

    /// Whether the directory holds no entries.
    pub fn is_empty(&mut self) -> Result<bool> {
        let root = self.header.root_page();
        if root == INVALID_PAGE {
            return Ok(true);
        }
        let n = self.load(INVALID_PAGE, root)?;
        Ok(n.entries().is_empty() && n.is_leaf())
    }

    /// Writes all dirty nodes back to the stream and flushes it.
    pub fn flush(&mut self) -> Result<()> {
        self.cache.flush(&mut self.stream)?;
        self.stream.flush()
    }

    /// Flushes, then drops every cached node. The next operation starts
    /// from a cold cache.
    pub fn clear_cache(&mut self) -> Result<()> {
        self.cache.clear(&mut self.stream)?;
        self.stream.flush()
    }

    /// Checks the structural invariants of the tree: depth bound, sorted
    /// entries, fill limits of non-root nodes, and separators lying
    /// strictly between their adjacent subtrees. Read failures count as
    /// invalid.
    pub fn validate_btree_structure(&mut self) -> bool {
        let root = self.header.root_page();
        if root == INVALID_PAGE {
            return true;
        }
        matches!(self.validate_node(root, INVALID_PAGE, 0), Ok(true))
    }

    fn validate_node(&mut self, num: u32, parent_hint: u32, depth: usize) -> Result<bool> {
        if depth > BTREE_MAX_DEPTH {
            return Ok(false);
        }
        let (entries, children, is_root) = {
            let n = self.cache.get(&self.stream, parent_hint, num)?;
            (
                n.entries().to_vec(),
                n.children().to_vec(),
                n.parent_page_number() == INVALID_PAGE,
            )
        };

        for pair in entries.windows(2) {
            if self.comparator.compare(&pair[0].filename, &pair[1].filename) != Ordering::Less {
                return Ok(false);
            }
        }
        if !is_root && (entries.len() < self.min_entries() || entries.len() > self.max_entries) {
            return Ok(false);
        }
        if children.is_empty() {
            return Ok(true);
        }
        if children.len() != entries.len() + 1 {
            return Ok(false);
        }

        for &child in &children {
            if !self.validate_node(child, num, depth + 1)? {
                return Ok(false);
            }
        }

        for (i, separator) in entries.iter().enumerate() {
            let left_last = {
                let c = self.cache.get(&self.stream, num, children[i])?;
                c.entries().last().cloned()
            };
            let right_first = {
                let c = self.cache.get(&self.stream, num, children[i + 1])?;
                c.entries().first().cloned()
            };
            let (Some(left_last), Some(right_first)) = (left_last, right_first) else {
                return Ok(false);
            };
            if self
                .comparator
                .compare(&left_last.filename, &separator.filename)
                != Ordering::Less
            {
                return Ok(false);
            }
            if self
                .comparator
                .compare(&separator.filename, &right_first.filename)
                != Ordering::Less
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Checks the free list against the header scalars. Read failures
    /// count as invalid.
    pub fn validate_free_list(&mut self) -> bool {
        validate_free_list(&self.stream, &self.header)
    }

    /// Dumps the tree as a Graphviz digraph: solid edges from child to
    /// parent pages, dotted edges for the in-memory parent back-edges.
    /// Purely diagnostic.
    pub fn to_dot_graph<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        writeln!(writer, "digraph directory{{")?;
        writeln!(writer, "rankdir=BT;")?;
        let root = self.header.root_page();
        if root != INVALID_PAGE {
            self.write_dot_node(root, INVALID_PAGE, 0, writer)?;
        }
        writeln!(writer, "}}")?;
        Ok(())
    }

    fn write_dot_node<W: Write>(
        &mut self,
        num: u32,
        parent_hint: u32,
        depth: usize,
        writer: &mut W,
    ) -> Result<()> {
        ensure!(
            depth < BTREE_MAX_DEPTH,
            corrupted!("graph dump exceeded {BTREE_MAX_DEPTH} levels")
        );
        let (entries, children, parent) = {
            let n = self.cache.get(&self.stream, parent_hint, num)?;
            (
                n.entries().to_vec(),
                n.children().to_vec(),
                n.parent_page_number(),
            )
        };
        if parent != INVALID_PAGE {
            writeln!(writer, "    node{num} -> node{parent} [style=dotted];")?;
        }
        let mut label = String::new();
        for e in &entries {
            label.push_str(&e.filename);
            label.push_str("\\n");
        }
        writeln!(writer, "node{num} [label=\"node{num}:\\n\\n{label}\"];")?;
        for &child in &children {
            writeln!(writer, "    node{child} -> node{num};")?;
        }
        for &child in &children {
            self.write_dot_node(child, num, depth + 1, writer)?;
        }
        Ok(())
    }
}

impl<S: PagedStream> Drop for BtreeDirectory<S> {
    fn drop(&mut self) {
        // Errors here are unreportable; they resurface on the next explicit
        // flush of a fresh instance over the same stream.
        let _ = self.cache.flush(&mut self.stream);
        let _ = self.stream.flush();
    }
}
