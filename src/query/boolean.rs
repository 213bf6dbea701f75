//! Compound iterators: AND, OR, NOT.
//!
//! Each compound is itself a [`DocumentIterator`], so arbitrary boolean
//! trees compose from the same interface. Children are owned exclusively
//! by their parent and torn down with it; a query is cancelled by simply
//! dropping the tree.
//!
//! Construction and traversal are separate phases: children may be added
//! until the first `next()` / `skip_to()` call, after which the tree is
//! frozen and `add_child` is rejected.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{PilumError, Result};
use crate::query::iterator::{DocId, DocumentIterator, NO_MORE_DOCS};
use crate::query::statistics::SearchStatistics;

/// Intersection of two or more child iterators (leapfrog join).
///
/// A document matches iff every child can reach it. The laggard children
/// are repeatedly skipped to the maximum current position until all align;
/// the node is exhausted as soon as any child is. When traversal starts,
/// children are sorted by ascending `cost()` so the most selective child
/// leads the probe order.
///
/// Term-frequency policy: the sum of all children's frequencies at the
/// aligned document.
#[derive(Debug)]
pub struct AndIterator {
    /// Children, sorted by ascending cost once traversal starts.
    children: Vec<Box<dyn DocumentIterator>>,
    /// Current aligned document.
    current_doc: DocId,
    /// Whether the intersection is spent.
    exhausted: bool,
    /// Whether traversal has started.
    started: bool,
}

impl AndIterator {
    /// Create an empty conjunction; add children before traversal.
    ///
    /// Arity cannot be checked while children may still be added, so a
    /// tree left with exactly one child is rejected on the first `next()`
    /// or `skip_to()`. Prefer [`AndIterator::try_new`] when the child set
    /// is known up front; it rejects malformed arity at construction.
    pub fn new() -> Self {
        AndIterator {
            children: Vec::new(),
            current_doc: 0,
            exhausted: false,
            started: false,
        }
    }

    /// Create a conjunction from children.
    ///
    /// Zero children is the documented always-empty degenerate; exactly
    /// one child is a malformed tree and is rejected eagerly.
    pub fn try_new(children: Vec<Box<dyn DocumentIterator>>) -> Result<Self> {
        if children.len() == 1 {
            return Err(PilumError::query(
                "conjunction requires at least two children",
            ));
        }
        Ok(AndIterator {
            children,
            current_doc: 0,
            exhausted: false,
            started: false,
        })
    }

    /// Add a child. Only valid before traversal starts.
    pub fn add_child(&mut self, child: Box<dyn DocumentIterator>) -> Result<()> {
        if self.started {
            return Err(PilumError::invalid_operation(
                "add_child after traversal started",
            ));
        }
        self.children.push(child);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.started = true;
        if self.children.is_empty() {
            self.exhausted = true;
            return Ok(());
        }
        if self.children.len() == 1 {
            return Err(PilumError::query(
                "conjunction requires at least two children",
            ));
        }

        // Most selective child first
        self.children.sort_by_key(|child| child.cost());

        for child in &mut self.children {
            if !child.next()? {
                self.exhausted = true;
                return Ok(());
            }
        }
        self.align()
    }

    /// Leapfrog all children onto the same document.
    fn align(&mut self) -> Result<()> {
        loop {
            let mut max_doc = 0;
            for child in &self.children {
                let doc = child.doc();
                if doc == NO_MORE_DOCS {
                    self.exhausted = true;
                    return Ok(());
                }
                max_doc = max_doc.max(doc);
            }

            let mut all_aligned = true;
            for child in &mut self.children {
                if child.doc() < max_doc {
                    let landed = child.skip_to(max_doc)?;
                    if landed == NO_MORE_DOCS {
                        self.exhausted = true;
                        return Ok(());
                    }
                    if landed != max_doc {
                        all_aligned = false;
                    }
                }
            }

            if all_aligned {
                self.current_doc = max_doc;
                return Ok(());
            }
        }
    }
}

impl Default for AndIterator {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentIterator for AndIterator {
    fn doc(&self) -> DocId {
        if self.exhausted {
            NO_MORE_DOCS
        } else {
            self.current_doc
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if !self.started {
            self.start()?;
            return Ok(!self.exhausted);
        }

        // Advance the lead child, then realign the rest
        if !self.children[0].next()? {
            self.exhausted = true;
            return Ok(false);
        }
        self.align()?;
        Ok(!self.exhausted)
    }

    fn skip_to(&mut self, target: DocId) -> Result<DocId> {
        if self.exhausted {
            return Ok(NO_MORE_DOCS);
        }
        if !self.started {
            self.start()?;
            if self.exhausted {
                return Ok(NO_MORE_DOCS);
            }
        }
        if target <= self.current_doc && self.current_doc > 0 {
            return Ok(self.current_doc);
        }

        if self.children[0].skip_to(target)? == NO_MORE_DOCS {
            self.exhausted = true;
            return Ok(NO_MORE_DOCS);
        }
        self.align()?;
        Ok(self.doc())
    }

    fn term_freq(&self) -> u64 {
        if self.exhausted {
            return 0;
        }
        self.children.iter().map(|child| child.term_freq()).sum()
    }

    fn cost(&self) -> u64 {
        // Bounded by the most selective child
        self.children
            .iter()
            .map(|child| child.cost())
            .min()
            .unwrap_or(0)
    }

    fn collect_statistics(&self, stats: &mut SearchStatistics) {
        for child in &self.children {
            child.collect_statistics(stats);
        }
    }
}

/// Heap entry ordering children by their current document (min-heap).
#[derive(Debug)]
struct HeapEntry {
    iterator: Box<dyn DocumentIterator>,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.iterator.doc() == other.iterator.doc()
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: lower doc IDs come first
        other.iterator.doc().cmp(&self.iterator.doc())
    }
}

/// Union of two or more child iterators.
///
/// A min-heap keyed by each child's current document yields the next
/// match; every child positioned exactly at the emitted document is
/// advanced, so a document present in several children is emitted once.
///
/// Term-frequency policy: the sum of frequencies across the children
/// positioned at the current document.
#[derive(Debug)]
pub struct OrIterator {
    /// Children added before traversal starts.
    pending: Vec<Box<dyn DocumentIterator>>,
    /// Active children, ordered by current doc.
    heap: BinaryHeap<HeapEntry>,
    /// Exhausted children, retained for the statistics pass.
    spent: Vec<Box<dyn DocumentIterator>>,
    /// Current document.
    current_doc: DocId,
    /// Whether every child is exhausted.
    exhausted: bool,
    /// Whether traversal has started.
    started: bool,
}

impl OrIterator {
    /// Create an empty disjunction; add children before traversal.
    ///
    /// As with [`AndIterator::new`], single-child arity can only be
    /// rejected once traversal starts; prefer [`OrIterator::try_new`] for
    /// construction-time validation.
    pub fn new() -> Self {
        OrIterator {
            pending: Vec::new(),
            heap: BinaryHeap::new(),
            spent: Vec::new(),
            current_doc: 0,
            exhausted: false,
            started: false,
        }
    }

    /// Create a disjunction from children.
    ///
    /// Zero children is the documented always-empty degenerate; exactly
    /// one child is a malformed tree and is rejected eagerly.
    pub fn try_new(children: Vec<Box<dyn DocumentIterator>>) -> Result<Self> {
        if children.len() == 1 {
            return Err(PilumError::query(
                "disjunction requires at least two children",
            ));
        }
        let mut iter = OrIterator::new();
        iter.pending = children;
        Ok(iter)
    }

    /// Add a child. Only valid before traversal starts.
    pub fn add_child(&mut self, child: Box<dyn DocumentIterator>) -> Result<()> {
        if self.started {
            return Err(PilumError::invalid_operation(
                "add_child after traversal started",
            ));
        }
        self.pending.push(child);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.started = true;
        if self.pending.is_empty() {
            self.exhausted = true;
            return Ok(());
        }
        if self.pending.len() == 1 {
            return Err(PilumError::query(
                "disjunction requires at least two children",
            ));
        }

        for mut child in self.pending.drain(..) {
            if child.next()? {
                self.heap.push(HeapEntry { iterator: child });
            } else {
                self.spent.push(child);
            }
        }
        self.refresh_current();
        Ok(())
    }

    fn refresh_current(&mut self) {
        match self.heap.peek() {
            Some(entry) => {
                self.current_doc = entry.iterator.doc();
            }
            None => {
                self.current_doc = NO_MORE_DOCS;
                self.exhausted = true;
            }
        }
    }

    /// Advance every child positioned at the current document.
    fn advance_past_current(&mut self) -> Result<()> {
        let current_doc = self.current_doc;
        while let Some(entry) = self.heap.peek() {
            if entry.iterator.doc() != current_doc {
                break;
            }
            let mut entry = match self.heap.pop() {
                Some(entry) => entry,
                None => break,
            };
            if entry.iterator.next()? {
                self.heap.push(entry);
            } else {
                self.spent.push(entry.iterator);
            }
        }
        self.refresh_current();
        Ok(())
    }
}

impl Default for OrIterator {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentIterator for OrIterator {
    fn doc(&self) -> DocId {
        if self.exhausted {
            NO_MORE_DOCS
        } else if !self.started {
            0
        } else {
            self.current_doc
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if !self.started {
            self.start()?;
            return Ok(!self.exhausted);
        }

        self.advance_past_current()?;
        Ok(!self.exhausted)
    }

    fn skip_to(&mut self, target: DocId) -> Result<DocId> {
        if self.exhausted {
            return Ok(NO_MORE_DOCS);
        }
        if !self.started {
            self.start()?;
            if self.exhausted {
                return Ok(NO_MORE_DOCS);
            }
        }
        if target <= self.current_doc {
            return Ok(self.current_doc);
        }

        // Skip every child below the target, then recompute the min
        let mut reinsert = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.iterator.doc() >= target {
                break;
            }
            let mut entry = match self.heap.pop() {
                Some(entry) => entry,
                None => break,
            };
            if entry.iterator.skip_to(target)? != NO_MORE_DOCS {
                reinsert.push(entry);
            } else {
                self.spent.push(entry.iterator);
            }
        }
        for entry in reinsert {
            self.heap.push(entry);
        }

        self.refresh_current();
        Ok(self.doc())
    }

    fn term_freq(&self) -> u64 {
        if self.exhausted {
            return 0;
        }
        self.heap
            .iter()
            .filter(|entry| entry.iterator.doc() == self.current_doc)
            .map(|entry| entry.iterator.term_freq())
            .sum()
    }

    fn cost(&self) -> u64 {
        let pending: u64 = self.pending.iter().map(|child| child.cost()).sum();
        let active: u64 = self.heap.iter().map(|entry| entry.iterator.cost()).sum();
        let spent: u64 = self.spent.iter().map(|child| child.cost()).sum();
        pending + active + spent
    }

    fn collect_statistics(&self, stats: &mut SearchStatistics) {
        for child in &self.pending {
            child.collect_statistics(stats);
        }
        for entry in self.heap.iter() {
            entry.iterator.collect_statistics(stats);
        }
        for child in &self.spent {
            child.collect_statistics(stats);
        }
    }
}

/// Difference: documents matched by `base` and not by `excluded`.
///
/// The deletion-filtering pattern generalized to an arbitrary excluded
/// iterator: the excluded side is caught up with its own `skip_to`, and
/// while the two coincide the base advances.
#[derive(Debug)]
pub struct NotIterator {
    /// Documents must match this subtree.
    base: Box<dyn DocumentIterator>,
    /// Documents must not match this subtree.
    excluded: Box<dyn DocumentIterator>,
    /// Current document.
    current_doc: DocId,
    /// Whether the base is spent.
    exhausted: bool,
}

impl NotIterator {
    /// Create a difference iterator (base minus excluded).
    pub fn new(base: Box<dyn DocumentIterator>, excluded: Box<dyn DocumentIterator>) -> Self {
        NotIterator {
            base,
            excluded,
            current_doc: 0,
            exhausted: false,
        }
    }

    /// Settle on the first base document not present in the excluded set.
    /// The base is already positioned on a candidate when this is called.
    fn advance_past_excluded(&mut self) -> Result<bool> {
        loop {
            let doc = self.base.doc();
            if doc == NO_MORE_DOCS {
                self.exhausted = true;
                return Ok(false);
            }
            if self.excluded.doc() < doc {
                self.excluded.skip_to(doc)?;
            }
            if self.excluded.doc() == doc {
                if !self.base.next()? {
                    self.exhausted = true;
                    return Ok(false);
                }
                continue;
            }
            self.current_doc = doc;
            return Ok(true);
        }
    }
}

impl DocumentIterator for NotIterator {
    fn doc(&self) -> DocId {
        if self.exhausted {
            NO_MORE_DOCS
        } else {
            self.current_doc
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if !self.base.next()? {
            self.exhausted = true;
            return Ok(false);
        }
        self.advance_past_excluded()
    }

    fn skip_to(&mut self, target: DocId) -> Result<DocId> {
        if self.exhausted {
            return Ok(NO_MORE_DOCS);
        }
        if target <= self.current_doc && self.current_doc > 0 {
            return Ok(self.current_doc);
        }
        if self.base.skip_to(target)? == NO_MORE_DOCS {
            self.exhausted = true;
            return Ok(NO_MORE_DOCS);
        }
        self.advance_past_excluded()?;
        Ok(self.doc())
    }

    fn term_freq(&self) -> u64 {
        if self.exhausted {
            0
        } else {
            self.base.term_freq()
        }
    }

    fn cost(&self) -> u64 {
        self.base.cost()
    }

    // The excluded subtree contributes no matches, so it contributes no
    // scoring statistics either.
    fn collect_statistics(&self, stats: &mut SearchStatistics) {
        self.base.collect_statistics(stats);
    }
}
