//! The concurrent list.
//!
//! Header (4 words) and node layout:
//!
//! ```text
//! header: [ head | tail | length | kind tag (low 16) · width (high 16) ]
//! node:   [ next | payload 0 | … | payload width-1 ]
//! ```
//!
//! `head`, `tail` and `next` hold packed [`Pointer`]s. Inserts from any
//! number of threads are linearised by a compare-and-swap on `tail`.
//! The predecessor's `next` is written after that swap, so a traversal
//! racing an insert may miss the new node but never sees a broken chain.

use std::fmt;
use std::marker::PhantomData;

use shoal_core::pointer::{load_pointer, replace_pointer, store_pointer};
use shoal_core::{Pointer, Word};
use shoal_heap::{Allocation, Heap, SharedLocation, WordView};

use crate::config::ListConfig;
use crate::cursor::{Cursor, Iter, Node};
use crate::error::ListError;

/// Words in the list header.
pub const HEADER_WORDS: u32 = 4;

pub(crate) const HEAD: usize = 0;
pub(crate) const TAIL: usize = 1;
pub(crate) const LENGTH: usize = 2;
const KIND: usize = 3;

pub(crate) const NEXT: usize = 0;
pub(crate) const NODE_HEADER_WORDS: u32 = 1;

const TAG_MASK: u32 = 0xffff;
const WIDTH_SHIFT: u32 = 16;

/// Where a list's header lives; hand it to another heap view and
/// [`SharedList::open`] it there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SharedListMemory {
    /// Location of the header block.
    pub header: SharedLocation,
}

/// A singly linked list of fixed-width nodes of `T` words, stored in a
/// [`Heap`].
///
/// Insertion is safe from any number of threads at once. Deletion is
/// not: the caller must make sure no other thread inserts into or
/// deletes from the list while a deletion runs.
pub struct SharedList<'h, T: Word = u32> {
    heap: &'h Heap,
    header: Allocation<'h>,
    width: u32,
    _kind: PhantomData<T>,
}

impl<'h, T: Word> SharedList<'h, T> {
    /// Words in the list header.
    pub const HEADER_WORDS: u32 = HEADER_WORDS;

    /// Create an empty list of single-word nodes.
    pub fn new(heap: &'h Heap) -> Result<Self, ListError> {
        Self::with_config(heap, ListConfig::default())
    }

    /// Create an empty list.
    pub fn with_config(heap: &'h Heap, config: ListConfig) -> Result<Self, ListError> {
        config.validate()?;
        let header = match config.init_with {
            Some(location) => heap.resolve_sized(location, HEADER_WORDS)?,
            None => heap.allocate(HEADER_WORDS)?,
        };
        let view = header.view();
        view.store(HEAD, 0);
        view.store(TAIL, 0);
        view.store(LENGTH, 0);
        view.store(KIND, u32::from(T::TAG) | config.width << WIDTH_SHIFT);
        Ok(Self {
            heap,
            header,
            width: config.width,
            _kind: PhantomData,
        })
    }

    /// Open a list another view created.
    pub fn open(heap: &'h Heap, memory: SharedListMemory) -> Result<Self, ListError> {
        let header = heap.resolve_sized(memory.header, HEADER_WORDS)?;
        let kind = header.load(KIND);
        let found = (kind & TAG_MASK) as u16;
        if found != T::TAG {
            return Err(ListError::ElementKindMismatch {
                expected: T::TAG,
                found,
            });
        }
        Ok(Self {
            heap,
            header,
            width: (kind >> WIDTH_SHIFT).max(1),
            _kind: PhantomData,
        })
    }

    /// Location of the header, for [`SharedList::open`].
    pub fn shared_memory(&self) -> SharedListMemory {
        SharedListMemory {
            header: self.header.location(),
        }
    }

    /// The heap view this list allocates from.
    pub fn heap(&self) -> &'h Heap {
        self.heap
    }

    /// Payload words per node.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of linked nodes.
    pub fn len(&self) -> usize {
        self.header.load(LENGTH) as usize
    }

    /// Whether the list has no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a node holding `values`, zero padded to the list width.
    pub fn insert(&self, values: &[T]) -> Result<(), ListError> {
        if values.len() > self.width as usize {
            return Err(ListError::PayloadTooWide {
                len: values.len(),
                width: self.width,
            });
        }
        let node = self.heap.allocate(NODE_HEADER_WORDS + self.width)?;
        node.view()
            .window(NODE_HEADER_WORDS as usize, self.width as usize)
            .copy_from(values);
        let new = node.pointer();

        // Nothing after a successful swap may fail, so the old tail is
        // resolved first.
        let header = self.header_view();
        let previous = loop {
            let tail = load_pointer(header.atomics(), TAIL);
            let previous = if tail.is_null() {
                None
            } else {
                match self.node(tail) {
                    Ok(previous) => Some(previous),
                    Err(e) => {
                        tracing::trace!(%tail, "tail not resolvable in this view");
                        node.free();
                        return Err(e);
                    }
                }
            };
            if replace_pointer(header.atomics(), TAIL, new, tail) {
                break previous;
            }
        };
        match previous {
            Some(previous) => store_pointer(previous.view().atomics(), NEXT, new),
            None => store_pointer(header.atomics(), HEAD, new),
        }
        header.fetch_add(LENGTH, 1);
        Ok(())
    }

    /// Append a single value.
    pub fn push(&self, value: T) -> Result<(), ListError> {
        self.insert(&[value])
    }

    /// Read-only traversal from head to tail.
    pub fn iter(&self) -> Iter<'_, 'h, T> {
        Iter::new(self)
    }

    /// Traversal that can delete the node it is on.
    pub fn cursor(&self) -> Cursor<'_, 'h, T> {
        Cursor::new(self)
    }

    /// First payload word of every node.
    pub fn values(&self) -> Result<Vec<T>, ListError> {
        self.iter().map(|node| node.map(|node| node.get(0))).collect()
    }

    /// Full payload of every node.
    pub fn rows(&self) -> Result<Vec<Vec<T>>, ListError> {
        self.iter().map(|node| node.map(|node| node.to_vec())).collect()
    }

    /// Delete the first node `matches` accepts. Returns whether one was
    /// deleted.
    pub fn delete_match<F>(&self, mut matches: F) -> Result<bool, ListError>
    where
        F: FnMut(&Node<'h, T>) -> bool,
    {
        let mut cursor = self.cursor();
        while let Some(node) = cursor.next_node()? {
            if matches(&node) {
                return cursor.delete_current();
            }
        }
        Ok(false)
    }

    /// Delete the node at position `index`.
    pub fn delete_index(&self, index: usize) -> Result<bool, ListError> {
        if index >= self.len() {
            return Ok(false);
        }
        self.delete_match(|node| node.index() == index)
    }

    /// Delete the first node holding `values`.
    ///
    /// A single value is compared with the first payload word. Otherwise
    /// `values` must cover the whole payload.
    pub fn delete_value(&self, values: &[T]) -> Result<bool, ListError> {
        match values {
            [] => Ok(false),
            [value] => self.delete_match(|node| node.get(0) == *value),
            _ if values.len() != self.width as usize => Ok(false),
            _ => self.delete_match(|node| {
                let words = node.words();
                values
                    .iter()
                    .enumerate()
                    .all(|(i, value)| words.load_as::<T>(i) == *value)
            }),
        }
    }

    /// Delete every node `keep` rejects; returns how many were deleted.
    pub fn retain<F>(&self, mut keep: F) -> Result<usize, ListError>
    where
        F: FnMut(&Node<'h, T>) -> bool,
    {
        let mut cursor = self.cursor();
        let mut deleted = 0;
        while let Some(node) = cursor.next_node()? {
            if !keep(&node) && cursor.delete_current()? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Return every node and the header to the heap.
    pub fn free(self) -> Result<(), ListError> {
        let mut next = self.head();
        while !next.is_null() {
            let node = self.node(next)?;
            next = load_pointer(node.view().atomics(), NEXT);
            node.free();
        }
        tracing::trace!(header = %self.header.pointer(), "list freed");
        self.header.free();
        Ok(())
    }

    pub(crate) fn head(&self) -> Pointer {
        load_pointer(self.header_view().atomics(), HEAD)
    }

    pub(crate) fn header_view(&self) -> WordView<'_> {
        self.header.view()
    }

    pub(crate) fn node(&self, pointer: Pointer) -> Result<Allocation<'h>, ListError> {
        Ok(self
            .heap
            .resolve_sized(pointer.into(), NODE_HEADER_WORDS + self.width)?)
    }
}

impl<T: Word> fmt::Debug for SharedList<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedList")
            .field("header", &format_args!("{}", self.header.pointer()))
            .field("len", &self.len())
            .field("width", &self.width)
            .field("kind", &T::TAG)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_heap::HeapConfig;

    fn heap() -> Heap {
        Heap::new(HeapConfig::default()).unwrap()
    }

    #[test]
    fn insert_links_head_and_tail() {
        let heap = heap();
        let list = SharedList::<u32>::new(&heap).unwrap();
        assert!(list.is_empty());
        list.push(1).unwrap();
        list.push(2).unwrap();
        list.push(3).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.values().unwrap(), vec![1, 2, 3]);

        let header = list.header_view();
        let tail = load_pointer(header.atomics(), TAIL);
        let last = list.iter().last().unwrap().unwrap();
        assert_eq!(tail, last.pointer());
    }

    #[test]
    fn scenario_b_delete_by_index_and_value() {
        let heap = heap();
        let list = SharedList::<u32>::new(&heap).unwrap();
        let baseline = heap.current_used();
        for value in [5, 10, 4, 8, 20] {
            list.push(value).unwrap();
        }
        assert!(list.delete_index(2).unwrap());
        assert_eq!(list.values().unwrap(), vec![5, 10, 8, 20]);
        assert!(list.delete_value(&[5]).unwrap());
        assert_eq!(list.values().unwrap(), vec![10, 8, 20]);

        let mut cursor = list.cursor();
        while cursor.next_node().unwrap().is_some() {
            assert!(cursor.delete_current().unwrap());
        }
        assert_eq!(list.len(), 0);
        assert!(list.values().unwrap().is_empty());
        assert_eq!(heap.current_used(), baseline);
    }

    #[test]
    fn delete_last_moves_tail_back() {
        let heap = heap();
        let list = SharedList::<u32>::new(&heap).unwrap();
        for value in [1, 2, 3] {
            list.push(value).unwrap();
        }
        assert!(list.delete_index(2).unwrap());
        list.push(4).unwrap();
        assert_eq!(list.values().unwrap(), vec![1, 2, 4]);

        assert!(list.delete_index(0).unwrap());
        assert!(list.delete_index(0).unwrap());
        assert!(list.delete_index(0).unwrap());
        assert!(list.is_empty());
        list.push(9).unwrap();
        assert_eq!(list.values().unwrap(), vec![9]);
    }

    #[test]
    fn delete_misses_report_false() {
        let heap = heap();
        let list = SharedList::<u32>::new(&heap).unwrap();
        list.push(1).unwrap();
        assert!(!list.delete_index(1).unwrap());
        assert!(!list.delete_value(&[7]).unwrap());
        assert!(!list.delete_value(&[]).unwrap());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn cursor_double_delete_is_noop() {
        let heap = heap();
        let list = SharedList::<u32>::new(&heap).unwrap();
        list.push(1).unwrap();
        list.push(2).unwrap();
        let mut cursor = list.cursor();
        assert!(!cursor.delete_current().unwrap());
        cursor.next_node().unwrap();
        assert!(cursor.delete_current().unwrap());
        assert!(!cursor.delete_current().unwrap());
        let node = cursor.next_node().unwrap().unwrap();
        assert_eq!(node.get(0), 2);
        assert_eq!(node.index(), 0);
        assert_eq!(list.values().unwrap(), vec![2]);
    }

    #[test]
    fn wide_nodes_zero_pad() {
        let heap = heap();
        let list = SharedList::<u32>::with_config(&heap, ListConfig::new(3)).unwrap();
        list.insert(&[1, 2, 3]).unwrap();
        list.insert(&[4]).unwrap();
        assert_eq!(list.rows().unwrap(), vec![vec![1, 2, 3], vec![4, 0, 0]]);
        assert_eq!(
            list.insert(&[1, 2, 3, 4]).unwrap_err(),
            ListError::PayloadTooWide { len: 4, width: 3 }
        );
        assert!(!list.delete_value(&[4, 0]).unwrap());
        assert!(!list.delete_value(&[1, 2]).unwrap());
        assert_eq!(list.len(), 2);
        assert!(list.delete_value(&[4, 0, 0]).unwrap());
        assert!(list.delete_value(&[1]).unwrap());
        assert!(list.is_empty());
    }

    #[test]
    fn signed_and_float_kinds() {
        let heap = heap();
        let ints = SharedList::<i32>::new(&heap).unwrap();
        ints.push(-5).unwrap();
        ints.push(7).unwrap();
        assert_eq!(ints.values().unwrap(), vec![-5, 7]);

        let floats = SharedList::<f32>::with_config(&heap, ListConfig::new(2)).unwrap();
        floats.insert(&[0.5, -1.25]).unwrap();
        assert_eq!(floats.rows().unwrap(), vec![vec![0.5, -1.25]]);
    }

    #[test]
    fn open_checks_element_kind() {
        let heap = heap();
        let list = SharedList::<f32>::new(&heap).unwrap();
        list.push(1.0).unwrap();
        let memory = list.shared_memory();

        let reopened = SharedList::<f32>::open(&heap, memory).unwrap();
        assert_eq!(reopened.values().unwrap(), vec![1.0]);
        assert_eq!(
            SharedList::<u32>::open(&heap, memory).unwrap_err(),
            ListError::ElementKindMismatch {
                expected: 0,
                found: 2
            }
        );
    }

    #[test]
    fn init_with_uses_given_block() {
        let heap = heap();
        let block = heap.allocate(HEADER_WORDS).unwrap();
        let config = ListConfig {
            width: 2,
            init_with: Some(block.location()),
        };
        let list = SharedList::<u32>::with_config(&heap, config).unwrap();
        assert_eq!(list.shared_memory().header, block.location());
        list.insert(&[1, 2]).unwrap();
        assert_eq!(block.load(LENGTH), 1);
        assert_eq!(block.load(KIND) >> WIDTH_SHIFT, 2);
    }

    #[test]
    fn invalid_width_rejected() {
        let heap = heap();
        assert_eq!(
            SharedList::<u32>::with_config(&heap, ListConfig::new(0)).unwrap_err(),
            ListError::InvalidWidth { width: 0 }
        );
    }

    #[test]
    fn retain_keeps_order() {
        let heap = heap();
        let list = SharedList::<u32>::new(&heap).unwrap();
        for value in 0..10 {
            list.push(value).unwrap();
        }
        assert_eq!(list.retain(|node| node.get(0) % 3 == 0).unwrap(), 6);
        assert_eq!(list.values().unwrap(), vec![0, 3, 6, 9]);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn free_returns_all_memory() {
        let heap = heap();
        let baseline = heap.current_used();
        let list = SharedList::<u32>::with_config(&heap, ListConfig::new(2)).unwrap();
        for value in 0..20 {
            list.insert(&[value, value]).unwrap();
        }
        assert!(heap.current_used() > baseline);
        list.free().unwrap();
        assert_eq!(heap.current_used(), baseline);
    }
}
