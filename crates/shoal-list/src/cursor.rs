//! Traversal of a [`SharedList`] with optional deletion.

use std::fmt;
use std::marker::PhantomData;

use shoal_core::pointer::{load_pointer, store_pointer};
use shoal_core::{Pointer, Word};
use shoal_heap::{Allocation, WordView};

use crate::error::ListError;
use crate::list::{SharedList, HEAD, LENGTH, NEXT, NODE_HEADER_WORDS, TAIL};

/// One node reached by a traversal.
#[derive(Clone)]
pub struct Node<'h, T: Word> {
    allocation: Allocation<'h>,
    index: usize,
    width: u32,
    _kind: PhantomData<T>,
}

impl<'h, T: Word> Node<'h, T> {
    /// Position among the nodes the traversal has kept so far.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Pointer to the node.
    pub fn pointer(&self) -> Pointer {
        self.allocation.pointer()
    }

    /// Payload words.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The payload words, for atomic access in place.
    pub fn words(&self) -> WordView<'_> {
        self.allocation
            .view()
            .window(NODE_HEADER_WORDS as usize, self.width as usize)
    }

    /// Payload word `i`.
    pub fn get(&self, i: usize) -> T {
        self.words().load_as(i)
    }

    /// Overwrite payload word `i`.
    pub fn set(&self, i: usize, value: T) {
        self.words().store_as(i, value);
    }

    /// Snapshot of the payload.
    pub fn to_vec(&self) -> Vec<T> {
        self.words().to_vec_as()
    }
}

impl<T: Word> fmt::Debug for Node<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("index", &self.index)
            .field("pointer", &format_args!("{}", self.pointer()))
            .field("values", &self.to_vec())
            .finish()
    }
}

/// Head-to-tail traversal that can unlink the node it is on.
///
/// Deleting is not synchronised with other threads: no other thread may
/// insert into or delete from the list while a cursor deletes.
pub struct Cursor<'l, 'h, T: Word> {
    list: &'l SharedList<'h, T>,
    /// Last kept node; `None` while still at the header.
    prev: Option<Allocation<'h>>,
    current: Option<Allocation<'h>>,
    next: Pointer,
    index: usize,
    deleted: bool,
}

impl<'l, 'h, T: Word> Cursor<'l, 'h, T> {
    pub(crate) fn new(list: &'l SharedList<'h, T>) -> Self {
        Self {
            list,
            prev: None,
            current: None,
            next: list.head(),
            index: 0,
            deleted: false,
        }
    }

    /// Move to the next node.
    pub fn next_node(&mut self) -> Result<Option<Node<'h, T>>, ListError> {
        if let Some(current) = self.current.take() {
            if !self.deleted {
                self.prev = Some(current);
                self.index += 1;
            }
        }
        self.deleted = false;
        if self.next.is_null() {
            return Ok(None);
        }
        let allocation = self.list.node(self.next)?;
        self.next = load_pointer(allocation.view().atomics(), NEXT);
        self.current = Some(allocation.clone());
        Ok(Some(Node {
            allocation,
            index: self.index,
            width: self.list.width(),
            _kind: PhantomData,
        }))
    }

    /// Unlink and free the node the cursor is on.
    ///
    /// Returns `false` if there is no current node or it was already
    /// deleted. The next call to [`next_node`](Self::next_node) continues
    /// with the node that followed it.
    pub fn delete_current(&mut self) -> Result<bool, ListError> {
        if self.deleted {
            return Ok(false);
        }
        let Some(current) = self.current.as_ref() else {
            return Ok(false);
        };
        let header = self.list.header_view();
        match &self.prev {
            Some(prev) => store_pointer(prev.view().atomics(), NEXT, self.next),
            None => store_pointer(header.atomics(), HEAD, self.next),
        }
        if self.next.is_null() {
            let prev = self.prev.as_ref().map_or(Pointer::NULL, Allocation::pointer);
            store_pointer(header.atomics(), TAIL, prev);
        }
        if !self.list.heap().free(current.pointer()) {
            tracing::warn!(pointer = %current.pointer(), "list node was not live when deleted");
        }
        header.fetch_sub(LENGTH, 1);
        self.deleted = true;
        Ok(true)
    }
}

impl<T: Word> fmt::Debug for Cursor<'_, '_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("index", &self.index)
            .field("next", &format_args!("{}", self.next))
            .field("deleted", &self.deleted)
            .finish()
    }
}

/// Read-only traversal; yields an error and stops if a node cannot be
/// resolved in this heap view.
pub struct Iter<'l, 'h, T: Word> {
    cursor: Cursor<'l, 'h, T>,
    done: bool,
}

impl<'l, 'h, T: Word> Iter<'l, 'h, T> {
    pub(crate) fn new(list: &'l SharedList<'h, T>) -> Self {
        Self {
            cursor: Cursor::new(list),
            done: false,
        }
    }
}

impl<'h, T: Word> Iterator for Iter<'_, 'h, T> {
    type Item = Result<Node<'h, T>, ListError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.cursor.next_node().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}
