//! Word-granular views into shared regions.

use std::fmt;
use std::sync::atomic::AtomicU32;

use shoal_core::{SharedRegion, Word};

/// A window of `len` words into a shared region.
///
/// Every access is an atomic SeqCst operation on the backing word, so a
/// view can be read and written from any thread. Indices are relative to
/// the start of the view.
#[derive(Clone, Copy)]
pub struct WordView<'a> {
    region: &'a SharedRegion,
    start: usize,
    len: usize,
}

impl<'a> WordView<'a> {
    pub(crate) fn new(region: &'a SharedRegion, start: usize, len: usize) -> Self {
        Self { region, start, len }
    }

    /// Length in words.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view covers no words.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Word index of the first element inside the backing region.
    pub fn region_offset(&self) -> usize {
        self.start
    }

    /// The backing words, for use with the pointer helpers in
    /// [`shoal_core::pointer`].
    pub fn atomics(&self) -> &'a [AtomicU32] {
        &self.region.words()[self.start..self.start + self.len]
    }

    #[inline]
    fn slot(&self, index: usize) -> usize {
        debug_assert!(
            index < self.len,
            "index {index} out of view of {} words",
            self.len
        );
        self.start + index
    }

    /// Load word `index`.
    #[inline]
    pub fn load(&self, index: usize) -> u32 {
        self.region.load(self.slot(index))
    }

    /// Store `value` at word `index`.
    #[inline]
    pub fn store(&self, index: usize, value: u32) {
        self.region.store(self.slot(index), value);
    }

    /// Load word `index` as `T`.
    #[inline]
    pub fn load_as<T: Word>(&self, index: usize) -> T {
        T::from_bits(self.load(index))
    }

    /// Store a `T` at word `index`.
    #[inline]
    pub fn store_as<T: Word>(&self, index: usize, value: T) {
        self.store(index, value.to_bits());
    }

    /// Compare-and-swap word `index`; returns the previous value.
    #[inline]
    pub fn compare_exchange(&self, index: usize, current: u32, new: u32) -> u32 {
        self.region.compare_exchange(self.slot(index), current, new)
    }

    /// Atomically add to word `index`; returns the previous value.
    #[inline]
    pub fn fetch_add(&self, index: usize, value: u32) -> u32 {
        self.region.fetch_add(self.slot(index), value)
    }

    /// Atomically subtract from word `index`; returns the previous value.
    #[inline]
    pub fn fetch_sub(&self, index: usize, value: u32) -> u32 {
        self.region.fetch_sub(self.slot(index), value)
    }

    /// Store `value` into every word.
    pub fn fill(&self, value: u32) {
        for index in 0..self.len {
            self.region.store(self.start + index, value);
        }
    }

    /// Copy `values` into the start of the view.
    pub fn copy_from<T: Word>(&self, values: &[T]) {
        debug_assert!(values.len() <= self.len);
        for (index, value) in values.iter().enumerate() {
            self.store_as(index, *value);
        }
    }

    /// Snapshot the view as raw words.
    pub fn to_vec(&self) -> Vec<u32> {
        (0..self.len).map(|index| self.load(index)).collect()
    }

    /// Snapshot the view as `T` values.
    pub fn to_vec_as<T: Word>(&self) -> Vec<T> {
        (0..self.len).map(|index| self.load_as(index)).collect()
    }

    /// Sub-window of `len` words starting at `offset`.
    ///
    /// Only debug builds check the window against this view.
    pub fn window(&self, offset: usize, len: usize) -> Self {
        debug_assert!(
            offset + len <= self.len,
            "window {offset}..{} exceeds view of {} words",
            offset + len,
            self.len
        );
        Self::new(self.region, self.start + offset, len)
    }
}

impl fmt::Debug for WordView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordView")
            .field("start", &self.start)
            .field("len", &self.len)
            .finish()
    }
}
