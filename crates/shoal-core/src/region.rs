//! Fixed-size shared word regions with a wait/notify queue.
//!
//! A [`SharedRegion`] is the unit of memory every thread maps: a boxed
//! slice of `AtomicU32` words. Threads share a region by cloning its
//! `Arc`; all access goes through atomic word operations, so no view of
//! a region ever needs `unsafe`.
//!
//! Byte addresses used by the allocator are always multiples of four and
//! map to word `addr >> 2` (see [`word_index`]). Word operations are
//! sequentially consistent, matching the ordering the lock protocols
//! built on top of them rely on.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Bytes per shared word.
pub const WORD_BYTES: u32 = 4;

/// Convert a byte address inside a region to its word index.
#[inline]
pub const fn word_index(byte_addr: u32) -> usize {
    (byte_addr >> 2) as usize
}

/// How a lock handle waits while contended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Park the thread on the region's wait queue until notified.
    #[default]
    Block,
    /// Busy-spin with a CPU hint; for contexts that must never park.
    Spin,
}

/// One fixed-size region of shared memory.
///
/// The wait queue plays the role of a futex keyed by the region: waiters
/// re-check their word under the queue mutex before parking, and every
/// notify takes the same mutex, so a notify issued after a state change
/// cannot slip between a waiter's check and its park.
pub struct SharedRegion {
    words: Box<[AtomicU32]>,
    wait_mutex: Mutex<()>,
    wait_condvar: Condvar,
}

impl SharedRegion {
    /// Allocate a zero-filled region of `byte_len` bytes.
    ///
    /// `byte_len` is rounded down to a whole number of words.
    pub fn new(byte_len: u32) -> Self {
        let words = (0..byte_len / WORD_BYTES)
            .map(|_| AtomicU32::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            words,
            wait_mutex: Mutex::new(()),
            wait_condvar: Condvar::new(),
        }
    }

    /// Allocate a region and wrap it for sharing.
    pub fn new_shared(byte_len: u32) -> Arc<Self> {
        Arc::new(Self::new(byte_len))
    }

    /// All words of the region.
    #[inline]
    pub fn words(&self) -> &[AtomicU32] {
        &self.words
    }

    /// Number of words in the region.
    #[inline]
    pub fn word_len(&self) -> usize {
        self.words.len()
    }

    /// Length of the region in bytes.
    #[inline]
    pub fn byte_len(&self) -> u32 {
        self.words.len() as u32 * WORD_BYTES
    }

    /// Atomically load word `index`.
    #[inline]
    pub fn load(&self, index: usize) -> u32 {
        self.words[index].load(Ordering::SeqCst)
    }

    /// Atomically store `value` into word `index`.
    #[inline]
    pub fn store(&self, index: usize, value: u32) {
        self.words[index].store(value, Ordering::SeqCst);
    }

    /// Compare-and-swap word `index`; returns the previous value.
    #[inline]
    pub fn compare_exchange(&self, index: usize, current: u32, new: u32) -> u32 {
        match self.words[index].compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(prev) | Err(prev) => prev,
        }
    }

    /// Atomically add to word `index`; returns the previous value.
    #[inline]
    pub fn fetch_add(&self, index: usize, value: u32) -> u32 {
        self.words[index].fetch_add(value, Ordering::SeqCst)
    }

    /// Atomically subtract from word `index`; returns the previous value.
    #[inline]
    pub fn fetch_sub(&self, index: usize, value: u32) -> u32 {
        self.words[index].fetch_sub(value, Ordering::SeqCst)
    }

    /// Block while word `index` still holds `expected`.
    ///
    /// Returns immediately if the word has already changed. Spurious
    /// wake-ups are possible; callers re-check their condition in a loop.
    pub fn wait(&self, index: usize, expected: u32) {
        let mut guard = self.wait_mutex.lock();
        if self.load(index) == expected {
            self.wait_condvar.wait(&mut guard);
        }
    }

    /// Wake every thread parked on this region.
    ///
    /// The queue is shared by all words of the region, so waiters for
    /// unrelated words wake too and simply re-check.
    pub fn notify_all(&self) {
        let _guard = self.wait_mutex.lock();
        self.wait_condvar.notify_all();
    }

    /// Copy `len` words from `src` to `dst` (overlap-safe, word by word).
    pub fn copy_words(&self, src: usize, dst: usize, len: usize) {
        if dst < src {
            for i in 0..len {
                self.store(dst + i, self.load(src + i));
            }
        } else {
            for i in (0..len).rev() {
                self.store(dst + i, self.load(src + i));
            }
        }
    }

    /// Zero `len` words starting at `start`.
    pub fn zero_words(&self, start: usize, len: usize) {
        for word in &self.words[start..start + len] {
            word.store(0, Ordering::Relaxed);
        }
        std::sync::atomic::fence(Ordering::Release);
    }
}

impl fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRegion")
            .field("byte_len", &self.byte_len())
            .finish_non_exhaustive()
    }
}
