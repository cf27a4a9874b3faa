//! Lock primitives living inside shared words.
//!
//! Both locks are plain state machines over one or two words of a
//! [`SharedRegion`], driven by compare-and-swap and the region's
//! wait/notify queue. Neither tracks ownership: releasing a lock that is
//! not held logs a warning and still forces the transition, so a single
//! misbehaving caller cannot wedge every other thread.
//!
//! Readers register in the reader count before inspecting the state word
//! and a writer drains that count after winning the state word, so a
//! reader racing the last reader's release can never overlap a writer.
//!
//! ```text
//! SpinLock   word 0: UNLOCKED(0) <-> LOCKED(1)
//! RwLock     word 0: UNLOCKED(0) <-> READ(1) | WRITE(2)
//!            word 1: active reader count
//! ```

use std::hint;

use crate::region::{SharedRegion, WaitStrategy};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;
const READ_LOCKED: u32 = 1;
const WRITE_LOCKED: u32 = 2;

#[inline]
fn park(region: &SharedRegion, index: usize, observed: u32, strategy: WaitStrategy) {
    match strategy {
        WaitStrategy::Block => region.wait(index, observed),
        WaitStrategy::Spin => hint::spin_loop(),
    }
}

// ── SpinLock ───────────────────────────────────────────────────────

/// Binary lock over one shared word.
#[derive(Clone, Copy, Debug)]
pub struct SpinLock<'a> {
    region: &'a SharedRegion,
    index: usize,
    strategy: WaitStrategy,
}

impl<'a> SpinLock<'a> {
    /// Words a spinlock occupies.
    pub const WORDS: usize = 1;

    /// A lock handle over word `index` of `region`.
    pub fn new(region: &'a SharedRegion, index: usize) -> Self {
        Self {
            region,
            index,
            strategy: WaitStrategy::Block,
        }
    }

    /// Use `strategy` while contended.
    pub fn with_strategy(mut self, strategy: WaitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Acquire, looping until this caller moved the word UNLOCKED -> LOCKED.
    pub fn lock(&self) {
        loop {
            let prev = self.region.compare_exchange(self.index, UNLOCKED, LOCKED);
            if prev == UNLOCKED {
                return;
            }
            park(self.region, self.index, prev, self.strategy);
        }
    }

    /// Try to acquire without waiting.
    pub fn try_lock(&self) -> bool {
        self.region.compare_exchange(self.index, UNLOCKED, LOCKED) == UNLOCKED
    }

    /// Release and wake waiters.
    pub fn unlock(&self) {
        let prev = self.region.compare_exchange(self.index, LOCKED, UNLOCKED);
        if prev != LOCKED {
            tracing::warn!(word = self.index, state = prev, "unlocking a spinlock that was not locked");
            self.region.store(self.index, UNLOCKED);
        }
        self.region.notify_all();
    }

    /// Whether the word currently reads LOCKED.
    pub fn is_locked(&self) -> bool {
        self.region.load(self.index) == LOCKED
    }

    /// Acquire and return a guard that releases on drop.
    pub fn guard(&self) -> SpinLockGuard<'a> {
        self.lock();
        SpinLockGuard { lock: *self }
    }
}

/// Holds a [`SpinLock`] until dropped.
#[derive(Debug)]
#[must_use = "dropping the guard releases the lock immediately"]
pub struct SpinLockGuard<'a> {
    lock: SpinLock<'a>,
}

impl Drop for SpinLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

// ── RwLock ─────────────────────────────────────────────────────────

/// Readers-writer lock over two shared words (state, reader count).
#[derive(Clone, Copy, Debug)]
pub struct RwLock<'a> {
    region: &'a SharedRegion,
    index: usize,
    strategy: WaitStrategy,
}

impl<'a> RwLock<'a> {
    /// Words a readers-writer lock occupies.
    pub const WORDS: usize = 2;

    /// A lock handle over words `index` and `index + 1` of `region`.
    pub fn new(region: &'a SharedRegion, index: usize) -> Self {
        Self {
            region,
            index,
            strategy: WaitStrategy::Block,
        }
    }

    /// Use `strategy` while contended.
    pub fn with_strategy(mut self, strategy: WaitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[inline]
    fn readers_index(&self) -> usize {
        self.index + 1
    }

    /// Enter shared mode, waiting while a writer holds the lock.
    ///
    /// The reader registers in the count before inspecting the state, so a
    /// writer that wins the state word still drains it before entering.
    pub fn read_lock(&self) {
        loop {
            self.region.fetch_add(self.readers_index(), 1);
            let prev = self
                .region
                .compare_exchange(self.index, UNLOCKED, READ_LOCKED);
            if prev != WRITE_LOCKED {
                return;
            }
            self.region.fetch_sub(self.readers_index(), 1);
            self.region.notify_all();
            park(self.region, self.index, WRITE_LOCKED, self.strategy);
        }
    }

    /// Enter exclusive mode, waiting until the lock is fully released.
    pub fn write_lock(&self) {
        loop {
            let prev = self
                .region
                .compare_exchange(self.index, UNLOCKED, WRITE_LOCKED);
            if prev == UNLOCKED {
                break;
            }
            park(self.region, self.index, prev, self.strategy);
        }
        // Readers that registered before the state flipped finish first.
        loop {
            let readers = self.region.load(self.readers_index());
            if readers == 0 {
                return;
            }
            park(self.region, self.readers_index(), readers, self.strategy);
        }
    }

    /// Leave shared mode; the last reader out unlocks and notifies.
    pub fn read_unlock(&self) {
        let prev_readers = self.region.fetch_sub(self.readers_index(), 1);
        if prev_readers == 0 {
            tracing::warn!(word = self.index, "read unlock with no active readers");
            self.region.store(self.readers_index(), 0);
        }
        if prev_readers <= 1 {
            // Fails harmlessly when a writer already owns the state word.
            self.region.compare_exchange(self.index, READ_LOCKED, UNLOCKED);
            self.region.notify_all();
        }
    }

    /// Leave exclusive mode and notify.
    pub fn write_unlock(&self) {
        let prev = self
            .region
            .compare_exchange(self.index, WRITE_LOCKED, UNLOCKED);
        if prev != WRITE_LOCKED {
            tracing::warn!(word = self.index, state = prev, "unlocking a lock that was not write locked");
            self.region.store(self.index, UNLOCKED);
        }
        self.region.notify_all();
    }

    /// Number of readers currently inside.
    pub fn reader_count(&self) -> u32 {
        self.region.load(self.readers_index())
    }

    /// Acquire shared mode with a guard.
    pub fn read(&self) -> ReadGuard<'a> {
        self.read_lock();
        ReadGuard { lock: *self }
    }

    /// Acquire exclusive mode with a guard.
    pub fn write(&self) -> WriteGuard<'a> {
        self.write_lock();
        WriteGuard { lock: *self }
    }
}

/// Holds shared mode of a [`RwLock`] until dropped.
#[derive(Debug)]
#[must_use = "dropping the guard releases the lock immediately"]
pub struct ReadGuard<'a> {
    lock: RwLock<'a>,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.read_unlock();
    }
}

/// Holds exclusive mode of a [`RwLock`] until dropped.
#[derive(Debug)]
#[must_use = "dropping the guard releases the lock immediately"]
pub struct WriteGuard<'a> {
    lock: RwLock<'a>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.write_unlock();
    }
}
