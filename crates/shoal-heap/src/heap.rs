//! The multi-arena heap.
//!
//! A heap is an ordered set of equally sized arenas. Allocation tries the
//! arenas in index order and adds a new arena when none has room. Views
//! of the same heap on other threads learn about new arenas through
//! growth listeners, and all views share one arena counter kept in a
//! metadata block at the start of arena 0:
//!
//! ```text
//! arena 0: [ state block | metadata: arena_size, arena_count | … ]
//! ```
//!
//! Growth claims the next index with an atomic increment of that counter,
//! so two views growing at once never hand out the same index.

use std::fmt;
use std::sync::{Arc, Weak};

use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use shoal_arena::{Arena, ArenaConfig, ArenaError};
use shoal_core::region::{word_index, WORD_BYTES};
use shoal_core::{Pointer, SharedRegion, MAX_ARENAS};

use crate::config::HeapConfig;
use crate::error::HeapError;
use crate::growth::{GrowthEvent, GrowthListener, GrowthListeners, Listening};
use crate::handle::{Allocation, SharedLocation};

/// Words in the metadata block at the head of arena 0.
pub(crate) const METADATA_WORDS: u32 = 2;

const META_ARENA_SIZE: usize = 0;
const META_ARENA_COUNT: usize = 1;

/// The regions of a heap, in arena-index order.
///
/// Hand this to another thread and call [`Heap::attach`] there to get a
/// second view of the same heap. Slots are `None` for arenas the
/// exporting view has not attached yet.
#[derive(Clone, Debug, Default)]
pub struct HeapTopology {
    /// Backing region of each arena.
    pub regions: Vec<Option<Arc<SharedRegion>>>,
}

impl HeapTopology {
    /// Number of arena slots.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the topology has no slots.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Used and total bytes across a heap view's arenas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Bytes not available for allocation.
    pub used: u64,
    /// Bytes of all attached regions.
    pub total: u64,
}

impl fmt::Display for MemoryUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", HumanBytes(self.used), HumanBytes(self.total))
    }
}

struct HumanBytes(u64);

impl fmt::Display for HumanBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
        if self.0 < 1024 {
            return write!(f, "{} B", self.0);
        }
        let mut value = self.0 as f64;
        let mut unit = 0;
        while value >= 1024.0 && unit + 1 < UNITS.len() {
            value /= 1024.0;
            unit += 1;
        }
        write!(f, "{value:.1} {}", UNITS[unit])
    }
}

/// One thread's view of a growable, shared heap.
///
/// Views are created with [`Heap::new`] (owner) or [`Heap::attach`]
/// (peer). Every view can allocate, free and grow; peers converge on the
/// same arena set as long as each view's growth events reach the others,
/// for instance via [`Heap::forward_growth_to`] or [`Heap::subscribe`].
pub struct Heap {
    arenas: RwLock<Vec<Option<Arena>>>,
    template: ArenaConfig,
    metadata: Arena,
    metadata_word: usize,
    listeners: GrowthListeners,
    attached: bool,
}

impl Heap {
    /// Create a heap with `config.initial_arenas` fresh arenas.
    pub fn new(config: HeapConfig) -> Result<Self, HeapError> {
        config.validate()?;
        let template = config.arena_config();
        let first = Arena::new(&template)?;
        let addr = first.calloc(METADATA_WORDS * WORD_BYTES);
        if addr == 0 {
            return Err(ArenaError::InsufficientRange {
                top: first.top(),
                end: first.end(),
            }
            .into());
        }
        let metadata_word = word_index(addr);
        let region = first.region();
        region.store(metadata_word + META_ARENA_SIZE, config.arena_size);
        region.store(metadata_word + META_ARENA_COUNT, config.initial_arenas);

        let mut arenas = Vec::with_capacity(config.initial_arenas as usize);
        arenas.push(Some(first.clone()));
        for _ in 1..config.initial_arenas {
            arenas.push(Some(Arena::new(&template)?));
        }
        tracing::debug!(
            arena_size = config.arena_size,
            initial_arenas = config.initial_arenas,
            "heap created"
        );
        Ok(Self {
            arenas: RwLock::new(arenas),
            template,
            metadata: first,
            metadata_word,
            listeners: GrowthListeners::default(),
            attached: false,
        })
    }

    /// Attach a new view to the heap described by `topology`.
    ///
    /// Arena size and block policy are read from arena 0.
    pub fn attach(topology: HeapTopology) -> Result<Self, HeapError> {
        let mut regions = topology.regions.into_iter();
        let first_region = regions.next().flatten().ok_or(HeapError::EmptyTopology)?;
        let first = Arena::attach(first_region, 0)?;
        let metadata_word = word_index(first.first_data_address());
        let template = ArenaConfig {
            size: first.region().load(metadata_word + META_ARENA_SIZE),
            start: 0,
            end: None,
            align: first.align(),
            compact: first.compacts(),
            split: first.splits(),
            min_split: first.min_split(),
        };
        template.validate()?;

        let mut arenas = vec![Some(first.clone())];
        for region in regions {
            arenas.push(region.map(|region| Arena::attach(region, 0)).transpose()?);
        }
        tracing::debug!(
            arena_size = template.size,
            arenas = arenas.len(),
            "heap view attached"
        );
        Ok(Self {
            arenas: RwLock::new(arenas),
            template,
            metadata: first,
            metadata_word,
            listeners: GrowthListeners::default(),
            attached: true,
        })
    }

    /// Regions of every arena this view knows, for [`Heap::attach`].
    pub fn topology(&self) -> HeapTopology {
        HeapTopology {
            regions: self
                .arenas
                .read()
                .iter()
                .map(|slot| slot.as_ref().map(|arena| Arc::clone(arena.region())))
                .collect(),
        }
    }

    /// Allocate `words` zeroed words.
    ///
    /// Arenas are tried in index order; when none has room the heap grows
    /// by one arena and retries there.
    pub fn allocate(&self, words: u32) -> Result<Allocation<'_>, HeapError> {
        if words == 0 {
            return Err(HeapError::ZeroSizedRequest);
        }
        let bytes = words
            .checked_mul(WORD_BYTES)
            .filter(|&bytes| self.metadata.padded_size(bytes).is_some())
            .ok_or(HeapError::RequestTooLarge {
                words,
                arena_size: self.template.size,
            })?;
        loop {
            if let Some(allocation) = self.allocate_existing(bytes, words) {
                return Ok(allocation);
            }
            let (index, arena) = self.grow()?;
            let addr = arena.calloc(bytes);
            if addr != 0 {
                return Ok(Allocation::new(self, arena, index, addr, words));
            }
            tracing::trace!(index, words, "new arena filled by another thread; rescanning");
        }
    }

    fn allocate_existing(&self, bytes: u32, words: u32) -> Option<Allocation<'_>> {
        let arenas = self.arenas.read();
        let found = arenas.iter().enumerate().find_map(|(index, slot)| {
            let arena = slot.as_ref()?;
            let addr = arena.calloc(bytes);
            (addr != 0).then(|| Allocation::new(self, arena.clone(), index as u32, addr, words))
        });
        if found.is_none() {
            tracing::trace!(words, arenas = arenas.len(), "no arena has room");
        }
        found
    }

    /// Claim the next arena index, create the arena and announce it.
    fn grow(&self) -> Result<(u32, Arena), HeapError> {
        let counter = self.metadata_word + META_ARENA_COUNT;
        let region = self.metadata.region();
        let index = region.fetch_add(counter, 1);
        if index >= MAX_ARENAS {
            region.fetch_sub(counter, 1);
            return Err(HeapError::ArenaIndexExhausted { max: MAX_ARENAS });
        }
        let arena = Arena::new(&self.template)?;
        self.install(index, arena.clone());
        tracing::debug!(index, arena_size = self.template.size, "heap grew");
        self.listeners.notify(&GrowthEvent {
            index,
            region: Arc::clone(arena.region()),
        });
        Ok((index, arena))
    }

    /// Put `arena` in slot `index` unless the slot is taken.
    fn install(&self, index: u32, arena: Arena) -> bool {
        let slot = index as usize;
        let mut arenas = self.arenas.write();
        if arenas.len() <= slot {
            arenas.resize(slot + 1, None);
        }
        if arenas[slot].is_some() {
            return false;
        }
        arenas[slot] = Some(arena);
        true
    }

    /// Attach an arena another view created. Returns `false` if this view
    /// already has an arena at `index`.
    ///
    /// Does not notify this view's growth listeners: the arena is not new
    /// to the heap, only to this view.
    pub fn add_shared_arena(
        &self,
        index: u32,
        region: Arc<SharedRegion>,
    ) -> Result<bool, HeapError> {
        if index >= MAX_ARENAS {
            return Err(HeapError::ArenaIndexExhausted { max: MAX_ARENAS });
        }
        let added = self.install(index, Arena::attach(region, 0)?);
        if added {
            tracing::debug!(index, "attached shared arena");
        } else {
            tracing::trace!(index, "shared arena already attached");
        }
        Ok(added)
    }

    /// Register a callback for every arena this view creates.
    ///
    /// The callback runs on the growing thread. It must not register
    /// listeners on, or grow, the heap that invoked it.
    pub fn on_grow<F>(&self, listener: F)
    where
        F: Fn(&GrowthEvent) + Send + Sync + 'static,
    {
        let listener: GrowthListener = Arc::new(listener);
        self.listeners.register(listener);
    }

    /// Receive this view's growth events on a channel.
    ///
    /// The subscription ends at the first event after the receiver is
    /// dropped.
    pub fn subscribe(&self) -> Receiver<GrowthEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.listeners.register_while(move |event| {
            if tx.send(event.clone()).is_ok() {
                return Listening::Keep;
            }
            tracing::trace!(index = event.index, "growth subscriber dropped");
            Listening::Stop
        });
        rx
    }

    /// Attach every arena this view creates to `target` as well.
    ///
    /// Holds `target` weakly, so two views may forward to each other
    /// without keeping each other alive. Forwarding stops once `target`
    /// is gone.
    pub fn forward_growth_to(&self, target: &Arc<Heap>) {
        let target: Weak<Heap> = Arc::downgrade(target);
        self.listeners.register_while(move |event| {
            let Some(target) = target.upgrade() else {
                return Listening::Stop;
            };
            if let Err(e) = target.add_shared_arena(event.index, Arc::clone(&event.region)) {
                tracing::warn!(index = event.index, error = %e, "failed to forward arena");
            }
            Listening::Keep
        });
    }

    /// Handle for the allocation at `location`.
    ///
    /// Debug builds look the block up to size the handle exactly; release
    /// builds size it to the end of the arena.
    pub fn resolve(&self, location: SharedLocation) -> Result<Allocation<'_>, HeapError> {
        let arena = self.checked_arena(location)?;
        let offset = location.byte_offset;
        let remaining = || arena.region().byte_len().saturating_sub(offset) / WORD_BYTES;
        let len = if cfg!(debug_assertions) {
            arena.data_len(offset).unwrap_or_else(remaining)
        } else {
            remaining()
        };
        Ok(Allocation::new(self, arena, location.arena_index, offset, len))
    }

    /// Handle of `words` words at `location`, without looking the block up.
    pub fn resolve_sized(
        &self,
        location: SharedLocation,
        words: u32,
    ) -> Result<Allocation<'_>, HeapError> {
        let arena = self.checked_arena(location)?;
        Ok(Allocation::new(
            self,
            arena,
            location.arena_index,
            location.byte_offset,
            words,
        ))
    }

    /// Handle for the allocation `pointer` refers to.
    pub fn resolve_pointer(&self, pointer: Pointer) -> Result<Allocation<'_>, HeapError> {
        self.resolve(pointer.into())
    }

    fn checked_arena(&self, location: SharedLocation) -> Result<Arena, HeapError> {
        if location.pointer().is_null() {
            return Err(HeapError::NullPointer);
        }
        self.arena(location.arena_index)
            .ok_or(HeapError::MissingArena {
                index: location.arena_index,
            })
    }

    /// Free the allocation `pointer` refers to. Returns `false` for null,
    /// unknown arenas and blocks that are not live.
    pub fn free(&self, pointer: Pointer) -> bool {
        if pointer.is_null() {
            return false;
        }
        match self.arena(pointer.arena_index()) {
            Some(arena) => arena.free(pointer.byte_offset()),
            None => {
                tracing::warn!(%pointer, "free of pointer into unknown arena");
                false
            }
        }
    }

    /// The arena at `index`, if this view has it.
    pub fn arena(&self, index: u32) -> Option<Arena> {
        self.arenas.read().get(index as usize)?.clone()
    }

    /// Arenas attached to this view.
    pub fn arena_count(&self) -> u32 {
        self.arenas.read().iter().flatten().count() as u32
    }

    /// Arenas created across all views of the heap.
    pub fn shared_arena_count(&self) -> u32 {
        self.metadata
            .region()
            .load(self.metadata_word + META_ARENA_COUNT)
    }

    /// Size of each arena in bytes.
    pub fn arena_size(&self) -> u32 {
        self.template.size
    }

    /// Whether this view was created by [`Heap::attach`].
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Bytes of all arenas attached to this view.
    pub fn total_allocated(&self) -> u64 {
        self.arenas
            .read()
            .iter()
            .flatten()
            .map(|arena| u64::from(arena.region().byte_len()))
            .sum()
    }

    /// Bytes not available for allocation across this view's arenas.
    pub fn current_used(&self) -> u64 {
        self.arenas
            .read()
            .iter()
            .flatten()
            .map(|arena| u64::from(arena.stats().used_bytes()))
            .sum()
    }

    /// Used and total bytes together.
    pub fn memory_usage(&self) -> MemoryUsage {
        MemoryUsage {
            used: self.current_used(),
            total: self.total_allocated(),
        }
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("arena_size", &self.template.size)
            .field("arenas", &self.arena_count())
            .field("shared_arenas", &self.shared_arena_count())
            .field("attached", &self.attached)
            .field("listeners", &self.listeners)
            .finish()
    }
}
