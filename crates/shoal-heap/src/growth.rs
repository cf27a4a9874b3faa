//! Growth notification.
//!
//! When a heap adds an arena it tells every registered listener, handing
//! over the new region so peer views can attach it under the same index.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use shoal_core::SharedRegion;
use smallvec::SmallVec;

/// A new arena was added to a heap.
#[derive(Clone)]
pub struct GrowthEvent {
    /// Arena index the region occupies in every view.
    pub index: u32,
    /// The new arena's backing region.
    pub region: Arc<SharedRegion>,
}

impl fmt::Debug for GrowthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrowthEvent")
            .field("index", &self.index)
            .field("region_bytes", &self.region.byte_len())
            .finish()
    }
}

/// Callback invoked with each growth event.
pub type GrowthListener = Arc<dyn Fn(&GrowthEvent) + Send + Sync>;

/// What a registered listener wants after seeing an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Listening {
    Keep,
    Stop,
}

type Entry = Arc<dyn Fn(&GrowthEvent) -> Listening + Send + Sync>;

/// Listener registry. Most heaps carry one or two listeners.
#[derive(Default)]
pub(crate) struct GrowthListeners {
    inner: RwLock<SmallVec<[Entry; 2]>>,
}

impl GrowthListeners {
    /// Register a listener that stays for the life of the heap.
    pub(crate) fn register(&self, listener: GrowthListener) {
        self.register_while(move |event| {
            listener(event);
            Listening::Keep
        });
    }

    /// Register a listener that is dropped once it returns
    /// [`Listening::Stop`].
    pub(crate) fn register_while<F>(&self, listener: F)
    where
        F: Fn(&GrowthEvent) -> Listening + Send + Sync + 'static,
    {
        self.inner.write().push(Arc::new(listener));
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Invoke every listener in registration order, then prune the ones
    /// that stopped.
    ///
    /// The registry lock is released before any listener runs, so a
    /// listener may register further listeners or touch other heaps.
    pub(crate) fn notify(&self, event: &GrowthEvent) {
        let listeners: SmallVec<[Entry; 2]> = self.inner.read().clone();
        let stopped: SmallVec<[Entry; 2]> = listeners
            .into_iter()
            .filter(|listener| listener(event) == Listening::Stop)
            .collect();
        if stopped.is_empty() {
            return;
        }
        self.inner
            .write()
            .retain(|entry| !stopped.iter().any(|gone| Arc::ptr_eq(gone, entry)));
        tracing::trace!(pruned = stopped.len(), "growth listeners stopped");
    }
}

impl fmt::Debug for GrowthListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrowthListeners")
            .field("len", &self.len())
            .finish()
    }
}
