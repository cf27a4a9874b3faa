//! Test utilities and fixtures for Shoal development.
//!
//! Provides a once-only tracing setup for tests, helpers for building
//! several linked views of one heap, and the [`fixtures`] module.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::{Arc, Once};

use shoal_heap::{Heap, HeapConfig, HeapError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

static INIT: Once = Once::new();

/// Install a test-friendly tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Safe to call from every test;
/// only the first call installs anything.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_thread_names(true)
            .with_target(true)
            .compact()
            .with_filter(filter);
        let _ = Registry::default().with(layer).try_init();
    });
}

/// One heap and `count - 1` attached views of it, every view forwarding
/// its growth to every other.
pub fn linked_views(config: HeapConfig, count: usize) -> Result<Vec<Arc<Heap>>, HeapError> {
    let owner = Arc::new(Heap::new(config)?);
    let mut views = vec![Arc::clone(&owner)];
    for _ in 1..count {
        views.push(Arc::new(Heap::attach(owner.topology())?));
    }
    link_all(&views);
    Ok(views)
}

/// Make every view forward its growth events to every other view.
pub fn link_all(views: &[Arc<Heap>]) {
    for (i, from) in views.iter().enumerate() {
        for (j, to) in views.iter().enumerate() {
            if i != j {
                from.forward_growth_to(to);
            }
        }
    }
}
