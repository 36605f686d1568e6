//! # Resource Pool
//!
//! Round-robin rotation over interchangeable network resources (API
//! credentials and outbound clients), each under its own rate ceiling.
//! Rotation spreads load evenly so no single resource bursts past its quota
//! while another sits idle.
//!
//! Every operation takes the same lock, so `next`, `add` and `delete` are
//! linearizable with respect to each other. Membership is tracked by
//! [`ResourceId`], never by value: two credentials carrying the same key are
//! still two distinct pool entries.

mod resource;

pub use resource::{Credential, PooledClient, Resource, ResourceId};

use crate::error::PoolError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Anything that can live in a [`ResourcePool`].
pub trait PoolMember: Send + Sync {
    /// Stable identity used for eviction.
    fn id(&self) -> ResourceId;
}

#[derive(Debug)]
struct PoolInner<T> {
    items: Vec<Arc<T>>,
    /// Index of the element returned by the next call to `next`.
    /// Always in `[0, items.len())` while the pool is non-empty.
    cursor: usize,
}

/// Thread-safe round-robin collection with identity-based eviction.
#[derive(Debug)]
pub struct ResourcePool<T: PoolMember = Resource> {
    name: &'static str,
    inner: Mutex<PoolInner<T>>,
}

impl<T: PoolMember> ResourcePool<T> {
    /// Creates an empty pool. `name` shows up in errors and logs.
    pub fn new(name: &'static str) -> Self {
        Self::with_items(name, Vec::new())
    }

    pub fn with_items(name: &'static str, items: Vec<T>) -> Self {
        Self {
            name,
            inner: Mutex::new(PoolInner {
                items: items.into_iter().map(Arc::new).collect(),
                cursor: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the next element in rotation. Never waits for an element to
    /// appear: an empty pool fails immediately.
    pub fn next(&self) -> Result<Arc<T>, PoolError> {
        let mut inner = self.inner.lock();
        let len = inner.items.len();
        if len == 0 {
            return Err(PoolError::Empty { pool: self.name });
        }

        let index = inner.cursor % len;
        inner.cursor = (index + 1) % len;
        Ok(Arc::clone(&inner.items[index]))
    }

    /// Appends an element at the end of the rotation.
    pub fn add(&self, item: T) {
        self.inner.lock().items.push(Arc::new(item));
    }

    /// Removes the element with the same identity as `item`.
    ///
    /// Returns `false` if it is not (or no longer) in the pool, which is the
    /// common case when several workers evict the same failing client.
    pub fn delete(&self, item: &T) -> bool {
        let id = item.id();
        let mut inner = self.inner.lock();
        let Some(position) = inner.items.iter().position(|e| e.id() == id) else {
            return false;
        };

        inner.items.remove(position);

        // Keep the cursor on the element that was due next.
        if position < inner.cursor {
            inner.cursor -= 1;
        }
        if inner.cursor >= inner.items.len() {
            inner.cursor = 0;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identities currently pooled, in rotation order starting at index 0.
    pub fn ids(&self) -> Vec<ResourceId> {
        self.inner.lock().items.iter().map(|e| e.id()).collect()
    }
}
