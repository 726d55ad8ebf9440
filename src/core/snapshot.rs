//! Atomically replaceable shared snapshots
//!
//! A [`SwapCell`] holds an `Arc<T>` that readers clone out and then use
//! without holding anything. Writers never mutate a published value in
//! place; they publish a new `Arc` instead, so a reader always sees either
//! the whole old value or the whole new one.
//!
//! The slot is an [`ArcSwap`]: loading is a single atomic operation and
//! never waits for a writer.

use arc_swap::{ArcSwap, Guard};
use std::fmt;
use std::sync::Arc;

pub struct SwapCell<T> {
    current: ArcSwap<T>,
}

impl<T> SwapCell<T> {
    pub fn new(value: Arc<T>) -> Self {
        Self {
            current: ArcSwap::new(value),
        }
    }

    /// Snapshot of the current value.
    #[inline]
    pub fn load(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Publishes `value`, returning the value it replaced.
    pub fn store(&self, value: Arc<T>) -> Arc<T> {
        self.current.swap(value)
    }

    /// Publishes `new` only if the current value is still `expected`.
    ///
    /// On success returns the replaced value; on failure hands `new` back
    /// untouched so the caller can dispose of it.
    pub fn compare_and_swap(&self, expected: &Arc<T>, new: Arc<T>) -> Result<Arc<T>, Arc<T>> {
        let previous = self.current.compare_and_swap(expected, Arc::clone(&new));
        if Arc::ptr_eq(&previous, expected) {
            Ok(Guard::into_inner(previous))
        } else {
            Err(new)
        }
    }

    /// Read-copy-update: derives a new value from the current one and
    /// publishes it, retrying if another writer got there first.
    ///
    /// `update` may run more than once. Returns the value that was replaced.
    pub fn rcu<F>(&self, mut update: F) -> Arc<T>
    where
        F: FnMut(&T) -> Arc<T>,
    {
        self.current.rcu(|current| update(&**current))
    }
}

impl<T: fmt::Debug> fmt::Debug for SwapCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SwapCell").field(&self.load()).finish()
    }
}
