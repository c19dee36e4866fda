//! Per-worker private state for parallel scans.
//!
//! Each worker of a [`WorkerPool`] owns one slot, so scan callbacks can
//! accumulate results without sharing anything with other workers. After the
//! parallel pass the caller folds over the slots.

use std::fmt;
use std::sync::Arc;

use crossbeam::utils::CachePadded;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use super::worker_pool::WorkerPool;

type InitFn<T> = Box<dyn Fn() -> T + Send + Sync>;
type DestroyFn<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// One lazily created state per worker thread.
///
/// There is a slot for every worker of the pool plus one shared by all
/// threads outside the pool. Slots are cache-padded so neighbouring workers
/// do not false-share.
///
/// A worker's slot stays locked while its guard from
/// [`access_current_thread_state`](Self::access_current_thread_state) is
/// alive. Callbacks holding the guard must not wait on other parallel work
/// in the same pool, since rayon may schedule that work on the same worker.
pub struct ThreadStateContainer<T> {
    pool: Arc<WorkerPool>,
    slots: Box<[CachePadded<Mutex<Option<T>>>]>,
    init: InitFn<T>,
    destroy: Option<DestroyFn<T>>,
}

impl<T: Send + Default + 'static> ThreadStateContainer<T> {
    /// Creates a container whose states start as `T::default()`.
    #[must_use]
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self::with_init(pool, T::default)
    }
}

impl<T: Send> ThreadStateContainer<T> {
    /// Creates a container whose states are built by `init`.
    #[must_use]
    pub fn with_init<I>(pool: Arc<WorkerPool>, init: I) -> Self
    where
        I: Fn() -> T + Send + Sync + 'static,
    {
        let slots = (0..=pool.num_threads())
            .map(|_| CachePadded::new(Mutex::new(None)))
            .collect();

        Self {
            pool,
            slots,
            init: Box::new(init),
            destroy: None,
        }
    }

    /// Discards all states and installs new lifecycle hooks.
    ///
    /// Existing states are torn down with the previous destroy hook. New
    /// states are created by `init` on first access and passed to `destroy`
    /// when they are cleared or the container is dropped.
    pub fn reset<I, D>(&mut self, init: I, destroy: D)
    where
        I: Fn() -> T + Send + Sync + 'static,
        D: Fn(&mut T) + Send + Sync + 'static,
    {
        self.clear();
        self.init = Box::new(init);
        self.destroy = Some(Box::new(destroy));
    }

    /// Returns the calling worker's state, creating it on first access.
    pub fn access_current_thread_state(&self) -> MappedMutexGuard<'_, T> {
        let external = self.slots.len() - 1;
        let idx = self
            .pool
            .worker_index()
            .filter(|&i| i < external)
            .unwrap_or(external);

        MutexGuard::map(self.slots[idx].lock(), |slot| {
            slot.get_or_insert_with(|| (self.init)())
        })
    }

    /// Visits every created state.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&T),
    {
        for slot in self.slots.iter() {
            if let Some(state) = slot.lock().as_ref() {
                f(state);
            }
        }
    }

    /// Visits every created state mutably.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut T),
    {
        for slot in self.slots.iter_mut() {
            if let Some(state) = slot.get_mut().as_mut() {
                f(state);
            }
        }
    }

    /// Folds over every created state.
    pub fn fold<A, F>(&self, init: A, mut f: F) -> A
    where
        F: FnMut(A, &T) -> A,
    {
        let mut acc = init;
        for slot in self.slots.iter() {
            if let Some(state) = slot.lock().as_ref() {
                acc = f(acc, state);
            }
        }
        acc
    }

    /// Returns the number of states created so far.
    #[must_use]
    pub fn active_states(&self) -> usize {
        self.slots.iter().filter(|s| s.lock().is_some()).count()
    }

    /// Tears down and discards every state.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(mut state) = slot.get_mut().take()
                && let Some(destroy) = &self.destroy
            {
                destroy(&mut state);
            }
        }
    }
}

impl<T> Drop for ThreadStateContainer<T> {
    fn drop(&mut self) {
        let Some(destroy) = &self.destroy else {
            return;
        };
        for slot in self.slots.iter_mut() {
            if let Some(state) = slot.get_mut().as_mut() {
                destroy(state);
            }
        }
    }
}

impl<T> fmt::Debug for ThreadStateContainer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadStateContainer")
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}
