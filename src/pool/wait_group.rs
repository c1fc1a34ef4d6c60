//! Completion counter used to detect that a scan has no outstanding work.
//!
//! Every producer (the directory walker) and every submitted job holds a
//! [`WaitGuard`]. The slot is released when the guard is dropped, so a job
//! counts as finished whether it ran, was drained during a graceful stop, or
//! was abandoned by a forced stop.

use std::sync::{Arc, Condvar, Mutex, PoisonError};

#[derive(Default)]
struct Inner {
    pending: Mutex<usize>,
    zero: Condvar,
}

/// Counter plus condition variable; cloning shares the same counter.
#[derive(Clone, Default)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

/// One outstanding unit of work registered with a [`WaitGroup`].
#[must_use = "dropping the guard immediately marks the work as done"]
pub struct WaitGuard {
    inner: Arc<Inner>,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one unit of work.
    pub fn add(&self) -> WaitGuard {
        let mut pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *pending += 1;
        WaitGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of guards still alive.
    pub fn pending(&self) -> usize {
        *self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until every guard has been dropped.
    pub fn wait(&self) {
        let pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _pending = self
            .inner
            .zero
            .wait_while(pending, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        let mut pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *pending -= 1;
        if *pending == 0 {
            self.inner.zero.notify_all();
        }
    }
}
