//! Lifecycle guard for destroyable resources.
//!
//! A [`Guard`] tracks the operations currently using a resource and makes
//! destroying that resource safe while other threads are still calling into
//! it. Operations run through [`Guard::run`], which admits them only while
//! the guard is live. [`Guard::destroy`] stops admitting new operations,
//! waits for the admitted ones to drain, destroys every registered child and
//! finally runs the guard's teardown.
//!
//! # Lifecycle
//!
//! `Live -> Draining -> Destroyed`. Draining is only observable as
//! `destroy` blocking; from the outside a guard is either live or reports
//! [`Error::AlreadyDestroyed`].
//!
//! Operations are not serialized with each other, only with destruction.
//! Calling `destroy` from inside a `run` on the same guard never returns,
//! since it waits for its own admission to drain.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Action run once when a guard is destroyed.
pub type Teardown = Box<dyn FnOnce() -> Result<()> + Send>;

struct State {
    destroyed: bool,
    in_flight: usize,
    children: Vec<Guard>,
    teardown: Option<Teardown>,
}

struct Inner {
    state: Mutex<State>,
    drained: Condvar,
}

impl Inner {
    // No user code runs while the lock is held, so a poisoned lock still
    // protects a consistent state.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Admission/quiescence gate shared by every handle to a resource.
///
/// Cloning a `Guard` yields another reference to the same state.
#[derive(Clone)]
pub struct Guard {
    inner: Arc<Inner>,
}

impl Guard {
    /// Creates a live guard with no teardown action.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a live guard that runs `teardown` when destroyed.
    pub fn with_teardown<F>(teardown: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self::build(Some(Box::new(teardown)))
    }

    fn build(teardown: Option<Teardown>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    destroyed: false,
                    in_flight: 0,
                    children: Vec::new(),
                    teardown,
                }),
                drained: Condvar::new(),
            }),
        }
    }

    /// Runs `action` as an admitted operation.
    ///
    /// Fails with [`Error::AlreadyDestroyed`] without running `action` once
    /// destruction has begun. Otherwise `action` runs without any lock held
    /// and its result is returned unchanged.
    pub fn run<T, F>(&self, action: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        {
            let mut state = self.inner.lock();
            if state.destroyed {
                return Err(Error::AlreadyDestroyed);
            }
            state.in_flight += 1;
        }
        let _admission = Admission { inner: &self.inner };
        action()
    }

    /// Registers `child` to be destroyed when this guard is destroyed.
    ///
    /// Cycles are not detected.
    pub fn add_child(&self, child: Guard) -> Result<()> {
        let mut state = self.inner.lock();
        if state.destroyed {
            return Err(Error::AlreadyDestroyed);
        }
        state.children.push(child);
        Ok(())
    }

    /// Destroys the guard.
    ///
    /// Only the first call proceeds; every other call fails with
    /// [`Error::AlreadyDestroyed`]. The winner blocks until all admitted
    /// operations have finished, destroys the children in the order they were
    /// added, then runs the teardown. Child failures are discarded; only the
    /// teardown's result is returned.
    pub fn destroy(&self) -> Result<()> {
        let (children, teardown) = {
            let mut state = self.inner.lock();
            if state.destroyed {
                return Err(Error::AlreadyDestroyed);
            }
            state.destroyed = true;
            let mut state = self
                .inner
                .drained
                .wait_while(state, |state| state.in_flight > 0)
                .unwrap_or_else(PoisonError::into_inner);
            (std::mem::take(&mut state.children), state.teardown.take())
        };

        tracing::debug!("destroying guard with {} children", children.len());
        for child in children {
            match child.destroy() {
                Ok(()) | Err(Error::AlreadyDestroyed) => {}
                Err(e) => tracing::warn!("Failed to destroy child resource: {}", e),
            }
        }

        match teardown {
            Some(teardown) => teardown(),
            None => Ok(()),
        }
    }

    /// Returns true once destruction has begun.
    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().destroyed
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Guard")
            .field("destroyed", &state.destroyed)
            .field("in_flight", &state.in_flight)
            .field("children", &state.children.len())
            .field("teardown", &state.teardown.is_some())
            .finish()
    }
}

/// Releases one admission, also when the admitted action panics.
struct Admission<'a> {
    inner: &'a Inner,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        state.in_flight -= 1;
        if state.in_flight == 0 {
            self.inner.drained.notify_all();
        }
    }
}
