// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("unable to spawn {name} thread: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("{name} did not stop within {timeout:?}")]
    StopTimeout { name: String, timeout: Duration },

    #[error("{name} panicked")]
    Panicked { name: String },
}

/// Represents the current cancel state.
#[derive(PartialEq)]
enum CancelState {
    Untouched,
    /// A sleeper should return early without being cancelled.
    Woken,
    Cancelled,
}

/// A cancel handle is shared between a worker thread and whoever owns it. The worker is
/// responsible for checking it between units of work and for sleeping through it.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<Mutex<CancelState>>,
    condvar: Arc<Condvar>,
}

impl CancelHandle {
    /// Creates a new cancel handle.
    pub fn new() -> CancelHandle {
        CancelHandle {
            cancelled: Arc::new(Mutex::new(CancelState::Untouched)),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Returns true if the handle has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock() == CancelState::Cancelled
    }

    /// Sleeps for the given duration or until cancelled or woken, whichever comes first.
    /// Returns true if the handle was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut state = self.cancelled.lock();
        if *state == CancelState::Untouched {
            self.condvar.wait_while_for(
                &mut state,
                |state| *state == CancelState::Untouched,
                timeout,
            );
        }
        if *state == CancelState::Woken {
            *state = CancelState::Untouched;
        }
        *state == CancelState::Cancelled
    }

    /// Cuts the current (or next) sleep short without cancelling.
    pub fn wake(&self) {
        let mut cancel_state = self.cancelled.lock();
        if *cancel_state == CancelState::Untouched {
            *cancel_state = CancelState::Woken;
            self.condvar.notify_all();
        }
    }

    /// Cancels the handle and wakes every sleeper.
    pub fn cancel(&self) {
        let mut cancel_state = self.cancelled.lock();
        if *cancel_state != CancelState::Cancelled {
            *cancel_state = CancelState::Cancelled;
            self.condvar.notify_all();
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A named thread that can be stopped synchronously. Stopping cancels the worker's handle and
/// then waits, for a bounded time, for the worker body to return.
pub struct Worker {
    name: String,
    cancel_handle: CancelHandle,
    done: Receiver<()>,
    join_handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns the body on its own thread. The body receives a clone of the cancel handle and
    /// must return promptly once it is cancelled.
    pub fn spawn<F>(name: &str, body: F) -> Result<Worker, LifecycleError>
    where
        F: FnOnce(CancelHandle) + Send + 'static,
    {
        let cancel_handle = CancelHandle::new();
        let (done_tx, done) = bounded::<()>(1);

        let join_handle = {
            let cancel_handle = cancel_handle.clone();
            thread::Builder::new()
                .name(name.to_string())
                .spawn(move || {
                    body(cancel_handle);
                    let _ = done_tx.send(());
                })
                .map_err(|source| LifecycleError::Spawn {
                    name: name.to_string(),
                    source,
                })?
        };

        Ok(Worker {
            name: name.to_string(),
            cancel_handle,
            done,
            join_handle: Some(join_handle),
        })
    }

    #[cfg(test)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true once the body has returned on its own.
    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(|join_handle| join_handle.is_finished())
    }

    /// Wakes the worker if it is sleeping on its cancel handle.
    pub fn wake(&self) {
        self.cancel_handle.wake();
    }

    /// Cancels the worker and blocks until it has exited. A worker that does not exit within
    /// the timeout is left running and reported as an error.
    pub fn stop(&mut self, timeout: Duration) -> Result<(), LifecycleError> {
        self.cancel_handle.cancel();

        let join_handle = match self.join_handle.take() {
            Some(join_handle) => join_handle,
            None => return Ok(()),
        };

        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                return Err(LifecycleError::StopTimeout {
                    name: self.name.clone(),
                    timeout,
                })
            }
        }

        join_handle.join().map_err(|_| LifecycleError::Panicked {
            name: self.name.clone(),
        })
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.cancel_handle.cancel();

        // Only join workers that have already signalled completion so a stuck worker can't hang
        // the drop.
        if let Some(join_handle) = self.join_handle.take() {
            if self.done.recv_timeout(Duration::from_secs(1)).is_ok() && join_handle.join().is_err()
            {
                error!(worker = self.name, "Error joining handle");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Instant,
    };

    use super::*;

    #[test]
    fn test_cancel_handle_wakes_sleeper() {
        let cancel_handle = CancelHandle::new();
        assert!(!cancel_handle.is_cancelled());

        let join = {
            let cancel_handle = cancel_handle.clone();
            thread::spawn(move || cancel_handle.wait_timeout(Duration::from_secs(30)))
        };

        cancel_handle.cancel();
        assert!(join.join().expect("join"));
        assert!(cancel_handle.is_cancelled());
    }

    #[test]
    fn test_cancel_handle_timeout() {
        let cancel_handle = CancelHandle::new();
        let start = Instant::now();
        assert!(!cancel_handle.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(!cancel_handle.is_cancelled());
    }

    #[test]
    fn test_cancel_handle_wake() {
        let cancel_handle = CancelHandle::new();
        let join = {
            let cancel_handle = cancel_handle.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let cancelled = cancel_handle.wait_timeout(Duration::from_secs(30));
                (cancelled, start.elapsed())
            })
        };

        // A wake before the sleep starts still cuts it short.
        cancel_handle.wake();
        let (cancelled, elapsed) = join.join().expect("join");
        assert!(!cancelled);
        assert!(elapsed < Duration::from_secs(10));
        assert!(!cancel_handle.is_cancelled());

        // The wake is consumed.
        let start = Instant::now();
        assert!(!cancel_handle.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));

        cancel_handle.wake();
        cancel_handle.cancel();
        assert!(cancel_handle.wait_timeout(Duration::from_secs(30)));
    }

    #[test]
    fn test_worker_stop() -> Result<(), LifecycleError> {
        let exited = Arc::new(AtomicBool::new(false));
        let mut worker = {
            let exited = exited.clone();
            Worker::spawn("test-worker", move |cancel_handle| {
                while !cancel_handle.wait_timeout(Duration::from_secs(10)) {}
                exited.store(true, Ordering::SeqCst);
            })?
        };

        assert_eq!(worker.name(), "test-worker");
        worker.stop(Duration::from_secs(2))?;
        assert!(exited.load(Ordering::SeqCst));
        assert!(worker.is_finished());

        // Stopping twice is harmless.
        worker.stop(Duration::from_secs(2))
    }

    #[test]
    fn test_worker_stop_timeout() -> Result<(), LifecycleError> {
        let release = CancelHandle::new();
        let mut worker = {
            let release = release.clone();
            Worker::spawn("stuck-worker", move |_| {
                release.wait_timeout(Duration::from_secs(10));
            })?
        };

        match worker.stop(Duration::from_millis(50)) {
            Err(LifecycleError::StopTimeout { name, .. }) => assert_eq!(name, "stuck-worker"),
            other => panic!("expected timeout, got {:?}", other),
        }

        release.cancel();
        Ok(())
    }

    #[test]
    fn test_worker_panicked() -> Result<(), LifecycleError> {
        let mut worker = Worker::spawn("panicking-worker", |_| panic!("boom"))?;
        assert!(matches!(
            worker.stop(Duration::from_secs(2)),
            Err(LifecycleError::Panicked { .. })
        ));
        Ok(())
    }
}
