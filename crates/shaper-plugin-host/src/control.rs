//! Control-thread task queue.
//!
//! Reconfiguration, instantiation completion, ready callbacks and editor
//! delivery must all run on the control thread. Other threads post boxed
//! tasks through a [`ControlHandle`]; whoever owns the [`ControlQueue`]
//! (normally the application's main loop) drains it.

use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::debug;

pub type ControlTask = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable sender side of the control queue.
#[derive(Clone, Debug)]
pub struct ControlHandle {
    tx: Sender<ControlTask>,
}

impl ControlHandle {
    /// Posts a task. Tasks posted after the queue is gone are dropped.
    pub fn dispatch(&self, task: impl FnOnce() + Send + 'static) {
        if self.tx.send(Box::new(task)).is_err() {
            debug!("control queue closed, dropping task");
        }
    }
}

/// Receiving side of the control queue, owned by the control thread.
#[derive(Debug)]
pub struct ControlQueue {
    tx: Sender<ControlTask>,
    rx: Receiver<ControlTask>,
}

impl Default for ControlQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            tx: self.tx.clone(),
        }
    }

    /// Runs every task queued so far, including tasks posted by those tasks.
    /// Returns the number of tasks executed.
    pub fn run_pending(&self) -> usize {
        let mut executed = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            executed += 1;
        }
        executed
    }

    /// Runs tasks as they arrive until `timeout` elapses.
    pub fn run_for(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut executed = 0;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return executed;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(task) => {
                    task();
                    executed += 1;
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return executed
                }
            }
        }
    }

    /// Runs tasks until `done` returns true or `timeout` elapses.
    /// Returns whether the condition was met.
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.run_pending();
            if done() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(task) => task(),
                Err(RecvTimeoutError::Timeout) => return done(),
                Err(RecvTimeoutError::Disconnected) => return done(),
            }
        }
    }
}
