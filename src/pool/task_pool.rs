//! Fixed-size worker pool consuming from a shared bounded queue.
//!
//! The pool moves through `Created -> Running -> Stopped` exactly once. Two
//! shutdown modes are supported:
//!
//! - [`TaskPool::stop`] closes the graceful-stop signal. Workers execute
//!   everything still queued, then exit.
//! - [`TaskPool::stop_force`] closes the forced-stop signal. Workers exit as
//!   soon as they observe it and queued tasks are dropped unexecuted.
//!
//! Both signals are channels that are never sent on; closing them (dropping
//! the only sender) makes every pending `recv` on them ready at once.

use anyhow::anyhow;
use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::PoolError;

/// Default worker count, matching the queue size so a full queue can be
/// drained in one round.
pub const DEFAULT_WORKERS: i64 = 100;

/// Default bounded queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: i64 = 100;

/// A unit of work executed by a pool worker.
pub trait Task: Send + 'static {
    /// Run the task. An `Err` (or a panic) is handed to [`Task::on_failure`].
    fn execute(&mut self) -> anyhow::Result<()>;

    /// Called by the worker when `execute` fails. Never called for tasks that
    /// are abandoned by a forced stop.
    fn on_failure(&mut self, err: anyhow::Error);
}

type BoxedTask = Box<dyn Task>;

/// Pool sizing as read from configuration.
///
/// Values are signed because they come straight from TOML integers; the pool
/// constructor is where they are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: i64,
    pub queue_capacity: i64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Lifecycle of a [`TaskPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    Created = 0,
    Running = 1,
    Stopped = 2,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PoolState::Created,
            1 => PoolState::Running,
            _ => PoolState::Stopped,
        }
    }
}

pub struct TaskPool {
    workers: usize,
    state: AtomicU8,

    tasks_tx: Sender<BoxedTask>,
    tasks_rx: Receiver<BoxedTask>,

    quit_tx: Mutex<Option<Sender<()>>>,
    quit_rx: Receiver<()>,
    force_tx: Mutex<Option<Sender<()>>>,
    force_rx: Receiver<()>,

    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskPool {
    /// Create a pool with `workers` threads and a queue holding up to
    /// `queue_capacity` tasks. A capacity of zero makes every submission a
    /// direct hand-off to an idle worker.
    pub fn new(workers: i64, queue_capacity: i64) -> Result<Self, PoolError> {
        if workers < 1 {
            return Err(PoolError::Config(format!(
                "worker pool needs at least 1 worker, got {}",
                workers
            )));
        }
        if queue_capacity < 0 {
            return Err(PoolError::Config(format!(
                "worker pool queue capacity cannot be negative, got {}",
                queue_capacity
            )));
        }

        let workers = usize::try_from(workers)
            .map_err(|_| PoolError::Config(format!("worker count {} is too large", workers)))?;
        let queue_capacity = usize::try_from(queue_capacity).map_err(|_| {
            PoolError::Config(format!("queue capacity {} is too large", queue_capacity))
        })?;

        let (tasks_tx, tasks_rx) = bounded(queue_capacity);
        let (quit_tx, quit_rx) = bounded(0);
        let (force_tx, force_rx) = bounded(0);

        Ok(Self {
            workers,
            state: AtomicU8::new(PoolState::Created as u8),
            tasks_tx,
            tasks_rx,
            quit_tx: Mutex::new(Some(quit_tx)),
            quit_rx,
            force_tx: Mutex::new(Some(force_tx)),
            force_rx,
            handles: Mutex::new(Vec::new()),
        })
    }

    pub fn from_config(config: PoolConfig) -> Result<Self, PoolError> {
        Self::new(config.workers, config.queue_capacity)
    }

    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of tasks waiting in the queue.
    pub fn queued(&self) -> usize {
        self.tasks_rx.len()
    }

    /// Move to `to` if the current state is one of `allowed`.
    fn transition(&self, allowed: &[PoolState], to: PoolState) -> Result<PoolState, PoolError> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let from = PoolState::from_u8(current);
            if !allowed.contains(&from) {
                return Err(PoolError::InvalidTransition { from, to });
            }
            match self.state.compare_exchange(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(from),
                Err(observed) => current = observed,
            }
        }
    }

    /// Spawn the worker threads. Valid only once, from `Created`.
    pub fn start(&self) -> Result<(), PoolError> {
        self.transition(&[PoolState::Created], PoolState::Running)?;

        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        for id in 0..self.workers {
            let tasks = self.tasks_rx.clone();
            let quit = self.quit_rx.clone();
            let force = self.force_rx.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("pool-worker-{}", id))
                .spawn(move || run_worker(id, tasks, quit, force));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!(worker = id, error = %e, "Failed to spawn pool worker"),
            }
        }

        info!(workers = handles.len(), "Task pool started");
        Ok(())
    }

    /// Enqueue a task.
    ///
    /// Blocks while the queue is full, until a worker makes room or the pool
    /// is stopped. Returns `false` without enqueuing if the pool is stopped.
    pub fn add_work(&self, task: impl Task) -> bool {
        if self.state() == PoolState::Stopped {
            trace!("Task pool stopped, dropping task");
            return false;
        }

        let task: BoxedTask = Box::new(task);
        select! {
            send(self.tasks_tx, task) -> res => res.is_ok(),
            recv(self.quit_rx) -> _ => false,
            recv(self.force_rx) -> _ => false,
        }
    }

    /// Graceful stop: reject new work, let workers drain the queue.
    pub fn stop(&self) -> Result<(), PoolError> {
        self.transition(&[PoolState::Created, PoolState::Running], PoolState::Stopped)?;
        self.quit_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!(queued = self.queued(), "Task pool stopping gracefully");
        Ok(())
    }

    /// Forced stop: reject new work, abandon queued tasks.
    ///
    /// Also valid after [`TaskPool::stop`] to cut a drain short.
    pub fn stop_force(&self) -> Result<(), PoolError> {
        if let Err(err) =
            self.transition(&[PoolState::Created, PoolState::Running], PoolState::Stopped)
        {
            let mut force = self.force_tx.lock().unwrap_or_else(PoisonError::into_inner);
            if force.is_none() {
                return Err(err);
            }
            force.take();
            warn!("Task pool escalated from graceful to forced stop");
            return Ok(());
        }

        self.force_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        warn!(abandoned = self.queued(), "Task pool force-stopped");
        Ok(())
    }

    /// Wait for every worker thread to exit. Call after one of the stops.
    pub fn join(&self) {
        let handles = std::mem::take(
            &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(e) = handle.join() {
                tracing::error!("Pool worker panicked: {:?}", e);
            }
        }
    }
}

fn force_raised(force: &Receiver<()>) -> bool {
    matches!(force.try_recv(), Err(TryRecvError::Disconnected))
}

fn run_worker(
    id: usize,
    tasks: Receiver<BoxedTask>,
    quit: Receiver<()>,
    force: Receiver<()>,
) {
    loop {
        // Forced stop wins over any queued work.
        if force_raised(&force) {
            trace!(worker = id, "Worker exiting on forced stop");
            return;
        }

        select! {
            recv(force) -> _ => {
                trace!(worker = id, "Worker exiting on forced stop");
                return;
            }
            recv(quit) -> _ => {
                while !force_raised(&force) {
                    match tasks.try_recv() {
                        Ok(task) => run_task(task),
                        Err(_) => break,
                    }
                }
                trace!(worker = id, "Worker drained queue and exited");
                return;
            }
            recv(tasks) -> task => match task {
                Ok(task) => run_task(task),
                Err(_) => return,
            }
        }
    }
}

fn run_task(mut task: BoxedTask) {
    let outcome = catch_unwind(AssertUnwindSafe(|| task.execute()));
    let err = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e,
        Err(_) => anyhow!("task panicked"),
    };
    task.on_failure(err);
}
