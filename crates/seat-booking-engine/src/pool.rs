//! Implementation of the worker pool
//!
//! A fixed number of threads take tasks from one shared FIFO queue. The queue
//! is a crossbeam channel; the pool owns its only sender, so closing the queue
//! (dropping the sender) wakes every worker at once.
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::error::{panic_message, InitError, Rejected, RejectedError};

/// A unit of work executed by the pool
pub trait Task: Send + Sized + 'static {
    /// Execute the task on a worker thread
    fn run(self);

    /// Called instead of [`Self::run()`] when the task is discarded by an
    /// immediate shutdown
    fn abandon(self) {}
}

impl<F> Task for F
where
    F: FnOnce() + Send + 'static,
{
    fn run(self) {
        self()
    }
}

/// A boxed closure, the default task type
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// What happens to queued tasks on shutdown
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ShutdownMode {
    /// Run every task that was queued before shutdown began
    Graceful,
    /// Finish the tasks in hand, discard the rest
    Immediate,
}

/// Lifecycle of a single worker
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting for the queue to yield a task
    Idle = 0,
    /// Executing a task
    Running = 1,
    /// Exited, reached only through shutdown
    Terminated = 2,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            _ => WorkerState::Terminated,
        }
    }
}

/// Counters describing the pool's work so far
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PoolStats {
    /// Number of worker threads
    pub workers: usize,
    /// Tasks waiting in the queue
    pub queued: usize,
    /// Tasks that ran to completion
    pub completed: u64,
    /// Tasks whose body panicked
    pub panicked: u64,
    /// Tasks dropped unexecuted by an immediate shutdown
    pub discarded: u64,
}

/// State shared between the pool handle and its workers
struct Shared<T> {
    tasks: Receiver<T>,
    /// set before the queue is closed by an immediate shutdown
    discard: AtomicBool,
    states: Box<[AtomicU8]>,
    completed: AtomicU64,
    panicked: AtomicU64,
    discarded: AtomicU64,
}

impl<T: Task> Shared<T> {
    /// main worker loop
    fn work(&self, index: usize) {
        debug!(worker = index, "worker started");
        loop {
            self.set_state(index, WorkerState::Idle);

            // blocks until a task arrives; fails once the queue is closed
            // and empty
            let Ok(task) = self.tasks.recv() else {
                break;
            };

            if self.discard.load(Ordering::Acquire) {
                self.abandon(task);
                break;
            }

            self.set_state(index, WorkerState::Running);
            match panic::catch_unwind(AssertUnwindSafe(move || task.run())) {
                Ok(()) => {
                    self.completed.fetch_add(1, Ordering::Relaxed);
                }
                Err(payload) => {
                    self.panicked.fetch_add(1, Ordering::Relaxed);
                    error!(
                        worker = index,
                        panic = %panic_message(payload.as_ref()),
                        "task panicked"
                    );
                }
            }
        }
        self.set_state(index, WorkerState::Terminated);
        debug!(worker = index, "worker exited");
    }

    fn abandon(&self, task: T) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
        task.abandon();
    }

    fn set_state(&self, index: usize, state: WorkerState) {
        self.states[index].store(state as u8, Ordering::Release);
    }
}

/// Fixed-size pool of worker threads fed from a FIFO queue
pub struct WorkerPool<T: Task = Job> {
    /// `None` once shutdown has begun
    sender: RwLock<Option<Sender<T>>>,
    shared: Arc<Shared<T>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    capacity: usize,
}

impl<T: Task> WorkerPool<T> {
    /// Start `threads` workers sharing a queue of `queue_capacity` tasks
    ///
    /// A capacity of `0` makes the queue unbounded.
    pub fn create(threads: usize, queue_capacity: usize) -> Result<Self, InitError> {
        Self::create_with(threads, queue_capacity, |index, body| {
            thread::Builder::new()
                .name(format!("worker_{index}"))
                .spawn(body)
        })
    }

    /// Like [`Self::create()`], with thread creation delegated to `spawn`
    ///
    /// If `spawn` fails, the workers started so far are stopped and joined
    /// before the error is returned.
    pub(crate) fn create_with<S>(
        threads: usize,
        queue_capacity: usize,
        mut spawn: S,
    ) -> Result<Self, InitError>
    where
        S: FnMut(usize, Box<dyn FnOnce() + Send + 'static>) -> io::Result<JoinHandle<()>>,
    {
        if threads == 0 {
            return Err(InitError::NoWorkers);
        }

        let (sender, receiver) = if queue_capacity == 0 {
            channel::unbounded()
        } else {
            channel::bounded(queue_capacity)
        };
        let shared = Arc::new(Shared {
            tasks: receiver,
            discard: AtomicBool::new(false),
            states: (0..threads)
                .map(|_| AtomicU8::new(WorkerState::Idle as u8))
                .collect(),
            completed: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let worker = Arc::clone(&shared);
            match spawn(index, Box::new(move || worker.work(index))) {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    error!(worker = index, error = %source, "failed to spawn worker");
                    // closing the queue stops the workers already running
                    drop(sender);
                    join_workers(workers);
                    return Err(InitError::Spawn { index, source });
                }
            }
        }

        info!(workers = threads, queue_capacity, "worker pool started");
        Ok(Self {
            sender: RwLock::new(Some(sender)),
            shared,
            workers: Mutex::new(workers),
            capacity: queue_capacity,
        })
    }

    /// Append `task` to the queue
    ///
    /// Never blocks: if the pool is shutting down or the queue is full, the
    /// task is handed back inside the error.
    pub fn submit(&self, task: T) -> Result<(), Rejected<T>> {
        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            return Err(Rejected::new(RejectedError::ShuttingDown, task));
        };
        sender.try_send(task).map_err(|err| match err {
            TrySendError::Full(task) => Rejected::new(
                RejectedError::QueueFull {
                    capacity: self.capacity,
                },
                task,
            ),
            TrySendError::Disconnected(task) => Rejected::new(RejectedError::ShuttingDown, task),
        })
    }

    /// Stop accepting tasks, stop the workers and wait for them to exit
    ///
    /// Only the first call has an effect.
    pub fn shutdown(&self, mode: ShutdownMode) {
        let sender = {
            let mut guard = self.sender.write();
            let Some(sender) = guard.take() else {
                return;
            };
            if mode == ShutdownMode::Immediate {
                self.shared.discard.store(true, Ordering::Release);
            }
            sender
        };
        info!(?mode, queued = self.shared.tasks.len(), "shutting worker pool down");

        // wakes every idle worker
        drop(sender);
        join_workers(std::mem::take(&mut *self.workers.lock()));

        let mut leftover = 0;
        while let Ok(task) = self.shared.tasks.try_recv() {
            self.shared.abandon(task);
            leftover += 1;
        }
        let stats = self.stats();
        if stats.discarded > 0 {
            warn!(discarded = stats.discarded, leftover, "queued tasks were discarded");
        }
        info!(
            completed = stats.completed,
            panicked = stats.panicked,
            "worker pool stopped"
        );
    }

    /// Whether shutdown has begun
    pub fn is_shutting_down(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Number of worker threads
    pub fn workers(&self) -> usize {
        self.shared.states.len()
    }

    /// Current state of every worker, indexed by worker number
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.shared
            .states
            .iter()
            .map(|s| WorkerState::from_u8(s.load(Ordering::Acquire)))
            .collect()
    }

    /// Snapshot of the pool's counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.workers(),
            queued: self.shared.tasks.len(),
            completed: self.shared.completed.load(Ordering::Relaxed),
            panicked: self.shared.panicked.load(Ordering::Relaxed),
            discarded: self.shared.discarded.load(Ordering::Relaxed),
        }
    }
}

impl<T: Task> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.shutdown(ShutdownMode::Immediate);
    }
}

fn join_workers(workers: Vec<JoinHandle<()>>) {
    for handle in workers {
        if handle.join().is_err() {
            warn!("worker thread panicked outside of a task");
        }
    }
}
