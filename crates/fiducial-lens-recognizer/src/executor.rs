//! Execution contexts the recognizer schedules its stages on.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

/// A unit of work handed to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Somewhere to run a task later (or right now).
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task);
}

fn run_guarded(name: &str, task: Task) {
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        log::error!("task panicked on {name}");
    }
}

/// Runs every task synchronously on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}

/// FIFO drained by one dedicated, named thread.
///
/// Tasks never overlap, so the queue doubles as the lock around whatever
/// state only its tasks touch. Dropping the queue lets pending tasks finish
/// and joins the thread.
pub struct SerialQueue {
    name: String,
    tx: Option<mpsc::Sender<Task>>,
    handle: Option<JoinHandle<()>>,
}

impl SerialQueue {
    pub fn new(name: impl Into<String>) -> std::io::Result<Self> {
        let name = name.into();
        let (tx, rx) = mpsc::channel::<Task>();
        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while let Ok(task) = rx.recv() {
                    run_guarded(&thread_name, task);
                }
                log::trace!("queue {thread_name} drained");
            })?;
        Ok(Self {
            name,
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Executor for SerialQueue {
    fn execute(&self, task: Task) {
        let sent = self.tx.as_ref().map(|tx| tx.send(task).is_ok());
        if sent != Some(true) {
            log::warn!("queue {} is closed; task dropped", self.name);
        }
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            // the last owner may be a task running on this very queue
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue").field("name", &self.name).finish()
    }
}

/// Small rayon pool for pure CPU work.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// `threads == 0` lets rayon pick the thread count.
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("fiducial-lens-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Executor for WorkerPool {
    fn execute(&self, task: Task) {
        self.pool.spawn(move || run_guarded("worker pool", task));
    }
}

/// FIFO that only runs when its owner pumps it with [`ManualQueue::run_pending`].
///
/// Models an event-loop context such as a UI main thread.
#[derive(Default)]
pub struct ManualQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl ManualQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Run queued tasks, including ones they enqueue, until the queue is
    /// empty. Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.tasks.lock().pop_front();
            let Some(task) = next else { break };
            task();
            ran += 1;
        }
        ran
    }
}

impl Executor for ManualQueue {
    fn execute(&self, task: Task) {
        self.tasks.lock().push_back(task);
    }
}

impl std::fmt::Debug for ManualQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualQueue")
            .field("pending", &self.len())
            .finish()
    }
}
