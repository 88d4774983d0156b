//! Main-thread dispatch.
//!
//! The host application owns a single "main" thread and drains a task queue
//! from it once per tick. Transport workers hand closures to a
//! [`MainThreadDispatcher`], which enqueues them and waits on a one-shot
//! completion signal until the main thread has run them.
//!
//! ```text
//! worker thread                       main thread
//! ─────────────                       ───────────
//! run_on_main(f) ──enqueue──────────▶ MainThreadQueue::pump()
//!      │                                   │ runs f()
//!      ◀──────────oneshot(result)──────────┘
//! ```
//!
//! Calls made from the main thread itself run inline. The queue is FIFO and
//! executes one task at a time, so tasks never interleave.

use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, ThreadId};

use tokio::sync::{mpsc, oneshot};

use crate::error::DispatchError;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Creates a dispatcher/queue pair bound to the calling thread.
///
/// The calling thread becomes the main thread: it must be the one that
/// pumps the returned queue.
#[must_use]
pub fn main_thread() -> (MainThreadDispatcher, MainThreadQueue) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let main = thread::current().id();

    (
        MainThreadDispatcher { sender, main },
        MainThreadQueue {
            receiver,
            _not_send: PhantomData,
        },
    )
}

/// Handle used from any thread to run closures on the main thread.
#[derive(Debug, Clone)]
pub struct MainThreadDispatcher {
    sender: mpsc::UnboundedSender<Task>,
    main: ThreadId,
}

impl MainThreadDispatcher {
    /// Returns `true` if the caller is on the main thread.
    #[must_use]
    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main
    }

    /// Runs `f` on the main thread and returns its value.
    ///
    /// Runs inline when already on the main thread. Otherwise blocks the
    /// calling thread until the main thread has run the closure. The wait is
    /// unbounded. Must not be called from inside an async context; use
    /// [`run_on_main_async`](Self::run_on_main_async) there.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::QueueClosed`] if the queue was shut down before enqueueing
    /// - [`DispatchError::TaskDropped`] if the task was discarded or panicked
    pub fn run_on_main<T, F>(&self, f: F) -> Result<T, DispatchError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.is_main_thread() {
            return Ok(f());
        }

        let rx = self.enqueue(f)?;
        rx.blocking_recv().map_err(|_| DispatchError::TaskDropped)
    }

    /// Runs `f` on the main thread without a return value.
    ///
    /// Same blocking and inline rules as [`run_on_main`](Self::run_on_main).
    ///
    /// # Errors
    ///
    /// See [`run_on_main`](Self::run_on_main).
    pub fn execute_on_main<F>(&self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.run_on_main(f)
    }

    /// Runs `f` on the main thread, suspending the calling task until done.
    ///
    /// # Errors
    ///
    /// See [`run_on_main`](Self::run_on_main).
    pub async fn run_on_main_async<T, F>(&self, f: F) -> Result<T, DispatchError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.is_main_thread() {
            return Ok(f());
        }

        let rx = self.enqueue(f)?;
        rx.await.map_err(|_| DispatchError::TaskDropped)
    }

    fn enqueue<T, F>(&self, f: F) -> Result<oneshot::Receiver<T>, DispatchError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task: Task = Box::new(move || {
            // The waiter may have given up; nothing to report then.
            let _ = tx.send(f());
        });

        self.sender
            .send(task)
            .map_err(|_| DispatchError::QueueClosed)?;
        Ok(rx)
    }
}

/// The main thread's side of the dispatcher.
///
/// Not `Send`: it stays on the thread that created it.
#[derive(Debug)]
pub struct MainThreadQueue {
    receiver: mpsc::UnboundedReceiver<Task>,
    _not_send: PhantomData<*const ()>,
}

impl MainThreadQueue {
    /// Runs the tasks queued when called and returns how many ran.
    ///
    /// Called once per host tick. Never blocks. Tasks submitted while the
    /// pump is running wait for the next tick.
    pub fn pump(&mut self) -> usize {
        let budget = self.receiver.len();
        let mut ran = 0;
        while ran < budget {
            let Ok(task) = self.receiver.try_recv() else {
                break;
            };
            run_task(task);
            ran += 1;
        }
        ran
    }

    /// Runs tasks as they arrive until every dispatcher has been dropped.
    pub fn run(&mut self) {
        while let Some(task) = self.receiver.blocking_recv() {
            run_task(task);
        }
        tracing::debug!("Main-thread queue drained, all dispatchers gone");
    }

    /// Shuts the queue down.
    ///
    /// Further submissions fail with [`DispatchError::QueueClosed`]; tasks
    /// still queued are dropped and their callers see
    /// [`DispatchError::TaskDropped`].
    pub fn close(&mut self) {
        self.receiver.close();
        let mut dropped = 0_usize;
        while let Ok(task) = self.receiver.try_recv() {
            drop(task);
            dropped += 1;
        }
        if dropped > 0 {
            tracing::warn!(dropped, "Main-thread queue closed with pending tasks");
        }
    }
}

fn run_task(task: Task) {
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        tracing::error!("Main-thread task panicked");
    }
}
