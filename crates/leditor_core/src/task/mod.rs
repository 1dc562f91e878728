use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicI32, Ordering},
        mpsc::{Receiver, TryRecvError},
        Arc,
    },
};

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("background task ended without producing a result")]
#[diagnostic(
    code(leditor::task::lost),
    help("the task panicked, the panic message was logged when it happened")
)]
pub struct TaskLost;

/// Number of tasks spawned through it that are still running.
/// Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct TaskCounter(Arc<AtomicI32>);

impl TaskCounter {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn count(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }
    pub fn is_running(&self) -> bool {
        self.count() != 0
    }
}

enum TaskState<T> {
    Running(Receiver<Option<T>>),
    // None when the task panicked
    Finished(Option<T>),
}

/// A single unit of work running on the rayon pool whose result is kept until asked for.
///
/// Tasks are meant to be stored in a `Vec` and awaited by index, so the consumer decides the order
/// in which results are observed, never the pool.
pub struct PendingTask<T> {
    state: TaskState<T>,
}

impl<T> PendingTask<T>
where
    T: Send + 'static,
{
    pub fn spawn<F>(counter: &TaskCounter, f: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        //https://doc.rust-lang.org/rust-by-example/std_misc/channels.html
        let (sender, receiver) = std::sync::mpsc::sync_channel(1);
        let nb = Arc::clone(&counter.0);
        nb.fetch_add(1, Ordering::Relaxed);
        rayon::spawn(move || {
            let outcome = {
                let _guard = scopeguard::guard((), |_| {
                    nb.fetch_sub(1, Ordering::Relaxed);
                });
                std::panic::catch_unwind(AssertUnwindSafe(f))
            };
            if outcome.is_err() {
                tracing::error!("background task panicked");
            }
            // the receiver may be gone if the owner was dropped, nobody is interested then
            let _ = sender.send(outcome.ok());
        });
        Self {
            state: TaskState::Running(receiver),
        }
    }
}

impl<T> PendingTask<T> {
    /// A task that is already done. Used to slot precomputed values among spawned ones.
    pub fn ready(value: T) -> Self {
        Self {
            state: TaskState::Finished(Some(value)),
        }
    }

    /// Non blocking check.
    pub fn is_finished(&mut self) -> bool {
        if let TaskState::Running(receiver) = &self.state {
            match receiver.try_recv() {
                Ok(outcome) => self.state = TaskState::Finished(outcome),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.state = TaskState::Finished(None),
            }
        }
        matches!(self.state, TaskState::Finished(_))
    }

    /// Blocks until the task is done. The result stays inside the task.
    pub fn wait(&mut self) -> Result<&T, TaskLost> {
        if let TaskState::Running(receiver) = &self.state {
            let outcome = receiver.recv().unwrap_or(None);
            self.state = TaskState::Finished(outcome);
        }
        match &self.state {
            TaskState::Finished(Some(value)) => Ok(value),
            _ => Err(TaskLost),
        }
    }

    /// Blocks until the task is done and hands over its result.
    pub fn take(mut self) -> Result<T, TaskLost> {
        self.wait()?;
        match self.state {
            TaskState::Finished(Some(value)) => Ok(value),
            _ => Err(TaskLost),
        }
    }
}
