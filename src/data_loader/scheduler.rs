use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_timer::Delay;
use futures_util::future::BoxFuture;

/// Runs the dispatch tasks of a [DataLoader](super::DataLoader).
///
/// Implemented for any `Fn(BoxFuture<'static, ()>) -> R`, so `tokio::spawn`
/// can be passed directly.
pub trait Spawner: Send + Sync + 'static {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

impl<F, R> Spawner for F
where
    F: Fn(BoxFuture<'static, ()>) -> R + Send + Sync + 'static,
{
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        self(task);
    }
}

/// Waits for the scheduler to move on to its next tick.
///
/// A zero delay yields once, which lets every task that is already runnable
/// (and every `load` it issues) go first.
pub(crate) async fn next_tick(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        Delay::new(delay).await;
    }
}

type Tasks = Arc<Mutex<VecDeque<BoxFuture<'static, ()>>>>;

/// A scheduler that only runs tasks when asked to.
///
/// Useful to observe exactly which dispatches a sequence of `load` calls
/// schedules.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    tasks: Tasks,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A spawner that queues tasks on this scheduler.
    pub fn spawner(&self) -> impl Fn(BoxFuture<'static, ()>) + Send + Sync + 'static {
        let tasks = self.tasks.clone();
        move |task| {
            tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(task);
        }
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Runs the oldest queued task to completion. Returns `false` if there was
    /// nothing to run.
    pub async fn run_next(&self) -> bool {
        let task = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match task {
            Some(task) => {
                task.await;
                true
            }
            None => false,
        }
    }

    /// Runs tasks, including the ones spawned while running, until the queue
    /// is empty. Returns how many ran.
    pub async fn run_until_idle(&self) -> usize {
        let mut count = 0;
        while self.run_next().await {
            count += 1;
        }
        count
    }

    /// Drops every queued task without running it, the way a runtime that
    /// shuts down does. Returns how many were dropped.
    pub fn discard_all(&self) -> usize {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        tasks.len()
    }
}
