//! Fire-and-forget task queue and its dedicated worker.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::driver::SessionDriver;
use crate::executor;
use crate::pool::PoolShared;
use crate::types::RowValues;

/// Immutable snapshot of a deferred statement, captured at enqueue time.
#[derive(Debug, Clone)]
pub(crate) struct BackgroundTask {
    pub(crate) template: String,
    pub(crate) params: Vec<RowValues>,
}

impl BackgroundTask {
    pub(crate) fn new(template: &str, params: Vec<RowValues>) -> Self {
        Self {
            template: template.to_string(),
            params,
        }
    }
}

/// FIFO of pending tasks, shared between producers and the single worker.
///
/// Unbounded on purpose: a backlog is accepted silently and observable only
/// through the stats snapshot.
#[derive(Default)]
pub(crate) struct BackgroundQueue {
    tasks: Mutex<VecDeque<BackgroundTask>>,
}

impl BackgroundQueue {
    pub(crate) fn push(&self, task: BackgroundTask) {
        self.tasks.lock().push_back(task);
    }

    /// Swap the entire queue contents out under the lock.
    pub(crate) fn drain(&self) -> VecDeque<BackgroundTask> {
        std::mem::take(&mut *self.tasks.lock())
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().len()
    }
}

/// Worker loop: drain a batch, run it FIFO against the background connection,
/// sleep on the shutdown channel when the queue is empty.
///
/// The shutdown signal (or a disconnected channel) ends the loop; it is
/// checked between batches, never mid-statement.
pub(crate) fn worker_loop<D: SessionDriver>(shared: Arc<PoolShared<D>>, shutdown: Receiver<()>) {
    debug!("background worker started");
    loop {
        let batch = shared.queue.drain();
        if batch.is_empty() {
            match shutdown.recv_timeout(shared.config.drain_interval()) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => continue,
            }
        }
        for task in batch {
            trace!(template = task.template.as_str(), "running background task");
            executor::run(
                &shared.background,
                &task.template,
                &task.params,
                &shared.sink,
                &shared.errored,
            );
            shared.processed.fetch_add(1, Ordering::Relaxed);
            shared.background.note_dispatch();
        }
        match shutdown.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }
    }
    debug!("background worker stopped");
}
