use std::collections::HashMap;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;

use crate::dispatch::{TaskId, TaskOutcome};
use crate::error::GenerationError;

/// Pending entries keyed by task id.
///
/// Each entry is a `watch` channel that starts at `None` and is set exactly once.
/// Settling removes the entry, so a second settle for the same id is a no-op.
#[derive(Default)]
pub struct TaskRegistry {
    pending: Mutex<HashMap<TaskId, watch::Sender<Option<TaskOutcome>>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending entry. Returns false if the id is already pending.
    pub fn register(&self, id: TaskId) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.contains_key(&id) {
            return false;
        }
        let (tx, _rx) = watch::channel(None);
        pending.insert(id, tx);
        true
    }

    /// Settle and remove the entry. Returns false if no entry was pending.
    pub fn settle(&self, id: TaskId, outcome: TaskOutcome) -> bool {
        let tx = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.remove(&id)
        };
        match tx {
            Some(tx) => {
                // send_replace never fails, even with no live receivers.
                tx.send_replace(Some(outcome));
                true
            }
            None => false,
        }
    }

    /// Handle for one id. Unknown ids yield a handle that resolves to `None`.
    pub fn handle(&self, id: TaskId) -> TaskHandle {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        TaskHandle {
            id,
            rx: pending.get(&id).map(|tx| tx.subscribe()),
        }
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Awaitable result of one task.
///
/// Resolves to `Some(outcome)` once the task settles, or `None` when the id had
/// no pending entry at the time the handle was created. A task the backend never
/// reports as terminal keeps its handle pending forever; use `with_timeout` to bound it.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    rx: Option<watch::Receiver<Option<TaskOutcome>>>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// True if the handle refers to a registered task.
    pub fn is_tracked(&self) -> bool {
        self.rx.is_some()
    }

    /// Wait for the outcome.
    pub async fn wait(self) -> Option<TaskOutcome> {
        let mut rx = self.rx?;
        match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            // Sender dropped without settling (registry dropped).
            Err(_) => None,
        }
    }

    /// Wait for the outcome, failing with `Timeout` once `timeout` elapses.
    pub async fn with_timeout(self, timeout: Duration) -> Result<Option<TaskOutcome>, GenerationError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| GenerationError::Timeout(timeout.as_millis() as u64))
    }
}

impl IntoFuture for TaskHandle {
    type Output = Option<TaskOutcome>;
    type IntoFuture = Pin<Box<dyn Future<Output = Option<TaskOutcome>> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
