use std::sync::{Arc, Mutex};

use futures_util::future::join_all;

use crate::config::{ChannelFailurePolicy, PollConfig};
use crate::dispatch::failure::FailureKind;
use crate::dispatch::poller::Poller;
use crate::dispatch::registry::{TaskHandle, TaskRegistry};
use crate::dispatch::{
    GenerationRequest, StatusQuery, TaskBackend, TaskId, TaskOutcome, TaskRecord, TaskStatus,
    TaskType,
};
use crate::error::GenerationError;

/// Error text for a task the backend superseded with a fallback task.
pub const REPLACED_MESSAGE: &str = "Task was replaced by a fallback task";

/// Submits generation tasks and multiplexes their completion over one polling loop.
///
/// One orchestrator tracks one task type. Every task submitted through it shares
/// a single status query per poll cycle, however many are in flight. Cloning is
/// cheap and shares all state.
#[derive(Clone)]
pub struct TaskOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn TaskBackend>,
    task_type: TaskType,
    failure_policy: ChannelFailurePolicy,
    registry: TaskRegistry,
    /// Ids awaiting a terminal status, in tracking order.
    active: Mutex<Vec<TaskId>>,
    poller: Poller,
}

impl std::fmt::Debug for TaskOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskOrchestrator")
            .field("task_type", &self.inner.task_type)
            .field("failure_policy", &self.inner.failure_policy)
            .field("active", &self.active_task_ids())
            .field("pending", &self.pending_count())
            .field("poller", &self.inner.poller)
            .finish()
    }
}

impl TaskOrchestrator {
    pub fn new(backend: Arc<dyn TaskBackend>, task_type: TaskType, poll: &PollConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                task_type,
                failure_policy: poll.channel_failure_policy,
                registry: TaskRegistry::new(),
                active: Mutex::new(Vec::new()),
                poller: Poller::new(poll.interval),
            }),
        }
    }

    pub fn task_type(&self) -> TaskType {
        self.inner.task_type
    }

    /// Submit a request and register one pending entry per returned task id.
    /// A rejected submission registers nothing.
    pub async fn submit(&self, req: &GenerationRequest) -> Result<Vec<TaskId>, GenerationError> {
        let task_ids = self.inner.backend.submit_task(req).await.inspect_err(|e| {
            tracing::warn!(
                model = req.model,
                task_type = self.inner.task_type.as_str(),
                "generation submit failed: {e}"
            );
        })?;

        for id in &task_ids {
            if !self.inner.registry.register(*id) {
                tracing::warn!(task_id = %id, "task id already pending, keeping existing entry");
            }
        }

        tracing::info!(
            model = req.model,
            task_type = self.inner.task_type.as_str(),
            task_ids = ?task_ids,
            "generation submitted"
        );
        Ok(task_ids)
    }

    /// Add ids to the active poll set and make sure the poller is running.
    pub fn track(&self, task_ids: &[TaskId]) {
        // Held across the poller check so a cycle cannot cancel in between.
        let mut active = self.inner.active.lock().unwrap_or_else(|e| e.into_inner());
        for id in task_ids {
            if !active.contains(id) {
                active.push(*id);
            }
        }
        if active.is_empty() || self.inner.poller.is_polling() {
            return;
        }

        let this = self.clone();
        if self.inner.poller.start(move || {
            let this = this.clone();
            async move { this.poll_cycle().await }
        }) {
            tracing::debug!(
                task_type = self.inner.task_type.as_str(),
                tracked = active.len(),
                "poller started"
            );
        }
    }

    /// One handle per id, in the given order.
    pub fn results_for(&self, task_ids: &[TaskId]) -> Vec<TaskHandle> {
        task_ids
            .iter()
            .map(|id| self.inner.registry.handle(*id))
            .collect()
    }

    /// Submit, then start polling for the returned ids.
    pub async fn submit_and_track(
        &self,
        req: &GenerationRequest,
    ) -> Result<Vec<TaskHandle>, GenerationError> {
        let task_ids = self.submit(req).await?;
        // Handles first: a fast poll cycle must not settle an entry nobody holds yet.
        let handles = self.results_for(&task_ids);
        self.track(&task_ids);
        Ok(handles)
    }

    /// Submit, track and wait for every task of the request.
    pub async fn generate(
        &self,
        req: &GenerationRequest,
    ) -> Result<Vec<Option<TaskOutcome>>, GenerationError> {
        let handles = self.submit_and_track(req).await?;
        Ok(join_all(handles.into_iter().map(TaskHandle::wait)).await)
    }

    /// Pick up tasks still processing server-side, e.g. after a restart.
    ///
    /// Queries each tool once (or once unfiltered when `tools` is empty) for
    /// processing tasks, registers every id found and starts tracking them. A
    /// failed query for one tool is logged and skipped.
    pub async fn resume(&self, tools: &[&str]) -> Vec<TaskId> {
        let filters: Vec<Option<String>> = if tools.is_empty() {
            vec![None]
        } else {
            tools.iter().map(|t| Some(t.to_string())).collect()
        };

        let queries = filters.into_iter().map(|tool| {
            let query = StatusQuery {
                task_ids: Vec::new(),
                statuses: vec![TaskStatus::Processing],
                task_type: self.inner.task_type,
                tool,
            };
            async move {
                let result = self.inner.backend.query_tasks(&query).await;
                (query.tool, result)
            }
        });

        let mut found = Vec::new();
        for (tool, result) in join_all(queries).await {
            match result {
                Ok(records) => {
                    for record in records {
                        if !found.contains(&record.id) {
                            found.push(record.id);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        task_type = self.inner.task_type.as_str(),
                        tool = tool.as_deref().unwrap_or("*"),
                        "processing task lookup failed: {e}"
                    );
                }
            }
        }

        for id in &found {
            self.inner.registry.register(*id);
        }
        self.track(&found);

        tracing::info!(
            task_type = self.inner.task_type.as_str(),
            task_ids = ?found,
            "resumed processing tasks"
        );
        found
    }

    /// One poll cycle: query every active id once and settle the terminal ones.
    pub async fn poll_cycle(&self) -> Result<(), GenerationError> {
        let task_ids = {
            let active = self.inner.active.lock().unwrap_or_else(|e| e.into_inner());
            if active.is_empty() {
                self.inner.poller.cancel();
                return Ok(());
            }
            active.clone()
        };

        let query = StatusQuery {
            task_ids,
            statuses: TaskStatus::TERMINAL.to_vec(),
            task_type: self.inner.task_type,
            tool: None,
        };

        let records = match self.inner.backend.query_tasks(&query).await {
            Ok(records) => records,
            Err(e) => match self.inner.failure_policy {
                ChannelFailurePolicy::Stop => {
                    tracing::error!(
                        task_type = self.inner.task_type.as_str(),
                        abandoned = query.task_ids.len(),
                        "status query failed, stopping poller: {e}"
                    );
                    self.inner.poller.cancel();
                    return Ok(());
                }
                ChannelFailurePolicy::Retry => return Err(e),
            },
        };

        tracing::debug!(
            task_type = self.inner.task_type.as_str(),
            queried = query.task_ids.len(),
            returned = records.len(),
            "poll cycle"
        );

        for record in &records {
            self.apply(record);
        }

        let active = self.inner.active.lock().unwrap_or_else(|e| e.into_inner());
        if active.is_empty() {
            self.inner.poller.cancel();
            tracing::debug!(task_type = self.inner.task_type.as_str(), "all tasks settled");
        }
        Ok(())
    }

    fn apply(&self, record: &TaskRecord) {
        if !record.status.is_terminal() {
            return;
        }

        let outcome = self.outcome_for(record);
        if self.inner.registry.settle(record.id, outcome.clone()) {
            tracing::info!(
                task_id = %record.id,
                status = record.status.code(),
                success = outcome.is_success(),
                "task settled"
            );
        }

        // Settle first, then stop polling for it.
        let mut active = self.inner.active.lock().unwrap_or_else(|e| e.into_inner());
        active.retain(|id| *id != record.id);
    }

    fn outcome_for(&self, record: &TaskRecord) -> TaskOutcome {
        let failed = |error: String, kind: FailureKind| TaskOutcome::Failed {
            error,
            id: record.id.0,
            kind,
        };
        match record.status {
            TaskStatus::Succeeded => match &record.output {
                Some(url) if !url.is_empty() => TaskOutcome::Succeeded {
                    url: url.clone(),
                    id: record.generation_id.unwrap_or(record.id.0),
                },
                _ => failed(self.failure_message(record), FailureKind::Generic),
            },
            TaskStatus::Replaced => failed(REPLACED_MESSAGE.to_string(), FailureKind::Generic),
            _ => failed(self.failure_message(record), record.failure_kind()),
        }
    }

    fn failure_message(&self, record: &TaskRecord) -> String {
        record
            .failure
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(self.inner.task_type.default_failure_message())
            .to_string()
    }

    /// Snapshot of the active poll set.
    pub fn active_task_ids(&self) -> Vec<TaskId> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of unsettled registry entries.
    pub fn pending_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_polling()
    }

    /// Stop polling. Pending handles stay pending; `track` restarts the loop.
    pub fn shutdown(&self) {
        self.inner.poller.cancel();
    }
}
