pub mod failure;
pub mod http;
pub mod orchestrator;
pub mod poller;
pub mod registry;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GenerationError;
use failure::{FailureKind, classify_failure};

/// Backend-assigned task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Generation status as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Failed,
    Processing,
    Succeeded,
    Pending,
    /// Reached the end without a known success/fail classification.
    Finished,
    /// Superseded by a fallback task created server-side.
    Replaced,
    Unknown(i64),
}

impl TaskStatus {
    /// Statuses the poll cycle asks the backend for.
    pub const TERMINAL: [TaskStatus; 4] = [
        TaskStatus::Succeeded,
        TaskStatus::Failed,
        TaskStatus::Finished,
        TaskStatus::Replaced,
    ];

    pub fn code(self) -> i64 {
        match self {
            Self::Failed => 0,
            Self::Processing => 1,
            Self::Succeeded => 2,
            Self::Pending => 3,
            Self::Finished => 4,
            Self::Replaced => 5,
            Self::Unknown(c) => c,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Failed,
            1 => Self::Processing,
            2 => Self::Succeeded,
            3 => Self::Pending,
            4 => Self::Finished,
            5 => Self::Replaced,
            other => Self::Unknown(other),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Finished | Self::Replaced
        )
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        i64::deserialize(d).map(Self::from_code)
    }
}

/// Task-type discriminator for the status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskType {
    Image,
    #[default]
    Video,
    Character,
}

impl TaskType {
    pub fn code(self) -> i64 {
        match self {
            Self::Image => 1,
            Self::Video => 2,
            Self::Character => 11,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Character => "character",
        }
    }

    /// Error text used when a failed task carries no failure message.
    pub fn default_failure_message(self) -> &'static str {
        match self {
            Self::Image => "Failed to generate image",
            Self::Video => "Failed to generate video",
            Self::Character => "Failed to generate character",
        }
    }
}

impl Serialize for TaskType {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(self.code())
    }
}

/// A generation request as accepted by the submit endpoint.
/// Model-specific parameters (size, duration, style...) ride in `params`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(rename = "target_model")]
    pub model: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_frame_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_generations: Option<u32>,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Batched status lookup. With no ids the backend matches every task of the
/// caller, optionally narrowed to one tool.
#[derive(Debug, Clone, Serialize)]
pub struct StatusQuery {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub task_ids: Vec<TaskId>,
    #[serde(rename = "status")]
    pub statuses: Vec<TaskStatus>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

/// One task row returned by the status endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub generation_id: Option<u64>,
    #[serde(default)]
    pub failure: Option<String>,
    #[serde(default, alias = "failureCode")]
    pub failure_code: Option<String>,
}

impl TaskRecord {
    pub fn failure_kind(&self) -> FailureKind {
        classify_failure(self.failure.as_deref(), self.failure_code.as_deref())
    }
}

/// Resolved value of a task. Failure is data, not an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TaskOutcome {
    Succeeded { url: String, id: u64 },
    Failed {
        error: String,
        id: u64,
        kind: FailureKind,
    },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Succeeded { url, .. } => Some(url),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }
}

/// Submit and status endpoints consumed by the orchestrator.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Submit a generation request. Returns the backend task ids in order.
    async fn submit_task(&self, req: &GenerationRequest) -> Result<Vec<TaskId>, GenerationError>;

    /// Batched status lookup, pre-filtered by status and task type.
    async fn query_tasks(&self, query: &StatusQuery) -> Result<Vec<TaskRecord>, GenerationError>;
}
