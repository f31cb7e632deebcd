use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("submission rejected (code {code:?}): {message}")]
    Rejected { code: Option<i64>, message: String },

    #[error("rate limited: {message}")]
    RateLimited { message: String },

    #[error("not enough credits: {message}")]
    InsufficientCredits { message: String },

    #[error("generation model not found: {message}")]
    ModelNotFound { message: String },

    #[error("generation task not found: {message}")]
    TaskNotFound { message: String },

    #[error("invalid params: {message}")]
    InvalidParams { message: String },

    #[error("auth failed: {message}")]
    AuthFailed { message: String },

    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        status: Option<u16>,
    },

    #[error("status query failed: {message}")]
    QueryFailed { message: String },

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl GenerationError {
    /// Map a backend envelope `error_code` to a structured error.
    pub fn from_error_code(code: Option<i64>, message: String) -> Self {
        match code {
            Some(1010) => Self::RateLimited { message },
            Some(1011) => Self::InsufficientCredits { message },
            Some(1005) => Self::ModelNotFound { message },
            Some(1006) => Self::TaskNotFound { message },
            Some(1007) => Self::InvalidParams { message },
            _ => Self::Rejected { code, message },
        }
    }

    /// Returns true for transient errors that may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Timeout(_) => true,
            // status: None = not from HTTP, treated as permanent
            Self::Upstream { status, .. } => status.is_some_and(|s| s >= 500),
            Self::Request(_) => true,
            Self::QueryFailed { .. } => true,
            _ => false,
        }
    }

    /// Sanitized message for display. Never includes URLs, bodies or task ids.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { .. } => "generation request was rejected".to_string(),
            Self::RateLimited { .. } => "rate limit exceeded, try again shortly".to_string(),
            Self::InsufficientCredits { .. } => "not enough credits for this generation".to_string(),
            Self::ModelNotFound { .. } => "generation model not found".to_string(),
            Self::TaskNotFound { .. } => "generation task not found".to_string(),
            Self::InvalidParams { .. } => "invalid generation parameters".to_string(),
            Self::AuthFailed { .. } => "authentication failed".to_string(),
            Self::Upstream { status: Some(s), .. } => format!("generation service error (HTTP {s})"),
            Self::Upstream { status: None, .. } => "generation service error".to_string(),
            Self::QueryFailed { .. } => "failed to check generation status".to_string(),
            Self::SchemaParse(_) => "failed to parse generation service response".to_string(),
            Self::Request(_) => "request to generation service failed".to_string(),
            Self::Timeout(ms) => format!("generation timed out after {ms}ms"),
            Self::Config(msg) => format!("configuration error: {msg}"),
            Self::Other(msg) => msg.clone(),
        }
    }
}
