use serde::Deserialize;

use crate::error::GenerationError;

/// Response envelope shared by the generation endpoints.
/// `code == 1` is success; failures carry `message`/`error` and an optional
/// `error_code`. Transport-level status is always 200 for envelope failures.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == 1
    }

    /// Unwrap the payload, mapping an envelope failure to a structured error.
    pub fn into_result(self) -> Result<T, GenerationError> {
        if !self.is_success() {
            let message = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(GenerationError::from_error_code(self.error_code, message));
        }
        self.data
            .ok_or_else(|| GenerationError::SchemaParse("success envelope missing 'data'".into()))
    }
}
