//! Classification of terminal task failures from the backend's free-text
//! `failure` and its `failure_code`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static MODERATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)inappropriate content|nudity|sexuality|erotic|guardrails")
        .expect("valid moderation regex")
});

static NO_FACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)no.*face.*found|face.*not.*found").expect("valid no-face regex")
});

static SMALL_FACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)small.*face|face.*too.*small").expect("valid small-face regex")
});

static INTERNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)internal.*error|server.*error").expect("valid internal-error regex")
});

/// Why a task failed, as far as the caller needs to react to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Prompt or output rejected by moderation.
    ContentModeration,
    /// No face detected in the input image.
    NoFace,
    /// Face in the input image too small to animate.
    SmallFace,
    InvalidParams,
    /// Any other coded failure from the character-motion pipeline.
    CharacterMotion,
    #[default]
    Generic,
}

impl FailureKind {
    /// Message text matching the kind. Generic failures use the task type's default.
    pub fn user_message(self) -> Option<&'static str> {
        match self {
            Self::ContentModeration => Some("Generation blocked by content moderation"),
            Self::NoFace => Some("No face found in the image"),
            Self::SmallFace => Some("The face in the image is too small"),
            Self::InvalidParams => Some("Invalid generation parameters"),
            Self::CharacterMotion => Some("Character motion generation failed"),
            Self::Generic => None,
        }
    }
}

/// Failure text wins over the code; known codes map to their kind, any other
/// code is a character-motion failure.
pub fn classify_failure(failure: Option<&str>, failure_code: Option<&str>) -> FailureKind {
    if let Some(text) = failure.filter(|f| !f.is_empty()) {
        if MODERATION_RE.is_match(text) {
            return FailureKind::ContentModeration;
        }
        if NO_FACE_RE.is_match(text) {
            return FailureKind::NoFace;
        }
        if SMALL_FACE_RE.is_match(text) {
            return FailureKind::SmallFace;
        }
        if INTERNAL_RE.is_match(text) {
            return FailureKind::Generic;
        }
    }

    match failure_code.filter(|c| !c.is_empty()) {
        Some("NO_FACE_FOUND") => FailureKind::NoFace,
        Some("SMALL_FACE") => FailureKind::SmallFace,
        Some("SAFETY.INPUT.TEXT") => FailureKind::ContentModeration,
        Some("INTERNAL.BAD_OUTPUT.CODE01") | Some("500") => FailureKind::Generic,
        Some("400") => FailureKind::InvalidParams,
        Some(_) => FailureKind::CharacterMotion,
        None => FailureKind::Generic,
    }
}
