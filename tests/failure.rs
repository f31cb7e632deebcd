//! Classification of terminal task failures.

use mediagen::dispatch::failure::{FailureKind, classify_failure};
use mediagen::dispatch::{TaskId, TaskRecord, TaskStatus};

// ---------------------------------------------------------------------------
// Failure text
// ---------------------------------------------------------------------------

#[test]
fn moderation_text_is_content_moderation() {
    for text in [
        "Detected inappropriate content",
        "NUDITY detected",
        "sexuality filter",
        "erotic output",
        "blocked by guardrails",
    ] {
        assert_eq!(
            classify_failure(Some(text), None),
            FailureKind::ContentModeration,
            "{text}"
        );
    }
}

#[test]
fn face_text_is_classified() {
    assert_eq!(classify_failure(Some("No face was found"), None), FailureKind::NoFace);
    assert_eq!(classify_failure(Some("face not found"), None), FailureKind::NoFace);
    assert_eq!(classify_failure(Some("Small face detected"), None), FailureKind::SmallFace);
    assert_eq!(classify_failure(Some("face is too small"), None), FailureKind::SmallFace);
}

#[test]
fn text_wins_over_code() {
    assert_eq!(
        classify_failure(Some("nudity"), Some("NO_FACE_FOUND")),
        FailureKind::ContentModeration
    );
    assert_eq!(
        classify_failure(Some("Internal error, retry"), Some("NO_FACE_FOUND")),
        FailureKind::Generic
    );
    assert_eq!(
        classify_failure(Some("server error"), Some("400")),
        FailureKind::Generic
    );
}

#[test]
fn unmatched_text_falls_through_to_code() {
    assert_eq!(
        classify_failure(Some("something odd"), Some("SMALL_FACE")),
        FailureKind::SmallFace
    );
    assert_eq!(classify_failure(Some(""), Some("400")), FailureKind::InvalidParams);
}

// ---------------------------------------------------------------------------
// Failure codes
// ---------------------------------------------------------------------------

#[test]
fn known_codes_map_to_kinds() {
    let cases = [
        ("NO_FACE_FOUND", FailureKind::NoFace),
        ("SMALL_FACE", FailureKind::SmallFace),
        ("SAFETY.INPUT.TEXT", FailureKind::ContentModeration),
        ("INTERNAL.BAD_OUTPUT.CODE01", FailureKind::Generic),
        ("500", FailureKind::Generic),
        ("400", FailureKind::InvalidParams),
    ];
    for (code, kind) in cases {
        assert_eq!(classify_failure(None, Some(code)), kind, "{code}");
    }
}

#[test]
fn other_code_is_character_motion() {
    assert_eq!(
        classify_failure(None, Some("MOTION.POSE_LOST")),
        FailureKind::CharacterMotion
    );
}

#[test]
fn nothing_to_go_on_is_generic() {
    assert_eq!(classify_failure(None, None), FailureKind::Generic);
    assert_eq!(classify_failure(Some(""), Some("")), FailureKind::Generic);
}

#[test]
fn record_classifies_its_own_fields() {
    let record = TaskRecord {
        id: TaskId(1),
        status: TaskStatus::Failed,
        output: None,
        generation_id: None,
        failure: Some("Face too small to animate".into()),
        failure_code: Some("NO_FACE_FOUND".into()),
    };
    assert_eq!(record.failure_kind(), FailureKind::SmallFace);
}

#[test]
fn only_generic_has_no_message() {
    assert_eq!(FailureKind::Generic.user_message(), None);
    assert!(FailureKind::NoFace.user_message().is_some());
    assert_eq!(FailureKind::default(), FailureKind::Generic);
}
