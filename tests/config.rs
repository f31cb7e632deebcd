use std::time::Duration;

use mediagen::config::{ChannelFailurePolicy, Config, DEFAULT_POLL_INTERVAL_MS};
use mediagen::error::GenerationError;
use mediagen::routing::AutoModelRouter;
use mediagen::routing::RoutingInput;

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.poll.interval, Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
    assert_eq!(config.poll.interval, Duration::from_secs(5));
    assert_eq!(config.poll.channel_failure_policy, ChannelFailurePolicy::Stop);
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert!(config.api_key.is_none());
}

#[test]
fn toml_overrides_env_values() {
    let mut config = Config::default();
    config
        .apply_toml(
            r#"
            base_url = "https://api.example.test"
            request_timeout_secs = 12

            [poll]
            interval_ms = 2500
            channel_failure_policy = "retry"

            [router]
            stylized_model = "Anime X"
            general_styles = ["[house-style]"]
            "#,
        )
        .unwrap();

    assert_eq!(config.base_url, "https://api.example.test");
    assert_eq!(config.request_timeout, Duration::from_secs(12));
    assert_eq!(config.poll.interval, Duration::from_millis(2500));
    assert_eq!(config.poll.channel_failure_policy, ChannelFailurePolicy::Retry);
    assert_eq!(config.router.stylized_model.as_deref(), Some("Anime X"));

    let router = AutoModelRouter::with_overrides(&config.router);
    let input = RoutingInput {
        mode: "Auto Model".into(),
        prompt: "[house-style] a fox".into(),
        reference_images: Vec::new(),
        available_characters: None,
    };
    assert_eq!(router.resolve(&input), "Gemini");
}

#[test]
fn empty_toml_keeps_everything() {
    let mut config = Config::default();
    config.apply_toml("").unwrap();
    assert_eq!(config.base_url, Config::default().base_url);
    assert_eq!(config.poll, Config::default().poll);
}

#[test]
fn zero_interval_is_rejected() {
    let mut config = Config::default();
    let err = config.apply_toml("[poll]\ninterval_ms = 0\n").unwrap_err();
    assert!(matches!(err, GenerationError::Config(_)));
}

#[test]
fn zero_request_timeout_is_rejected() {
    let mut config = Config::default();
    let err = config.apply_toml("request_timeout_secs = 0\n").unwrap_err();
    assert!(matches!(err, GenerationError::Config(_)), "{err:?}");
    assert_eq!(config.request_timeout, Duration::from_secs(30));
}

#[test]
fn invalid_toml_is_config_error() {
    let mut config = Config::default();
    let err = config
        .apply_toml("[poll]\nchannel_failure_policy = \"sometimes\"\n")
        .unwrap_err();
    assert!(matches!(err, GenerationError::Config(_)), "{err:?}");
}

#[test]
fn policy_parse_is_case_insensitive() {
    assert_eq!(ChannelFailurePolicy::parse(" Retry "), Some(ChannelFailurePolicy::Retry));
    assert_eq!(ChannelFailurePolicy::parse("STOP"), Some(ChannelFailurePolicy::Stop));
    assert_eq!(ChannelFailurePolicy::parse("later"), None);
}
