use std::env;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::GenerationError;

/// Default delay between poll cycles.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// What the poll cycle does when the batched status query itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelFailurePolicy {
    /// Cancel the poller. Tasks still pending are abandoned.
    #[default]
    Stop,
    /// Hand the error to the poller, which logs it and tries again next cycle.
    Retry,
}

impl ChannelFailurePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" => Some(Self::Stop),
            "retry" => Some(Self::Retry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub channel_failure_policy: ChannelFailurePolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            channel_failure_policy: ChannelFailurePolicy::Stop,
        }
    }
}

/// Optional replacements for the router's target models and tag lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterOverrides {
    pub multi_image_model: Option<String>,
    pub high_fidelity_model: Option<String>,
    pub stylized_model: Option<String>,
    pub general_model: Option<String>,
    pub grid_model: Option<String>,
    pub grid_tags: Option<Vec<String>>,
    pub multi_image_grid_tags: Option<Vec<String>>,
    pub general_styles: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct Config {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub poll: PollConfig,
    pub router: RouterOverrides,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .field("poll", &self.poll)
            .field("router", &self.router)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll: PollConfig::default(),
            router: RouterOverrides::default(),
        }
    }
}

/// TOML file layout. Every key is optional and overrides the env value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    base_url: Option<String>,
    api_key: Option<String>,
    request_timeout_secs: Option<u64>,
    poll: FilePollConfig,
    router: RouterOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FilePollConfig {
    interval_ms: Option<u64>,
    channel_failure_policy: Option<ChannelFailurePolicy>,
}

impl Config {
    /// Read configuration from `MEDIAGEN_*` environment variables.
    /// Unparseable values fall back to defaults with a warning.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(url) = env::var("MEDIAGEN_API_BASE_URL") {
            config.base_url = url;
        } else {
            tracing::warn!("MEDIAGEN_API_BASE_URL not set, using {DEFAULT_BASE_URL}");
        }

        config.api_key = env::var("MEDIAGEN_API_KEY").ok().filter(|k| !k.is_empty());

        if let Some(ms) = env_u64("MEDIAGEN_POLL_INTERVAL_MS") {
            config.poll.interval = Duration::from_millis(ms);
        }

        if let Some(secs) = env_u64("MEDIAGEN_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(raw) = env::var("MEDIAGEN_CHANNEL_FAILURE_POLICY") {
            match ChannelFailurePolicy::parse(&raw) {
                Some(policy) => config.poll.channel_failure_policy = policy,
                None => tracing::warn!(
                    value = raw,
                    "unknown MEDIAGEN_CHANNEL_FAILURE_POLICY, keeping 'stop'"
                ),
            }
        }

        config
    }

    /// Load `.env`, read the environment, then apply the TOML file named by
    /// `MEDIAGEN_CONFIG` if set.
    pub fn load() -> Result<Self, GenerationError> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_env();
        if let Ok(path) = env::var("MEDIAGEN_CONFIG") {
            let text = std::fs::read_to_string(Path::new(&path))
                .map_err(|e| GenerationError::Config(format!("failed to read {path}: {e}")))?;
            config.apply_toml(&text)?;
            tracing::info!(path, "loaded config file");
        }
        Ok(config)
    }

    /// Overlay values from a TOML document.
    pub fn apply_toml(&mut self, text: &str) -> Result<(), GenerationError> {
        let file: FileConfig =
            toml::from_str(text).map_err(|e| GenerationError::Config(e.to_string()))?;

        if let Some(url) = file.base_url {
            self.base_url = url;
        }
        if let Some(key) = file.api_key {
            self.api_key = Some(key);
        }
        if let Some(secs) = file.request_timeout_secs {
            if secs == 0 {
                return Err(GenerationError::Config("request_timeout_secs must be > 0".into()));
            }
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = file.poll.interval_ms {
            if ms == 0 {
                return Err(GenerationError::Config("poll.interval_ms must be > 0".into()));
            }
            self.poll.interval = Duration::from_millis(ms);
        }
        if let Some(policy) = file.poll.channel_failure_policy {
            self.poll.channel_failure_policy = policy;
        }
        self.router = file.router;
        Ok(())
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Some(v),
        _ => {
            tracing::warn!(var = name, value = raw, "ignoring invalid value");
            None
        }
    }
}
