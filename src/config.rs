//! In-memory application configuration.
//!
//! Nothing here is validated or persisted; the credential is only checked for
//! presence before clip rendering.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Model selected when nothing else is configured.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// User-facing settings plus the simulated latencies.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Free-text model identifier.
    pub ai_model: String,
    /// Credential for the video provider. Empty means unset.
    pub provider_api_key: String,
    pub timings: Timings,
    /// Cancel a stage's pending jobs when navigating away from it.
    pub cancel_on_navigate: bool,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Set model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.ai_model = model.into();
        self
    }

    /// Builder: Set provider credential.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.provider_api_key = key.into();
        self
    }

    /// Builder: Set timings.
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Builder: Set navigation cancellation.
    pub fn with_cancel_on_navigate(mut self, cancel: bool) -> Self {
        self.cancel_on_navigate = cancel;
        self
    }

    pub fn has_credential(&self) -> bool {
        !self.provider_api_key.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ai_model: DEFAULT_MODEL.to_string(),
            provider_api_key: String::new(),
            timings: Timings::default(),
            cancel_on_navigate: false,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.has_credential() { "<redacted>" } else { "<unset>" };
        f.debug_struct("AppConfig")
            .field("ai_model", &self.ai_model)
            .field("provider_api_key", &key)
            .field("timings", &self.timings)
            .field("cancel_on_navigate", &self.cancel_on_navigate)
            .finish()
    }
}

/// Simulated latencies, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub fetch_ms: u64,
    pub script_ms: u64,
    pub prompts_ms: u64,
    /// Clip `i` of a batch finishes after `(i + 1) * clip_stagger_ms`.
    pub clip_stagger_ms: u64,
    pub regenerate_ms: u64,
}

impl Timings {
    /// All delays set to zero.
    pub fn instant() -> Self {
        Self {
            fetch_ms: 0,
            script_ms: 0,
            prompts_ms: 0,
            clip_stagger_ms: 0,
            regenerate_ms: 0,
        }
    }

    pub fn fetch(&self) -> Duration {
        Duration::from_millis(self.fetch_ms)
    }

    pub fn script(&self) -> Duration {
        Duration::from_millis(self.script_ms)
    }

    pub fn prompts(&self) -> Duration {
        Duration::from_millis(self.prompts_ms)
    }

    /// Delay before the clip at `index` of a batch is ready.
    pub fn clip(&self, index: usize) -> Duration {
        Duration::from_millis(self.clip_stagger_ms.saturating_mul(index as u64 + 1))
    }

    pub fn regenerate(&self) -> Duration {
        Duration::from_millis(self.regenerate_ms)
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            fetch_ms: 1500,
            script_ms: 2000,
            prompts_ms: 2000,
            clip_stagger_ms: 1500,
            regenerate_ms: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.ai_model, "gpt-4");
        assert!(!config.has_credential());
        assert!(!config.cancel_on_navigate);
        assert_eq!(config.timings.fetch(), Duration::from_millis(1500));
        assert_eq!(config.timings.script(), Duration::from_secs(2));
    }

    #[test]
    fn test_clip_stagger() {
        let timings = Timings::default();
        assert_eq!(timings.clip(0), Duration::from_millis(1500));
        assert_eq!(timings.clip(3), Duration::from_millis(6000));
        assert_eq!(Timings::instant().clip(9), Duration::ZERO);
    }

    #[test]
    fn test_debug_redacts_credential() {
        let config = AppConfig::new().with_api_key("sk-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"provider_api_key":"k","timings":{"fetch_ms":10}}"#).unwrap();
        assert_eq!(config.ai_model, "gpt-4");
        assert!(config.has_credential());
        assert_eq!(config.timings.fetch_ms, 10);
        assert_eq!(config.timings.regenerate_ms, 2000);
    }
}
