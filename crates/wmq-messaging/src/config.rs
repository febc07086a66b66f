//! Provider configuration.
//!
//! Every field carries a serde default, so an empty source yields a usable
//! configuration. [`ProviderConfig::load`] layers the sources:
//!
//! 1. `config/messaging.yaml` (optional)
//! 2. an explicit YAML file, when a path is given
//! 3. environment variables prefixed `WMQ__`, e.g. `WMQ__BACKOUT_LIMIT=3`
//!
//! Later sources override earlier ones.

use crate::error::ConfigurationError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Placeholder in a poison queue name pattern replaced by the receive queue name
pub const POISON_PATTERN_PLACEHOLDER: &str = "%s";

/// Settings of a [`MessagingProvider`](crate::provider::MessagingProvider)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub queue_manager_name: String,

    /// Logical destinations opened for output
    pub sending_queue_names: Vec<String>,

    pub received_queue_name: Option<String>,

    /// Explicit poison queue name; exclusive with the pattern
    pub poison_queue_name: Option<String>,

    /// Poison queue name pattern, e.g. `%s.POISON`
    pub poison_queue_name_pattern: Option<String>,

    /// A message redelivered more than this many times is poison
    pub backout_limit: i32,

    pub backout_limit_exceeded_exit_code: i32,
    pub backout_limit_exceeded_failure_code: Option<String>,
    pub put_poison_failed_exit_code: i32,
    pub put_poison_failed_failure_code: Option<String>,

    pub default_response_timeout_ms: i64,
    pub default_time_to_live_ms: i64,

    /// Run puts and gets under syncpoint in a distributed transaction
    pub use_xa: bool,

    pub persistence: bool,

    pub character_set_id: Option<i32>,

    /// Allow the native library to print its own diagnostics
    pub native_diagnostics: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            queue_manager_name: String::new(),
            sending_queue_names: Vec::new(),
            received_queue_name: None,
            poison_queue_name: None,
            poison_queue_name_pattern: None,
            backout_limit: 0,
            backout_limit_exceeded_exit_code: 190,
            backout_limit_exceeded_failure_code: None,
            put_poison_failed_exit_code: 191,
            put_poison_failed_failure_code: None,
            default_response_timeout_ms: 300_000,
            default_time_to_live_ms: 60_000,
            use_xa: true,
            persistence: true,
            character_set_id: None,
            native_diagnostics: false,
        }
    }
}

/// Millisecond setting as a duration; values beyond the representable range saturate
fn duration_from_ms(ms: i64) -> Duration {
    Duration::try_milliseconds(ms).unwrap_or(if ms < 0 { Duration::MIN } else { Duration::MAX })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ProviderConfig {
    pub fn new(queue_manager_name: impl Into<String>) -> Self {
        Self {
            queue_manager_name: queue_manager_name.into(),
            ..Self::default()
        }
    }

    /// Load configuration from the default file, an optional explicit file
    /// and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        Self::load_with_environment(
            path,
            config::Environment::with_prefix("WMQ").separator("__"),
        )
    }

    fn load_with_environment(
        path: Option<&Path>,
        environment: config::Environment,
    ) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder().add_source(
            config::File::with_name("config/messaging")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
        }

        let environment = environment
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("sending_queue_names");

        builder
            .add_source(environment)
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| ConfigurationError::Parsing {
                message: e.to_string(),
            })
    }

    pub fn received_queue_name(&self) -> Option<&str> {
        non_empty(&self.received_queue_name)
    }

    /// Check that the poison queue settings are consistent.
    ///
    /// Without a receive queue no poison queue may be configured; with one,
    /// at most one of the poison name and the poison pattern may be set.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let name = non_empty(&self.poison_queue_name);
        let pattern = non_empty(&self.poison_queue_name_pattern);

        let reason = match (self.received_queue_name(), name, pattern) {
            (None, Some(_), _) | (None, _, Some(_)) => Some(
                "if receivedQueueName was not set, must not be set poisonQueueNamePattern and poisonQueueName.",
            ),
            (Some(_), Some(_), Some(_)) => Some(
                "if receivedQueueName was set, must be set either poisonQueueNamePattern or poisonQueueName or must not be set both poisonQueueNamePattern and poisonQueueName.",
            ),
            _ => None,
        };

        match reason {
            Some(reason) => Err(ConfigurationError::InvalidPoisonSetting {
                reason,
                queue_manager_name: self.queue_manager_name.clone(),
                pattern: pattern.unwrap_or_default().to_string(),
                name: name.unwrap_or_default().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Poison queue name: the explicit name, or the pattern applied to the
    /// receive queue name
    pub fn resolved_poison_queue_name(&self) -> Option<String> {
        if let (Some(received), Some(pattern)) = (
            self.received_queue_name(),
            non_empty(&self.poison_queue_name_pattern),
        ) {
            return Some(pattern.replacen(POISON_PATTERN_PLACEHOLDER, received, 1));
        }
        non_empty(&self.poison_queue_name).map(str::to_string)
    }

    pub fn default_response_timeout(&self) -> Duration {
        duration_from_ms(self.default_response_timeout_ms)
    }

    pub fn default_time_to_live(&self) -> Duration {
        duration_from_ms(self.default_time_to_live_ms)
    }
}
