// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_LOG_LEVEL, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_SECONDS};
use crate::engine::WorkerSettings;
use crate::message::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration for one hosted processor service.
///
/// Loaded from YAML or TOML. Everything except `namespace` has a default, so
/// the smallest valid file is a single line.
///
/// # Example
/// ```yaml
/// namespace: ec2x
/// client:
///   timeout_seconds: 10
/// bus:
///   poll_interval_ms: 250
/// logging:
///   level: info
/// workers:
///   - name: heartbeat
///     loop: 5.0
///     messages:
///       - handler: ping
/// reactors:
///   - name: low_voltage
///     handler: read_voltage
///     condition: "$volts < 11.5"
///     actions:
///       - handler: notify
///         kwargs: { volts: "$volts" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub namespace: String,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub workers: Vec<WorkerConfig>,
    #[serde(default)]
    pub reactors: Vec<ReactorConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ClientConfig {
    /// Reply timeout; non-finite or negative values fall back to the default.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl BusConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// A worker created when the service starts.
///
/// Configured workers are created stopped and all start together once the
/// service enters its receive loop.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub name: String,
    /// Seconds between passes; absent means the worker runs when its queue changes.
    #[serde(rename = "loop", default)]
    pub loop_seconds: Option<f64>,
    #[serde(default = "default_true")]
    pub suppress_exceptions: bool,
    #[serde(default)]
    pub kill_upon_success: bool,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl WorkerConfig {
    pub fn settings(&self) -> WorkerSettings {
        WorkerSettings {
            loop_interval: self
                .loop_seconds
                .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok()),
            suppress_exceptions: self.suppress_exceptions,
            kill_upon_success: self.kill_upon_success,
            start: false,
        }
    }
}

/// A rule that dispatches follow-up messages when a handler result matches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReactorConfig {
    pub name: String,
    /// Only results of this handler are considered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    /// Keyword expression over the result's fields; must be truthy to fire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Message templates, resolved against the result before dispatch.
    #[serde(default)]
    pub actions: Vec<Value>,
}

fn default_timeout_seconds() -> f64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true() -> bool {
    true
}

/// Loads a service configuration, choosing the parser by file extension.
///
/// `.toml` files are read as TOML; anything else is read as YAML.
pub fn load_config<P: AsRef<Path>>(
    path: P,
) -> Result<ServiceConfig, Box<dyn std::error::Error + Send + Sync>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let config = if is_toml {
        toml::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(config)
}

/// Loads a service configuration and checks it with [`validate_service_config`].
///
/// All validation failures are reported together, one per line.
///
/// [`validate_service_config`]: crate::config::validate_service_config
pub fn load_and_validate_config<P: AsRef<Path>>(
    path: P,
) -> Result<ServiceConfig, Box<dyn std::error::Error + Send + Sync>> {
    let config = load_config(path)?;

    if let Err(validation_errors) = crate::config::validate_service_config(&config) {
        let error_messages: Vec<String> = validation_errors.iter().map(|e| e.to_string()).collect();
        let combined_error = format!(
            "Configuration validation failed:\n{}",
            error_messages.join("\n")
        );
        return Err(combined_error.into());
    }

    Ok(config)
}
