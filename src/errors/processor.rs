// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while dispatching messages through hooks, workflows and workers.

use serde_json::{json, Value};
use thiserror::Error;

use super::BusError;
use crate::keywords::KeywordError;

/// Misconfiguration surfaced to the caller and never suppressed inside workers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// No hook is registered under the key and no built-in carries that name.
    #[error("unknown hook: {key}")]
    UnknownHook { key: String },

    /// The management workflow did not recognize the command.
    #[error("invalid or unknown command: {0}")]
    UnknownCommand(String),

    /// A hook override string could not be parsed.
    #[error("malformed hook url '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    /// A setting or argument had the wrong shape.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    /// A destructive bulk operation targeted `*` without `force_wildcard`.
    #[error("refusing to {action} every worker without force_wildcard")]
    WildcardNotForced { action: String },
}

/// Every failure a hook invocation can produce.
///
/// `Warning` is the soft failure counted in a worker's `distinct_warnings`;
/// everything else is a hard failure.
#[derive(Error, Debug, Clone)]
pub enum ProcessorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Rejection payload returned by a validator hook.
    #[error("{}", payload_text(.0))]
    Validation(Value),

    /// Error raised by a handler; a mapping payload is surfaced structurally.
    #[error("{}", payload_text(.0))]
    Handler(Value),

    /// Soft failure; the worker records it and carries on.
    #[error("{0}")]
    Warning(String),

    /// Failure that terminated a worker running with `suppress_exceptions=false`.
    #[error("fatal: {0}")]
    Fatal(String),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("message codec error: {0}")]
    Codec(String),

    #[error(transparent)]
    Keyword(#[from] KeywordError),
}

impl ProcessorError {
    pub fn handler(payload: impl Into<Value>) -> Self {
        ProcessorError::Handler(payload.into())
    }

    pub fn validation(payload: impl Into<Value>) -> Self {
        ProcessorError::Validation(payload.into())
    }

    pub fn warning(message: impl Into<String>) -> Self {
        ProcessorError::Warning(message.into())
    }

    pub fn is_soft(&self) -> bool {
        matches!(self, ProcessorError::Warning(_))
    }

    /// Builds the `{"error": ...}` reply payload for this error.
    pub fn to_reply(&self) -> Value {
        match self {
            ProcessorError::Validation(payload) | ProcessorError::Handler(payload)
                if payload.is_object() =>
            {
                json!({ "error": payload })
            }
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl From<serde_json::Error> for ProcessorError {
    fn from(err: serde_json::Error) -> Self {
        ProcessorError::Codec(err.to_string())
    }
}

fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
