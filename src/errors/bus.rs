// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// Failures reported by an event-bus transport.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusError {
    /// Receive was attempted on a handle opened with `listen = false`.
    #[error("bus handle was opened without listen")]
    NotListening,

    /// The processor was used before `init` attached its handles.
    #[error("bus handles are not attached")]
    NotConnected,

    /// The transport went away; listeners may reconnect.
    #[error("bus disconnected")]
    Disconnected,

    /// A subscription pattern could not be compiled.
    #[error("invalid match pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors surfaced to callers of the request/reply client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No reply arrived in time. The request may still be processed remotely.
    #[error("timed out after {timeout:?} waiting for reply on '{tag}'")]
    Timeout { tag: String, timeout: Duration },

    /// The remote handler failed; `detail` carries a structured error payload.
    #[error("{message}")]
    Handler {
        message: String,
        detail: Option<Map<String, Value>>,
    },

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("message codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
