// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! * `hooks` - hook registry, listener and reactor events
//! * `worker` - worker lifecycle and outcome accounting
//! * `bus` - event-driven processor and client events

pub mod bus;
pub mod hooks;
pub mod worker;

use tracing::Span;

/// A log message that knows its level and structured fields.
pub trait StructuredLog {
    /// Emits the message at its level with its fields attached.
    fn log(&self);

    /// A span carrying the same fields, for work done on behalf of the event.
    fn span(&self, name: &str) -> Span;
}
