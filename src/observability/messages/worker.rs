// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for worker lifecycle and outcome accounting.
//!
//! This module contains message types for logging events related to:
//! * Worker creation, start and termination
//! * Soft failures (warnings) and hard failures (errors) during a pass
//! * Rate-limited repeats of an already reported error

use crate::errors::ProcessorError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

fn schedule(loop_interval: Option<Duration>) -> String {
    match loop_interval {
        Some(interval) => format!("every {:?}", interval),
        None => "on queue change".to_string(),
    }
}

/// Worker registered with the processor.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use edge_processor::observability::messages::worker::WorkerCreated;
/// use std::time::Duration;
///
/// let msg = WorkerCreated {
///     worker: "heartbeat",
///     loop_interval: Some(Duration::from_secs(5)),
///     messages: 1,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct WorkerCreated<'a> {
    pub worker: &'a str,
    pub loop_interval: Option<Duration>,
    pub messages: usize,
}

impl Display for WorkerCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Created worker '{}' with {} message(s), running {}",
            self.worker,
            self.messages,
            schedule(self.loop_interval)
        )
    }
}

impl StructuredLog for WorkerCreated<'_> {
    fn log(&self) {
        tracing::info!(
            worker = self.worker,
            messages = self.messages,
            loop_interval = ?self.loop_interval,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "worker_created",
            span_name = name,
            worker = self.worker,
            messages = self.messages,
        )
    }
}

/// Worker thread entered its main loop.
///
/// # Log Level
/// `debug!` - Follows `WorkerCreated` for started workers
pub struct WorkerStarted<'a> {
    pub worker: &'a str,
    pub loop_interval: Option<Duration>,
}

impl Display for WorkerStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker '{}' thread started, running {}",
            self.worker,
            schedule(self.loop_interval)
        )
    }
}

impl StructuredLog for WorkerStarted<'_> {
    fn log(&self) {
        tracing::debug!(worker = self.worker, loop_interval = ?self.loop_interval, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("worker", span_name = name, worker = self.worker)
    }
}

/// Worker thread exited.
pub struct WorkerStopped<'a> {
    pub worker: &'a str,
    pub reason: &'a str,
}

impl Display for WorkerStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker '{}' exited: {}", self.worker, self.reason)
    }
}

impl StructuredLog for WorkerStopped<'_> {
    fn log(&self) {
        tracing::info!(worker = self.worker, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "worker_stopped",
            span_name = name,
            worker = self.worker,
            reason = self.reason,
        )
    }
}

/// Full-detail report of a hard failure inside a worker pass.
///
/// Emitted the first time a distinct error is seen and afterwards only as
/// often as the error rate limiter allows; see [`WorkerErrorRepeated`].
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct WorkerPassFailed<'a> {
    pub worker: &'a str,
    pub error: &'a ProcessorError,
    pub count: u64,
}

impl Display for WorkerPassFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker '{}' failed (occurrence {}): {:?}",
            self.worker, self.count, self.error
        )
    }
}

impl StructuredLog for WorkerPassFailed<'_> {
    fn log(&self) {
        tracing::error!(
            worker = self.worker,
            count = self.count,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "worker_pass_failed",
            span_name = name,
            worker = self.worker,
            count = self.count,
        )
    }
}

/// Compact report of an error already logged in full.
///
/// # Log Level
/// `debug!` - Suppressed repeat
pub struct WorkerErrorRepeated<'a> {
    pub worker: &'a str,
    pub error: &'a str,
    pub count: u64,
}

impl Display for WorkerErrorRepeated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker '{}' error repeated ({} times): {}",
            self.worker, self.count, self.error
        )
    }
}

impl StructuredLog for WorkerErrorRepeated<'_> {
    fn log(&self) {
        tracing::debug!(
            worker = self.worker,
            count = self.count,
            error = self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "worker_error_repeated",
            span_name = name,
            worker = self.worker,
            count = self.count,
        )
    }
}

/// Soft failure; never rate limited.
pub struct WorkerWarning<'a> {
    pub worker: &'a str,
    pub warning: &'a str,
    pub count: u64,
}

impl Display for WorkerWarning<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker '{}' warning (occurrence {}): {}",
            self.worker, self.count, self.warning
        )
    }
}

impl StructuredLog for WorkerWarning<'_> {
    fn log(&self) {
        tracing::warn!(
            worker = self.worker,
            count = self.count,
            warning = self.warning,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "worker_warning",
            span_name = name,
            worker = self.worker,
            count = self.count,
        )
    }
}

/// Worker terminated by an error it was not allowed to suppress.
///
/// # Log Level
/// `error!` - The worker is deregistered
pub struct WorkerFatal<'a> {
    pub worker: &'a str,
    pub error: &'a ProcessorError,
}

impl Display for WorkerFatal<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker '{}' terminated: {}", self.worker, self.error)
    }
}

impl StructuredLog for WorkerFatal<'_> {
    fn log(&self) {
        tracing::error!(worker = self.worker, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("worker_fatal", span_name = name, worker = self.worker)
    }
}

pub struct MessageEnqueued<'a> {
    pub worker: &'a str,
}

impl Display for MessageEnqueued<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Enqueued message to worker '{}'", self.worker)
    }
}

impl StructuredLog for MessageEnqueued<'_> {
    fn log(&self) {
        tracing::debug!(worker = self.worker, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("enqueue", span_name = name, worker = self.worker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_render_schedule() {
        let looping = WorkerCreated {
            worker: "heartbeat",
            loop_interval: Some(Duration::from_millis(10)),
            messages: 2,
        };
        assert_eq!(
            looping.to_string(),
            "Created worker 'heartbeat' with 2 message(s), running every 10ms"
        );

        let evented = WorkerStarted {
            worker: "gps",
            loop_interval: None,
        };
        assert_eq!(
            evented.to_string(),
            "Worker 'gps' thread started, running on queue change"
        );
    }
}
