// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the event-driven processor and the request/reply client.

use crate::errors::{BusError, ProcessorError};
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Event-driven processor entered its receive loop.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use edge_processor::observability::messages::bus::ProcessorStarted;
///
/// let msg = ProcessorStarted {
///     namespace: "ec2x",
///     workers: 2,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ProcessorStarted<'a> {
    pub namespace: &'a str,
    pub workers: usize,
}

impl Display for ProcessorStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Processor '{}' listening for requests with {} worker(s) started",
            self.namespace, self.workers
        )
    }
}

impl StructuredLog for ProcessorStarted<'_> {
    fn log(&self) {
        tracing::info!(namespace = self.namespace, workers = self.workers, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "processor",
            span_name = name,
            namespace = self.namespace,
        )
    }
}

pub struct ProcessorClosed<'a> {
    pub namespace: &'a str,
    pub workers: usize,
}

impl Display for ProcessorClosed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Processor '{}' closed, {} worker(s) killed",
            self.namespace, self.workers
        )
    }
}

impl StructuredLog for ProcessorClosed<'_> {
    fn log(&self) {
        tracing::info!(namespace = self.namespace, workers = self.workers, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "processor_closed",
            span_name = name,
            namespace = self.namespace,
        )
    }
}

pub struct EventReceived<'a> {
    pub tag: &'a str,
}

impl Display for EventReceived<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Received request on '{}'", self.tag)
    }
}

impl StructuredLog for EventReceived<'_> {
    fn log(&self) {
        tracing::debug!(tag = self.tag, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("request", span_name = name, tag = self.tag)
    }
}

pub struct ReplySent<'a> {
    pub tag: &'a str,
    pub error: bool,
}

impl Display for ReplySent<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.error {
            write!(f, "Sent error reply on '{}'", self.tag)
        } else {
            write!(f, "Sent reply on '{}'", self.tag)
        }
    }
}

impl StructuredLog for ReplySent<'_> {
    fn log(&self) {
        tracing::debug!(tag = self.tag, error = self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("reply", span_name = name, tag = self.tag)
    }
}

/// The workflow produced no result, so nothing is published.
pub struct ReplySkipped<'a> {
    pub tag: &'a str,
    pub workflow: &'a str,
}

impl Display for ReplySkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "No reply for '{}': {} workflow returned nothing",
            self.tag, self.workflow
        )
    }
}

impl StructuredLog for ReplySkipped<'_> {
    fn log(&self) {
        tracing::debug!(tag = self.tag, workflow = self.workflow, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("reply_skipped", span_name = name, tag = self.tag)
    }
}

/// A reply was requested for a message whose `_event_tag` is not a request tag.
///
/// # Log Level
/// `debug!` - The reply is dropped without fabricating a tag
pub struct MisroutedReply<'a> {
    pub event_tag: Option<&'a str>,
}

impl Display for MisroutedReply<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.event_tag {
            Some(tag) => write!(f, "Dropping reply: '{}' is not a request tag", tag),
            None => write!(f, "Dropping reply: message carries no event tag"),
        }
    }
}

impl StructuredLog for MisroutedReply<'_> {
    fn log(&self) {
        tracing::debug!(event_tag = ?self.event_tag, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("misrouted_reply", span_name = name, event_tag = ?self.event_tag)
    }
}

pub struct DuplicateEventSuppressed<'a> {
    pub tag: &'a str,
    pub filter: &'a str,
}

impl Display for DuplicateEventSuppressed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Suppressed duplicate event on '{}' (filter '{}')",
            self.tag, self.filter
        )
    }
}

impl StructuredLog for DuplicateEventSuppressed<'_> {
    fn log(&self) {
        tracing::trace!(tag = self.tag, filter = self.filter, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "duplicate_suppressed",
            span_name = name,
            tag = self.tag,
            filter = self.filter,
        )
    }
}

/// Processing a request failed; the error becomes the reply payload.
///
/// # Log Level
/// `warn!` - The client receives `{"error": ...}`
pub struct ProcessingFailed<'a> {
    pub tag: &'a str,
    pub error: &'a ProcessorError,
}

impl Display for ProcessingFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Processing '{}' failed: {}", self.tag, self.error)
    }
}

impl StructuredLog for ProcessingFailed<'_> {
    fn log(&self) {
        tracing::warn!(tag = self.tag, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("processing_failed", span_name = name, tag = self.tag)
    }
}

pub struct BusReconnecting<'a> {
    pub namespace: &'a str,
    pub error: &'a BusError,
}

impl Display for BusReconnecting<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Processor '{}' lost its bus connection ({}), reconnecting",
            self.namespace, self.error
        )
    }
}

impl StructuredLog for BusReconnecting<'_> {
    fn log(&self) {
        tracing::warn!(namespace = self.namespace, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("reconnect", span_name = name, namespace = self.namespace)
    }
}

pub struct WorkerFailurePublished<'a> {
    pub worker: &'a str,
    pub tag: &'a str,
}

impl Display for WorkerFailurePublished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Published failure of worker '{}' on '{}'", self.worker, self.tag)
    }
}

impl StructuredLog for WorkerFailurePublished<'_> {
    fn log(&self) {
        tracing::info!(worker = self.worker, tag = self.tag, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "worker_failure",
            span_name = name,
            worker = self.worker,
            tag = self.tag,
        )
    }
}

/// Client gave up waiting; a late reply is discarded.
///
/// # Log Level
/// `warn!` - The request may still be processed remotely
pub struct ClientTimedOut<'a> {
    pub tag: &'a str,
    pub timeout: Duration,
}

impl Display for ClientTimedOut<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "No reply for '{}' within {:?}",
            self.tag, self.timeout
        )
    }
}

impl StructuredLog for ClientTimedOut<'_> {
    fn log(&self) {
        tracing::warn!(
            tag = self.tag,
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "client_timeout",
            span_name = name,
            tag = self.tag,
            timeout = ?self.timeout,
        )
    }
}

/// Uncollected replies were released after their retention period.
///
/// # Log Level
/// `debug!` - Fire-and-forget requests end up here routinely
pub struct PendingRepliesExpired {
    pub released: usize,
    pub retention: Duration,
}

impl Display for PendingRepliesExpired {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Released {} uncollected reply subscription(s) older than {:?}",
            self.released, self.retention
        )
    }
}

impl StructuredLog for PendingRepliesExpired {
    fn log(&self) {
        tracing::debug!(
            released = self.released,
            retention_ms = self.retention.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "pending_replies_expired",
            span_name = name,
            released = self.released,
        )
    }
}
