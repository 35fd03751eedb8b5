// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! A processor hosted on an event bus.
//!
//! Requests arrive on `{ns}/req/{id}`, run through [`Processor::process`] on
//! the thread that called [`EventDrivenProcessor::run`], and their results go
//! back on `{ns}/res/{id}`. Every failure becomes an `{"error": ...}` reply, so
//! a client always gets a reply or times out.
//!
//! ```text
//!   init ──► configured workers created stopped, matchers registered
//!   run  ──► workers `*` started ──► loop { next_event ─► matchers } ──► close
//! ```

use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::filter::OutgoingFilter;
use super::{failure_tag, reply_tag, request_pattern, Processor};
use crate::bus::{MatchGroups, MatchType, PatternCache};
use crate::config::consts::{DEFAULT_POLL_INTERVAL, RECONNECT_DELAY};
use crate::config::{ReactorConfig, WorkerConfig};
use crate::engine::worker_registry::WILDCARD;
use crate::errors::{BusError, ConfigurationError, ProcessorError};
use crate::message::Message;
use crate::observability::messages::bus::{
    BusReconnecting, DuplicateEventSuppressed, EventReceived, MisroutedReply, ProcessingFailed,
    ProcessorClosed, ProcessorStarted, ReplySent, ReplySkipped, WorkerFailurePublished,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{BusHandle, Event, EventBus};

/// Handler bound to a subscription; receives the named groups of the match.
pub type EventHandlerFn = Arc<
    dyn Fn(&EventDrivenProcessor, &Event, &MatchGroups) -> Result<(), ProcessorError> + Send + Sync,
>;

struct EventMatcher {
    tag: String,
    match_type: MatchType,
    handler: EventHandlerFn,
}

type SharedHandle = Arc<Mutex<Option<Box<dyn BusHandle>>>>;

pub struct EventDrivenProcessor {
    namespace: String,
    processor: Processor,
    bus: Arc<dyn EventBus>,
    incoming: Mutex<Option<Box<dyn BusHandle>>>,
    /// Publishing handle; its lock serializes every write to the bus.
    outgoing: SharedHandle,
    matchers: RwLock<Vec<Arc<EventMatcher>>>,
    patterns: PatternCache,
    request_pattern: String,
    filter: OutgoingFilter,
    shutdown: CancellationToken,
    poll_interval: Duration,
}

impl EventDrivenProcessor {
    pub fn new(namespace: impl Into<String>, processor: Processor, bus: Arc<dyn EventBus>) -> Self {
        let namespace = namespace.into();
        Self {
            request_pattern: request_pattern(&namespace),
            namespace,
            processor,
            bus,
            incoming: Mutex::new(None),
            outgoing: Arc::new(Mutex::new(None)),
            matchers: RwLock::new(Vec::new()),
            patterns: PatternCache::new(),
            filter: OutgoingFilter::new(),
            shutdown: CancellationToken::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// How long one bus poll may block before shutdown is re-checked.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Token cancelled by [`close`](Self::close); hosts may also cancel it directly.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Connects to the bus, subscribes to requests and creates the configured
    /// workers (stopped) and reactors. Must be called once, before [`run`](Self::run).
    pub fn init(
        &self,
        workers: &[WorkerConfig],
        reactors: &[ReactorConfig],
    ) -> Result<(), ProcessorError> {
        if self.outgoing.lock().is_some() {
            return Err(ConfigurationError::InvalidArgument {
                name: "init".to_string(),
                reason: format!("processor '{}' is already initialized", self.namespace),
            }
            .into());
        }
        *self.incoming.lock() = Some(self.bus.connect(true)?);
        *self.outgoing.lock() = Some(self.bus.connect(false)?);

        let request_pattern = self.request_pattern.clone();
        self.subscribe_to_events(&request_pattern, MatchType::Regex, |service, event, _| {
            service.process_event(event)
        })?;

        for config in workers {
            let worker = self
                .processor
                .create_worker(&config.name, config.settings(), Vec::new())?;
            for message in &config.messages {
                worker.enqueue(message.clone());
            }
        }
        for reactor in reactors {
            self.processor.reactors().register(reactor.clone());
        }

        let outgoing = Arc::clone(&self.outgoing);
        let tag = failure_tag(&self.namespace);
        self.processor
            .set_failure_callback(Arc::new(move |worker: &str, error: &ProcessorError| {
                let data = json!({ "worker": worker, "error": error.to_string() });
                let published = outgoing
                    .lock()
                    .as_ref()
                    .is_some_and(|handle| handle.fire_event(&data, &tag).is_ok());
                if published {
                    WorkerFailurePublished { worker, tag: &tag }.log();
                }
            }));
        Ok(())
    }

    /// Appends a subscription; matchers run in the order they were added.
    pub fn subscribe_to_events<F>(
        &self,
        tag: &str,
        match_type: MatchType,
        handler: F,
    ) -> Result<(), BusError>
    where
        F: Fn(&EventDrivenProcessor, &Event, &MatchGroups) -> Result<(), ProcessorError>
            + Send
            + Sync
            + 'static,
    {
        if match_type == MatchType::Regex {
            self.patterns.compile(tag)?;
        }
        self.matchers.write().push(Arc::new(EventMatcher {
            tag: tag.to_string(),
            match_type,
            handler: Arc::new(handler),
        }));
        Ok(())
    }

    /// Starts every worker and serves events until [`close`](Self::close).
    ///
    /// Blocks the calling thread. A bus disconnect is survived by reopening
    /// the incoming handle.
    pub fn run(&self) -> Result<(), ProcessorError> {
        let mut incoming = self
            .incoming
            .lock()
            .take()
            .ok_or(BusError::NotConnected)?;
        let started = self
            .processor
            .workers()
            .start_all_for(WILDCARD, &self.processor)?;
        ProcessorStarted {
            namespace: &self.namespace,
            workers: started.len(),
        }
        .log();

        let result = loop {
            if self.shutdown.is_cancelled() {
                break Ok(());
            }
            match incoming.next_event(self.poll_interval) {
                Ok(Some(event)) => self.dispatch(&event),
                Ok(None) => {}
                Err(BusError::Disconnected) => {
                    BusReconnecting {
                        namespace: &self.namespace,
                        error: &BusError::Disconnected,
                    }
                    .log();
                    if self.sleep_unless_cancelled(RECONNECT_DELAY) {
                        break Ok(());
                    }
                    match self.bus.connect(true) {
                        Ok(handle) => incoming = handle,
                        Err(error) => BusReconnecting {
                            namespace: &self.namespace,
                            error: &error,
                        }
                        .log(),
                    }
                }
                Err(error) => break Err(error.into()),
            }
        };

        *self.incoming.lock() = Some(incoming);
        result
    }

    /// Stops the receive loop and kills every worker.
    pub fn close(&self) -> Vec<String> {
        self.shutdown.cancel();
        let killed = self.processor.close();
        ProcessorClosed {
            namespace: &self.namespace,
            workers: killed.len(),
        }
        .log();
        killed
    }

    /// Handles one request event and replies to it.
    ///
    /// A payload that is not a message object, and any processing failure,
    /// produce an error reply. A null result produces no reply.
    pub fn process_event(&self, event: &Event) -> Result<(), ProcessorError> {
        let decoded = match &event.data {
            Value::Object(_) => Message::from_value(event.data.clone()).map_err(ProcessorError::from),
            other => Err(ProcessorError::Codec(format!(
                "request payload must be a message object, got {}",
                other
            ))),
        };
        let message = match decoded {
            Ok(message) => message.with_event_tag(&event.tag),
            Err(error) => {
                ProcessingFailed {
                    tag: &event.tag,
                    error: &error,
                }
                .log();
                let untyped = Message::default().with_event_tag(&event.tag);
                self.send_reply_event_for(&untyped, &error.to_reply())?;
                return Ok(());
            }
        };

        let reply = match self.processor.process(&message) {
            Ok(Value::Null) => {
                ReplySkipped {
                    tag: &event.tag,
                    workflow: message.workflow_name(),
                }
                .log();
                return Ok(());
            }
            Ok(result) => result,
            Err(error) => {
                ProcessingFailed {
                    tag: &event.tag,
                    error: &error,
                }
                .log();
                error.to_reply()
            }
        };
        self.send_reply_event_for(&message, &reply)?;
        Ok(())
    }

    /// Publishes `data` as the reply to `message`.
    ///
    /// Returns `false`, without publishing, when the message's `_event_tag`
    /// is not a request tag of this namespace.
    pub fn send_reply_event_for(&self, message: &Message, data: &Value) -> Result<bool, ProcessorError> {
        let groups = match message.event_tag.as_deref() {
            Some(tag) => self.patterns.matches(tag, &self.request_pattern, MatchType::Regex)?,
            None => None,
        };
        let Some(id) = groups.and_then(|mut groups| groups.remove("id")) else {
            MisroutedReply {
                event_tag: message.event_tag.as_deref(),
            }
            .log();
            return Ok(false);
        };

        let tag = reply_tag(&self.namespace, &id);
        self.publish(data, &tag)?;
        ReplySent {
            tag: &tag,
            error: data.get("error").is_some(),
        }
        .log();
        Ok(true)
    }

    /// Publishes an arbitrary event.
    ///
    /// With `skip_duplicates_filter`, an event identical in tag and data to
    /// the last one published under the same key is dropped; the return value
    /// tells whether it was published.
    pub fn trigger_event(
        &self,
        data: &Value,
        tag: &str,
        skip_duplicates_filter: Option<&str>,
    ) -> Result<bool, ProcessorError> {
        let outgoing = self.outgoing.lock();
        let handle = outgoing.as_ref().ok_or(BusError::NotConnected)?;
        if let Some(filter) = skip_duplicates_filter {
            if !self.filter.admit(filter, tag, data) {
                DuplicateEventSuppressed { tag, filter }.log();
                return Ok(false);
            }
        }
        handle.fire_event(data, tag)?;
        Ok(true)
    }

    fn publish(&self, data: &Value, tag: &str) -> Result<(), BusError> {
        let outgoing = self.outgoing.lock();
        outgoing
            .as_ref()
            .ok_or(BusError::NotConnected)?
            .fire_event(data, tag)
    }

    fn dispatch(&self, event: &Event) {
        EventReceived { tag: &event.tag }.log();
        let matchers = self.matchers.read().clone();
        for matcher in &matchers {
            let outcome = self
                .patterns
                .matches(&event.tag, &matcher.tag, matcher.match_type)
                .map_err(ProcessorError::from)
                .and_then(|groups| match groups {
                    Some(groups) => (matcher.handler)(self, event, &groups),
                    None => Ok(()),
                });
            if let Err(error) = outcome {
                ProcessingFailed {
                    tag: &event.tag,
                    error: &error,
                }
                .log();
            }
        }
    }

    /// Returns `true` if shutdown was requested while waiting.
    fn sleep_unless_cancelled(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        while !self.shutdown.is_cancelled() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            std::thread::sleep(remaining.min(self.poll_interval));
        }
        true
    }
}
