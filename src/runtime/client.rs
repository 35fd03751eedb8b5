// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Request/reply client for an [`EventDrivenProcessor`](super::EventDrivenProcessor).
//!
//! Each request gets a fresh correlation id and its own listening handle,
//! opened before the request is published so a fast reply cannot slip past.
//! Delivery is at most once: after a timeout the request may still run
//! remotely, and its late reply is dropped with the handle.
//!
//! Replies sent with [`Client::send_async`] and never collected are released
//! after the client's reply retention, or explicitly with [`Client::cancel`].

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::{reply_tag, request_tag};
use crate::bus::MatchType;
use crate::config::consts::{DEFAULT_TIMEOUT, REPLY_RETENTION};
use crate::errors::ClientError;
use crate::message::Message;
use crate::observability::messages::bus::{ClientTimedOut, PendingRepliesExpired};
use crate::observability::messages::StructuredLog;
use crate::traits::{BusHandle, EventBus};

struct PendingReply {
    replies: Box<dyn BusHandle>,
    expires: Instant,
}

pub struct Client {
    namespace: String,
    bus: Arc<dyn EventBus>,
    outgoing: Mutex<Box<dyn BusHandle>>,
    pending: Mutex<HashMap<String, PendingReply>>,
    default_timeout: Duration,
    reply_retention: Duration,
}

impl Client {
    pub fn connect(namespace: impl Into<String>, bus: Arc<dyn EventBus>) -> Result<Self, ClientError> {
        let outgoing = bus.connect(false)?;
        Ok(Self {
            namespace: namespace.into(),
            bus,
            outgoing: Mutex::new(outgoing),
            pending: Mutex::new(HashMap::new()),
            default_timeout: DEFAULT_TIMEOUT,
            reply_retention: REPLY_RETENTION,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// How long an uncollected reply stays subscribed after [`send_async`](Self::send_async).
    pub fn with_reply_retention(mut self, retention: Duration) -> Self {
        self.reply_retention = retention;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// [`send_sync`](Self::send_sync) with the client's default timeout.
    pub fn send(&self, message: &Message) -> Result<Value, ClientError> {
        self.send_sync(message, self.default_timeout)
    }

    /// Sends `message` and blocks until its reply arrives or `timeout` elapses.
    pub fn send_sync(&self, message: &Message, timeout: Duration) -> Result<Value, ClientError> {
        let id = self.send_async(message)?;
        self.recv_reply(&id, timeout)
    }

    /// Publishes `message` and returns its correlation id without waiting.
    ///
    /// The reply must be collected with [`recv_reply`](Self::recv_reply)
    /// within the reply retention; after that it is released.
    pub fn send_async(&self, message: &Message) -> Result<String, ClientError> {
        self.release_expired();
        let id = Uuid::new_v4().to_string();
        let replies = self.bus.connect(true)?;
        self.pending.lock().insert(
            id.clone(),
            PendingReply {
                replies,
                expires: Instant::now() + self.reply_retention,
            },
        );

        let tag = request_tag(&self.namespace, &id);
        if let Err(error) = self.outgoing.lock().fire_event(&message.to_value(), &tag) {
            self.pending.lock().remove(&id);
            return Err(error.into());
        }
        Ok(id)
    }

    /// Waits for the reply to a request sent with [`send_async`](Self::send_async).
    ///
    /// An `{"error": ...}` reply becomes [`ClientError::Handler`]; a mapping
    /// error payload is kept in `detail`.
    pub fn recv_reply(&self, id: &str, timeout: Duration) -> Result<Value, ClientError> {
        let pending = self.pending.lock().remove(id);
        self.release_expired();
        let mut replies = match pending {
            Some(pending) => pending.replies,
            None => self.bus.connect(true)?,
        };

        match replies.get_event(timeout, &reply_tag(&self.namespace, id), MatchType::StartsWith)? {
            Some(event) => interpret_reply(event.data),
            None => {
                let tag = request_tag(&self.namespace, id);
                ClientTimedOut { tag: &tag, timeout }.log();
                Err(ClientError::Timeout { tag, timeout })
            }
        }
    }

    /// Stops listening for the reply to `id`. Returns `false` if it was not pending.
    pub fn cancel(&self, id: &str) -> bool {
        self.pending.lock().remove(id).is_some()
    }

    /// Requests sent but not yet collected with [`recv_reply`](Self::recv_reply).
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    fn release_expired(&self) {
        let now = Instant::now();
        let released = {
            let mut pending = self.pending.lock();
            let before = pending.len();
            pending.retain(|_, reply| reply.expires > now);
            before - pending.len()
        };
        if released > 0 {
            PendingRepliesExpired {
                released,
                retention: self.reply_retention,
            }
            .log();
        }
    }
}

fn interpret_reply(data: Value) -> Result<Value, ClientError> {
    let mut reply = match data {
        Value::Object(reply) if reply.contains_key("error") => reply,
        other => return Ok(other),
    };
    Err(match reply.remove("error").unwrap_or_default() {
        Value::String(message) => ClientError::Handler {
            message,
            detail: None,
        },
        Value::Object(detail) => ClientError::Handler {
            message: detail_message(&detail),
            detail: Some(detail),
        },
        other => ClientError::Handler {
            message: other.to_string(),
            detail: None,
        },
    })
}

fn detail_message(detail: &Map<String, Value>) -> String {
    match detail.get("message") {
        Some(Value::String(message)) => message.clone(),
        _ => Value::Object(detail.clone()).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalBus;
    use serde_json::json;

    #[test]
    fn test_interpret_reply_table_driven() {
        struct TestCase {
            name: &'static str,
            data: Value,
            expected: Result<Value, (String, Option<Value>)>,
        }

        let test_cases = vec![
            TestCase {
                name: "plain result",
                data: json!({ "x": 1 }),
                expected: Ok(json!({ "x": 1 })),
            },
            TestCase {
                name: "scalar result",
                data: json!("pong"),
                expected: Ok(json!("pong")),
            },
            TestCase {
                name: "string error",
                data: json!({ "error": "nope" }),
                expected: Err(("nope".to_string(), None)),
            },
            TestCase {
                name: "structured error",
                data: json!({ "error": { "code": 7, "message": "modem offline" } }),
                expected: Err((
                    "modem offline".to_string(),
                    Some(json!({ "code": 7, "message": "modem offline" })),
                )),
            },
            TestCase {
                name: "structured error without message",
                data: json!({ "error": { "code": 7 } }),
                expected: Err((r#"{"code":7}"#.to_string(), Some(json!({ "code": 7 })))),
            },
        ];

        for test_case in test_cases {
            let actual = interpret_reply(test_case.data).map_err(|error| match error {
                ClientError::Handler { message, detail } => (message, detail.map(Value::Object)),
                other => panic!("unexpected error {:?}", other),
            });
            assert_eq!(actual, test_case.expected, "Test case '{}'", test_case.name);
        }
    }

    #[test]
    fn async_request_pairs_with_its_reply() {
        let bus = LocalBus::new();
        let client = Client::connect("demo", Arc::new(bus.clone())).unwrap();
        let mut server = bus.handle(true);

        let message = Message::builder().handler("echo").kwarg("x", 1).build();
        let id = client.send_async(&message).unwrap();
        assert_eq!(client.pending(), 1);

        let request = server
            .get_event(Duration::from_millis(100), "demo/req/", MatchType::StartsWith)
            .unwrap()
            .unwrap();
        assert_eq!(request.tag, format!("demo/req/{}", id));
        assert_eq!(request.data, message.to_value());

        let publisher = bus.handle(false);
        publisher.fire_event(&json!("other"), "demo/res/someone-else").unwrap();
        publisher.fire_event(&json!({ "x": 1 }), &format!("demo/res/{}", id)).unwrap();

        let reply = client.recv_reply(&id, Duration::from_millis(100)).unwrap();
        assert_eq!(reply, json!({ "x": 1 }));
        assert_eq!(client.pending(), 0);
    }

    #[test]
    fn unanswered_request_times_out_with_request_tag() {
        let bus = LocalBus::new();
        let client = Client::connect("demo", Arc::new(bus.clone()))
            .unwrap()
            .with_timeout(Duration::from_millis(20));

        match client.send(&Message::builder().handler("echo").build()) {
            Err(ClientError::Timeout { tag, timeout }) => {
                assert!(tag.starts_with("demo/req/"));
                assert_eq!(timeout, Duration::from_millis(20));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        // A late reply prunes the dropped per-request subscription.
        bus.handle(false).fire_event(&json!("late"), "demo/res/x").unwrap();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn uncollected_replies_are_released() {
        let bus = LocalBus::new();
        let client = Client::connect("demo", Arc::new(bus.clone()))
            .unwrap()
            .with_reply_retention(Duration::from_millis(20));
        let message = Message::builder().handler("echo").build();

        for _ in 0..50 {
            client.send_async(&message).unwrap();
        }
        assert_eq!(client.pending(), 50);

        std::thread::sleep(Duration::from_millis(40));
        let kept = client.send_async(&message).unwrap();
        assert_eq!(client.pending(), 1);

        let publisher = bus.handle(false);
        publisher.fire_event(&json!({ "x": 1 }), "telemetry/x").unwrap();
        assert_eq!(bus.subscriber_count(), 1);

        assert!(client.cancel(&kept));
        assert!(!client.cancel(&kept));
        publisher.fire_event(&json!({ "x": 2 }), "telemetry/x").unwrap();
        assert_eq!(bus.subscriber_count(), 0);
    }
}
