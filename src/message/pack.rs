// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;

use super::Message;

/// Builds a request message from call-style arguments.
///
/// Positional `args` become `message.args`. For each keyword argument:
/// * a `null` value is dropped,
/// * a key starting with `__` is host-private and dropped,
/// * a key starting with `_` is stored at the message root without the
///   underscore (`_handler`, `_workflow`, `_timeout`, ...),
/// * anything else goes into `message.kwargs`.
///
/// ```
/// use edge_processor::message::msg_pack;
/// use serde_json::json;
///
/// let message = msg_pack(
///     [],
///     [("_handler", json!("echo")), ("x", json!(1)), ("skip", json!(null))],
/// );
/// assert_eq!(message.handler.as_deref(), Some("echo"));
/// assert_eq!(message.kwargs.len(), 1);
/// ```
pub fn msg_pack<A, K, S>(args: A, kwargs: K) -> Message
where
    A: IntoIterator<Item = Value>,
    K: IntoIterator<Item = (S, Value)>,
    S: AsRef<str>,
{
    let mut builder = MessageBuilder::default();
    for arg in args {
        builder = builder.arg(arg);
    }
    for (key, value) in kwargs {
        builder = builder.kwarg(key.as_ref(), value);
    }
    builder.build()
}

/// Fluent form of [`msg_pack`].
#[derive(Debug, Default, Clone)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.message.args.push(value.into());
        self
    }

    /// Adds a keyword argument following the [`msg_pack`] routing rules.
    pub fn kwarg(mut self, key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() || key.starts_with("__") {
            return self;
        }
        match key.strip_prefix('_') {
            Some(root_key) => self.message.set_root(root_key, value),
            None => {
                self.message.kwargs.insert(key.to_string(), value);
            }
        }
        self
    }

    pub fn handler(self, name: &str) -> Self {
        self.kwarg("_handler", name)
    }

    pub fn workflow(self, name: &str) -> Self {
        self.kwarg("_workflow", name)
    }

    pub fn worker(self, name: &str) -> Self {
        self.kwarg("_worker", name)
    }

    pub fn validator(self, name: &str) -> Self {
        self.kwarg("_validator", name)
    }

    pub fn converter(self, name: &str) -> Self {
        self.kwarg("_converter", name)
    }

    pub fn returner(self, name: &str) -> Self {
        self.kwarg("_returner", name)
    }

    pub fn build(self) -> Message {
        self.message
    }
}
