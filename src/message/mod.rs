// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The message record exchanged over the bus and the helpers that build it.
//!
//! A message carries positional `args`, named `kwargs`, and optional hook
//! overrides. Each override is a URL-shaped string (`name?key=value`) naming
//! the hook to use for that pipeline stage plus settings for it:
//!
//! ```json
//! {
//!   "args": [1, 2],
//!   "kwargs": { "x": 1 },
//!   "handler": "read_voltage?channel=2",
//!   "workflow": "extended",
//!   "worker": "dedicated?loop=1.0",
//!   "_event_tag": "ec2x/req/4b1e..."
//! }
//! ```
//!
//! Any other root key (for instance `timeout`) is preserved in [`Message::extra`].

mod hook_url;
mod pack;

pub use hook_url::HookUrl;
pub use pack::{msg_pack, MessageBuilder};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::hooks::HookKind;

/// Key under which the bus tag of the request is injected server-side.
pub const EVENT_TAG_KEY: &str = "_event_tag";

/// A request for the processor, as carried on the bus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub kwargs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returner: Option<String>,
    #[serde(
        rename = "_event_tag",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub event_tag: Option<String>,
    /// Root-level keys with no dedicated field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// Decodes a message from bus data.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        // A struct of JSON values with string keys always serializes.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// The raw override string for a hook kind, if the sender supplied one.
    pub fn hook_override(&self, kind: HookKind) -> Option<&str> {
        let field = match kind {
            HookKind::Worker => &self.worker,
            HookKind::Workflow => &self.workflow,
            HookKind::Handler => &self.handler,
            HookKind::Validator => &self.validator,
            HookKind::Converter => &self.converter,
            HookKind::Returner => &self.returner,
        };
        field.as_deref()
    }

    /// Name of the hook selected for `kind`, without its settings.
    pub fn hook_name(&self, kind: HookKind) -> Option<&str> {
        self.hook_override(kind)
            .map(|raw| raw.split_once('?').map_or(raw, |(name, _)| name))
    }

    /// Workflow this message runs through; `simple` unless overridden.
    pub fn workflow_name(&self) -> &str {
        self.hook_name(HookKind::Workflow).unwrap_or("simple")
    }

    /// Copy of this message carrying the tag it arrived on.
    pub fn with_event_tag(&self, tag: impl Into<String>) -> Self {
        let mut tagged = self.clone();
        tagged.event_tag = Some(tag.into());
        tagged
    }

    /// Places `value` at the message root under `key`.
    ///
    /// Known keys land in their typed fields; a non-string override value is
    /// stored in its JSON text form.
    pub fn set_root(&mut self, key: &str, value: Value) {
        let as_text = |value: Value| match value {
            Value::String(text) => text,
            other => other.to_string(),
        };
        match key {
            "args" => {
                self.args = match value {
                    Value::Array(items) => items,
                    single => vec![single],
                }
            }
            "kwargs" => match value {
                Value::Object(map) => self.kwargs = map,
                other => {
                    self.extra.insert(key.to_string(), other);
                }
            },
            "worker" => self.worker = Some(as_text(value)),
            "workflow" => self.workflow = Some(as_text(value)),
            "handler" => self.handler = Some(as_text(value)),
            "validator" => self.validator = Some(as_text(value)),
            "converter" => self.converter = Some(as_text(value)),
            "returner" => self.returner = Some(as_text(value)),
            "event_tag" | EVENT_TAG_KEY => self.event_tag = Some(as_text(value)),
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
    }
}
