// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The built-in worker hooks: where a message runs.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::worker_registry::WILDCARD;
use super::WorkerSettings;
use crate::errors::{ConfigurationError, ProcessorError};
use crate::hooks::HookResult;
use crate::message::Message;
use crate::observability::messages::worker::MessageEnqueued;
use crate::observability::messages::StructuredLog;
use crate::runtime::Processor;

/// Runs the message's workflow on the caller's thread.
pub fn shared_worker(
    processor: &Processor,
    message: Option<&Message>,
    _settings: &Map<String, Value>,
) -> HookResult {
    match message {
        Some(message) => processor.run_workflow(message, None),
        None => Ok(Value::Null),
    }
}

/// Hands the message to a long-lived worker.
///
/// * `enqueue=<name>` appends the message to that worker's queue, creating
///   the worker when a literal name is not registered yet;
/// * `dequeue=<name>` removes one equal entry from that worker's queue;
/// * otherwise a new worker is created from `name`, `messages` and the
///   scheduling settings, with the message (if any) as its first entry.
pub fn dedicated_worker(
    processor: &Processor,
    message: Option<&Message>,
    settings: &Map<String, Value>,
) -> HookResult {
    if let Some(target) = settings.get("enqueue") {
        let target = worker_name("enqueue", target)?;
        let item = work_item(require_message("enqueue", message)?);
        return enqueue(processor, target, item, settings);
    }
    if let Some(target) = settings.get("dequeue") {
        let target = worker_name("dequeue", target)?;
        let item = work_item(require_message("dequeue", message)?);
        let dequeued = processor
            .workers()
            .modify_all_for(target, |worker| worker.dequeue(&item));
        return Ok(json!({ "dequeued": dequeued }));
    }
    create(processor, message, settings)
}

fn enqueue(
    processor: &Processor,
    target: &str,
    item: Message,
    settings: &Map<String, Value>,
) -> HookResult {
    let mut enqueued = processor.workers().modify_all_for(target, |worker| {
        worker.enqueue(item.clone());
        true
    });
    if enqueued.is_empty() && target != WILDCARD {
        let worker_settings = WorkerSettings::from_settings(settings)?;
        processor.create_worker(target, worker_settings, vec![item])?;
        enqueued.push(target.to_string());
    }
    for name in &enqueued {
        MessageEnqueued { worker: name }.log();
    }
    Ok(json!({ "enqueued": enqueued }))
}

fn create(
    processor: &Processor,
    message: Option<&Message>,
    settings: &Map<String, Value>,
) -> HookResult {
    let name = match settings.get("name") {
        Some(name) => worker_name("name", name)?.to_string(),
        None => Uuid::new_v4().to_string(),
    };
    let mut messages = match settings.get("messages") {
        Some(raw) => decode_messages(raw)?,
        None => Vec::new(),
    };
    if let Some(message) = message {
        messages.push(work_item(message));
    }

    let worker_settings = WorkerSettings::from_settings(settings)?;
    let worker = processor.create_worker(&name, worker_settings, messages)?;
    Ok(json!({
        "created": worker.name(),
        "started": worker.state() == super::WorkerState::Running,
    }))
}

/// The queued form of a message: routing to a worker is already done.
fn work_item(message: &Message) -> Message {
    let mut item = message.clone();
    item.worker = None;
    item.event_tag = None;
    item
}

fn require_message<'a>(
    setting: &str,
    message: Option<&'a Message>,
) -> Result<&'a Message, ConfigurationError> {
    message.ok_or_else(|| ConfigurationError::InvalidArgument {
        name: setting.to_string(),
        reason: "requires a message".to_string(),
    })
}

fn worker_name<'a>(setting: &str, raw: &'a Value) -> Result<&'a str, ConfigurationError> {
    match raw {
        Value::String(name) if !name.is_empty() => Ok(name),
        other => Err(ConfigurationError::InvalidArgument {
            name: setting.to_string(),
            reason: format!("expected a worker name, got {}", other),
        }),
    }
}

fn decode_messages(raw: &Value) -> Result<Vec<Message>, ProcessorError> {
    let invalid = |reason: String| ConfigurationError::InvalidArgument {
        name: "messages".to_string(),
        reason,
    };
    let items = match raw {
        Value::Array(items) => items.clone(),
        Value::Object(_) => vec![raw.clone()],
        other => return Err(invalid(format!("expected a list of messages, got {}", other)).into()),
    };
    items
        .into_iter()
        .map(|item| Message::from_value(item).map_err(|e| invalid(e.to_string()).into()))
        .collect()
}
