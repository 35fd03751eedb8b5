// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Reactors: configured rules that turn handler results into follow-up messages.
//!
//! After a workflow produces a non-null result, every reactor whose `handler`
//! filter names the message's handler and whose `condition` holds for the
//! result fires. The result's fields are the keywords: a result of
//! `{"volts": 11.2}` makes `$volts` available to the condition and to every
//! action template. A non-mapping result is bound as `$result`.
//!
//! Action failures are logged and never reach the request that triggered them.
//! Results of action messages are not offered to the reactors again, so a
//! reactor whose action matches its own filter fires once per original result.

use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::Processor;
use crate::config::ReactorConfig;
use crate::errors::ProcessorError;
use crate::hooks::HookKind;
use crate::keywords::{is_truthy, keyword_resolve, DEFAULT_SYMBOL};
use crate::message::Message;
use crate::observability::messages::hooks::{
    NestedReactionSkipped, ReactorActionFailed, ReactorConditionFailed, ReactorFired,
};
use crate::observability::messages::StructuredLog;

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running reactor actions until dropped.
struct DispatchGuard {
    outer: bool,
}

impl DispatchGuard {
    fn enter() -> Self {
        Self {
            outer: DISPATCHING.with(|flag| flag.replace(true)),
        }
    }

    fn active() -> bool {
        DISPATCHING.with(Cell::get)
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|flag| flag.set(self.outer));
    }
}

struct Reactor {
    config: ReactorConfig,
    fired: AtomicU64,
}

impl Reactor {
    fn accepts(&self, handler: Option<&str>, keywords: &Map<String, Value>) -> bool {
        if let Some(wanted) = &self.config.handler {
            if handler != Some(wanted.as_str()) {
                return false;
            }
        }
        let Some(condition) = &self.config.condition else {
            return true;
        };
        match keyword_resolve(&Value::String(condition.clone()), keywords, DEFAULT_SYMBOL) {
            // Still mentions an unbound keyword: not evaluable for this result.
            Ok(Value::String(text)) if text.contains(DEFAULT_SYMBOL) => false,
            Ok(value) => is_truthy(&value),
            Err(error) => {
                ReactorConditionFailed {
                    reactor: &self.config.name,
                    condition,
                    error: &error,
                }
                .log();
                false
            }
        }
    }

    fn dispatch(&self, processor: &Processor, keywords: &Map<String, Value>) {
        self.fired.fetch_add(1, Ordering::Relaxed);
        ReactorFired {
            reactor: &self.config.name,
            actions: self.config.actions.len(),
        }
        .log();

        let _guard = DispatchGuard::enter();
        for (index, action) in self.config.actions.iter().enumerate() {
            let outcome = keyword_resolve(action, keywords, DEFAULT_SYMBOL)
                .map_err(ProcessorError::from)
                .and_then(|resolved| Ok(Message::from_value(resolved)?))
                .and_then(|message| processor.process(&message));
            if let Err(error) = outcome {
                ReactorActionFailed {
                    reactor: &self.config.name,
                    action: index,
                    error: &error,
                }
                .log();
            }
        }
    }
}

/// Reactors in registration order.
#[derive(Default)]
pub struct ReactorRegistry {
    reactors: RwLock<Vec<Arc<Reactor>>>,
}

impl ReactorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reactor, replacing any reactor with the same name in place.
    pub fn register(&self, config: ReactorConfig) {
        let reactor = Arc::new(Reactor {
            config,
            fired: AtomicU64::new(0),
        });
        let mut reactors = self.reactors.write();
        match reactors
            .iter_mut()
            .find(|existing| existing.config.name == reactor.config.name)
        {
            Some(existing) => *existing = reactor,
            None => reactors.push(reactor),
        }
    }

    pub fn len(&self) -> usize {
        self.reactors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactors.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.reactors
            .read()
            .iter()
            .map(|reactor| reactor.config.name.clone())
            .collect()
    }

    /// Definition and firing count of every reactor, keyed by name.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.reactors
            .read()
            .iter()
            .map(|reactor| {
                let mut entry = match serde_json::to_value(&reactor.config) {
                    Ok(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                entry.insert("fired".to_string(), json!(reactor.fired.load(Ordering::Relaxed)));
                (reactor.config.name.clone(), Value::Object(entry))
            })
            .collect()
    }

    /// Fires every reactor accepting `result` of `message`.
    ///
    /// Reactors are matched against a snapshot taken before any fires, so an
    /// action may register further reactors. Does nothing for results of
    /// actions dispatched on this thread.
    pub fn react(&self, processor: &Processor, message: &Message, result: &Value) {
        let reactors = self.reactors.read().clone();
        if reactors.is_empty() {
            return;
        }
        if DispatchGuard::active() {
            NestedReactionSkipped {
                handler: message.hook_name(HookKind::Handler),
            }
            .log();
            return;
        }

        let keywords = match result {
            Value::Object(fields) => fields.clone(),
            other => {
                let mut keywords = Map::new();
                keywords.insert("result".to_string(), other.clone());
                keywords
            }
        };
        let handler = message.hook_name(HookKind::Handler);
        for reactor in reactors.iter().filter(|r| r.accepts(handler, &keywords)) {
            reactor.dispatch(processor, &keywords);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn reactor(name: &str, handler: Option<&str>, condition: Option<&str>, actions: Vec<Value>) -> ReactorConfig {
        ReactorConfig {
            name: name.to_string(),
            handler: handler.map(str::to_string),
            condition: condition.map(str::to_string),
            actions,
        }
    }

    fn processor_with_notify() -> (Processor, Arc<Mutex<Vec<Value>>>) {
        let processor = Processor::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        processor.hooks().register_handler("notify", move |call| {
            sink.lock().push(Value::Object(call.kwargs().clone()));
            Ok(Value::Null)
        });
        (processor, seen)
    }

    #[test]
    fn test_react_table_driven() {
        struct TestCase {
            name: &'static str,
            handler: &'static str,
            result: Value,
            expected: Vec<Value>,
        }

        let test_cases = vec![
            TestCase {
                name: "condition holds",
                handler: "read_voltage",
                result: json!({ "volts": 11.2 }),
                expected: vec![json!({ "volts": 11.2, "low": true })],
            },
            TestCase {
                name: "condition does not hold",
                handler: "read_voltage",
                result: json!({ "volts": 12.6 }),
                expected: vec![],
            },
            TestCase {
                name: "other handler",
                handler: "read_gps",
                result: json!({ "volts": 11.2 }),
                expected: vec![],
            },
            TestCase {
                name: "keyword missing from result",
                handler: "read_voltage",
                result: json!({ "amps": 3 }),
                expected: vec![],
            },
        ];

        for test_case in test_cases {
            let (processor, seen) = processor_with_notify();
            processor.reactors().register(reactor(
                "low_voltage",
                Some("read_voltage"),
                Some("$volts < 11.5"),
                vec![json!({ "handler": "notify", "kwargs": { "volts": "$volts", "low": "$volts < 11.5" } })],
            ));
            let message = Message::builder().handler(test_case.handler).build();

            processor.reactors().react(&processor, &message, &test_case.result);

            let actual = seen.lock().clone();
            assert_eq!(actual, test_case.expected, "Test case '{}'", test_case.name);
        }
    }

    #[test]
    fn scalar_results_bind_as_result_and_counts_are_tracked() {
        let (processor, seen) = processor_with_notify();
        processor.reactors().register(reactor(
            "any_reading",
            None,
            None,
            vec![json!({ "handler": "notify", "kwargs": { "value": "$result * 2" } })],
        ));
        let message = Message::builder().handler("read").build();

        processor.reactors().react(&processor, &message, &json!(21));
        processor.reactors().react(&processor, &message, &json!(1));

        assert_eq!(*seen.lock(), vec![json!({ "value": 42 }), json!({ "value": 2 })]);
        let snapshot = processor.reactors().snapshot();
        assert_eq!(snapshot["any_reading"]["fired"], json!(2));
        assert_eq!(processor.reactors().names(), vec!["any_reading".to_string()]);
    }

    #[test]
    fn failing_actions_do_not_stop_later_actions() {
        let (processor, seen) = processor_with_notify();
        processor.reactors().register(reactor(
            "chain",
            None,
            None,
            vec![
                json!({ "handler": "missing" }),
                json!({ "handler": "notify", "kwargs": { "ok": true } }),
            ],
        ));

        processor
            .reactors()
            .react(&processor, &Message::default(), &json!({ "x": 1 }));

        assert_eq!(*seen.lock(), vec![json!({ "ok": true })]);
    }

    #[test]
    fn action_results_do_not_fire_reactors_again() {
        struct TestCase {
            name: &'static str,
            handler_filter: Option<&'static str>,
            expected_calls: usize,
        }

        let test_cases = vec![
            TestCase {
                name: "unfiltered reactor",
                handler_filter: None,
                expected_calls: 2,
            },
            TestCase {
                name: "action targets the filtered handler",
                handler_filter: Some("ping"),
                expected_calls: 2,
            },
        ];

        for test_case in test_cases {
            let processor = Processor::new();
            let calls = Arc::new(AtomicU64::new(0));
            let counter = Arc::clone(&calls);
            processor.hooks().register_handler("ping", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!("pong"))
            });
            processor.reactors().register(reactor(
                "echo_all",
                test_case.handler_filter,
                None,
                vec![json!({ "handler": "ping" })],
            ));

            let result = processor.process_value(json!({ "handler": "ping" })).unwrap();

            assert_eq!(result, json!("pong"), "Test case '{}'", test_case.name);
            assert_eq!(
                calls.load(Ordering::SeqCst) as usize,
                test_case.expected_calls,
                "Test case '{}'",
                test_case.name
            );
            assert_eq!(
                processor.reactors().snapshot()["echo_all"]["fired"],
                json!(1),
                "Test case '{}'",
                test_case.name
            );
            assert!(!DispatchGuard::active(), "Test case '{}'", test_case.name);
        }
    }

    #[test]
    fn registering_same_name_replaces() {
        let registry = ReactorRegistry::new();
        registry.register(reactor("r", None, None, vec![json!({})]));
        registry.register(reactor("r", Some("h"), None, vec![json!({})]));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot()["r"]["handler"], json!("h"));
    }
}
