// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Operator control surface, reached with `workflow = "manage"`.
//!
//! The command is read from the positional arguments:
//!
//! | command                          | result `values`                        |
//! |----------------------------------|----------------------------------------|
//! | `hook list`                      | every hook key                         |
//! | `hook call <name> [args..]`      | whatever the hook returned             |
//! | `listener list`                  | listener names in firing order         |
//! | `worker list [pattern]`          | worker names                           |
//! | `worker show [pattern]`          | name to context snapshot               |
//! | `worker create`                  | `{"created", "started"}`               |
//! | `worker start|stop|kill <pattern>` | names affected                       |
//! | `reactor list`                   | reactor names                          |
//! | `reactor show`                   | name to definition and fire count      |
//! | `run [args..]`                   | the dispatched message's own result    |
//!
//! Keyword arguments of the management message are passed through: to the
//! hook for `hook call`, as settings for `worker create`, as the message
//! fields for `run`, and as `force_wildcard` for `worker kill`.

use serde_json::{json, Map, Value};

use super::strategy::dedicated_worker;
use super::worker_registry::WILDCARD;
use crate::errors::ConfigurationError;
use crate::hooks::{HookCall, HookKind, HookResult};
use crate::keywords::is_truthy;
use crate::message::{msg_pack, Message};

pub fn manage_workflow(call: &HookCall<'_>) -> HookResult {
    let args = call.args();
    let word = |index: usize| args.get(index).and_then(Value::as_str);
    let rest = args.get(2..).unwrap_or_default();
    let processor = call.processor();

    match (word(0), word(1)) {
        (Some("hook"), Some("list")) => values(processor.hooks().names()),
        (Some("hook"), Some("call")) => {
            let (name, hook_args) = match rest.split_first() {
                Some((Value::String(name), hook_args)) => (name.as_str(), hook_args),
                _ => return Err(missing("name", "hook call").into()),
            };
            values(call_hook(call, name, hook_args)?)
        }
        (Some("listener"), Some("list")) => values(processor.hooks().listener_names()),
        (Some("worker"), Some("list")) => values(processor.workers().names(pattern(rest))),
        (Some("worker"), Some("show")) => {
            values(Value::Object(processor.workers().snapshot(pattern(rest))))
        }
        (Some("worker"), Some("create")) => {
            let mut settings = call.kwargs().clone();
            settings.entry("start").or_insert(Value::Bool(false));
            values(dedicated_worker(processor, None, &settings)?)
        }
        (Some("worker"), Some("start")) => {
            let target = required_pattern(rest, "worker start")?;
            values(processor.workers().start_all_for(target, processor)?)
        }
        (Some("worker"), Some("stop")) => {
            let target = required_pattern(rest, "worker stop")?;
            values(processor.workers().stop_all_for(target))
        }
        (Some("worker"), Some("kill")) => {
            let target = required_pattern(rest, "worker kill")?;
            let force = call.kwarg("force_wildcard").map_or(false, is_truthy);
            values(processor.workers().kill_all_for(target, force)?)
        }
        (Some("reactor"), Some("list")) => values(processor.reactors().names()),
        (Some("reactor"), Some("show")) => values(processor.reactors().snapshot()),
        (Some("run"), _) => {
            let message = msg_pack(
                args[1..].iter().cloned(),
                call.kwargs().iter().map(|(k, v)| (k.as_str(), v.clone())),
            );
            processor.process(&message)
        }
        _ => Err(ConfigurationError::UnknownCommand(command_text(args)).into()),
    }
}

fn values(value: impl serde::Serialize) -> HookResult {
    Ok(json!({ "values": value }))
}

fn pattern(rest: &[Value]) -> &str {
    rest.first().and_then(Value::as_str).unwrap_or(WILDCARD)
}

fn required_pattern<'a>(rest: &'a [Value], command: &str) -> Result<&'a str, ConfigurationError> {
    rest.first()
        .and_then(Value::as_str)
        .ok_or_else(|| missing("pattern", command))
}

fn missing(what: &str, command: &str) -> ConfigurationError {
    ConfigurationError::InvalidArgument {
        name: what.to_string(),
        reason: format!("'{}' requires a {}", command, what),
    }
}

/// Invokes a hook by key (`echo_handler`) or bare handler name (`echo`).
fn call_hook(call: &HookCall<'_>, name: &str, args: &[Value]) -> HookResult {
    let (name, kind) = HookKind::split_key(name).unwrap_or((name, HookKind::Handler));
    let processor = call.processor();
    let hooks = processor.hooks();
    let message = Message {
        args: args.to_vec(),
        kwargs: call.kwargs().clone(),
        ..Message::default()
    };
    let settings = Map::new();
    let inner = HookCall::new(processor, &message, &settings, call.worker());

    match kind {
        HookKind::Handler => hooks.call_handler(name, &inner),
        HookKind::Validator => hooks.call_validator(name, &inner),
        HookKind::Workflow => hooks.call_workflow(name, &inner),
        HookKind::Converter => {
            let input = args.first().cloned().unwrap_or(Value::Null);
            hooks.call_converter(name, &inner, input)
        }
        HookKind::Returner => {
            let input = args.first().cloned().unwrap_or(Value::Null);
            hooks.call_returner(name, &inner, &input).map(|_| Value::Null)
        }
        HookKind::Worker => hooks.call_worker(name, processor, None, call.kwargs()),
    }
}

fn command_text(args: &[Value]) -> String {
    args.iter()
        .map(|arg| match arg {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProcessorError;
    use crate::runtime::Processor;

    fn manage(processor: &Processor, words: &[&str], kwargs: Value) -> HookResult {
        let mut builder = Message::builder().workflow("manage");
        for word in words {
            builder = builder.arg(*word);
        }
        let mut message = builder.build();
        if let Value::Object(kwargs) = kwargs {
            message.kwargs = kwargs;
        }
        processor.process(&message)
    }

    #[test]
    fn test_manage_commands_table_driven() {
        struct TestCase {
            name: &'static str,
            words: Vec<&'static str>,
            kwargs: Value,
            expected: Value,
        }

        let processor = Processor::new();
        processor
            .hooks()
            .register_handler("echo", |call| Ok(Value::Object(call.kwargs().clone())));
        processor
            .hooks()
            .register_handler("add", |call| {
                let sum: i64 = call.args().iter().filter_map(Value::as_i64).sum();
                Ok(json!(sum))
            });
        manage(&processor, &["worker", "create"], json!({ "name": "W" })).unwrap();
        manage(&processor, &["worker", "create"], json!({ "name": "V" })).unwrap();

        let test_cases = vec![
            TestCase {
                name: "worker list defaults to wildcard",
                words: vec!["worker", "list"],
                kwargs: json!({}),
                expected: json!({ "values": ["V", "W"] }),
            },
            TestCase {
                name: "worker list by name",
                words: vec!["worker", "list", "W"],
                kwargs: json!({}),
                expected: json!({ "values": ["W"] }),
            },
            TestCase {
                name: "hook call by bare name",
                words: vec!["hook", "call", "echo"],
                kwargs: json!({ "x": 1 }),
                expected: json!({ "values": { "x": 1 } }),
            },
            TestCase {
                name: "hook call by registry key",
                words: vec!["hook", "call", "add_handler"],
                kwargs: json!({}),
                expected: json!({ "values": 0 }),
            },
            TestCase {
                name: "run dispatches a synthesized message",
                words: vec!["run"],
                kwargs: json!({ "_handler": "echo", "y": 2 }),
                expected: json!({ "y": 2 }),
            },
            TestCase {
                name: "listener list is empty",
                words: vec!["listener", "list"],
                kwargs: json!({}),
                expected: json!({ "values": [] }),
            },
        ];

        for test_case in test_cases {
            let actual = manage(&processor, &test_case.words, test_case.kwargs).unwrap();
            assert_eq!(actual, test_case.expected, "Test case '{}'", test_case.name);
        }
        processor.close();
    }

    #[test]
    fn hook_list_includes_builtins_and_registered() {
        let processor = Processor::new();
        processor.hooks().register_handler("ping", |_| Ok(json!("pong")));
        let result = manage(&processor, &["hook", "list"], json!({})).unwrap();
        let names = result["values"].as_array().unwrap();
        assert!(names.contains(&json!("ping_handler")));
        assert!(names.contains(&json!("manage_workflow")));
    }

    #[test]
    fn worker_lifecycle_commands() {
        let processor = Processor::new();
        manage(&processor, &["worker", "create"], json!({ "name": "idle" })).unwrap();

        let started = manage(&processor, &["worker", "start", "idle"], json!({})).unwrap();
        assert_eq!(started, json!({ "values": ["idle"] }));
        let stopped = manage(&processor, &["worker", "stop", "idle"], json!({})).unwrap();
        assert_eq!(stopped, json!({ "values": ["idle"] }));

        let refused = manage(&processor, &["worker", "kill", "*"], json!({})).unwrap_err();
        assert!(matches!(
            refused,
            ProcessorError::Configuration(ConfigurationError::WildcardNotForced { .. })
        ));
        let killed =
            manage(&processor, &["worker", "kill", "*"], json!({ "force_wildcard": true })).unwrap();
        assert_eq!(killed, json!({ "values": ["idle"] }));
        assert!(processor.workers().is_empty());
    }

    #[test]
    fn worker_show_exposes_context() {
        let processor = Processor::new();
        manage(
            &processor,
            &["worker", "create"],
            json!({ "name": "gps", "messages": [{ "handler": "fix" }] }),
        )
        .unwrap();
        let shown = manage(&processor, &["worker", "show"], json!({})).unwrap();
        assert_eq!(shown["values"]["gps"]["messages"], json!([{ "handler": "fix" }]));
        assert_eq!(shown["values"]["gps"]["distinct_errors"], json!({}));
        processor.close();
    }

    #[test]
    fn unknown_commands_are_rejected() {
        let processor = Processor::new();
        for words in [vec!["worker", "dance"], vec!["reboot"], vec![]] {
            let err = manage(&processor, &words, json!({})).unwrap_err();
            assert!(
                matches!(
                    err,
                    ProcessorError::Configuration(ConfigurationError::UnknownCommand(_))
                ),
                "{:?} should be unknown",
                words
            );
        }
    }
}
