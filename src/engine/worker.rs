// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Long-lived workers that replay their queued messages through the workflow engine.
//!
//! A worker owns a persistent list of messages. Each *pass* runs every message
//! of a snapshot of that list, in FIFO order, through its workflow. Between
//! passes the worker sleeps for its loop interval, or, without one, until its
//! message list changes. Messages are not consumed by a pass; they stay queued
//! until dequeued.
//!
//! # Outcomes
//!
//! Each workflow run is classified as an [`Outcome`]:
//! * `Ok` - nothing to record,
//! * `Soft` - a warning; counted in `distinct_warnings`, logged every time,
//! * `Hard` - an error; counted in `distinct_errors` and logged through an
//!   [`ErrorLogLimiter`]. With `suppress_exceptions = false`, or for
//!   configuration errors, the worker dies and is deregistered.
//!
//! # Lifecycle
//!
//! ```text
//!   create(start=false) ──► Stopped ◄──── stop ────┐
//!                              │                   │
//!                            start                 │
//!                              ▼                   │
//!   create(start=true) ───► Running ───────────────┘
//!                              │
//!          kill / fatal error / clean pass with kill_upon_success
//!                              ▼
//!                           Killed (deregistered)
//! ```
//!
//! Kills are cooperative: the flag is checked between messages and between
//! passes, and an in-flight handler always runs to completion.

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error_log::ErrorLogLimiter;
use crate::errors::{ConfigurationError, ProcessorError};
use crate::hooks::HookResult;
use crate::message::Message;
use crate::observability::messages::worker::{
    WorkerErrorRepeated, WorkerFatal, WorkerPassFailed, WorkerStarted, WorkerStopped,
    WorkerWarning,
};
use crate::observability::messages::StructuredLog;
use crate::runtime::{Processor, WeakProcessor};

/// Classification of one workflow run inside a worker.
#[derive(Debug, Clone)]
pub enum Outcome {
    Ok(Value),
    Soft(String),
    Hard(ProcessorError),
}

impl From<HookResult> for Outcome {
    fn from(result: HookResult) -> Self {
        match result {
            Ok(value) => Outcome::Ok(value),
            Err(ProcessorError::Warning(warning)) => Outcome::Soft(warning),
            Err(error) => Outcome::Hard(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Stopped,
    Running,
    Killed,
}

/// Scheduling knobs fixed at worker creation.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSettings {
    /// Pause between passes; `None` waits for the message list to change.
    pub loop_interval: Option<Duration>,
    pub suppress_exceptions: bool,
    pub kill_upon_success: bool,
    pub start: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            loop_interval: None,
            suppress_exceptions: true,
            kill_upon_success: false,
            start: true,
        }
    }
}

impl WorkerSettings {
    /// Reads `loop`, `suppress_exceptions`, `kill_upon_success` and `start`
    /// from hook settings or management keyword arguments.
    pub fn from_settings(settings: &Map<String, Value>) -> Result<Self, ConfigurationError> {
        let defaults = Self::default();
        Ok(Self {
            loop_interval: loop_interval(settings.get("loop"))?,
            suppress_exceptions: flag(settings, "suppress_exceptions", defaults.suppress_exceptions)?,
            kill_upon_success: flag(settings, "kill_upon_success", defaults.kill_upon_success)?,
            start: flag(settings, "start", defaults.start)?,
        })
    }
}

fn loop_interval(raw: Option<&Value>) -> Result<Option<Duration>, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidArgument {
        name: "loop".to_string(),
        reason,
    };
    match raw {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Number(number)) => {
            let seconds = number.as_f64().unwrap_or(f64::NAN);
            if seconds.is_finite() && seconds >= 0.0 {
                Ok(Some(Duration::from_secs_f64(seconds)))
            } else {
                Err(invalid(format!("{} is not a valid interval", number)))
            }
        }
        Some(other) => Err(invalid(format!("expected seconds, got {}", other))),
    }
}

fn flag(settings: &Map<String, Value>, key: &str, default: bool) -> Result<bool, ConfigurationError> {
    match settings.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(value)) => Ok(*value),
        Some(Value::Number(number)) => Ok(number.as_f64().map_or(false, |n| n != 0.0)),
        Some(Value::String(text)) => match text.as_str() {
            "True" | "true" | "1" => Ok(true),
            "False" | "false" | "0" => Ok(false),
            _ => Err(ConfigurationError::InvalidArgument {
                name: key.to_string(),
                reason: format!("'{}' is not a boolean", text),
            }),
        },
        Some(other) => Err(ConfigurationError::InvalidArgument {
            name: key.to_string(),
            reason: format!("{} is not a boolean", other),
        }),
    }
}

/// Per-worker state shared between the worker thread and its observers.
#[derive(Debug, Clone, Default)]
pub struct WorkerContext {
    pub messages: Vec<Message>,
    pub last_warning: Option<DateTime<Utc>>,
    pub last_error: Option<DateTime<Utc>>,
    pub distinct_warnings: BTreeMap<String, u64>,
    pub distinct_errors: BTreeMap<String, u64>,
    /// Keys set by handlers.
    pub values: Map<String, Value>,
}

impl WorkerContext {
    /// Returns the occurrence count including this one.
    pub fn record_warning(&mut self, warning: &str, at: DateTime<Utc>) -> u64 {
        self.last_warning = Some(at);
        bump(&mut self.distinct_warnings, warning)
    }

    pub fn record_error(&mut self, error: &str, at: DateTime<Utc>) -> u64 {
        self.last_error = Some(at);
        bump(&mut self.distinct_errors, error)
    }

    /// JSON view with the reserved keys taking precedence over handler keys.
    pub fn to_value(&self) -> Value {
        let mut view = self.values.clone();
        view.insert(
            "messages".to_string(),
            Value::Array(self.messages.iter().map(Message::to_value).collect()),
        );
        view.insert("last_warning".to_string(), timestamp(self.last_warning));
        view.insert("last_error".to_string(), timestamp(self.last_error));
        view.insert("distinct_warnings".to_string(), json!(self.distinct_warnings));
        view.insert("distinct_errors".to_string(), json!(self.distinct_errors));
        Value::Object(view)
    }
}

fn bump(counts: &mut BTreeMap<String, u64>, key: &str) -> u64 {
    let count = counts.entry(key.to_string()).or_insert(0);
    *count += 1;
    *count
}

fn timestamp(at: Option<DateTime<Utc>>) -> Value {
    at.map_or(Value::Null, |at| Value::String(at.to_rfc3339()))
}

#[derive(Debug)]
struct Control {
    state: WorkerState,
    queue_changed: bool,
    thread_spawned: bool,
}

enum Pass {
    Clean,
    Dirty,
    Fatal(ProcessorError),
}

/// A named long-lived task with its own thread and message queue.
pub struct Worker {
    name: String,
    settings: WorkerSettings,
    context: Mutex<WorkerContext>,
    control: Mutex<Control>,
    wake: Condvar,
    limiter: Mutex<ErrorLogLimiter>,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Worker {
    /// Creates a stopped worker; see [`Worker::start`].
    pub fn new(name: impl Into<String>, settings: WorkerSettings, messages: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            settings,
            context: Mutex::new(WorkerContext {
                messages,
                ..WorkerContext::default()
            }),
            control: Mutex::new(Control {
                state: WorkerState::Stopped,
                queue_changed: false,
                thread_spawned: false,
            }),
            wake: Condvar::new(),
            limiter: Mutex::new(ErrorLogLimiter::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn state(&self) -> WorkerState {
        self.control.lock().state
    }

    /// Copy of the context; safe to inspect while the worker runs.
    pub fn context(&self) -> WorkerContext {
        self.context.lock().clone()
    }

    pub fn snapshot(&self) -> Value {
        self.context.lock().to_value()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.context.lock().values.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.context.lock().values.insert(key.into(), value);
    }

    /// Mutates the context under its lock. `f` must not call back into this worker.
    pub fn update<R>(&self, f: impl FnOnce(&mut WorkerContext) -> R) -> R {
        f(&mut self.context.lock())
    }

    pub fn messages(&self) -> Vec<Message> {
        self.context.lock().messages.clone()
    }

    pub fn enqueue(&self, message: Message) {
        self.context.lock().messages.push(message);
        self.notify_queue_changed();
    }

    /// Removes exactly one queued entry equal to `message`.
    pub fn dequeue(&self, message: &Message) -> bool {
        let removed = {
            let mut context = self.context.lock();
            match context.messages.iter().position(|queued| queued == message) {
                Some(index) => {
                    context.messages.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.notify_queue_changed();
        }
        removed
    }

    fn notify_queue_changed(&self) {
        self.control.lock().queue_changed = true;
        self.wake.notify_all();
    }

    /// Starts or resumes the worker. Returns `false` when it was already
    /// running or has been killed.
    pub fn start(self: &Arc<Self>, processor: &Processor) -> Result<bool, ProcessorError> {
        let mut control = self.control.lock();
        if control.state != WorkerState::Stopped {
            return Ok(false);
        }
        if !control.thread_spawned {
            let worker = Arc::clone(self);
            let weak = processor.downgrade();
            std::thread::Builder::new()
                .name(format!("worker:{}", self.name))
                .spawn(move || worker.run(weak))
                .map_err(|e| {
                    ProcessorError::Fatal(format!("failed to spawn worker '{}': {}", self.name, e))
                })?;
            control.thread_spawned = true;
        }
        control.state = WorkerState::Running;
        self.wake.notify_all();
        Ok(true)
    }

    /// Pauses a running worker after its current message.
    pub fn stop(&self) -> bool {
        let mut control = self.control.lock();
        if control.state != WorkerState::Running {
            return false;
        }
        control.state = WorkerState::Stopped;
        self.wake.notify_all();
        true
    }

    /// Flags the worker for termination. Returns `false` if already killed.
    pub fn kill(&self) -> bool {
        let mut control = self.control.lock();
        if control.state == WorkerState::Killed {
            return false;
        }
        control.state = WorkerState::Killed;
        self.wake.notify_all();
        true
    }

    fn run(self: Arc<Self>, processor: WeakProcessor) {
        WorkerStarted {
            worker: &self.name,
            loop_interval: self.settings.loop_interval,
        }
        .log();

        let reason = loop {
            if !self.wait_until_runnable() {
                break "killed";
            }
            let Some(processor) = processor.upgrade() else {
                break "processor dropped";
            };
            match self.run_pass(&processor) {
                Pass::Clean if self.settings.kill_upon_success => {
                    self.kill();
                    processor.workers().deregister(&self);
                    break "completed";
                }
                Pass::Clean | Pass::Dirty => {}
                Pass::Fatal(error) => {
                    WorkerFatal {
                        worker: &self.name,
                        error: &error,
                    }
                    .log();
                    self.kill();
                    processor.workers().deregister(&self);
                    processor.report_worker_failure(&self.name, &error);
                    break "fatal error";
                }
            }
            drop(processor);
            self.sleep_until_next_tick();
        };

        WorkerStopped {
            worker: &self.name,
            reason,
        }
        .log();
    }

    /// Blocks while stopped. Returns `false` once killed.
    fn wait_until_runnable(&self) -> bool {
        let mut control = self.control.lock();
        loop {
            match control.state {
                WorkerState::Running => {
                    control.queue_changed = false;
                    return true;
                }
                WorkerState::Killed => return false,
                WorkerState::Stopped => self.wake.wait(&mut control),
            }
        }
    }

    fn sleep_until_next_tick(&self) {
        let mut control = self.control.lock();
        match self.settings.loop_interval {
            Some(interval) => {
                let deadline = Instant::now() + interval;
                while control.state == WorkerState::Running {
                    if self.wake.wait_until(&mut control, deadline).timed_out() {
                        break;
                    }
                }
            }
            None => {
                while control.state == WorkerState::Running && !control.queue_changed {
                    self.wake.wait(&mut control);
                }
            }
        }
    }

    fn run_pass(&self, processor: &Processor) -> Pass {
        let messages = self.messages();
        let mut clean = true;

        for message in &messages {
            if self.state() == WorkerState::Killed {
                return Pass::Dirty;
            }
            match Outcome::from(processor.run_workflow(message, Some(self))) {
                Outcome::Ok(_) => {}
                Outcome::Soft(warning) => {
                    clean = false;
                    let count = self.context.lock().record_warning(&warning, Utc::now());
                    WorkerWarning {
                        worker: &self.name,
                        warning: &warning,
                        count,
                    }
                    .log();
                }
                Outcome::Hard(error) => {
                    clean = false;
                    let text = error.to_string();
                    let count = self.context.lock().record_error(&text, Utc::now());
                    if self.limiter.lock().should_log_full(&text, count, Instant::now()) {
                        WorkerPassFailed {
                            worker: &self.name,
                            error: &error,
                            count,
                        }
                        .log();
                    } else {
                        WorkerErrorRepeated {
                            worker: &self.name,
                            error: &text,
                            count,
                        }
                        .log();
                    }
                    let configuration = matches!(error, ProcessorError::Configuration(_));
                    if configuration || !self.settings.suppress_exceptions {
                        return Pass::Fatal(error);
                    }
                }
            }
        }

        if clean {
            Pass::Clean
        } else {
            Pass::Dirty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_settings_table_driven() {
        struct TestCase {
            name: &'static str,
            settings: Value,
            expected: Result<WorkerSettings, ()>,
        }

        let test_cases = vec![
            TestCase {
                name: "defaults",
                settings: json!({}),
                expected: Ok(WorkerSettings::default()),
            },
            TestCase {
                name: "interval and one-shot",
                settings: json!({ "loop": 0.5, "kill_upon_success": true, "start": false }),
                expected: Ok(WorkerSettings {
                    loop_interval: Some(Duration::from_millis(500)),
                    suppress_exceptions: true,
                    kill_upon_success: true,
                    start: false,
                }),
            },
            TestCase {
                name: "string booleans",
                settings: json!({ "suppress_exceptions": "False" }),
                expected: Ok(WorkerSettings {
                    suppress_exceptions: false,
                    ..WorkerSettings::default()
                }),
            },
            TestCase {
                name: "negative interval",
                settings: json!({ "loop": -1 }),
                expected: Err(()),
            },
            TestCase {
                name: "non boolean flag",
                settings: json!({ "start": "later" }),
                expected: Err(()),
            },
        ];

        for test_case in test_cases {
            let settings = test_case.settings.as_object().cloned().unwrap_or_default();
            let actual = WorkerSettings::from_settings(&settings).map_err(|_| ());
            assert_eq!(actual, test_case.expected, "Test case '{}'", test_case.name);
        }
    }

    #[test]
    fn outcome_separates_soft_from_hard() {
        assert!(matches!(Outcome::from(Ok(json!(1))), Outcome::Ok(_)));
        assert!(matches!(
            Outcome::from(Err(ProcessorError::warning("weak signal"))),
            Outcome::Soft(w) if w == "weak signal"
        ));
        assert!(matches!(
            Outcome::from(Err(ProcessorError::handler("no modem"))),
            Outcome::Hard(_)
        ));
    }

    #[test]
    fn context_snapshot_exposes_reserved_keys() {
        let worker = Worker::new("gps", WorkerSettings::default(), vec![]);
        worker.set("fix", json!("3d"));
        worker.set("messages", json!("shadowed"));
        worker.update(|context| {
            context.record_error("timeout", Utc::now());
            context.record_error("timeout", Utc::now());
        });

        let snapshot = worker.snapshot();
        assert_eq!(snapshot["fix"], json!("3d"));
        assert_eq!(snapshot["messages"], json!([]));
        assert_eq!(snapshot["distinct_errors"], json!({ "timeout": 2 }));
        assert!(snapshot["last_error"].is_string());
        assert!(snapshot["last_warning"].is_null());
    }

    #[test]
    fn dequeue_removes_exactly_one_entry() {
        let message = Message::builder().handler("count").build();
        let worker = Worker::new(
            "w",
            WorkerSettings::default(),
            vec![message.clone(), message.clone()],
        );
        assert!(worker.dequeue(&message));
        assert_eq!(worker.messages().len(), 1);
        assert!(worker.dequeue(&message));
        assert!(!worker.dequeue(&message));
    }

    #[test]
    fn lifecycle_flags() {
        let worker = Worker::new("idle", WorkerSettings::default(), vec![]);
        assert_eq!(worker.state(), WorkerState::Stopped);
        assert!(!worker.stop());
        assert!(worker.kill());
        assert!(!worker.kill());
        assert_eq!(worker.state(), WorkerState::Killed);
    }

    #[test]
    fn kill_wakes_a_worker_sleeping_on_a_long_loop() {
        let processor = Processor::new();
        let passes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&passes);
        processor.hooks().register_handler("poll", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!("ok"))
        });
        let settings = WorkerSettings {
            loop_interval: Some(Duration::from_secs(60)),
            ..WorkerSettings::default()
        };
        let message = Message::builder().handler("poll").build();
        let worker = processor.create_worker("sleepy", settings, vec![message]).unwrap();
        assert!(wait_for(|| passes.load(Ordering::SeqCst) == 1));

        let started = Instant::now();
        let killed = processor.workers().kill_all_for("sleepy", false).unwrap();

        assert_eq!(killed, vec!["sleepy".to_string()]);
        assert_eq!(worker.state(), WorkerState::Killed);
        assert!(processor.workers().get("sleepy").is_none());
        // The worker thread holds the last other reference; it exits once woken.
        let thread_handle = Arc::downgrade(&worker);
        drop(worker);
        assert!(wait_for(|| thread_handle.upgrade().is_none()));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(passes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn warnings_are_recorded_and_do_not_end_a_one_shot_worker() {
        let processor = Processor::new();
        processor
            .hooks()
            .register_handler("weak", |_| Err(ProcessorError::warning("weak signal")));
        let settings = WorkerSettings {
            loop_interval: Some(Duration::from_millis(10)),
            kill_upon_success: true,
            ..WorkerSettings::default()
        };
        let message = Message::builder().handler("weak").build();
        let worker = processor.create_worker("modem", settings, vec![message]).unwrap();

        assert!(wait_for(|| {
            worker.context().distinct_warnings.get("weak signal").copied().unwrap_or(0) >= 2
        }));
        let context = worker.context();
        assert!(context.last_warning.is_some());
        assert!(context.distinct_errors.is_empty());
        assert_eq!(worker.state(), WorkerState::Running);
        assert!(processor.workers().get("modem").is_some());

        processor.workers().kill_all_for("modem", false).unwrap();
    }
}
