// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The processor: hooks, workers and reactors behind one cheap handle.
//!
//! `Processor` is a reference-counted handle, so hooks and worker threads can
//! hold it without lifetimes. Worker threads keep only a [`WeakProcessor`];
//! once the last strong handle is gone they exit at their next wake-up.

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};

use super::reactor::ReactorRegistry;
use crate::engine::worker_registry::WILDCARD;
use crate::engine::{Worker, WorkerRegistry, WorkerSettings};
use crate::errors::{ConfigurationError, ProcessorError};
use crate::hooks::{HookCall, HookKind, HookRegistry, HookResult};
use crate::message::{HookUrl, Message};
use crate::observability::messages::worker::WorkerCreated;
use crate::observability::messages::StructuredLog;
use crate::traits::HostCommand;

/// Called with the worker name and its error when a worker dies of a fatal error.
pub type FailureCallback = Arc<dyn Fn(&str, &ProcessorError) + Send + Sync>;

const DEFAULT_WORKER: &str = "shared";

struct ProcessorCore {
    hooks: HookRegistry,
    workers: WorkerRegistry,
    reactors: ReactorRegistry,
    host: Option<Arc<dyn HostCommand>>,
    failure_callback: RwLock<Option<FailureCallback>>,
}

#[derive(Clone)]
pub struct Processor {
    core: Arc<ProcessorCore>,
}

/// Non-owning handle held by worker threads.
#[derive(Clone)]
pub struct WeakProcessor {
    core: Weak<ProcessorCore>,
}

impl WeakProcessor {
    pub fn upgrade(&self) -> Option<Processor> {
        self.core.upgrade().map(|core| Processor { core })
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("workers", &self.core.workers.len())
            .field("host", &self.core.host.is_some())
            .finish()
    }
}

impl Processor {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A processor whose handlers can reach the host through [`HookCall::host`].
    pub fn with_host(host: Arc<dyn HostCommand>) -> Self {
        Self::build(Some(host))
    }

    fn build(host: Option<Arc<dyn HostCommand>>) -> Self {
        Self {
            core: Arc::new(ProcessorCore {
                hooks: HookRegistry::new(),
                workers: WorkerRegistry::new(),
                reactors: ReactorRegistry::new(),
                host,
                failure_callback: RwLock::new(None),
            }),
        }
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.core.hooks
    }

    pub fn workers(&self) -> &WorkerRegistry {
        &self.core.workers
    }

    pub fn reactors(&self) -> &ReactorRegistry {
        &self.core.reactors
    }

    pub fn host(&self) -> Option<&dyn HostCommand> {
        self.core.host.as_deref()
    }

    pub fn downgrade(&self) -> WeakProcessor {
        WeakProcessor {
            core: Arc::downgrade(&self.core),
        }
    }

    /// Routes a message to its worker hook, `shared` unless overridden.
    ///
    /// With `shared` the workflow runs on the calling thread and its result
    /// is returned; `dedicated` returns what it did with the message.
    pub fn process(&self, message: &Message) -> HookResult {
        let url = match message.hook_override(HookKind::Worker) {
            Some(raw) => HookUrl::parse(raw)?,
            None => HookUrl {
                name: DEFAULT_WORKER.to_string(),
                settings: Map::new(),
            },
        };
        self.core
            .hooks
            .call_worker(&url.name, self, Some(message), &url.settings)
    }

    /// Runs the message's workflow, on behalf of `worker` when given.
    pub fn run_workflow(&self, message: &Message, worker: Option<&Worker>) -> HookResult {
        let (name, settings) = match message.hook_override(HookKind::Workflow) {
            Some(raw) => {
                let url = HookUrl::parse(raw)?;
                (url.name, url.settings)
            }
            None => (message.workflow_name().to_string(), Map::new()),
        };
        let call = HookCall::new(self, message, &settings, worker);
        self.core.hooks.call_workflow(&name, &call)
    }

    /// Creates and registers a worker, starting it when `settings.start` is set.
    ///
    /// A worker already registered under `name` is killed and replaced.
    pub fn create_worker(
        &self,
        name: &str,
        settings: WorkerSettings,
        messages: Vec<Message>,
    ) -> Result<Arc<Worker>, ProcessorError> {
        if name.is_empty() || name == WILDCARD {
            return Err(ConfigurationError::InvalidArgument {
                name: "name".to_string(),
                reason: format!("'{}' is not a valid worker name", name),
            }
            .into());
        }

        let start = settings.start;
        let worker = Worker::new(name, settings, messages);
        WorkerCreated {
            worker: worker.name(),
            loop_interval: worker.settings().loop_interval,
            messages: worker.messages().len(),
        }
        .log();
        self.core.workers.register(Arc::clone(&worker));
        if start {
            worker.start(self)?;
        }
        Ok(worker)
    }

    /// Kills every worker. Returns the names of the workers that were killed.
    pub fn close(&self) -> Vec<String> {
        self.core
            .workers
            .kill_all_for(WILDCARD, true)
            .unwrap_or_default()
    }

    pub fn set_failure_callback(&self, callback: FailureCallback) {
        *self.core.failure_callback.write() = Some(callback);
    }

    pub fn report_worker_failure(&self, worker: &str, error: &ProcessorError) {
        let callback = self.core.failure_callback.read().clone();
        if let Some(callback) = callback {
            callback(worker, error);
        }
    }

    /// Convenience for hooks and tests: processes a message built from a JSON value.
    pub fn process_value(&self, value: Value) -> HookResult {
        let message = Message::from_value(value)?;
        self.process(&message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::{Duration, Instant};

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

    struct Uname;

    impl HostCommand for Uname {
        fn exec(&self, name: &str, args: &[Value], _kwargs: &Map<String, Value>) -> HookResult {
            Ok(json!({ "command": name, "args": args }))
        }
    }

    #[test]
    fn process_defaults_to_shared_worker_and_simple_workflow() {
        let processor = Processor::new();
        processor
            .hooks()
            .register_handler("double", |call| Ok(json!(call.arg(0).and_then(Value::as_i64).unwrap_or(0) * 2)));

        let result = processor
            .process_value(json!({ "handler": "double", "args": [21] }))
            .unwrap();
        assert_eq!(result, json!(42));
    }

    #[test]
    fn unknown_worker_hook_is_a_configuration_error() {
        let processor = Processor::new();
        let err = processor
            .process_value(json!({ "handler": "x", "worker": "remote" }))
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::Configuration(ConfigurationError::UnknownHook { ref key }) if key == "remote_worker"
        ));
    }

    #[test]
    fn handlers_reach_the_host_capability() {
        let processor = Processor::with_host(Arc::new(Uname));
        processor.hooks().register_handler("uname", |call| match call.host() {
            Some(host) => host.exec("uname", &[json!("-a")], &Map::new()),
            None => Err(ProcessorError::handler("no host")),
        });

        let result = processor.process_value(json!({ "handler": "uname" })).unwrap();
        assert_eq!(result, json!({ "command": "uname", "args": ["-a"] }));
        assert!(Processor::new().host().is_none());
    }

    #[test]
    fn create_worker_rejects_reserved_names() {
        let processor = Processor::new();
        for name in ["", "*"] {
            let err = processor
                .create_worker(name, WorkerSettings::default(), Vec::new())
                .unwrap_err();
            assert!(matches!(err, ProcessorError::Configuration(_)), "name '{}'", name);
        }
        assert!(processor.workers().is_empty());
    }

    #[test]
    fn fatal_worker_errors_reach_the_failure_callback() {
        let processor = Processor::new();
        processor
            .hooks()
            .register_handler("broken", |_| Err(ProcessorError::handler("sensor offline")));
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        processor.set_failure_callback(Arc::new(move |worker: &str, error: &ProcessorError| {
            sink.lock().push((worker.to_string(), error.to_string()));
        }));

        let settings = WorkerSettings {
            loop_interval: Some(Duration::from_millis(10)),
            suppress_exceptions: false,
            ..WorkerSettings::default()
        };
        let message = Message::builder().handler("broken").build();
        processor.create_worker("imu", settings, vec![message]).unwrap();

        assert!(wait_for(|| !failures.lock().is_empty()));
        assert_eq!(
            failures.lock()[0],
            ("imu".to_string(), "sensor offline".to_string())
        );
        assert!(wait_for(|| processor.workers().get("imu").is_none()));
    }

    #[test]
    fn close_kills_every_worker() {
        let processor = Processor::new();
        for name in ["a", "b"] {
            let settings = WorkerSettings {
                start: false,
                ..WorkerSettings::default()
            };
            processor.create_worker(name, settings, Vec::new()).unwrap();
        }

        let mut killed = processor.close();
        killed.sort();
        assert_eq!(killed, vec!["a".to_string(), "b".to_string()]);
        assert!(processor.workers().is_empty());
    }

    #[test]
    fn weak_handles_do_not_keep_the_processor_alive() {
        let processor = Processor::new();
        let weak = processor.downgrade();
        assert!(weak.upgrade().is_some());
        drop(processor);
        assert!(weak.upgrade().is_none());
    }
}
