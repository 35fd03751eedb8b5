// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Thread-synchronized table of hooks and listeners owned by one processor.

use parking_lot::{ReentrantMutex, RwLock};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::{
    ConverterFn, HandlerFn, Hook, HookCall, HookKind, HookResult, Listener, ListenerFn,
    MatcherFn, ReturnerFn, ValidatorFn, WorkerFn, WorkflowFn,
};
use crate::engine::builtins;
use crate::errors::{ConfigurationError, ProcessorError};
use crate::message::Message;
use crate::observability::messages::hooks::{HookRegistered, ListenerFailed, ListenerRegistered};
use crate::observability::messages::StructuredLog;
use crate::runtime::Processor;

#[derive(Clone)]
struct HookEntry {
    hook: Hook,
    synchronize: bool,
}

/// Registry of named hooks and result listeners.
///
/// Hooks registered with `synchronize = true` run while holding a
/// registry-wide reentrant lock, so a synchronized hook may call into other
/// hooks of the same processor without deadlocking. Listeners never take
/// that lock.
///
/// # Examples
/// ```
/// use edge_processor::hooks::HookRegistry;
/// use serde_json::Value;
///
/// let registry = HookRegistry::new();
/// registry.register_handler("echo", |call| Ok(Value::Object(call.kwargs().clone())));
/// assert!(registry.names().contains(&"echo_handler".to_string()));
/// ```
pub struct HookRegistry {
    lock: ReentrantMutex<()>,
    hooks: RwLock<HashMap<String, HookEntry>>,
    listeners: RwLock<Vec<Listener>>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            lock: ReentrantMutex::new(()),
            hooks: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Stores `hook` under `"{name}_{kind}"`, replacing any previous entry.
    pub fn register_hook(&self, name: &str, hook: Hook, synchronize: bool) {
        let key = hook.kind().key(name);
        HookRegistered {
            key: &key,
            synchronize,
        }
        .log();
        self.hooks
            .write()
            .insert(key, HookEntry { hook, synchronize });
    }

    pub fn register_handler<F>(&self, name: &str, func: F)
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        let func: HandlerFn = Arc::new(func);
        self.register_hook(name, Hook::Handler(func), true);
    }

    /// Registers a handler that runs without the registry lock.
    pub fn register_unsynchronized_handler<F>(&self, name: &str, func: F)
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        let func: HandlerFn = Arc::new(func);
        self.register_hook(name, Hook::Handler(func), false);
    }

    pub fn register_validator<F>(&self, name: &str, func: F)
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        let func: ValidatorFn = Arc::new(func);
        self.register_hook(name, Hook::Validator(func), true);
    }

    pub fn register_converter<F>(&self, name: &str, func: F)
    where
        F: Fn(&HookCall<'_>, Value) -> HookResult + Send + Sync + 'static,
    {
        let func: ConverterFn = Arc::new(func);
        self.register_hook(name, Hook::Converter(func), true);
    }

    pub fn register_returner<F>(&self, name: &str, func: F)
    where
        F: Fn(&HookCall<'_>, &Value) -> HookResult<()> + Send + Sync + 'static,
    {
        let func: ReturnerFn = Arc::new(func);
        self.register_hook(name, Hook::Returner(func), true);
    }

    pub fn register_workflow<F>(&self, name: &str, func: F)
    where
        F: Fn(&HookCall<'_>) -> HookResult + Send + Sync + 'static,
    {
        let func: WorkflowFn = Arc::new(func);
        self.register_hook(name, Hook::Workflow(func), true);
    }

    pub fn register_worker(&self, name: &str, func: WorkerFn) {
        self.register_hook(name, Hook::Worker(func), true);
    }

    /// Adds a result listener; listeners fire in registration order.
    pub fn register_listener<F>(&self, name: &str, func: F, matcher: Option<MatcherFn>)
    where
        F: Fn(&Message, &Value) -> HookResult<()> + Send + Sync + 'static,
    {
        let func: ListenerFn = Arc::new(func);
        ListenerRegistered {
            name,
            gated: matcher.is_some(),
        }
        .log();
        self.listeners.write().push(Listener {
            name: name.to_string(),
            func,
            matcher,
        });
    }

    /// Resolves a hook, falling back to the built-in workflows and workers.
    pub fn get(&self, name: &str, kind: HookKind) -> Result<(Hook, bool), ConfigurationError> {
        let key = kind.key(name);
        if let Some(entry) = self.hooks.read().get(&key) {
            return Ok((entry.hook.clone(), entry.synchronize));
        }
        builtins::lookup(name, kind)
            .map(|hook| (hook, false))
            .ok_or(ConfigurationError::UnknownHook { key })
    }

    pub fn contains(&self, name: &str, kind: HookKind) -> bool {
        self.get(name, kind).is_ok()
    }

    /// Every known hook key, registered and built-in, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hooks.read().keys().cloned().collect();
        for key in builtins::KEYS {
            if !names.iter().any(|name| name == key) {
                names.push(key.to_string());
            }
        }
        names.sort();
        names
    }

    pub fn listener_names(&self) -> Vec<String> {
        self.listeners
            .read()
            .iter()
            .map(|listener| listener.name.clone())
            .collect()
    }

    /// Runs `f` under the registry lock when `synchronize` is set.
    pub fn synchronized<T>(&self, synchronize: bool, f: impl FnOnce() -> T) -> T {
        if synchronize {
            let _guard = self.lock.lock();
            f()
        } else {
            f()
        }
    }

    pub fn call_handler(&self, name: &str, call: &HookCall<'_>) -> HookResult {
        match self.get(name, HookKind::Handler)? {
            (Hook::Handler(func), synchronize) => self.synchronized(synchronize, || func(call)),
            (other, _) => Err(wrong_kind(name, HookKind::Handler, &other)),
        }
    }

    pub fn call_validator(&self, name: &str, call: &HookCall<'_>) -> HookResult {
        match self.get(name, HookKind::Validator)? {
            (Hook::Validator(func), synchronize) => self.synchronized(synchronize, || func(call)),
            (other, _) => Err(wrong_kind(name, HookKind::Validator, &other)),
        }
    }

    pub fn call_converter(&self, name: &str, call: &HookCall<'_>, result: Value) -> HookResult {
        match self.get(name, HookKind::Converter)? {
            (Hook::Converter(func), synchronize) => {
                self.synchronized(synchronize, || func(call, result))
            }
            (other, _) => Err(wrong_kind(name, HookKind::Converter, &other)),
        }
    }

    pub fn call_returner(&self, name: &str, call: &HookCall<'_>, result: &Value) -> HookResult<()> {
        match self.get(name, HookKind::Returner)? {
            (Hook::Returner(func), synchronize) => {
                self.synchronized(synchronize, || func(call, result))
            }
            (other, _) => Err(wrong_kind(name, HookKind::Returner, &other)),
        }
    }

    pub fn call_workflow(&self, name: &str, call: &HookCall<'_>) -> HookResult {
        match self.get(name, HookKind::Workflow)? {
            (Hook::Workflow(func), synchronize) => self.synchronized(synchronize, || func(call)),
            (other, _) => Err(wrong_kind(name, HookKind::Workflow, &other)),
        }
    }

    pub fn call_worker(
        &self,
        name: &str,
        processor: &Processor,
        message: Option<&Message>,
        settings: &Map<String, Value>,
    ) -> HookResult {
        match self.get(name, HookKind::Worker)? {
            (Hook::Worker(func), synchronize) => {
                self.synchronized(synchronize, || func(processor, message, settings))
            }
            (other, _) => Err(wrong_kind(name, HookKind::Worker, &other)),
        }
    }

    /// Fires every accepting listener, in registration order. Returns how many failed.
    ///
    /// Works on a snapshot so listeners may register further listeners. A
    /// failing listener is logged; the rest still run and the workflow
    /// result is unaffected.
    pub fn fire_listeners(&self, message: &Message, result: &Value) -> usize {
        let listeners = self.listeners.read().clone();
        let mut failed = 0;
        for listener in listeners.iter().filter(|l| l.accepts(message, result)) {
            if let Err(error) = (listener.func)(message, result) {
                ListenerFailed {
                    listener: &listener.name,
                    error: &error,
                }
                .log();
                failed += 1;
            }
        }
        failed
    }
}

fn wrong_kind(name: &str, expected: HookKind, found: &Hook) -> ProcessorError {
    ConfigurationError::InvalidArgument {
        name: expected.key(name),
        reason: format!("registered as a {} hook", found.kind()),
    }
    .into()
}
