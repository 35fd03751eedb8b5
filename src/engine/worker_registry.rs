// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::Worker;
use crate::errors::{ConfigurationError, ProcessorError};
use crate::runtime::Processor;

/// Pattern selecting every worker.
pub const WILDCARD: &str = "*";

fn matches(pattern: &str, name: &str) -> bool {
    pattern == WILDCARD || pattern == name
}

/// Index of named workers.
///
/// The lock is held only for bookkeeping. Lifecycle calls on the selected
/// workers only flip flags and notify, so no handler ever runs under it.
#[derive(Default)]
pub struct WorkerRegistry {
    workers: Mutex<BTreeMap<String, Arc<Worker>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `worker`, killing any different worker it replaces.
    pub fn register(&self, worker: Arc<Worker>) {
        let replaced = self
            .workers
            .lock()
            .insert(worker.name().to_string(), Arc::clone(&worker));
        if let Some(old) = replaced {
            if !Arc::ptr_eq(&old, &worker) {
                old.kill();
            }
        }
    }

    /// Removes `worker` if it is still the one registered under its name.
    pub fn deregister(&self, worker: &Arc<Worker>) -> bool {
        let mut workers = self.workers.lock();
        match workers.get(worker.name()) {
            Some(current) if Arc::ptr_eq(current, worker) => {
                workers.remove(worker.name());
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Worker>> {
        self.workers.lock().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.workers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.lock().is_empty()
    }

    /// Workers named `pattern`, or all of them for `*`, in name order.
    pub fn find_all_by(&self, pattern: &str) -> Vec<Arc<Worker>> {
        self.workers
            .lock()
            .values()
            .filter(|worker| matches(pattern, worker.name()))
            .cloned()
            .collect()
    }

    pub fn names(&self, pattern: &str) -> Vec<String> {
        self.workers
            .lock()
            .keys()
            .filter(|name| matches(pattern, name))
            .cloned()
            .collect()
    }

    /// Applies `f` to every matching worker under the registry lock and
    /// returns the names for which it reported a change.
    pub fn modify_all_for<F>(&self, pattern: &str, mut f: F) -> Vec<String>
    where
        F: FnMut(&Arc<Worker>) -> bool,
    {
        let workers = self.workers.lock();
        workers
            .values()
            .filter(|worker| matches(pattern, worker.name()))
            .filter(|worker| f(*worker))
            .map(|worker| worker.name().to_string())
            .collect()
    }

    /// Starts or resumes every matching worker; returns the ones started.
    pub fn start_all_for(
        &self,
        pattern: &str,
        processor: &Processor,
    ) -> Result<Vec<String>, ProcessorError> {
        let mut started = Vec::new();
        for worker in self.find_all_by(pattern) {
            if worker.start(processor)? {
                started.push(worker.name().to_string());
            }
        }
        Ok(started)
    }

    /// Pauses every matching worker; returns the ones paused.
    pub fn stop_all_for(&self, pattern: &str) -> Vec<String> {
        self.modify_all_for(pattern, |worker| worker.stop())
    }

    /// Kills and deregisters every matching worker.
    ///
    /// `*` is refused unless `force_wildcard` is set.
    pub fn kill_all_for(
        &self,
        pattern: &str,
        force_wildcard: bool,
    ) -> Result<Vec<String>, ConfigurationError> {
        if pattern == WILDCARD && !force_wildcard {
            return Err(ConfigurationError::WildcardNotForced {
                action: "kill".to_string(),
            });
        }
        let mut workers = self.workers.lock();
        let doomed: Vec<String> = workers
            .keys()
            .filter(|name| matches(pattern, name))
            .cloned()
            .collect();
        for name in &doomed {
            if let Some(worker) = workers.remove(name) {
                worker.kill();
            }
        }
        Ok(doomed)
    }

    /// Context snapshots of every matching worker keyed by name.
    pub fn snapshot(&self, pattern: &str) -> Map<String, Value> {
        self.find_all_by(pattern)
            .into_iter()
            .map(|worker| (worker.name().to_string(), worker.snapshot()))
            .collect()
    }
}
