// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Workflows and workers every processor knows without registration.

use crate::hooks::{Hook, HookKind, WorkerFn, WorkflowFn};
use std::sync::Arc;

use super::{manage, strategy, workflow};

/// Registry keys of the built-ins.
pub const KEYS: [&str; 5] = [
    "simple_workflow",
    "extended_workflow",
    "manage_workflow",
    "shared_worker",
    "dedicated_worker",
];

/// Built-in hook with this exact name and kind, if any.
pub fn lookup(name: &str, kind: HookKind) -> Option<Hook> {
    match kind {
        HookKind::Workflow => {
            let func: WorkflowFn = match name {
                "simple" => Arc::new(workflow::simple_workflow),
                "extended" => Arc::new(workflow::extended_workflow),
                "manage" => Arc::new(manage::manage_workflow),
                _ => return None,
            };
            Some(Hook::Workflow(func))
        }
        HookKind::Worker => {
            let func: WorkerFn = match name {
                "shared" => Arc::new(strategy::shared_worker),
                "dedicated" => Arc::new(strategy::dedicated_worker),
                _ => return None,
            };
            Some(Hook::Worker(func))
        }
        _ => None,
    }
}
