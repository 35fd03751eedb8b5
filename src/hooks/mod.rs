// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named callables the processor dispatches to.
//!
//! Every pipeline stage of a workflow is a *hook* looked up by `(name, kind)`
//! under the key `"{name}_{kind}"`:
//!
//! | kind        | called with              | returns                           |
//! |-------------|--------------------------|-----------------------------------|
//! | `handler`   | the call context         | the result value                  |
//! | `validator` | the call context         | a truthy rejection, or falsy      |
//! | `converter` | context + handler result | the replacement result            |
//! | `returner`  | context + final result   | nothing                           |
//! | `workflow`  | the call context         | the workflow result               |
//! | `worker`    | processor, message, settings | worker status or result       |
//!
//! Listeners are kept apart from hooks: they observe results and are not
//! serialized by the registry lock.

mod call;
mod listener;
mod registry;

pub use call::HookCall;
pub use listener::{Listener, ListenerFn, MatcherFn};
pub use registry::HookRegistry;

use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::{ConfigurationError, ProcessorError};
use crate::message::Message;
use crate::runtime::Processor;

/// Result of invoking any hook.
pub type HookResult<T = Value> = Result<T, ProcessorError>;

pub type HandlerFn = Arc<dyn Fn(&HookCall<'_>) -> HookResult + Send + Sync>;
pub type ValidatorFn = Arc<dyn Fn(&HookCall<'_>) -> HookResult + Send + Sync>;
pub type ConverterFn = Arc<dyn Fn(&HookCall<'_>, Value) -> HookResult + Send + Sync>;
pub type ReturnerFn = Arc<dyn Fn(&HookCall<'_>, &Value) -> HookResult<()> + Send + Sync>;
pub type WorkflowFn = Arc<dyn Fn(&HookCall<'_>) -> HookResult + Send + Sync>;
pub type WorkerFn =
    Arc<dyn Fn(&Processor, Option<&Message>, &Map<String, Value>) -> HookResult + Send + Sync>;

/// The stage a hook plays in message processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Worker,
    Workflow,
    Handler,
    Validator,
    Converter,
    Returner,
}

impl HookKind {
    pub const ALL: [HookKind; 6] = [
        HookKind::Worker,
        HookKind::Workflow,
        HookKind::Handler,
        HookKind::Validator,
        HookKind::Converter,
        HookKind::Returner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Worker => "worker",
            HookKind::Workflow => "workflow",
            HookKind::Handler => "handler",
            HookKind::Validator => "validator",
            HookKind::Converter => "converter",
            HookKind::Returner => "returner",
        }
    }

    /// Registry key for a hook of this kind.
    pub fn key(&self, name: &str) -> String {
        format!("{}_{}", name, self.as_str())
    }

    /// Splits a registry key such as `echo_handler` into `("echo", Handler)`.
    pub fn split_key(key: &str) -> Option<(&str, HookKind)> {
        let (name, kind) = key.rsplit_once('_')?;
        let kind = kind.parse().ok()?;
        (!name.is_empty()).then_some((name, kind))
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookKind {
    type Err = ConfigurationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        HookKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw)
            .ok_or_else(|| ConfigurationError::InvalidArgument {
                name: "kind".to_string(),
                reason: format!("'{}' is not a hook kind", raw),
            })
    }
}

/// A callable registered under one of the [`HookKind`]s.
#[derive(Clone)]
pub enum Hook {
    Handler(HandlerFn),
    Validator(ValidatorFn),
    Converter(ConverterFn),
    Returner(ReturnerFn),
    Workflow(WorkflowFn),
    Worker(WorkerFn),
}

impl Hook {
    pub fn kind(&self) -> HookKind {
        match self {
            Hook::Handler(_) => HookKind::Handler,
            Hook::Validator(_) => HookKind::Validator,
            Hook::Converter(_) => HookKind::Converter,
            Hook::Returner(_) => HookKind::Returner,
            Hook::Workflow(_) => HookKind::Workflow,
            Hook::Worker(_) => HookKind::Worker,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook::{}", self.kind())
    }
}
