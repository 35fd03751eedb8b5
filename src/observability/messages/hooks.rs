// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the hook registry, listeners and reactors.

use crate::errors::ProcessorError;
use crate::keywords::KeywordError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A hook was stored in the registry, possibly replacing an earlier one.
///
/// # Log Level
/// `debug!` - Registration happens once per hook at startup
///
/// # Example
/// ```
/// use edge_processor::observability::messages::hooks::HookRegistered;
///
/// let msg = HookRegistered {
///     key: "read_voltage_handler",
///     synchronize: true,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct HookRegistered<'a> {
    pub key: &'a str,
    pub synchronize: bool,
}

impl Display for HookRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Registered hook '{}' (synchronize={})",
            self.key, self.synchronize
        )
    }
}

impl StructuredLog for HookRegistered<'_> {
    fn log(&self) {
        tracing::debug!(key = self.key, synchronize = self.synchronize, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "hook_registered",
            span_name = name,
            key = self.key,
            synchronize = self.synchronize,
        )
    }
}

pub struct ListenerRegistered<'a> {
    pub name: &'a str,
    pub gated: bool,
}

impl Display for ListenerRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.gated {
            write!(f, "Registered listener '{}' with matcher", self.name)
        } else {
            write!(f, "Registered listener '{}'", self.name)
        }
    }
}

impl StructuredLog for ListenerRegistered<'_> {
    fn log(&self) {
        tracing::debug!(listener = self.name, gated = self.gated, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "listener_registered",
            span_name = name,
            listener = self.name,
            gated = self.gated,
        )
    }
}

/// A listener returned an error; the remaining listeners still run.
///
/// # Log Level
/// `warn!` - The triggering request still receives its handler result
pub struct ListenerFailed<'a> {
    pub listener: &'a str,
    pub error: &'a ProcessorError,
}

impl Display for ListenerFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Listener '{}' failed: {}", self.listener, self.error)
    }
}

impl StructuredLog for ListenerFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            listener = self.listener,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "listener_failed",
            span_name = name,
            listener = self.listener,
            error = %self.error,
        )
    }
}

pub struct ReactorFired<'a> {
    pub reactor: &'a str,
    pub actions: usize,
}

impl Display for ReactorFired<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reactor '{}' fired, dispatching {} action(s)",
            self.reactor, self.actions
        )
    }
}

impl StructuredLog for ReactorFired<'_> {
    fn log(&self) {
        tracing::info!(reactor = self.reactor, actions = self.actions, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "reactor",
            span_name = name,
            reactor = self.reactor,
            actions = self.actions,
        )
    }
}

/// A reactor action could not be resolved or dispatched.
///
/// # Log Level
/// `error!` - Never propagated to the request that triggered the reactor
pub struct ReactorActionFailed<'a> {
    pub reactor: &'a str,
    pub action: usize,
    pub error: &'a ProcessorError,
}

impl Display for ReactorActionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reactor '{}' action #{} failed: {}",
            self.reactor, self.action, self.error
        )
    }
}

impl StructuredLog for ReactorActionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            reactor = self.reactor,
            action = self.action,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "reactor_action_failed",
            span_name = name,
            reactor = self.reactor,
            action = self.action,
        )
    }
}

/// A reactor condition could not be evaluated; the reactor is skipped.
pub struct ReactorConditionFailed<'a> {
    pub reactor: &'a str,
    pub condition: &'a str,
    pub error: &'a KeywordError,
}

impl Display for ReactorConditionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reactor '{}' condition '{}' failed: {}",
            self.reactor, self.condition, self.error
        )
    }
}

impl StructuredLog for ReactorConditionFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            reactor = self.reactor,
            condition = self.condition,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "reactor_condition_failed",
            span_name = name,
            reactor = self.reactor,
        )
    }
}

/// A result produced by a reactor action was not offered to the reactors again.
///
/// # Log Level
/// `debug!` - Expected whenever an action's handler returns a value
pub struct NestedReactionSkipped<'a> {
    pub handler: Option<&'a str>,
}

impl Display for NestedReactionSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping reactors for result of reactor action (handler {})",
            self.handler.unwrap_or("<none>")
        )
    }
}

impl StructuredLog for NestedReactionSkipped<'_> {
    fn log(&self) {
        tracing::debug!(handler = self.handler, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("nested_reaction", span_name = name, handler = self.handler)
    }
}
