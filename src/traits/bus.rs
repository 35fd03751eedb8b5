// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::bus::MatchType;
use crate::errors::BusError;

/// One published record: a tag and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub tag: String,
    pub data: Value,
}

impl Event {
    pub fn new(tag: impl Into<String>, data: Value) -> Self {
        Self {
            tag: tag.into(),
            data,
        }
    }
}

/// A transport that hands out publish/receive handles.
///
/// Implementations must deliver events published by one handle to every
/// listening handle in publication order.
pub trait EventBus: Send + Sync {
    /// Opens a handle; only `listen = true` handles can receive.
    fn connect(&self, listen: bool) -> Result<Box<dyn BusHandle>, BusError>;
}

/// One connection to an [`EventBus`].
pub trait BusHandle: Send {
    fn fire_event(&self, data: &Value, tag: &str) -> Result<(), BusError>;

    /// Next event of any tag, or `None` when `wait` elapses.
    fn next_event(&mut self, wait: Duration) -> Result<Option<Event>, BusError>;

    /// First event whose tag matches `tag` under `match_type`, discarding
    /// non-matching events, or `None` when `wait` elapses.
    fn get_event(
        &mut self,
        wait: Duration,
        tag: &str,
        match_type: MatchType,
    ) -> Result<Option<Event>, BusError>;

    fn is_listening(&self) -> bool;
}
