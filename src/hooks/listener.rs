// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::HookResult;
use crate::message::Message;

pub type ListenerFn = Arc<dyn Fn(&Message, &Value) -> HookResult<()> + Send + Sync>;
pub type MatcherFn = Arc<dyn Fn(&Message, &Value) -> bool + Send + Sync>;

/// Observer of handler results, optionally gated by a matcher.
#[derive(Clone)]
pub struct Listener {
    pub name: String,
    pub func: ListenerFn,
    pub matcher: Option<MatcherFn>,
}

impl Listener {
    pub fn accepts(&self, message: &Message, result: &Value) -> bool {
        self.matcher
            .as_ref()
            .map_or(true, |matcher| matcher(message, result))
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("name", &self.name)
            .field("has_matcher", &self.matcher.is_some())
            .finish()
    }
}
