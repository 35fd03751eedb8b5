// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// Suppresses back-to-back duplicates of triggered events.
///
/// Each filter key remembers the last `(tag, data)` published under it. An
/// event identical to that pair is dropped; anything else is admitted and
/// becomes the new last value.
#[derive(Debug, Default)]
pub struct OutgoingFilter {
    last: Mutex<HashMap<String, (String, Value)>>,
}

impl OutgoingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the event should be published, recording it.
    pub fn admit(&self, key: &str, tag: &str, data: &Value) -> bool {
        let mut last = self.last.lock();
        if let Some((last_tag, last_data)) = last.get(key) {
            if last_tag == tag && last_data == data {
                return false;
            }
        }
        last.insert(key.to_string(), (tag.to_string(), data.clone()));
        true
    }

    /// Forgets the last value for `key`, so the next event always passes.
    pub fn reset(&self, key: &str) -> bool {
        self.last.lock().remove(key).is_some()
    }
}
