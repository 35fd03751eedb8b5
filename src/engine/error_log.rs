// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::consts::{ERROR_LOG_REPEAT_THRESHOLD, ERROR_LOG_WINDOW};

/// Decides when a repeated worker error deserves a full-detail log line.
///
/// The first occurrence of a distinct error is always logged in full. After
/// that, a full line is emitted only once the window has elapsed since the
/// previous full line *and* the error has been seen more than the threshold
/// number of times.
#[derive(Debug)]
pub struct ErrorLogLimiter {
    window: Duration,
    threshold: u64,
    last_full: HashMap<String, Instant>,
}

impl Default for ErrorLogLimiter {
    fn default() -> Self {
        Self::new(ERROR_LOG_WINDOW, ERROR_LOG_REPEAT_THRESHOLD)
    }
}

impl ErrorLogLimiter {
    pub fn new(window: Duration, threshold: u64) -> Self {
        Self {
            window,
            threshold,
            last_full: HashMap::new(),
        }
    }

    /// `count` is the total number of occurrences including this one.
    pub fn should_log_full(&mut self, error: &str, count: u64, now: Instant) -> bool {
        let due = match self.last_full.get(error) {
            None => true,
            Some(last) => {
                now.saturating_duration_since(*last) >= self.window && count > self.threshold
            }
        };
        if due {
            self.last_full.insert(error.to_string(), now);
        }
        due
    }
}
