// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

/// How long the event loop blocks on the bus before re-checking for shutdown.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Client reply timeout when the caller does not supply one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 10.0;

/// Pause before re-opening the incoming handle after a bus disconnect.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Minimum time between two full-detail log lines for the same worker error.
pub const ERROR_LOG_WINDOW: Duration = Duration::from_secs(60);

/// A repeated error must have been seen more often than this to be logged in full again.
pub const ERROR_LOG_REPEAT_THRESHOLD: u64 = 3;

/// How long a client keeps listening for a reply nobody has collected yet.
pub const REPLY_RETENTION: Duration = Duration::from_secs(60);
