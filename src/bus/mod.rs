// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Tag matching and the in-memory event bus.

pub mod local;
pub mod matcher;

pub use local::{LocalBus, LocalBusHandle};
pub use matcher::{MatchGroups, MatchType, PatternCache};
