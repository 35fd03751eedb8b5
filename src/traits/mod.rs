// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Seams to the collaborators the processor does not implement itself.

pub mod bus;
pub mod host;

pub use bus::{BusHandle, Event, EventBus};
pub use host::HostCommand;
