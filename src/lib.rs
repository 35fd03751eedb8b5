// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod bus;           // in-memory event bus + tag matching
pub mod config;        // service config + validation
pub mod engine;        // workers, workflows, management
pub mod errors;        // error handling
pub mod hooks;         // hook registry
pub mod keywords;      // $keyword resolution
pub mod message;       // wire codec
pub mod observability;
pub mod runtime;       // processor, event-driven service, client
pub mod traits;        // bus + host abstractions
