// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Every diagnostic the processor emits is a message struct implementing
//! `Display` and [`messages::StructuredLog`], so log text and structured
//! fields are defined in one place instead of as strings at the call sites.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::hooks` - hook and listener registration, listener and reactor failures
//! * `messages::worker` - worker lifecycle, pass failures and rate-limited repeats
//! * `messages::bus` - request intake, replies, triggers and the client side
//!
//! # Usage
//!
//! ```rust
//! use edge_processor::observability::messages::worker::WorkerStopped;
//! use edge_processor::observability::messages::StructuredLog;
//!
//! WorkerStopped {
//!     worker: "heartbeat",
//!     reason: "killed",
//! }
//! .log();
//! ```

pub mod messages;
