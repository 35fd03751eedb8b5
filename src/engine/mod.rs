// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Workflows and workers: the machinery that turns a message into hook calls.
//!
//! * [`workflow`] - the `simple` and `extended` pipelines
//! * [`manage`] - the operator-facing `manage` workflow
//! * [`strategy`] - the `shared` and `dedicated` worker hooks
//! * [`worker`] / [`worker_registry`] - long-lived workers and their index
//! * [`error_log`] - distinct-error log rate limiting for workers

pub mod builtins;
pub mod error_log;
pub mod manage;
pub mod strategy;
pub mod worker;
pub mod worker_registry;
pub mod workflow;

pub use worker::{Outcome, Worker, WorkerContext, WorkerSettings, WorkerState};
pub use worker_registry::WorkerRegistry;
