// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runtime: the processor and the bus-facing service and client around it.
//!
//! Tags on the bus are namespaced per service:
//!
//! | tag                              | direction        |
//! |----------------------------------|------------------|
//! | `{ns}/req/{id}`                  | client → service |
//! | `{ns}/res/{id}`                  | service → client |
//! | `system/service/{ns}/failed`     | worker failures  |

mod client;
mod event_driven;
mod filter;
mod processor;
mod reactor;

#[cfg(test)]
mod integration_tests;

pub use client::Client;
pub use event_driven::{EventDrivenProcessor, EventHandlerFn};
pub use filter::OutgoingFilter;
pub use processor::{FailureCallback, Processor, WeakProcessor};
pub use reactor::ReactorRegistry;

pub fn request_tag(namespace: &str, id: &str) -> String {
    format!("{}/req/{}", namespace, id)
}

pub fn reply_tag(namespace: &str, id: &str) -> String {
    format!("{}/res/{}", namespace, id)
}

pub fn failure_tag(namespace: &str) -> String {
    format!("system/service/{}/failed", namespace)
}

/// Regex matching request tags of `namespace`, capturing the correlation id as `id`.
pub fn request_pattern(namespace: &str) -> String {
    format!("^{}/req/(?P<id>.+)$", regex::escape(namespace))
}
