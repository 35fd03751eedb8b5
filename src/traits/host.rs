// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};

use crate::errors::ProcessorError;

/// Host-side command dispatch available to handlers.
///
/// The hosting agent exposes its own functions (reading grains, running
/// shell commands, ...) through this capability instead of a global table.
/// A processor built with [`Processor::with_host`](crate::runtime::Processor::with_host)
/// hands it to every hook through [`HookCall::host`](crate::hooks::HookCall::host).
pub trait HostCommand: Send + Sync {
    fn exec(
        &self,
        name: &str,
        args: &[Value],
        kwargs: &Map<String, Value>,
    ) -> Result<Value, ProcessorError>;
}
