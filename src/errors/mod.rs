// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod bus;
mod config;
mod processor;

pub use bus::{BusError, ClientError};
pub use config::ValidationError;
pub use processor::{ConfigurationError, ProcessorError};
