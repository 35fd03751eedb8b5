// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Errors that can occur during service configuration validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The namespace is empty or contains a tag separator
    InvalidNamespace {
        /// The offending namespace
        namespace: String,
    },
    /// Two workers share the same name
    DuplicateWorkerName {
        /// The duplicate worker name
        worker: String,
    },
    /// A worker loop interval is negative or not finite
    InvalidLoopInterval {
        /// The worker carrying the interval
        worker: String,
        /// The configured interval in seconds
        interval: f64,
    },
    /// Two reactors share the same name
    DuplicateReactorName {
        /// The duplicate reactor name
        reactor: String,
    },
    /// A reactor has nothing to dispatch when it fires
    ReactorWithoutActions {
        /// The reactor missing actions
        reactor: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidNamespace { namespace } => {
                write!(
                    f,
                    "Invalid namespace '{}': must be non-empty and must not contain '/'",
                    namespace
                )
            }
            ValidationError::DuplicateWorkerName { worker } => {
                write!(f, "Duplicate worker name: '{}'", worker)
            }
            ValidationError::InvalidLoopInterval { worker, interval } => {
                write!(
                    f,
                    "Worker '{}' has an invalid loop interval of {} seconds",
                    worker, interval
                )
            }
            ValidationError::DuplicateReactorName { reactor } => {
                write!(f, "Duplicate reactor name: '{}'", reactor)
            }
            ValidationError::ReactorWithoutActions { reactor } => {
                write!(f, "Reactor '{}' declares no actions", reactor)
            }
        }
    }
}

impl std::error::Error for ValidationError {}
