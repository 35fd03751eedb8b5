// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Service configuration validation.
//!
//! Checks run independently and every failure is collected, so an operator
//! sees all problems in a config file at once:
//!
//! 1. **Namespace**: non-empty and free of `/`, since it prefixes every bus tag
//! 2. **Workers**: unique names, loop intervals finite and non-negative
//! 3. **Reactors**: unique names, at least one action each
//!
//! # Example
//! ```rust
//! use edge_processor::config::{validate_service_config, ServiceConfig};
//!
//! let config: ServiceConfig = serde_yaml::from_str("namespace: ec2x").unwrap();
//! assert!(validate_service_config(&config).is_ok());
//! ```

use crate::config::{ReactorConfig, ServiceConfig, WorkerConfig};
use crate::errors::ValidationError;
use std::collections::HashSet;

/// Validates a service configuration, returning every error found.
pub fn validate_service_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.namespace.is_empty() || config.namespace.contains('/') {
        errors.push(ValidationError::InvalidNamespace {
            namespace: config.namespace.clone(),
        });
    }

    errors.extend(validate_workers(&config.workers));
    errors.extend(validate_reactors(&config.reactors));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_workers(workers: &[WorkerConfig]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for worker in workers {
        if !seen.insert(worker.name.as_str()) {
            errors.push(ValidationError::DuplicateWorkerName {
                worker: worker.name.clone(),
            });
        }
        if let Some(interval) = worker.loop_seconds {
            if !interval.is_finite() || interval < 0.0 {
                errors.push(ValidationError::InvalidLoopInterval {
                    worker: worker.name.clone(),
                    interval,
                });
            }
        }
    }

    errors
}

fn validate_reactors(reactors: &[ReactorConfig]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for reactor in reactors {
        if !seen.insert(reactor.name.as_str()) {
            errors.push(ValidationError::DuplicateReactorName {
                reactor: reactor.name.clone(),
            });
        }
        if reactor.actions.is_empty() {
            errors.push(ValidationError::ReactorWithoutActions {
                reactor: reactor.name.clone(),
            });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ServiceConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_validate_service_config_table_driven() {
        struct TestCase {
            name: &'static str,
            yaml: &'static str,
            expected: Result<(), Vec<ValidationError>>,
        }

        let test_cases = vec![
            TestCase {
                name: "minimal config",
                yaml: "namespace: ec2x",
                expected: Ok(()),
            },
            TestCase {
                name: "empty namespace",
                yaml: "namespace: ''",
                expected: Err(vec![ValidationError::InvalidNamespace {
                    namespace: String::new(),
                }]),
            },
            TestCase {
                name: "namespace with separator",
                yaml: "namespace: a/b",
                expected: Err(vec![ValidationError::InvalidNamespace {
                    namespace: "a/b".to_string(),
                }]),
            },
            TestCase {
                name: "duplicate worker and negative loop",
                yaml: r#"
namespace: ec2x
workers:
  - name: gps
    loop: -1
  - name: gps
"#,
                expected: Err(vec![
                    ValidationError::InvalidLoopInterval {
                        worker: "gps".to_string(),
                        interval: -1.0,
                    },
                    ValidationError::DuplicateWorkerName {
                        worker: "gps".to_string(),
                    },
                ]),
            },
            TestCase {
                name: "reactor problems",
                yaml: r#"
namespace: ec2x
reactors:
  - name: low_voltage
    actions: [{ handler: notify }]
  - name: low_voltage
"#,
                expected: Err(vec![
                    ValidationError::DuplicateReactorName {
                        reactor: "low_voltage".to_string(),
                    },
                    ValidationError::ReactorWithoutActions {
                        reactor: "low_voltage".to_string(),
                    },
                ]),
            },
        ];

        for test_case in test_cases {
            let actual = validate_service_config(&parse(test_case.yaml));
            assert_eq!(actual, test_case.expected, "Test case '{}'", test_case.name);
        }
    }
}
