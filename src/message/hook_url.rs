// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};
use std::str::FromStr;

use crate::errors::ConfigurationError;

/// A parsed hook override of the form `name?k1=v1&k2=v2`.
///
/// Values that look like numbers or booleans are typed; everything else stays
/// a string. A key given more than once collapses to an array.
#[derive(Debug, Clone, PartialEq)]
pub struct HookUrl {
    pub name: String,
    pub settings: Map<String, Value>,
}

impl HookUrl {
    pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
        let (name, query) = match raw.split_once('?') {
            Some((name, query)) => (name.trim(), Some(query)),
            None => (raw.trim(), None),
        };
        if name.is_empty() {
            return Err(ConfigurationError::MalformedUrl {
                url: raw.to_string(),
                reason: "missing hook name".to_string(),
            });
        }

        let mut grouped: Vec<(String, Vec<Value>)> = Vec::new();
        for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            if key.is_empty() {
                return Err(ConfigurationError::MalformedUrl {
                    url: raw.to_string(),
                    reason: "empty setting name".to_string(),
                });
            }
            let value = coerce(&value);
            match grouped.iter_mut().find(|(existing, _)| existing.as_str() == key) {
                Some((_, values)) => values.push(value),
                None => grouped.push((key.into_owned(), vec![value])),
            }
        }

        let settings = grouped
            .into_iter()
            .map(|(key, mut values)| {
                let value = if values.len() == 1 {
                    values.remove(0)
                } else {
                    Value::Array(values)
                };
                (key, value)
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            settings,
        })
    }
}

impl FromStr for HookUrl {
    type Err = ConfigurationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        HookUrl::parse(raw)
    }
}

/// Optional sign, digits, at most one decimal point.
fn looks_numeric(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1
}

/// Types a raw setting value: number, boolean, or string.
fn coerce(raw: &str) -> Value {
    match raw {
        "True" | "true" => return Value::Bool(true),
        "False" | "false" => return Value::Bool(false),
        _ => {}
    }
    if !looks_numeric(raw) {
        return Value::String(raw.to_string());
    }
    if !raw.contains('.') {
        if let Ok(int) = raw.parse::<i64>() {
            return Value::from(int);
        }
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_table_driven() {
        struct TestCase {
            name: &'static str,
            raw: &'static str,
            expected_name: &'static str,
            expected_settings: Value,
        }

        let test_cases = vec![
            TestCase {
                name: "bare name",
                raw: "dedicated",
                expected_name: "dedicated",
                expected_settings: json!({}),
            },
            TestCase {
                name: "float and bool",
                raw: "dedicated?loop=0.5&start=False",
                expected_name: "dedicated",
                expected_settings: json!({ "loop": 0.5, "start": false }),
            },
            TestCase {
                name: "signed integer",
                raw: "shift?offset=-3",
                expected_name: "shift",
                expected_settings: json!({ "offset": -3 }),
            },
            TestCase {
                name: "repeated key collapses to a list",
                raw: "pick?pin=1&pin=2&label=a",
                expected_name: "pick",
                expected_settings: json!({ "pin": [1, 2], "label": "a" }),
            },
            TestCase {
                name: "percent encoded string",
                raw: "notify?text=low%20battery",
                expected_name: "notify",
                expected_settings: json!({ "text": "low battery" }),
            },
            TestCase {
                name: "dotted version stays a string",
                raw: "flash?version=1.2.3",
                expected_name: "flash",
                expected_settings: json!({ "version": "1.2.3" }),
            },
        ];

        for test_case in test_cases {
            let url = HookUrl::parse(test_case.raw)
                .unwrap_or_else(|e| panic!("Test case '{}': {}", test_case.name, e));
            assert_eq!(url.name, test_case.expected_name, "Test case '{}'", test_case.name);
            assert_eq!(
                Value::Object(url.settings),
                test_case.expected_settings,
                "Test case '{}'",
                test_case.name
            );
        }
    }

    #[test]
    fn rejects_missing_name() {
        let err = "?loop=1".parse::<HookUrl>().unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedUrl { .. }));
    }
}
