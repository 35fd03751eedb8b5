// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Keyword resolution for reactor templates.
//!
//! [`keyword_resolve`] walks a JSON value and rewrites every string that
//! mentions the symbol (`$` by default). Each `$name` with a matching keyword
//! is bound to that keyword's value and the string is evaluated as an
//! expression in a small, side-effect free language: literals, arithmetic,
//! comparisons, boolean logic, and attribute or index access on the bound
//! values. Nothing else is reachable from an expression.
//!
//! ```
//! use edge_processor::keywords::keyword_resolve;
//! use serde_json::json;
//!
//! let keywords = json!({ "a": 2, "b": 3 });
//! let resolved = keyword_resolve(
//!     &json!({ "sum": "$a + $b", "list": ["$a"] }),
//!     keywords.as_object().unwrap(),
//!     "$",
//! )
//! .unwrap();
//! assert_eq!(resolved, json!({ "sum": 5, "list": [2] }));
//! ```
//!
//! A string that is not an expression (`"battery at $volts V"`) falls back
//! to plain substitution of each bound `$name` with its display form.

mod eval;
mod lexer;
mod parser;

use serde_json::{Map, Value};
use thiserror::Error;

/// Marker that introduces a keyword reference.
pub const DEFAULT_SYMBOL: &str = "$";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeywordError {
    #[error("invalid expression '{expression}': {reason}")]
    Syntax { expression: String, reason: String },

    #[error("name '{0}' is not defined")]
    UnknownName(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("division by zero")]
    DivisionByZero,
}

/// Resolves every keyword reference in `data`, preserving container shapes.
pub fn keyword_resolve(
    data: &Value,
    keywords: &Map<String, Value>,
    symbol: &str,
) -> Result<Value, KeywordError> {
    match data {
        Value::Array(items) => items
            .iter()
            .map(|item| keyword_resolve(item, keywords, symbol))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| Ok((key.clone(), keyword_resolve(value, keywords, symbol)?)))
            .collect::<Result<Map<String, Value>, KeywordError>>()
            .map(Value::Object),
        Value::String(text) if !symbol.is_empty() && text.contains(symbol) => {
            resolve_text(text, keywords, symbol)
        }
        other => Ok(other.clone()),
    }
}

/// Python-style truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn resolve_text(
    text: &str,
    keywords: &Map<String, Value>,
    symbol: &str,
) -> Result<Value, KeywordError> {
    let mut expression = text.to_string();
    let mut scope = Map::new();
    for key in longest_first(keywords).into_iter().filter(|k| is_identifier(k)) {
        let reference = format!("{}{}", symbol, key);
        if expression.contains(&reference) {
            let placeholder = format!("__{}__", key);
            expression = expression.replace(&reference, &placeholder);
            scope.insert(placeholder, keywords[key].clone());
        }
    }

    let evaluated = parser::parse(&expression).and_then(|expr| eval::evaluate(&expr, &scope));
    match evaluated {
        Ok(value) => Ok(value),
        Err(KeywordError::Syntax { .. }) | Err(KeywordError::UnknownName(_)) => {
            Ok(Value::String(substitute(text, keywords, symbol)))
        }
        Err(error) => Err(error),
    }
}

fn substitute(text: &str, keywords: &Map<String, Value>, symbol: &str) -> String {
    longest_first(keywords)
        .into_iter()
        .fold(text.to_string(), |acc, key| {
            let display = match &keywords[key] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            acc.replace(&format!("{}{}", symbol, key), &display)
        })
}

// `$ab` must be replaced before `$a`.
fn longest_first(keywords: &Map<String, Value>) -> Vec<&String> {
    let mut keys: Vec<&String> = keywords.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    keys
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}
