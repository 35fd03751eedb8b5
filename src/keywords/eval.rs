// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Evaluation of parsed expressions over JSON values.
//!
//! Integers stay integers under `+ - * // %` (falling back to floats on
//! overflow), `/` always yields a float, and `and`/`or` return one of their
//! operands the way Python does. Booleans count as 0 and 1 in arithmetic.

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

use super::parser::{BinaryOp, CompareOp, Expr};
use super::{is_truthy, KeywordError};

pub(super) fn evaluate(expr: &Expr, scope: &Map<String, Value>) -> Result<Value, KeywordError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| KeywordError::UnknownName(name.clone())),
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Negate(inner) => match numeric(&evaluate(inner, scope)?) {
            Some(Num::Int(n)) => match n.checked_neg() {
                Some(negated) => Ok(Value::from(negated)),
                None => float(-(n as f64)),
            },
            Some(Num::Float(f)) => float(-f),
            None => Err(type_error("bad operand for unary -")),
        },
        Expr::Binary(op, left, right) => {
            binary(*op, &evaluate(left, scope)?, &evaluate(right, scope)?)
        }
        Expr::Compare(first, links) => {
            let mut left = evaluate(first, scope)?;
            for (op, right) in links {
                let right = evaluate(right, scope)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        Expr::And(left, right) => {
            let left = evaluate(left, scope)?;
            if is_truthy(&left) {
                evaluate(right, scope)
            } else {
                Ok(left)
            }
        }
        Expr::Or(left, right) => {
            let left = evaluate(left, scope)?;
            if is_truthy(&left) {
                Ok(left)
            } else {
                evaluate(right, scope)
            }
        }
        Expr::Not(inner) => Ok(Value::Bool(!is_truthy(&evaluate(inner, scope)?))),
        Expr::Attribute(target, name) => match evaluate(target, scope)? {
            Value::Object(map) => map
                .get(name)
                .cloned()
                .ok_or_else(|| KeywordError::Lookup(format!("no attribute '{}'", name))),
            other => Err(KeywordError::Lookup(format!(
                "{} has no attribute '{}'",
                kind(&other),
                name
            ))),
        },
        Expr::Index(target, index) => index_into(&evaluate(target, scope)?, &evaluate(index, scope)?),
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }
}

fn numeric(value: &Value) -> Option<Num> {
    match value {
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => Num::Int(i),
            None => Num::Float(n.as_f64().unwrap_or(f64::NAN)),
        }),
        Value::Bool(b) => Some(Num::Int(i64::from(*b))),
        _ => None,
    }
}

fn float(f: f64) -> Result<Value, KeywordError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| type_error("result is not a finite number"))
}

fn type_error(reason: &str) -> KeywordError {
    KeywordError::Type(reason.to_string())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, KeywordError> {
    if op == BinaryOp::Add {
        match (left, right) {
            (Value::String(a), Value::String(b)) => return Ok(Value::String(format!("{}{}", a, b))),
            (Value::Array(a), Value::Array(b)) => {
                return Ok(Value::Array(a.iter().chain(b).cloned().collect()))
            }
            _ => {}
        }
    }

    let (a, b) = match (numeric(left), numeric(right)) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(KeywordError::Type(format!(
                "unsupported operand types for {:?}: {} and {}",
                op,
                kind(left),
                kind(right)
            )))
        }
    };

    let divides_by_zero = matches!(op, BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod)
        && b.as_f64() == 0.0;
    if divides_by_zero {
        return Err(KeywordError::DivisionByZero);
    }

    if let (Num::Int(a), Num::Int(b)) = (a, b) {
        let exact = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::FloorDiv => floor_div(a, b),
            BinaryOp::Mod => a.checked_rem(b).map(|r| if r != 0 && (r < 0) != (b < 0) { r + b } else { r }),
            BinaryOp::Div => None,
        };
        if let Some(n) = exact {
            return Ok(Value::from(n));
        }
    }

    let (a, b) = (a.as_f64(), b.as_f64());
    float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => a - (a / b).floor() * b,
    })
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if a % b != 0 && (a < 0) != (b < 0) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

pub(super) fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_) | Value::Bool(_), Value::Number(_) | Value::Bool(_)) => {
            match (numeric(left), numeric(right)) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
                (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
                _ => false,
            }
        }
        _ => left == right,
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, KeywordError> {
    let ordering = || -> Result<Ordering, KeywordError> {
        match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            _ => match (numeric(left), numeric(right)) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => Ok(a.cmp(&b)),
                (Some(a), Some(b)) => a
                    .as_f64()
                    .partial_cmp(&b.as_f64())
                    .ok_or_else(|| type_error("cannot order NaN")),
                _ => Err(KeywordError::Type(format!(
                    "cannot order {} and {}",
                    kind(left),
                    kind(right)
                ))),
            },
        }
    };

    Ok(match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::Ne => !values_equal(left, right),
        CompareOp::Lt => ordering()? == Ordering::Less,
        CompareOp::Le => ordering()? != Ordering::Greater,
        CompareOp::Gt => ordering()? == Ordering::Greater,
        CompareOp::Ge => ordering()? != Ordering::Less,
        CompareOp::In => contains(right, left)?,
        CompareOp::NotIn => !contains(right, left)?,
    })
}

fn contains(container: &Value, item: &Value) -> Result<bool, KeywordError> {
    match (container, item) {
        (Value::String(haystack), Value::String(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Array(items), _) => Ok(items.iter().any(|candidate| values_equal(candidate, item))),
        (Value::Object(map), Value::String(key)) => Ok(map.contains_key(key)),
        _ => Err(KeywordError::Type(format!(
            "'in' is not supported between {} and {}",
            kind(item),
            kind(container)
        ))),
    }
}

fn index_into(target: &Value, index: &Value) -> Result<Value, KeywordError> {
    let position = |len: usize| -> Result<usize, KeywordError> {
        let i = index
            .as_i64()
            .ok_or_else(|| type_error("sequence indices must be integers"))?;
        let resolved = if i < 0 { len as i64 + i } else { i };
        usize::try_from(resolved)
            .ok()
            .filter(|p| *p < len)
            .ok_or_else(|| KeywordError::Lookup(format!("index {} out of range", i)))
    };

    match target {
        Value::Array(items) => Ok(items[position(items.len())?].clone()),
        Value::String(text) => {
            let chars: Vec<char> = text.chars().collect();
            Ok(Value::String(chars[position(chars.len())?].to_string()))
        }
        Value::Object(map) => {
            let key = index
                .as_str()
                .ok_or_else(|| type_error("mapping keys must be strings"))?;
            map.get(key)
                .cloned()
                .ok_or_else(|| KeywordError::Lookup(format!("no key '{}'", key)))
        }
        other => Err(KeywordError::Type(format!("{} is not subscriptable", kind(other)))),
    }
}
