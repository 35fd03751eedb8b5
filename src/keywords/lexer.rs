// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::KeywordError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
}

// Longest operators first so `//` wins over `/` and `<=` over `<`.
const OPERATORS: [&str; 22] = [
    "//", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!", "(", ")",
    "[", "]", ",", ".", ":",
];

pub(super) fn tokenize(source: &str) -> Result<Vec<Token>, KeywordError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        if c.is_whitespace() {
            pos += 1;
        } else if c.is_ascii_digit()
            || (c == '.' && chars.get(pos + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            let (token, next) = number(&chars, pos, source)?;
            tokens.push(token);
            pos = next;
        } else if c == '\'' || c == '"' {
            let (text, next) = string(&chars, pos, source)?;
            tokens.push(Token::Str(text));
            pos = next;
        } else if c.is_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Token::Ident(chars[start..pos].iter().collect()));
        } else {
            let op = OPERATORS
                .iter()
                .copied()
                .find(|op| {
                    op.chars()
                        .enumerate()
                        .all(|(i, oc)| chars.get(pos + i) == Some(&oc))
                })
                .ok_or_else(|| syntax(source, format!("unexpected character '{}'", c)))?;
            tokens.push(Token::Op(op));
            pos += op.len();
        }
    }
    Ok(tokens)
}

fn number(chars: &[char], start: usize, source: &str) -> Result<(Token, usize), KeywordError> {
    let mut pos = start;
    let mut float = false;
    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    if chars.get(pos) == Some(&'.') && chars.get(pos + 1).map_or(true, |c| !c.is_alphabetic()) {
        float = true;
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if matches!(chars.get(pos), Some('e') | Some('E')) {
        let mut exp = pos + 1;
        if matches!(chars.get(exp), Some('+') | Some('-')) {
            exp += 1;
        }
        if chars.get(exp).is_some_and(|c| c.is_ascii_digit()) {
            float = true;
            pos = exp;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }

    let text: String = chars[start..pos].iter().collect();
    let token = if float {
        text.parse::<f64>().map(Token::Float).ok()
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .or_else(|_| text.parse::<f64>().map(Token::Float))
            .ok()
    };
    token
        .map(|token| (token, pos))
        .ok_or_else(|| syntax(source, format!("invalid number '{}'", text)))
}

fn string(chars: &[char], start: usize, source: &str) -> Result<(String, usize), KeywordError> {
    let quote = chars[start];
    let mut text = String::new();
    let mut pos = start + 1;
    while let Some(&c) = chars.get(pos) {
        match c {
            '\\' => {
                let escaped = chars
                    .get(pos + 1)
                    .ok_or_else(|| syntax(source, "dangling escape".to_string()))?;
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => *other,
                });
                pos += 2;
            }
            c if c == quote => return Ok((text, pos + 1)),
            c => {
                text.push(c);
                pos += 1;
            }
        }
    }
    Err(syntax(source, "unterminated string".to_string()))
}

fn syntax(source: &str, reason: String) -> KeywordError {
    KeywordError::Syntax {
        expression: source.to_string(),
        reason,
    }
}
