// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Recursive-descent parser for the expression subset.
//!
//! ```text
//! or       := and ( ("or" | "||") and )*
//! and      := not ( ("and" | "&&") not )*
//! not      := ("not" | "!") not | compare
//! compare  := sum ( ("==" | "!=" | "<" | "<=" | ">" | ">=" | "in" | "not in") sum )*
//! sum      := term ( ("+" | "-") term )*
//! term     := unary ( ("*" | "/" | "//" | "%") unary )*
//! unary    := ("-" | "+") unary | postfix
//! postfix  := primary ( "." name | "[" or "]" )*
//! primary  := number | string | name | constant | "(" or ")" | "[" (or ("," or)*)? "]"
//! ```

use serde_json::{Number, Value};

use super::lexer::{tokenize, Token};
use super::KeywordError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Expr {
    Literal(Value),
    Name(String),
    List(Vec<Expr>),
    Negate(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Chained comparison; `a < b < c` holds when every link holds.
    Compare(Box<Expr>, Vec<(CompareOp, Expr)>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Attribute(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

pub(super) fn parse(source: &str) -> Result<Expr, KeywordError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
        source,
    };
    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parser.error(format!("unexpected {:?}", token))),
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(o)) if *o == op)
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(w)) if w == word)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = self.at_op(op);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_op(&mut self, op: &str) -> Result<(), KeywordError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", op)))
        }
    }

    fn error(&self, reason: String) -> KeywordError {
        KeywordError::Syntax {
            expression: self.source.to_string(),
            reason,
        }
    }

    fn or(&mut self) -> Result<Expr, KeywordError> {
        let mut left = self.and()?;
        while self.at_word("or") || self.at_op("||") {
            self.pos += 1;
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, KeywordError> {
        let mut left = self.not()?;
        while self.at_word("and") || self.at_op("&&") {
            self.pos += 1;
            let right = self.not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, KeywordError> {
        if self.at_word("not") || self.at_op("!") {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<Expr, KeywordError> {
        let first = self.sum()?;
        let mut links = Vec::new();
        while let Some(op) = self.compare_op() {
            links.push((op, self.sum()?));
        }
        if links.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), links))
        }
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let (op, width) = match self.peek()? {
            Token::Op("==") => (CompareOp::Eq, 1),
            Token::Op("!=") => (CompareOp::Ne, 1),
            Token::Op("<") => (CompareOp::Lt, 1),
            Token::Op("<=") => (CompareOp::Le, 1),
            Token::Op(">") => (CompareOp::Gt, 1),
            Token::Op(">=") => (CompareOp::Ge, 1),
            Token::Ident(word) if word == "in" => (CompareOp::In, 1),
            Token::Ident(word)
                if word == "not"
                    && matches!(self.peek_at(1), Some(Token::Ident(next)) if next == "in") =>
            {
                (CompareOp::NotIn, 2)
            }
            _ => return None,
        };
        self.pos += width;
        Some(op)
    }

    fn sum(&mut self) -> Result<Expr, KeywordError> {
        let mut left = self.term()?;
        loop {
            let op = if self.eat_op("+") {
                BinaryOp::Add
            } else if self.eat_op("-") {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, KeywordError> {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat_op("*") {
                BinaryOp::Mul
            } else if self.eat_op("//") {
                BinaryOp::FloorDiv
            } else if self.eat_op("/") {
                BinaryOp::Div
            } else if self.eat_op("%") {
                BinaryOp::Mod
            } else {
                return Ok(left);
            };
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, KeywordError> {
        if self.eat_op("-") {
            return Ok(Expr::Negate(Box::new(self.unary()?)));
        }
        if self.eat_op("+") {
            return self.unary();
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, KeywordError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_op(".") {
                match self.advance() {
                    Some(Token::Ident(name)) => expr = Expr::Attribute(Box::new(expr), name),
                    _ => return Err(self.error("expected attribute name".to_string())),
                }
            } else if self.eat_op("[") {
                let index = self.or()?;
                self.expect_op("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, KeywordError> {
        match self.advance() {
            Some(Token::Int(n)) => Ok(Expr::Literal(Value::from(n))),
            Some(Token::Float(f)) => Number::from_f64(f)
                .map(|n| Expr::Literal(Value::Number(n)))
                .ok_or_else(|| self.error(format!("number {} out of range", f))),
            Some(Token::Str(text)) => Ok(Expr::Literal(Value::String(text))),
            Some(Token::Ident(word)) => Ok(match word.as_str() {
                "True" | "true" => Expr::Literal(Value::Bool(true)),
                "False" | "false" => Expr::Literal(Value::Bool(false)),
                "None" | "null" => Expr::Literal(Value::Null),
                "and" | "or" | "not" | "in" => {
                    return Err(self.error(format!("unexpected '{}'", word)))
                }
                _ => Expr::Name(word),
            }),
            Some(Token::Op("(")) => {
                let inner = self.or()?;
                self.expect_op(")")?;
                Ok(inner)
            }
            Some(Token::Op("[")) => {
                let mut items = Vec::new();
                if !self.eat_op("]") {
                    loop {
                        items.push(self.or()?);
                        if self.eat_op("]") {
                            break;
                        }
                        self.expect_op(",")?;
                        // Trailing comma.
                        if self.eat_op("]") {
                            break;
                        }
                    }
                }
                Ok(Expr::List(items))
            }
            Some(token) => Err(self.error(format!("unexpected {:?}", token))),
            None => Err(self.error("unexpected end of expression".to_string())),
        }
    }
}
