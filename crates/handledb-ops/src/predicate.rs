//! Filter predicate language.
//!
//! A small boolean expression language over columns: comparison
//! operators (`==`, `!=`, `<`, `<=`, `>`, `>=`), the connectives
//! `and`/`or`/`not` (symbol forms `&&`/`||`/`!` accepted), parentheses,
//! and integer/float/string/boolean literals. Column references are bare
//! identifiers.
//!
//! Comparisons use the total order on [`Value`]: nulls sort before every
//! non-null value and cross-type numeric comparisons go through f64,
//! matching the rest of the engine.

use std::fmt;

use handledb_core::{Row, Schema, Value};

use crate::error::{OpError, OpResult};

/// A parsed, reusable filter predicate.
#[derive(Debug, Clone)]
pub struct Predicate {
    source: String,
    expr: Expr,
}

#[derive(Debug, Clone)]
enum Expr {
    Column(String),
    Literal(Value),
    Compare {
        left: Box<Expr>,
        op: CmpOp,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl Predicate {
    /// Parses a predicate expression. Syntax errors yield
    /// `OpError::Predicate` with the cause.
    pub fn parse(source: &str) -> OpResult<Self> {
        let tokens = tokenize(source).map_err(OpError::Predicate)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or().map_err(OpError::Predicate)?;
        if parser.pos != parser.tokens.len() {
            return Err(OpError::Predicate(format!(
                "unexpected trailing input at token {}",
                parser.pos
            )));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Returns every column the predicate references that is missing
    /// from `schema`, in first-reference order without duplicates.
    pub fn missing_columns(&self, schema: &Schema) -> Vec<String> {
        let mut referenced = Vec::new();
        collect_columns(&self.expr, &mut referenced);
        referenced.retain(|name| !schema.contains(name));
        referenced
    }

    /// Evaluates the predicate against one row.
    pub fn matches(&self, row: &Row, schema: &Schema) -> OpResult<bool> {
        let value = eval(&self.expr, row, schema)?;
        Ok(value.to_bool().unwrap_or(false))
    }

    /// Returns the original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn collect_columns(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Column(name) => {
            if !out.iter().any(|n| n == name) {
                out.push(name.clone());
            }
        }
        Expr::Literal(_) => {}
        Expr::Compare { left, right, .. } => {
            collect_columns(left, out);
            collect_columns(right, out);
        }
        Expr::And(a, b) | Expr::Or(a, b) => {
            collect_columns(a, out);
            collect_columns(b, out);
        }
        Expr::Not(inner) => collect_columns(inner, out),
    }
}

fn eval(expr: &Expr, row: &Row, schema: &Schema) -> OpResult<Value> {
    match expr {
        Expr::Column(name) => {
            let idx = schema
                .index_of(name)
                .ok_or_else(|| OpError::ColumnNotFound(vec![name.clone()]))?;
            Ok(row.get(idx).cloned().unwrap_or(Value::Null))
        }
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Compare { left, op, right } => {
            let l = eval(left, row, schema)?;
            let r = eval(right, row, schema)?;
            let result = match op {
                CmpOp::Eq => l == r,
                CmpOp::NotEq => l != r,
                CmpOp::Lt => l < r,
                CmpOp::LtEq => l <= r,
                CmpOp::Gt => l > r,
                CmpOp::GtEq => l >= r,
            };
            Ok(Value::Boolean(result))
        }
        Expr::And(a, b) => {
            let l = eval(a, row, schema)?.to_bool().unwrap_or(false);
            if !l {
                return Ok(Value::Boolean(false));
            }
            let r = eval(b, row, schema)?.to_bool().unwrap_or(false);
            Ok(Value::Boolean(r))
        }
        Expr::Or(a, b) => {
            let l = eval(a, row, schema)?.to_bool().unwrap_or(false);
            if l {
                return Ok(Value::Boolean(true));
            }
            let r = eval(b, row, schema)?.to_bool().unwrap_or(false);
            Ok(Value::Boolean(r))
        }
        Expr::Not(inner) => {
            let v = eval(inner, row, schema)?.to_bool().unwrap_or(false);
            Ok(Value::Boolean(!v))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    And,
    Or,
    Not,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LParen,
    RParen,
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '=' => {
                // Both '==' and '=' mean equality.
                i += if chars.get(i + 1) == Some(&'=') { 2 } else { 1 };
                tokens.push(Token::Eq);
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    tokens.push(Token::Not);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::LtEq);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::GtEq);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::And);
                    i += 2;
                } else {
                    return Err(format!("unexpected character '&' at position {}", i));
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::Or);
                    i += 2;
                } else {
                    return Err(format!("unexpected character '|' at position {}", i));
                }
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != quote {
                    j += 1;
                }
                if j == chars.len() {
                    return Err(format!("unterminated string starting at position {}", i));
                }
                tokens.push(Token::Str(chars[start..j].iter().collect()));
                i = j + 1;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1; // sign or first digit
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    if chars[i] == '.' {
                        is_float = true;
                    }
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if is_float {
                    let v = text
                        .parse()
                        .map_err(|_| format!("invalid number literal '{}'", text))?;
                    tokens.push(Token::Float(v));
                } else {
                    let v = text
                        .parse()
                        .map_err(|_| format!("invalid number literal '{}'", text))?;
                    tokens.push(Token::Int(v));
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(word),
                });
            }
            other => return Err(format!("unexpected character '{}' at position {}", other, i)),
        }
    }

    if tokens.is_empty() {
        return Err("empty predicate".to_string());
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Token::Not) {
            self.next();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let left = self.parse_primary()?;
        let op = match self.peek() {
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::NotEq) => CmpOp::NotEq,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::LtEq) => CmpOp::LtEq,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::GtEq) => CmpOp::GtEq,
            _ => return Ok(left),
        };
        self.next();
        let right = self.parse_primary()?;
        Ok(Expr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(Expr::Column(name)),
            Some(Token::Int(v)) => Ok(Expr::Literal(Value::Integer(v))),
            Some(Token::Float(v)) => Ok(Expr::Literal(Value::Float(v))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Boolean(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Boolean(false))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("expected ')'".to_string()),
                }
            }
            Some(other) => Err(format!("unexpected token {:?}", other)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handledb_core::Table;

    fn sample() -> Table {
        Table::from_columns(vec![
            (
                "age".to_string(),
                vec![Value::int(30), Value::int(25), Value::int(35)],
            ),
            (
                "city".to_string(),
                vec![
                    Value::string("London"),
                    Value::string("Paris"),
                    Value::string("London"),
                ],
            ),
        ])
        .unwrap()
    }

    fn matching_rows(expr: &str) -> Vec<usize> {
        let table = sample();
        let pred = Predicate::parse(expr).unwrap();
        table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| pred.matches(row, table.schema()).unwrap())
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_comparison() {
        assert_eq!(matching_rows("age > 25"), vec![0, 2]);
        assert_eq!(matching_rows("age == 25"), vec![1]);
        assert_eq!(matching_rows("age = 25"), vec![1]);
        assert_eq!(matching_rows("age != 25"), vec![0, 2]);
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(matching_rows("city == 'London'"), vec![0, 2]);
        assert_eq!(matching_rows("city == \"Paris\""), vec![1]);
    }

    #[test]
    fn test_connectives() {
        assert_eq!(matching_rows("age > 25 and city == 'London'"), vec![0, 2]);
        assert_eq!(matching_rows("age < 30 or age > 30"), vec![1, 2]);
        assert_eq!(matching_rows("not (city == 'London')"), vec![1]);
        assert_eq!(matching_rows("age > 25 && city == 'London'"), vec![0, 2]);
    }

    #[test]
    fn test_negative_number() {
        assert_eq!(matching_rows("age > -5"), vec![0, 1, 2]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Predicate::parse("age >"),
            Err(OpError::Predicate(_))
        ));
        assert!(matches!(
            Predicate::parse("(age > 5"),
            Err(OpError::Predicate(_))
        ));
        assert!(matches!(Predicate::parse(""), Err(OpError::Predicate(_))));
        assert!(matches!(
            Predicate::parse("age > 5 extra"),
            Err(OpError::Predicate(_))
        ));
    }

    #[test]
    fn test_missing_columns() {
        let table = sample();
        let pred = Predicate::parse("age > 5 and salary < bonus").unwrap();
        assert_eq!(
            pred.missing_columns(table.schema()),
            vec!["salary".to_string(), "bonus".to_string()]
        );
    }
}
