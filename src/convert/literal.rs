//! Bounded parser for map/array literals such as `{"id"=>"203341", "tags"=>["a", nil]}`.
//!
//! Only data is accepted: strings, numbers, `nil`/`null`, booleans, arrays and maps
//! (with `=>` or `:` between key and value). Nothing is ever evaluated.

use serde_json::{Map, Number, Value};
use thiserror::Error;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LiteralError {
    #[error("unexpected end of literal")]
    UnexpectedEnd,
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),
    #[error("literal nests deeper than {MAX_DEPTH} levels")]
    TooDeep,
    #[error("map keys must be strings or numbers (offset {0})")]
    InvalidKey(usize),
}

/// Parses a complete literal. Trailing content other than whitespace is an error.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = LiteralParser {
        chars: input.char_indices().collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(value),
        Some((offset, found)) => Err(LiteralError::UnexpectedChar { found, offset }),
    }
}

struct LiteralParser {
    chars: Vec<(usize, char)>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    fn peek(&self) -> Option<(usize, char)> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Result<(usize, char), LiteralError> {
        let item = self.peek().ok_or(LiteralError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(item)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some((_, c)) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), LiteralError> {
        let (offset, found) = self.next()?;
        if found == wanted {
            Ok(())
        } else {
            Err(LiteralError::UnexpectedChar { found, offset })
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_whitespace();
        let (offset, c) = self.peek().ok_or(LiteralError::UnexpectedEnd)?;
        match c {
            '{' => self.nested(Self::map),
            '[' => self.nested(Self::array),
            '"' | '\'' => self.string().map(Value::String),
            '-' | '0'..='9' => self.number(),
            c if c.is_ascii_alphabetic() => self.keyword(),
            found => Err(LiteralError::UnexpectedChar { found, offset }),
        }
    }

    fn nested(&mut self, body: fn(&mut Self) -> Result<Value, LiteralError>) -> Result<Value, LiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(LiteralError::TooDeep);
        }
        self.depth += 1;
        let value = body(self);
        self.depth -= 1;
        value
    }

    fn map(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if let Some((_, '}')) = self.peek() {
                self.pos += 1;
                return Ok(Value::Object(map));
            }

            let key = self.key()?;
            self.skip_whitespace();
            self.separator()?;
            let value = self.value()?;
            map.insert(key, value);

            self.skip_whitespace();
            let (offset, c) = self.next()?;
            match c {
                ',' => continue,
                '}' => return Ok(Value::Object(map)),
                found => return Err(LiteralError::UnexpectedChar { found, offset }),
            }
        }
    }

    fn key(&mut self) -> Result<String, LiteralError> {
        let (offset, c) = self.peek().ok_or(LiteralError::UnexpectedEnd)?;
        match c {
            '"' | '\'' => self.string(),
            '-' | '0'..='9' => Ok(self.number()?.to_string()),
            _ => Err(LiteralError::InvalidKey(offset)),
        }
    }

    /// `=>` or `:`
    fn separator(&mut self) -> Result<(), LiteralError> {
        let (offset, c) = self.next()?;
        match c {
            ':' => Ok(()),
            '=' => self.expect('>'),
            found => Err(LiteralError::UnexpectedChar { found, offset }),
        }
    }

    fn array(&mut self) -> Result<Value, LiteralError> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if let Some((_, ']')) = self.peek() {
                self.pos += 1;
                return Ok(Value::Array(items));
            }

            items.push(self.value()?);

            self.skip_whitespace();
            let (offset, c) = self.next()?;
            match c {
                ',' => continue,
                ']' => return Ok(Value::Array(items)),
                found => return Err(LiteralError::UnexpectedChar { found, offset }),
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let (_, quote) = self.next()?;
        let mut out = String::new();
        loop {
            let (offset, c) = self.next()?;
            match c {
                c if c == quote => return Ok(out),
                '\\' => {
                    let (_, escaped) = self.next()?;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'u' => out.push(self.unicode_escape(offset)?),
                        other => out.push(other),
                    }
                }
                c => out.push(c),
            }
        }
    }

    fn unicode_escape(&mut self, offset: usize) -> Result<char, LiteralError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let (_, c) = self.next()?;
            let digit = c.to_digit(16).ok_or(LiteralError::InvalidEscape(offset))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or(LiteralError::InvalidEscape(offset))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let mut text = String::new();
        while let Some((_, c)) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_') {
                if c != '_' {
                    text.push(c);
                }
                self.pos += 1;
            } else {
                break;
            }
        }

        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or(LiteralError::InvalidNumber(text))
    }

    fn keyword(&mut self) -> Result<Value, LiteralError> {
        let (offset, first) = self.peek().ok_or(LiteralError::UnexpectedEnd)?;
        let mut word = String::new();
        while let Some((_, c)) = self.peek() {
            if !c.is_ascii_alphanumeric() {
                break;
            }
            word.push(c);
            self.pos += 1;
        }

        match word.as_str() {
            "nil" | "null" => Ok(Value::Null),
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(LiteralError::UnexpectedChar {
                found: first,
                offset,
            }),
        }
    }
}
