//! Parser for the OpenStep ASCII plist syntax.

use thiserror::Error;

use super::value::{Dict, Value};

/// Malformed project text, with the 1-based position of the offending character.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
  pub line: usize,
  pub column: usize,
  pub message: String,
}

struct Parser {
  chars: Vec<char>,
  pos: usize,
  line: usize,
  column: usize,
}

/// Parse a complete document whose top level is a dictionary.
pub fn parse_document(text: &str) -> Result<Dict, ParseError> {
  let mut parser = Parser {
    chars: text.chars().collect(),
    pos: 0,
    line: 1,
    column: 1,
  };

  parser.skip_trivia()?;
  if parser.peek() != Some('{') {
    return Err(parser.error("expected '{' at start of document"));
  }
  let dict = parser.parse_dict()?;
  parser.skip_trivia()?;
  if parser.peek().is_some() {
    return Err(parser.error("unexpected content after top-level dictionary"));
  }
  Ok(dict)
}

impl Parser {
  fn peek(&self) -> Option<char> {
    self.chars.get(self.pos).copied()
  }

  fn peek_at(&self, offset: usize) -> Option<char> {
    self.chars.get(self.pos + offset).copied()
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += 1;
    if c == '\n' {
      self.line += 1;
      self.column = 1;
    } else {
      self.column += 1;
    }
    Some(c)
  }

  fn error(&self, message: impl Into<String>) -> ParseError {
    ParseError {
      line: self.line,
      column: self.column,
      message: message.into(),
    }
  }

  /// Skip whitespace plus `//` and `/* */` comments.
  fn skip_trivia(&mut self) -> Result<(), ParseError> {
    loop {
      match (self.peek(), self.peek_at(1)) {
        (Some(c), _) if c.is_whitespace() => {
          self.bump();
        }
        (Some('/'), Some('/')) => {
          while let Some(c) = self.bump() {
            if c == '\n' {
              break;
            }
          }
        }
        (Some('/'), Some('*')) => {
          let start = self.error("unterminated comment");
          self.bump();
          self.bump();
          loop {
            match self.bump() {
              Some('*') if self.peek() == Some('/') => {
                self.bump();
                break;
              }
              Some(_) => {}
              None => return Err(start),
            }
          }
        }
        _ => return Ok(()),
      }
    }
  }

  fn expect(&mut self, expected: char) -> Result<(), ParseError> {
    self.skip_trivia()?;
    match self.peek() {
      Some(c) if c == expected => {
        self.bump();
        Ok(())
      }
      Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
      None => Err(self.error(format!("expected '{}', found end of input", expected))),
    }
  }

  fn parse_value(&mut self) -> Result<Value, ParseError> {
    self.skip_trivia()?;
    match self.peek() {
      Some('{') => Ok(Value::Dict(self.parse_dict()?)),
      Some('(') => self.parse_array(),
      Some(_) => Ok(Value::String(self.parse_string()?)),
      None => Err(self.error("unexpected end of input")),
    }
  }

  fn parse_dict(&mut self) -> Result<Dict, ParseError> {
    self.expect('{')?;
    let mut dict = Dict::new();
    loop {
      self.skip_trivia()?;
      if self.peek() == Some('}') {
        self.bump();
        return Ok(dict);
      }
      let key = self.parse_string()?;
      self.expect('=')?;
      let value = self.parse_value()?;
      self.expect(';')?;
      dict.insert(key, value);
    }
  }

  fn parse_array(&mut self) -> Result<Value, ParseError> {
    self.expect('(')?;
    let mut items = Vec::new();
    loop {
      self.skip_trivia()?;
      if self.peek() == Some(')') {
        self.bump();
        return Ok(Value::Array(items));
      }
      items.push(self.parse_value()?);
      self.skip_trivia()?;
      match self.peek() {
        Some(',') => {
          self.bump();
        }
        Some(')') => {}
        Some(c) => return Err(self.error(format!("expected ',' or ')', found '{}'", c))),
        None => return Err(self.error("unterminated array")),
      }
    }
  }

  fn parse_string(&mut self) -> Result<String, ParseError> {
    self.skip_trivia()?;
    match self.peek() {
      Some('"') => self.parse_quoted(),
      Some(c) if is_bare(c) => {
        let mut s = String::new();
        while let Some(c) = self.peek()
          && is_bare(c)
        {
          s.push(c);
          self.bump();
        }
        Ok(s)
      }
      Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
      None => Err(self.error("unexpected end of input")),
    }
  }

  fn parse_quoted(&mut self) -> Result<String, ParseError> {
    let start = self.error("unterminated string");
    self.bump();
    let mut s = String::new();
    loop {
      match self.bump() {
        Some('"') => return Ok(s),
        Some('\\') => match self.bump() {
          Some('n') => s.push('\n'),
          Some('t') => s.push('\t'),
          Some('r') => s.push('\r'),
          Some(c) => s.push(c),
          None => return Err(start),
        },
        Some(c) => s.push(c),
        None => return Err(start),
      }
    }
  }
}

/// Characters accepted in an unquoted string. Wider than what the serializer
/// leaves unquoted, since hand-edited files are not always strict.
fn is_bare(c: char) -> bool {
  c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.' | '-' | '+' | '*' | '[' | ']' | '<' | '>')
}
