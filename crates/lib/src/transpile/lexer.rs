//! Position-addressed tokenizer for TypeScript + JSX sources.
//!
//! The lexer never guesses between context-dependent readings of a character
//! (regex vs. division, template continuation vs. closing brace, JSX text vs.
//! tokens). It always produces the plain reading and exposes `*_at` entry
//! points so the parser can re-read from a given offset once it knows which
//! grammar applies.

use super::TranspileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  /// Identifiers, keywords and `#private` names.
  Ident,
  Num,
  Str,
  /// A template chunk: `` `...` ``, `` `...${ ``, `` }...${ `` or `` }...` ``.
  Template,
  Regex,
  Punct,
  Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub start: usize,
  pub end: usize,
  /// A line terminator appeared between the previous token and this one.
  pub nl_before: bool,
  /// For template chunks: the chunk closes the literal.
  pub tail: bool,
}

/// A piece of JSX element content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsxChild {
  Text { start: usize, end: usize },
  /// `{` at the given offset.
  Expr(usize),
  /// `<` at the given offset.
  Tag(usize),
  Eof,
}

// Longest first so that greedy matching picks the right operator.
const PUNCTUATORS: &[&str] = &[
  ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==", "!=", "<=", ">=", "&&",
  "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")",
  "[", "]", ";", ",", "<", ">", "+", "-", "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@",
];

pub struct Lexer<'a> {
  src: &'a str,
  bytes: &'a [u8],
  pos: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(src: &'a str) -> Self {
    let mut lexer = Self {
      src,
      bytes: src.as_bytes(),
      pos: 0,
    };
    if src.starts_with("#!") {
      lexer.skip_line();
    }
    lexer
  }

  pub fn pos(&self) -> usize {
    self.pos
  }

  pub fn set_pos(&mut self, pos: usize) {
    self.pos = pos;
  }

  fn peek_char(&self) -> Option<char> {
    self.src[self.pos..].chars().next()
  }

  fn byte_at(&self, pos: usize) -> Option<u8> {
    self.bytes.get(pos).copied()
  }

  fn error(&self, pos: usize, message: impl Into<String>) -> TranspileError {
    TranspileError::at(self.src, pos, message)
  }

  fn skip_line(&mut self) {
    while let Some(c) = self.peek_char() {
      if is_line_terminator(c) {
        break;
      }
      self.pos += c.len_utf8();
    }
  }

  /// Skip whitespace and comments, reporting whether a line break was crossed.
  fn skip_trivia(&mut self) -> Result<bool, TranspileError> {
    let mut newline = false;
    while let Some(c) = self.peek_char() {
      if is_line_terminator(c) {
        newline = true;
        self.pos += c.len_utf8();
      } else if c.is_whitespace() || c == '\u{feff}' {
        self.pos += c.len_utf8();
      } else if self.src[self.pos..].starts_with("//") {
        self.skip_line();
      } else if self.src[self.pos..].starts_with("/*") {
        let start = self.pos;
        let Some(len) = self.src[self.pos + 2..].find("*/") else {
          return Err(self.error(start, "Unterminated comment"));
        };
        let comment = &self.src[self.pos..self.pos + 2 + len];
        if comment.chars().any(is_line_terminator) {
          newline = true;
        }
        self.pos += len + 4;
      } else {
        break;
      }
    }
    Ok(newline)
  }

  /// Read the next token in plain (non-JSX) mode.
  pub fn next_token(&mut self) -> Result<Token, TranspileError> {
    let nl_before = self.skip_trivia()?;
    let start = self.pos;
    let make = |kind, end| Token {
      kind,
      start,
      end,
      nl_before,
      tail: false,
    };

    let Some(c) = self.peek_char() else {
      return Ok(make(TokenKind::Eof, start));
    };

    if is_ident_start(c) || c == '#' {
      self.pos += c.len_utf8();
      if c == '#' && !self.peek_char().is_some_and(is_ident_start) {
        return Err(self.error(start, "Unexpected character '#'"));
      }
      self.eat_ident_rest();
      return Ok(make(TokenKind::Ident, self.pos));
    }

    if c == '\\' {
      return Err(self.error(start, "Unicode escapes in identifiers are not supported"));
    }

    if c.is_ascii_digit() || (c == '.' && self.byte_at(start + 1).is_some_and(|b| b.is_ascii_digit())) {
      self.number()?;
      return Ok(make(TokenKind::Num, self.pos));
    }

    if c == '"' || c == '\'' {
      self.string(c)?;
      return Ok(make(TokenKind::Str, self.pos));
    }

    if c == '`' {
      self.pos += 1;
      let tail = self.template_chunk(start)?;
      return Ok(Token {
        tail,
        ..make(TokenKind::Template, self.pos)
      });
    }

    let rest = &self.src[self.pos..];
    for punct in PUNCTUATORS {
      if rest.starts_with(punct) {
        // `a?.5:b` is a conditional, not an optional chain.
        if *punct == "?." && self.byte_at(start + 2).is_some_and(|b| b.is_ascii_digit()) {
          continue;
        }
        self.pos += punct.len();
        return Ok(make(TokenKind::Punct, self.pos));
      }
    }

    Err(self.error(start, format!("Unexpected character '{c}'")))
  }

  fn eat_ident_rest(&mut self) {
    while let Some(c) = self.peek_char() {
      if is_ident_part(c) {
        self.pos += c.len_utf8();
      } else {
        break;
      }
    }
  }

  fn number(&mut self) -> Result<(), TranspileError> {
    let start = self.pos;
    let radix_prefix = self.src[self.pos..]
      .get(..2)
      .map(|p| p.to_ascii_lowercase())
      .filter(|p| p == "0x" || p == "0o" || p == "0b");
    if radix_prefix.is_some() {
      self.pos += 2;
      while let Some(b) = self.byte_at(self.pos) {
        if b.is_ascii_hexdigit() || b == b'_' {
          self.pos += 1;
        } else {
          break;
        }
      }
    } else {
      self.digits();
      if self.byte_at(self.pos) == Some(b'.') {
        self.pos += 1;
        self.digits();
      }
      if matches!(self.byte_at(self.pos), Some(b'e' | b'E')) {
        let mut next = self.pos + 1;
        if matches!(self.byte_at(next), Some(b'+' | b'-')) {
          next += 1;
        }
        if self.byte_at(next).is_some_and(|b| b.is_ascii_digit()) {
          self.pos = next;
          self.digits();
        }
      }
    }
    if self.byte_at(self.pos) == Some(b'n') {
      self.pos += 1;
    }
    if self.peek_char().is_some_and(is_ident_start) {
      return Err(self.error(start, "Identifier directly after number"));
    }
    Ok(())
  }

  fn digits(&mut self) {
    while let Some(b) = self.byte_at(self.pos) {
      if b.is_ascii_digit() || b == b'_' {
        self.pos += 1;
      } else {
        break;
      }
    }
  }

  fn string(&mut self, quote: char) -> Result<(), TranspileError> {
    let start = self.pos;
    self.pos += 1;
    loop {
      let Some(c) = self.peek_char() else {
        return Err(self.error(start, "Unterminated string constant"));
      };
      self.pos += c.len_utf8();
      match c {
        '\\' => {
          if let Some(escaped) = self.peek_char() {
            self.pos += escaped.len_utf8();
          }
        }
        '\n' | '\r' => return Err(self.error(start, "Unterminated string constant")),
        c if c == quote => return Ok(()),
        _ => {}
      }
    }
  }

  /// Scan template text after its opening delimiter. Returns whether the
  /// chunk closes the literal (as opposed to opening a `${` substitution).
  fn template_chunk(&mut self, start: usize) -> Result<bool, TranspileError> {
    loop {
      let Some(c) = self.peek_char() else {
        return Err(self.error(start, "Unterminated template"));
      };
      self.pos += c.len_utf8();
      match c {
        '\\' => {
          if let Some(escaped) = self.peek_char() {
            self.pos += escaped.len_utf8();
          }
        }
        '`' => return Ok(true),
        '$' if self.byte_at(self.pos) == Some(b'{') => {
          self.pos += 1;
          return Ok(false);
        }
        _ => {}
      }
    }
  }

  /// Re-read a `/` or `/=` token starting at `start` as a regular expression.
  pub fn regex_at(&mut self, start: usize, nl_before: bool) -> Result<Token, TranspileError> {
    self.pos = start + 1;
    let mut in_class = false;
    loop {
      let Some(c) = self.peek_char() else {
        return Err(self.error(start, "Unterminated regular expression"));
      };
      if is_line_terminator(c) {
        return Err(self.error(start, "Unterminated regular expression"));
      }
      self.pos += c.len_utf8();
      match c {
        '\\' => {
          if let Some(escaped) = self.peek_char() {
            if is_line_terminator(escaped) {
              return Err(self.error(start, "Unterminated regular expression"));
            }
            self.pos += escaped.len_utf8();
          }
        }
        '[' => in_class = true,
        ']' => in_class = false,
        '/' if !in_class => break,
        _ => {}
      }
    }
    self.eat_ident_rest();
    Ok(Token {
      kind: TokenKind::Regex,
      start,
      end: self.pos,
      nl_before,
      tail: false,
    })
  }

  /// Re-read a `}` at `start` as the continuation of a template literal.
  pub fn template_continue_at(&mut self, start: usize) -> Result<Token, TranspileError> {
    self.pos = start + 1;
    let tail = self.template_chunk(start)?;
    Ok(Token {
      kind: TokenKind::Template,
      start,
      end: self.pos,
      nl_before: false,
      tail,
    })
  }

  /// Classify JSX element content starting at `pos`.
  pub fn jsx_child_at(&mut self, pos: usize) -> JsxChild {
    self.pos = pos;
    match self.byte_at(pos) {
      None => JsxChild::Eof,
      Some(b'{') => JsxChild::Expr(pos),
      Some(b'<') => JsxChild::Tag(pos),
      Some(_) => {
        let end = self.src[pos..]
          .find(['{', '<'])
          .map(|offset| pos + offset)
          .unwrap_or(self.src.len());
        self.pos = end;
        JsxChild::Text { start: pos, end }
      }
    }
  }

  /// End offset of a JSX name (identifier characters and `-`) starting at `start`.
  pub fn jsx_name_end(&self, start: usize) -> usize {
    let mut end = start;
    for c in self.src[start..].chars() {
      if is_ident_part(c) || c == '-' {
        end += c.len_utf8();
      } else {
        break;
      }
    }
    end
  }

  /// Read the token after `=` in a JSX attribute: a raw JSX string when the
  /// value is quoted, a regular token otherwise.
  pub fn jsx_attr_value_at(&mut self, pos: usize) -> Result<Token, TranspileError> {
    self.pos = pos;
    let nl_before = self.skip_trivia()?;
    match self.byte_at(self.pos) {
      Some(b'"' | b'\'') => self.jsx_string_at(self.pos, nl_before),
      _ => self.next_token(),
    }
  }

  /// Read a JSX attribute string (no escape sequences) starting at the quote.
  pub fn jsx_string_at(&mut self, start: usize, nl_before: bool) -> Result<Token, TranspileError> {
    let quote = self.bytes[start];
    let Some(len) = self.src[start + 1..].find(quote as char) else {
      return Err(self.error(start, "Unterminated string constant"));
    };
    self.pos = start + len + 2;
    Ok(Token {
      kind: TokenKind::Str,
      start,
      end: self.pos,
      nl_before,
      tail: false,
    })
  }
}

pub fn is_line_terminator(c: char) -> bool {
  matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

pub fn is_ident_start(c: char) -> bool {
  c == '$' || c == '_' || c.is_ascii_alphabetic() || (!c.is_ascii() && c.is_alphabetic())
}

pub fn is_ident_part(c: char) -> bool {
  is_ident_start(c) || c.is_ascii_digit() || (!c.is_ascii() && c.is_alphanumeric()) || c == '\u{200c}' || c == '\u{200d}'
}
