//! Type-level syntax is never represented: these routines walk past it and
//! only remember which identifiers appeared, so that imports used purely as
//! types can be elided.

use super::TranspileError;
use super::lexer::TokenKind;
use super::parser::Parser;

impl<'a> Parser<'a> {
  fn type_advance(&mut self) -> Result<(), TranspileError> {
    if self.tok.kind == TokenKind::Ident {
      self.type_refs.insert(self.text().to_string());
    }
    self.advance()?;
    Ok(())
  }

  /// `: Type`
  pub(super) fn skip_type_annotation(&mut self) -> Result<(), TranspileError> {
    self.expect(":")?;
    self.skip_type()
  }

  /// `: Type`, `: x is Type` or `: asserts x [is Type]`.
  pub(super) fn skip_return_type(&mut self) -> Result<(), TranspileError> {
    self.expect(":")?;
    if self.is_word("asserts") {
      let next = self.peek()?;
      if next.kind == TokenKind::Ident && !next.nl_before {
        self.advance()?;
        self.type_advance()?;
        if self.eat_word("is")? {
          self.skip_type()?;
        }
        return Ok(());
      }
    }
    self.skip_type()
  }

  pub(super) fn skip_type(&mut self) -> Result<(), TranspileError> {
    self.nested(Self::skip_type_at_depth)
  }

  fn skip_type_at_depth(&mut self) -> Result<(), TranspileError> {
    if self.is_word("abstract") {
      let next = self.peek()?;
      if next.kind == TokenKind::Ident && self.tok_text(next) == "new" {
        self.advance()?;
      }
    }
    if self.eat_word("new")? {
      if self.is("<") {
        self.skip_type_params()?;
      }
      self.skip_balanced()?;
      self.expect("=>")?;
      return self.skip_type();
    }
    if self.is("<") {
      self.skip_type_params()?;
      self.skip_balanced()?;
      self.expect("=>")?;
      return self.skip_type();
    }
    if self.is("(") {
      let cp = self.checkpoint();
      self.skip_balanced()?;
      if self.eat("=>")? {
        return self.skip_type();
      }
      self.restore(cp);
    }

    self.skip_union()?;
    if self.is_word("extends") && !self.tok.nl_before {
      self.advance()?;
      self.skip_union()?;
      self.expect("?")?;
      self.skip_type()?;
      self.expect(":")?;
      self.skip_type()?;
    }
    Ok(())
  }

  fn skip_union(&mut self) -> Result<(), TranspileError> {
    self.eat("|")?;
    self.skip_intersection()?;
    while self.eat("|")? {
      self.skip_intersection()?;
    }
    Ok(())
  }

  fn skip_intersection(&mut self) -> Result<(), TranspileError> {
    self.eat("&")?;
    self.skip_type_operator()?;
    while self.eat("&")? {
      self.skip_type_operator()?;
    }
    Ok(())
  }

  fn skip_type_operator(&mut self) -> Result<(), TranspileError> {
    if self.tok.kind == TokenKind::Ident {
      match self.text() {
        "keyof" | "unique" | "readonly" => {
          let next = self.peek()?;
          let operand = next.kind == TokenKind::Ident
            || (next.kind == TokenKind::Punct && matches!(self.tok_text(next), "(" | "[" | "{"));
          if operand {
            self.advance()?;
            return self.nested(Self::skip_type_operator);
          }
        }
        "infer" => {
          let next = self.peek()?;
          if next.kind == TokenKind::Ident {
            self.advance()?;
            return self.type_advance();
          }
        }
        _ => {}
      }
    }
    self.skip_postfix_type()
  }

  fn skip_postfix_type(&mut self) -> Result<(), TranspileError> {
    self.skip_primary_type()?;
    while self.is("[") && !self.tok.nl_before {
      self.advance()?;
      if !self.eat("]")? {
        self.skip_type()?;
        self.expect("]")?;
      }
    }
    Ok(())
  }

  fn skip_primary_type(&mut self) -> Result<(), TranspileError> {
    match self.tok.kind {
      TokenKind::Punct => match self.text() {
        "(" => {
          self.advance()?;
          self.skip_type()?;
          self.expect(")")
        }
        "{" | "[" => self.skip_balanced(),
        "-" => {
          self.advance()?;
          if self.tok.kind != TokenKind::Num {
            return Err(self.unexpected());
          }
          self.advance()?;
          Ok(())
        }
        _ => Err(self.unexpected()),
      },
      TokenKind::Num | TokenKind::Str => {
        self.advance()?;
        Ok(())
      }
      TokenKind::Template => self.skip_template_literal(),
      TokenKind::Ident => {
        match self.text() {
          "typeof" => {
            self.advance()?;
            if self.is_word("import") {
              self.skip_import_type()?;
            } else {
              self.skip_entity_name()?;
            }
          }
          "import" => self.skip_import_type()?,
          _ => {
            self.skip_entity_name()?;
            if self.is_word("is") && !self.tok.nl_before {
              self.advance()?;
              self.skip_type()?;
            }
          }
        }
        Ok(())
      }
      _ => Err(self.unexpected()),
    }
  }

  /// `A.B.C<Args>`
  fn skip_entity_name(&mut self) -> Result<(), TranspileError> {
    self.type_advance()?;
    while self.eat(".")? {
      self.type_advance()?;
    }
    if self.is("<") && !self.tok.nl_before {
      self.skip_type_params()?;
    }
    Ok(())
  }

  /// `import("mod").Name<Args>`
  fn skip_import_type(&mut self) -> Result<(), TranspileError> {
    self.expect_word("import")?;
    self.skip_balanced()?;
    while self.eat(".")? {
      self.type_advance()?;
    }
    if self.is("<") && !self.tok.nl_before {
      self.skip_type_params()?;
    }
    Ok(())
  }

  /// Skip a `<...>` list of type parameters or arguments.
  pub(super) fn skip_type_params(&mut self) -> Result<(), TranspileError> {
    let start = self.tok.start;
    self.expect("<")?;
    let mut depth = 1usize;
    loop {
      match self.tok.kind {
        TokenKind::Eof => return Err(self.error_at(start, "Unterminated type parameter list")),
        TokenKind::Template => {
          self.skip_template_literal()?;
          continue;
        }
        TokenKind::Punct => {
          let text = self.text();
          if text.starts_with('>') {
            self.expect_closing_angle()?;
            depth -= 1;
            if depth == 0 {
              return Ok(());
            }
            continue;
          }
          match text {
            "<" => depth += 1,
            "(" | "[" | "{" => {
              self.skip_balanced()?;
              continue;
            }
            ";" | "}" | ")" | "]" => return Err(self.unexpected()),
            _ => {}
          }
        }
        _ => {}
      }
      self.type_advance()?;
    }
  }

  /// Type arguments of a call: `f<T>(...)` or `` tag<T>`...` ``. Declines
  /// unless the list is followed by an argument list or template.
  pub(super) fn call_type_args(&mut self) -> Result<Option<()>, TranspileError> {
    self.expect("<")?;
    loop {
      self.skip_type()?;
      if !self.eat(",")? {
        break;
      }
    }
    self.expect_closing_angle()?;
    if self.is("(") || self.tok.kind == TokenKind::Template {
      return Ok(Some(()));
    }
    Ok(None)
  }

  /// Skip a bracketed group starting at `(`, `[` or `{`, tracking nesting.
  pub(super) fn skip_balanced(&mut self) -> Result<(), TranspileError> {
    if !(self.is("(") || self.is("[") || self.is("{")) {
      return Err(self.unexpected());
    }
    let start = self.tok.start;
    let mut depth = 0usize;
    loop {
      match self.tok.kind {
        TokenKind::Eof => return Err(self.error_at(start, "Unbalanced brackets")),
        TokenKind::Template => {
          self.skip_template_literal()?;
          continue;
        }
        TokenKind::Punct => match self.text() {
          "(" | "[" | "{" => depth += 1,
          ")" | "]" | "}" => {
            depth -= 1;
            if depth == 0 {
              self.advance()?;
              return Ok(());
            }
          }
          _ => {}
        },
        _ => {}
      }
      self.type_advance()?;
    }
  }

  /// Skip a template literal, including any `${...}` substitutions.
  pub(super) fn skip_template_literal(&mut self) -> Result<(), TranspileError> {
    let start = self.tok.start;
    loop {
      let chunk = self.tok;
      self.advance()?;
      if chunk.tail {
        return Ok(());
      }
      let mut depth = 0usize;
      loop {
        match self.tok.kind {
          TokenKind::Eof => return Err(self.error_at(start, "Unterminated template")),
          TokenKind::Template => {
            self.skip_template_literal()?;
            continue;
          }
          TokenKind::Punct => match self.text() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" => depth = depth.saturating_sub(1),
            "}" if depth == 0 => break,
            "}" => depth -= 1,
            _ => {}
          },
          _ => {}
        }
        self.type_advance()?;
      }
      self.tok = self.lexer.template_continue_at(self.tok.start)?;
    }
  }

  pub(super) fn skip_interface(&mut self) -> Result<(), TranspileError> {
    self.expect_word("interface")?;
    self.type_advance()?;
    if self.is("<") {
      self.skip_type_params()?;
    }
    if self.eat_word("extends")? {
      loop {
        self.skip_type()?;
        if !self.eat(",")? {
          break;
        }
      }
    }
    self.skip_balanced()
  }

  pub(super) fn skip_type_alias(&mut self) -> Result<(), TranspileError> {
    self.expect_word("type")?;
    self.type_advance()?;
    if self.is("<") {
      self.skip_type_params()?;
    }
    self.expect("=")?;
    self.skip_type()?;
    if !self.eat(";")? && !self.is("}") && self.tok.kind != TokenKind::Eof && !self.tok.nl_before {
      return Err(self.error_at(self.prev_end, "Missing semicolon."));
    }
    Ok(())
  }
}
