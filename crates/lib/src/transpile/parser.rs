//! Recursive-descent parser for TypeScript + JSX modules.
//!
//! Types are skipped rather than represented (see `types.rs`), JSX is lowered
//! to `React.createElement` calls on the fly (see `jsx.rs`). Context-dependent
//! lexing (regexes, template continuations, `>>` inside type arguments) is
//! resolved here by re-reading from a token offset.

use std::collections::HashSet;

use super::TranspileError;
use super::ast::*;
use super::lexer::{Lexer, Token, TokenKind};

const RESERVED: &[&str] = &[
  "break",
  "case",
  "catch",
  "class",
  "const",
  "continue",
  "debugger",
  "default",
  "delete",
  "do",
  "else",
  "enum",
  "export",
  "extends",
  "false",
  "finally",
  "for",
  "function",
  "if",
  "import",
  "in",
  "instanceof",
  "new",
  "null",
  "return",
  "super",
  "switch",
  "this",
  "throw",
  "true",
  "try",
  "typeof",
  "var",
  "void",
  "while",
  "with",
];

const PARAM_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

const CLASS_MODIFIERS: &[&str] = &[
  "static",
  "public",
  "private",
  "protected",
  "readonly",
  "abstract",
  "override",
  "declare",
  "accessor",
  "async",
  "get",
  "set",
];

/// Deepest syntactic nesting accepted before parsing gives up.
pub const MAX_DEPTH: usize = 128;

pub fn is_reserved(word: &str) -> bool {
  RESERVED.contains(&word)
}

/// Result of parsing a module: statements plus the identifier usage needed
/// to decide which imports survive type erasure.
#[derive(Debug)]
pub struct ParsedModule {
  pub body: Vec<Stmt>,
  /// Identifiers referenced in value positions.
  pub value_refs: HashSet<String>,
  /// Identifiers seen in type positions.
  pub type_refs: HashSet<String>,
  pub uses_jsx: bool,
}

pub fn parse_module(src: &str) -> Result<ParsedModule, TranspileError> {
  let mut parser = Parser::new(src)?;
  let mut body = Vec::new();
  while parser.tok.kind != TokenKind::Eof {
    if let Some(stmt) = parser.parse_statement(true)? {
      body.push(stmt);
    }
  }
  Ok(ParsedModule {
    body,
    value_refs: parser.value_refs,
    type_refs: parser.type_refs,
    uses_jsx: parser.uses_jsx,
  })
}

#[derive(Clone, Copy)]
pub(super) struct Checkpoint {
  pos: usize,
  tok: Token,
  prev_end: usize,
  in_generator: bool,
}

pub(super) struct Parser<'a> {
  pub(super) src: &'a str,
  pub(super) lexer: Lexer<'a>,
  pub(super) tok: Token,
  pub(super) prev_end: usize,
  pub(super) value_refs: HashSet<String>,
  pub(super) type_refs: HashSet<String>,
  pub(super) uses_jsx: bool,
  in_generator: bool,
  depth: usize,
}

impl<'a> Parser<'a> {
  fn new(src: &'a str) -> Result<Self, TranspileError> {
    let mut lexer = Lexer::new(src);
    let tok = lexer.next_token()?;
    Ok(Self {
      src,
      lexer,
      tok,
      prev_end: 0,
      value_refs: HashSet::new(),
      type_refs: HashSet::new(),
      uses_jsx: false,
      in_generator: false,
      depth: 0,
    })
  }

  // =========================================================================
  // Token navigation
  // =========================================================================

  pub(super) fn text(&self) -> &'a str {
    &self.src[self.tok.start..self.tok.end]
  }

  pub(super) fn tok_text(&self, tok: Token) -> &'a str {
    &self.src[tok.start..tok.end]
  }

  pub(super) fn is(&self, punct: &str) -> bool {
    self.tok.kind == TokenKind::Punct && self.text() == punct
  }

  pub(super) fn is_word(&self, word: &str) -> bool {
    self.tok.kind == TokenKind::Ident && self.text() == word
  }

  pub(super) fn advance(&mut self) -> Result<Token, TranspileError> {
    let prev = self.tok;
    self.prev_end = prev.end;
    self.tok = self.lexer.next_token()?;
    Ok(prev)
  }

  pub(super) fn advance_text(&mut self) -> Result<&'a str, TranspileError> {
    let tok = self.advance()?;
    Ok(self.tok_text(tok))
  }

  pub(super) fn eat(&mut self, punct: &str) -> Result<bool, TranspileError> {
    if self.is(punct) {
      self.advance()?;
      return Ok(true);
    }
    Ok(false)
  }

  pub(super) fn eat_word(&mut self, word: &str) -> Result<bool, TranspileError> {
    if self.is_word(word) {
      self.advance()?;
      return Ok(true);
    }
    Ok(false)
  }

  pub(super) fn expect(&mut self, punct: &str) -> Result<(), TranspileError> {
    if self.eat(punct)? {
      return Ok(());
    }
    Err(self.error_here(format!("Unexpected token, expected \"{punct}\"")))
  }

  pub(super) fn expect_word(&mut self, word: &str) -> Result<(), TranspileError> {
    if self.eat_word(word)? {
      return Ok(());
    }
    Err(self.error_here(format!("Unexpected token, expected \"{word}\"")))
  }

  pub(super) fn error_here(&self, message: impl Into<String>) -> TranspileError {
    TranspileError::at(self.src, self.tok.start, message)
  }

  pub(super) fn error_at(&self, pos: usize, message: impl Into<String>) -> TranspileError {
    TranspileError::at(self.src, pos, message)
  }

  pub(super) fn unexpected(&self) -> TranspileError {
    if self.tok.kind == TokenKind::Eof {
      return self.error_here("Unexpected end of input");
    }
    self.error_here(format!("Unexpected token '{}'", self.text()))
  }

  /// Lex the token after the current one without consuming anything.
  pub(super) fn peek(&mut self) -> Result<Token, TranspileError> {
    let saved = self.lexer.pos();
    let next = self.lexer.next_token();
    self.lexer.set_pos(saved);
    next
  }

  pub(super) fn checkpoint(&self) -> Checkpoint {
    Checkpoint {
      pos: self.lexer.pos(),
      tok: self.tok,
      prev_end: self.prev_end,
      in_generator: self.in_generator,
    }
  }

  pub(super) fn restore(&mut self, cp: Checkpoint) {
    self.lexer.set_pos(cp.pos);
    self.tok = cp.tok;
    self.prev_end = cp.prev_end;
    self.in_generator = cp.in_generator;
  }

  /// Run `f`, rewinding to the current token if it fails or declines.
  pub(super) fn speculate<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<Option<T>, TranspileError>) -> Option<T> {
    let cp = self.checkpoint();
    match f(self) {
      Ok(Some(value)) => Some(value),
      _ => {
        self.restore(cp);
        None
      }
    }
  }

  /// Run `f` one nesting level deeper. Input nested past [`MAX_DEPTH`] is
  /// rejected instead of recursing further.
  pub(super) fn nested<T>(
    &mut self,
    f: impl FnOnce(&mut Self) -> Result<T, TranspileError>,
  ) -> Result<T, TranspileError> {
    if self.depth >= MAX_DEPTH {
      return Err(self.error_here("Maximum nesting depth exceeded"));
    }
    self.depth += 1;
    let result = f(self);
    self.depth -= 1;
    result
  }

  /// Reposition the lexer at `pos` and read the token found there.
  pub(super) fn resync(&mut self, pos: usize) -> Result<(), TranspileError> {
    self.lexer.set_pos(pos);
    self.prev_end = pos;
    self.tok = self.lexer.next_token()?;
    Ok(())
  }

  /// Consume a single `>`, splitting `>>`, `>=` and friends.
  pub(super) fn expect_closing_angle(&mut self) -> Result<(), TranspileError> {
    if self.tok.kind != TokenKind::Punct || !self.text().starts_with('>') {
      return Err(self.error_here("Unexpected token, expected \">\""));
    }
    if self.text().len() == 1 {
      self.advance()?;
      return Ok(());
    }
    self.resync(self.tok.start + 1)?;
    self.tok.nl_before = false;
    Ok(())
  }

  fn semicolon(&mut self) -> Result<(), TranspileError> {
    if self.eat(";")? {
      return Ok(());
    }
    if self.is("}") || self.tok.kind == TokenKind::Eof || self.tok.nl_before {
      return Ok(());
    }
    Err(self.error_at(self.prev_end, "Missing semicolon."))
  }

  pub(super) fn binding_ident(&mut self) -> Result<String, TranspileError> {
    if self.tok.kind != TokenKind::Ident || self.text().starts_with('#') || is_reserved(self.text()) {
      return Err(self.unexpected());
    }
    Ok(self.advance_text()?.to_string())
  }

  fn starts_with_ident(&self, tok: Token) -> bool {
    tok.kind == TokenKind::Ident && !is_reserved(self.tok_text(tok))
  }

  fn token_is(&self, tok: Token, punct: &str) -> bool {
    tok.kind == TokenKind::Punct && self.tok_text(tok) == punct
  }

  fn token_is_word(&self, tok: Token, word: &str) -> bool {
    tok.kind == TokenKind::Ident && self.tok_text(tok) == word
  }

  // =========================================================================
  // Statements
  // =========================================================================

  /// Parse one statement. `None` means the statement was type-only and
  /// erased entirely.
  pub(super) fn parse_statement(&mut self, top_level: bool) -> Result<Option<Stmt>, TranspileError> {
    self.nested(|p| p.parse_statement_at_depth(top_level))
  }

  fn parse_statement_at_depth(&mut self, top_level: bool) -> Result<Option<Stmt>, TranspileError> {
    match self.tok.kind {
      TokenKind::Punct => {
        if self.is("{") {
          return Ok(Some(Stmt::Block(self.parse_block()?)));
        }
        if self.eat(";")? {
          return Ok(Some(Stmt::Empty));
        }
        if self.is("@") {
          return Err(self.error_here("Decorators are not supported"));
        }
      }
      TokenKind::Ident => {
        if let Some(stmt) = self.parse_keyword_statement(top_level)? {
          return Ok(stmt);
        }
      }
      _ => {}
    }

    let expr = self.parse_expression(false)?;
    self.semicolon()?;
    Ok(Some(Stmt::Expr(expr)))
  }

  /// Statements introduced by a keyword. The outer `None` means "not a
  /// keyword statement, parse an expression instead".
  fn parse_keyword_statement(&mut self, top_level: bool) -> Result<Option<Option<Stmt>>, TranspileError> {
    let word = self.text();
    let stmt = match word {
      "var" | "const" => {
        if word == "const" {
          let next = self.peek()?;
          if self.token_is_word(next, "enum") {
            self.advance()?;
            return Ok(Some(Some(Stmt::Enum(self.parse_enum()?))));
          }
        }
        let decl = self.parse_var_decl(false)?;
        self.semicolon()?;
        Stmt::Var(decl)
      }
      "let" => {
        let next = self.peek()?;
        if next.kind != TokenKind::Ident && !self.token_is(next, "[") && !self.token_is(next, "{") {
          return Ok(None);
        }
        let decl = self.parse_var_decl(false)?;
        self.semicolon()?;
        Stmt::Var(decl)
      }
      "function" => return Ok(Some(self.parse_function_decl(false)?.map(Stmt::Function))),
      "async" => {
        let next = self.peek()?;
        if !self.token_is_word(next, "function") || next.nl_before {
          return Ok(None);
        }
        self.advance()?;
        return Ok(Some(self.parse_function_decl(true)?.map(Stmt::Function)));
      }
      "class" => Stmt::Class(self.parse_class(true)?),
      "abstract" => {
        let next = self.peek()?;
        if !self.token_is_word(next, "class") {
          return Ok(None);
        }
        self.advance()?;
        Stmt::Class(self.parse_class(true)?)
      }
      "enum" => Stmt::Enum(self.parse_enum()?),
      "if" => self.parse_if()?,
      "for" => self.parse_for()?,
      "while" => {
        self.advance()?;
        let test = self.parse_paren_expression()?;
        let body = self.parse_sub_statement()?;
        Stmt::While { test, body }
      }
      "do" => {
        self.advance()?;
        let body = self.parse_sub_statement()?;
        self.expect_word("while")?;
        let test = self.parse_paren_expression()?;
        self.eat(";")?;
        Stmt::DoWhile { body, test }
      }
      "return" => {
        self.advance()?;
        let arg = if self.is(";") || self.is("}") || self.tok.kind == TokenKind::Eof || self.tok.nl_before {
          None
        } else {
          Some(self.parse_expression(false)?)
        };
        self.semicolon()?;
        Stmt::Return(arg)
      }
      "break" | "continue" => {
        self.advance()?;
        let label = if self.tok.kind == TokenKind::Ident && !self.tok.nl_before {
          Some(self.binding_ident()?)
        } else {
          None
        };
        self.semicolon()?;
        if word == "break" {
          Stmt::Break(label)
        } else {
          Stmt::Continue(label)
        }
      }
      "throw" => {
        self.advance()?;
        if self.tok.nl_before {
          return Err(self.error_here("Illegal newline after throw"));
        }
        let arg = self.parse_expression(false)?;
        self.semicolon()?;
        Stmt::Throw(arg)
      }
      "try" => self.parse_try()?,
      "switch" => self.parse_switch()?,
      "debugger" => {
        self.advance()?;
        self.semicolon()?;
        Stmt::Debugger
      }
      "with" => return Err(self.error_here("'with' in strict mode")),
      "import" => {
        let next = self.peek()?;
        if self.token_is(next, "(") || self.token_is(next, ".") {
          return Ok(None);
        }
        if !top_level {
          return Err(self.error_here("'import' and 'export' may only appear at the top level"));
        }
        Stmt::Import(self.parse_import()?)
      }
      "export" => {
        if !top_level {
          return Err(self.error_here("'import' and 'export' may only appear at the top level"));
        }
        return Ok(Some(self.parse_export()?));
      }
      "interface" | "type" | "declare" => {
        let next = self.peek()?;
        if next.kind != TokenKind::Ident || next.nl_before {
          return Ok(None);
        }
        match word {
          "interface" => self.skip_interface()?,
          "type" => self.skip_type_alias()?,
          _ => self.skip_declare()?,
        }
        return Ok(Some(None));
      }
      "namespace" | "module" => {
        let next = self.peek()?;
        if (next.kind != TokenKind::Ident && next.kind != TokenKind::Str) || next.nl_before {
          return Ok(None);
        }
        return Err(self.error_here("TypeScript namespaces are not supported"));
      }
      _ => {
        if is_reserved(word) || word.starts_with('#') {
          return Ok(None);
        }
        let next = self.peek()?;
        if !self.token_is(next, ":") {
          return Ok(None);
        }
        let label = self.binding_ident()?;
        self.expect(":")?;
        let body = self.parse_sub_statement()?;
        Stmt::Labeled { label, body }
      }
    };
    Ok(Some(Some(stmt)))
  }

  pub(super) fn parse_block(&mut self) -> Result<Vec<Stmt>, TranspileError> {
    self.expect("{")?;
    let mut body = Vec::new();
    while !self.is("}") {
      if self.tok.kind == TokenKind::Eof {
        return Err(self.unexpected());
      }
      if let Some(stmt) = self.parse_statement(false)? {
        body.push(stmt);
      }
    }
    self.expect("}")?;
    Ok(body)
  }

  fn parse_sub_statement(&mut self) -> Result<Box<Stmt>, TranspileError> {
    Ok(Box::new(self.parse_statement(false)?.unwrap_or(Stmt::Empty)))
  }

  fn parse_paren_expression(&mut self) -> Result<Expr, TranspileError> {
    self.expect("(")?;
    let expr = self.parse_expression(false)?;
    self.expect(")")?;
    Ok(expr)
  }

  fn parse_var_decl(&mut self, no_in: bool) -> Result<VarDecl, TranspileError> {
    let kind = match self.advance_text()? {
      "var" => VarKind::Var,
      "let" => VarKind::Let,
      _ => VarKind::Const,
    };
    let mut decls = Vec::new();
    loop {
      let target = self.parse_binding_target()?;
      self.eat("!")?;
      if self.is(":") {
        self.skip_type_annotation()?;
      }
      let init = if self.eat("=")? {
        Some(self.parse_assign(no_in)?)
      } else {
        None
      };
      decls.push(Declarator { target, init });
      if !self.eat(",")? {
        break;
      }
    }
    Ok(VarDecl { kind, decls })
  }

  fn parse_if(&mut self) -> Result<Stmt, TranspileError> {
    self.advance()?;
    let test = self.parse_paren_expression()?;
    let cons = self.parse_sub_statement()?;
    let alt = if self.eat_word("else")? {
      Some(self.parse_sub_statement()?)
    } else {
      None
    };
    Ok(Stmt::If { test, cons, alt })
  }

  fn parse_for(&mut self) -> Result<Stmt, TranspileError> {
    self.advance()?;
    let is_await = self.eat_word("await")?;
    self.expect("(")?;

    let init_start = self.tok.start;
    let is_decl = if self.is_word("var") || self.is_word("const") {
      true
    } else if self.is_word("let") {
      let next = self.peek()?;
      next.kind == TokenKind::Ident || self.token_is(next, "[") || self.token_is(next, "{")
    } else {
      false
    };
    let init = if self.is(";") {
      None
    } else if is_decl {
      Some(ForInit::Var(self.parse_var_decl(true)?))
    } else {
      Some(ForInit::Expr(self.parse_expression(true)?))
    };

    let kind = if self.is_word("of") {
      Some(if is_await { ForInKind::AwaitOf } else { ForInKind::Of })
    } else if self.is_word("in") {
      Some(ForInKind::In)
    } else {
      None
    };

    if let Some(kind) = kind {
      let Some(init) = init else {
        return Err(self.unexpected());
      };
      self.advance()?;
      let left = match init {
        ForInit::Expr(expr) => ForInit::Pat(self.expr_to_pat(expr, true, init_start)?),
        other => other,
      };
      let right = if kind == ForInKind::In {
        self.parse_expression(false)?
      } else {
        self.parse_assign(false)?
      };
      self.expect(")")?;
      let body = self.parse_sub_statement()?;
      return Ok(Stmt::ForIn {
        left,
        right,
        kind,
        body,
      });
    }

    self.expect(";")?;
    let test = if self.is(";") {
      None
    } else {
      Some(self.parse_expression(false)?)
    };
    self.expect(";")?;
    let update = if self.is(")") {
      None
    } else {
      Some(self.parse_expression(false)?)
    };
    self.expect(")")?;
    let body = self.parse_sub_statement()?;
    Ok(Stmt::For {
      init,
      test,
      update,
      body,
    })
  }

  fn parse_try(&mut self) -> Result<Stmt, TranspileError> {
    self.advance()?;
    let block = self.parse_block()?;
    let mut param = None;
    let mut handler = None;
    if self.eat_word("catch")? {
      if self.eat("(")? {
        param = Some(self.parse_binding_target()?);
        if self.is(":") {
          self.skip_type_annotation()?;
        }
        self.expect(")")?;
      }
      handler = Some(self.parse_block()?);
    }
    let finalizer = if self.eat_word("finally")? {
      Some(self.parse_block()?)
    } else {
      None
    };
    if handler.is_none() && finalizer.is_none() {
      return Err(self.error_here("Missing catch or finally clause"));
    }
    Ok(Stmt::Try {
      block,
      param,
      handler,
      finalizer,
    })
  }

  fn parse_switch(&mut self) -> Result<Stmt, TranspileError> {
    self.advance()?;
    let discriminant = self.parse_paren_expression()?;
    self.expect("{")?;
    let mut cases = Vec::new();
    while !self.eat("}")? {
      let test = if self.eat_word("case")? {
        Some(self.parse_expression(false)?)
      } else {
        self.expect_word("default")?;
        None
      };
      self.expect(":")?;
      let mut body = Vec::new();
      while !self.is("}") && !self.is_word("case") && !self.is_word("default") {
        if self.tok.kind == TokenKind::Eof {
          return Err(self.unexpected());
        }
        if let Some(stmt) = self.parse_statement(false)? {
          body.push(stmt);
        }
      }
      cases.push(SwitchCase { test, body });
    }
    Ok(Stmt::Switch { discriminant, cases })
  }

  fn parse_enum(&mut self) -> Result<Enum, TranspileError> {
    self.expect_word("enum")?;
    let name = self.binding_ident()?;
    self.expect("{")?;
    let mut members = Vec::new();
    while !self.is("}") {
      let member = match self.tok.kind {
        TokenKind::Ident => self.advance_text()?.to_string(),
        TokenKind::Str => unquote(self.advance_text()?),
        _ => return Err(self.unexpected()),
      };
      let init = if self.eat("=")? {
        Some(self.parse_assign(false)?)
      } else {
        None
      };
      members.push(EnumMember { name: member, init });
      if !self.is("}") {
        self.expect(",")?;
      }
    }
    self.expect("}")?;
    Ok(Enum { name, members })
  }

  fn skip_declare(&mut self) -> Result<(), TranspileError> {
    self.expect_word("declare")?;
    match self.text() {
      "var" | "let" => {
        self.parse_var_decl(false)?;
        self.semicolon()
      }
      "const" => {
        let next = self.peek()?;
        if self.token_is_word(next, "enum") {
          self.advance()?;
          self.parse_enum()?;
          return Ok(());
        }
        self.parse_var_decl(false)?;
        self.semicolon()
      }
      "function" => self.parse_function_decl(false).map(|_| ()),
      "async" => {
        self.advance()?;
        self.parse_function_decl(true).map(|_| ())
      }
      "abstract" => {
        self.advance()?;
        self.parse_class(false).map(|_| ())
      }
      "class" => self.parse_class(false).map(|_| ()),
      "enum" => self.parse_enum().map(|_| ()),
      "interface" => self.skip_interface(),
      "type" => self.skip_type_alias(),
      "module" | "namespace" | "global" => {
        while !self.is("{") && !self.is(";") && self.tok.kind != TokenKind::Eof && !self.tok.nl_before {
          self.advance()?;
        }
        if self.is("{") {
          self.skip_balanced()
        } else {
          self.semicolon()
        }
      }
      _ => Err(self.unexpected()),
    }
  }

  // =========================================================================
  // Modules
  // =========================================================================

  fn parse_module_source(&mut self) -> Result<String, TranspileError> {
    if self.tok.kind != TokenKind::Str {
      return Err(self.unexpected());
    }
    let source = unquote(self.advance_text()?);
    // `with { type: "json" }` / `assert { ... }`
    if (self.is_word("with") || self.is_word("assert")) && !self.tok.nl_before {
      self.advance()?;
      self.skip_balanced()?;
    }
    self.semicolon()?;
    Ok(source)
  }

  /// Name in an import/export specifier list: identifier or string.
  fn module_export_name(&mut self) -> Result<String, TranspileError> {
    match self.tok.kind {
      TokenKind::Ident => Ok(self.advance_text()?.to_string()),
      TokenKind::Str => Ok(unquote(self.advance_text()?)),
      _ => Err(self.unexpected()),
    }
  }

  /// Whether a `type` keyword at the current token modifies the following
  /// specifier (`{ type Foo }`) rather than naming a binding called `type`.
  fn type_modifier_follows(&mut self) -> Result<bool, TranspileError> {
    if !self.is_word("type") {
      return Ok(false);
    }
    let next = self.peek()?;
    Ok((next.kind == TokenKind::Ident && !self.token_is_word(next, "as")) || next.kind == TokenKind::Str)
  }

  fn parse_import(&mut self) -> Result<ImportDecl, TranspileError> {
    self.expect_word("import")?;
    let mut decl = ImportDecl {
      source: String::new(),
      default: None,
      namespace: None,
      named: Vec::new(),
      type_only: false,
    };

    if self.tok.kind == TokenKind::Str {
      decl.source = self.parse_module_source()?;
      return Ok(decl);
    }

    if self.is_word("type") {
      let next = self.peek()?;
      let modifies = (next.kind == TokenKind::Ident && !self.token_is_word(next, "from"))
        || self.token_is(next, "{")
        || self.token_is(next, "*");
      if modifies {
        self.advance()?;
        decl.type_only = true;
      }
    }

    if self.tok.kind == TokenKind::Ident {
      let start = self.tok.start;
      let local = self.binding_ident()?;
      if self.is("=") {
        return Err(self.error_at(start, "`import ... = require(...)` is not supported"));
      }
      decl.default = Some(local);
      if !self.eat(",")? {
        self.expect_word("from")?;
        decl.source = self.parse_module_source()?;
        return Ok(decl);
      }
    }

    if self.eat("*")? {
      self.expect_word("as")?;
      decl.namespace = Some(self.binding_ident()?);
    } else if self.eat("{")? {
      while !self.is("}") {
        let type_only = self.type_modifier_follows()?;
        if type_only {
          self.advance()?;
        }
        let imported = self.module_export_name()?;
        let local = if self.eat_word("as")? {
          self.binding_ident()?
        } else {
          if !is_identifier_name(&imported) || is_reserved(&imported) {
            return Err(self.error_at(self.prev_end, format!("Unexpected keyword '{imported}'")));
          }
          imported.clone()
        };
        decl.named.push(ImportSpecifier {
          imported,
          local,
          type_only,
        });
        if !self.is("}") {
          self.expect(",")?;
        }
      }
      self.expect("}")?;
    } else {
      return Err(self.unexpected());
    }

    self.expect_word("from")?;
    decl.source = self.parse_module_source()?;
    Ok(decl)
  }

  fn parse_export(&mut self) -> Result<Option<Stmt>, TranspileError> {
    let start = self.tok.start;
    self.expect_word("export")?;

    if self.is("=") {
      return Err(self.error_at(start, "`export =` is not supported"));
    }
    if self.is_word("import") {
      return Err(self.error_at(start, "`export import` is not supported"));
    }
    if self.eat_word("as")? {
      // `export as namespace Foo;` only describes a UMD global.
      self.expect_word("namespace")?;
      self.binding_ident()?;
      self.semicolon()?;
      return Ok(None);
    }

    if self.eat_word("default")? {
      return self.parse_export_default();
    }

    if self.is_word("type") {
      let next = self.peek()?;
      if self.token_is(next, "{") || self.token_is(next, "*") {
        self.advance()?;
        self.parse_export_list()?;
        return Ok(None);
      }
    }

    if self.eat("*")? {
      let alias = if self.eat_word("as")? {
        Some(self.module_export_name()?)
      } else {
        None
      };
      self.expect_word("from")?;
      let source = self.parse_module_source()?;
      return Ok(Some(Stmt::Export(ExportDecl::All { source, alias })));
    }

    if self.is("{") {
      let (specifiers, source) = self.parse_export_list()?;
      if source.is_none() {
        for spec in &specifiers {
          self.value_refs.insert(spec.local.clone());
        }
      }
      return Ok(Some(Stmt::Export(ExportDecl::Named { specifiers, source })));
    }

    let decl_start = self.tok.start;
    match self.parse_statement(false)? {
      None => Ok(None),
      Some(stmt @ (Stmt::Var(_) | Stmt::Function(_) | Stmt::Class(_) | Stmt::Enum(_))) => {
        Ok(Some(Stmt::Export(ExportDecl::Decl(Box::new(stmt)))))
      }
      Some(_) => Err(self.error_at(decl_start, "Unexpected export")),
    }
  }

  fn parse_export_default(&mut self) -> Result<Option<Stmt>, TranspileError> {
    if self.is_word("function") {
      return Ok(
        self
          .parse_function_decl_named(false, false)?
          .map(|f| Stmt::Export(ExportDecl::DefaultFunction(f))),
      );
    }
    if self.is_word("async") {
      let next = self.peek()?;
      if self.token_is_word(next, "function") && !next.nl_before {
        self.advance()?;
        return Ok(
          self
            .parse_function_decl_named(true, false)?
            .map(|f| Stmt::Export(ExportDecl::DefaultFunction(f))),
        );
      }
    }
    if self.is_word("abstract") {
      let next = self.peek()?;
      if self.token_is_word(next, "class") {
        self.advance()?;
      }
    }
    if self.is_word("class") {
      return Ok(Some(Stmt::Export(ExportDecl::DefaultClass(self.parse_class(false)?))));
    }
    if self.is_word("interface") {
      let next = self.peek()?;
      if next.kind == TokenKind::Ident {
        self.skip_interface()?;
        return Ok(None);
      }
    }
    let expr = self.parse_assign(false)?;
    self.semicolon()?;
    Ok(Some(Stmt::Export(ExportDecl::Default(expr))))
  }

  fn parse_export_list(&mut self) -> Result<(Vec<ExportSpecifier>, Option<String>), TranspileError> {
    let mut specifiers = Vec::new();
    if self.eat("*")? {
      // `export type * from "x"`
      if self.eat_word("as")? {
        self.module_export_name()?;
      }
    } else {
      self.expect("{")?;
      while !self.is("}") {
        let type_only = self.type_modifier_follows()?;
        if type_only {
          self.advance()?;
        }
        let local = self.module_export_name()?;
        let exported = if self.eat_word("as")? {
          self.module_export_name()?
        } else {
          local.clone()
        };
        if !type_only {
          specifiers.push(ExportSpecifier { local, exported });
        }
        if !self.is("}") {
          self.expect(",")?;
        }
      }
      self.expect("}")?;
    }
    let source = if self.eat_word("from")? {
      Some(self.parse_module_source()?)
    } else {
      self.semicolon()?;
      None
    };
    Ok((specifiers, source))
  }

  // =========================================================================
  // Functions and classes
  // =========================================================================

  /// `function` declaration at the current token. `None` for a body-less
  /// overload signature.
  fn parse_function_decl(&mut self, is_async: bool) -> Result<Option<Function>, TranspileError> {
    self.parse_function_decl_named(is_async, true)
  }

  fn parse_function_decl_named(&mut self, is_async: bool, require_name: bool) -> Result<Option<Function>, TranspileError> {
    self.expect_word("function")?;
    let is_generator = self.eat("*")?;
    let name = if self.tok.kind == TokenKind::Ident {
      Some(self.binding_ident()?)
    } else if require_name {
      return Err(self.unexpected());
    } else {
      None
    };
    self.parse_function_rest(name, is_async, is_generator)
  }

  fn parse_function_expr(&mut self, is_async: bool) -> Result<Expr, TranspileError> {
    self.expect_word("function")?;
    let is_generator = self.eat("*")?;
    let name = if self.tok.kind == TokenKind::Ident {
      Some(self.binding_ident()?)
    } else {
      None
    };
    match self.parse_function_rest(name, is_async, is_generator)? {
      Some(func) => Ok(Expr::Function(Box::new(func))),
      None => Err(self.error_at(self.prev_end, "Function expression requires a body")),
    }
  }

  /// Everything after the function name: type parameters, parameters,
  /// return type and body.
  pub(super) fn parse_function_rest(
    &mut self,
    name: Option<String>,
    is_async: bool,
    is_generator: bool,
  ) -> Result<Option<Function>, TranspileError> {
    if self.is("<") {
      self.skip_type_params()?;
    }
    let params = self.parse_params()?;
    if self.is(":") {
      self.skip_return_type()?;
    }
    if !self.is("{") {
      self.semicolon()?;
      return Ok(None);
    }
    let body = self.parse_function_body(is_generator)?;
    Ok(Some(Function {
      name,
      params,
      body,
      is_async,
      is_generator,
    }))
  }

  fn parse_function_body(&mut self, is_generator: bool) -> Result<Vec<Stmt>, TranspileError> {
    let saved = self.in_generator;
    self.in_generator = is_generator;
    let body = self.parse_block();
    self.in_generator = saved;
    body
  }

  pub(super) fn parse_params(&mut self) -> Result<Vec<Param>, TranspileError> {
    self.expect("(")?;
    let mut params = Vec::new();
    while !self.is(")") {
      if self.is("@") {
        return Err(self.error_here("Decorators are not supported"));
      }

      let mut this_property = false;
      while self.tok.kind == TokenKind::Ident && PARAM_MODIFIERS.contains(&self.text()) {
        let next = self.peek()?;
        if next.kind == TokenKind::Ident || self.token_is(next, "{") || self.token_is(next, "[") {
          self.advance()?;
          this_property = true;
        } else {
          break;
        }
      }

      // `this` parameters only carry a type.
      if self.is_word("this") {
        self.advance()?;
        if self.is(":") {
          self.skip_type_annotation()?;
        }
        if !self.is(")") {
          self.expect(",")?;
        }
        continue;
      }

      let pat = if self.eat("...")? {
        Pat::Rest(Box::new(self.parse_binding_target()?))
      } else {
        self.parse_binding_target()?
      };
      self.eat("?")?;
      if self.is(":") {
        self.skip_type_annotation()?;
      }
      let pat = if self.eat("=")? {
        Pat::Assign(Box::new(pat), Box::new(self.parse_assign(false)?))
      } else {
        pat
      };
      params.push(Param { pat, this_property });
      if !self.is(")") {
        self.expect(",")?;
      }
    }
    self.expect(")")?;
    Ok(params)
  }

  pub(super) fn parse_class(&mut self, require_name: bool) -> Result<Class, TranspileError> {
    self.expect_word("class")?;
    let name = if self.tok.kind == TokenKind::Ident && !self.is_word("extends") && !self.is_word("implements") {
      Some(self.binding_ident()?)
    } else if require_name {
      return Err(self.unexpected());
    } else {
      None
    };
    if self.is("<") {
      self.skip_type_params()?;
    }
    let super_class = if self.eat_word("extends")? {
      let base = self.parse_lhs()?;
      if self.is("<") {
        self.skip_type_params()?;
      }
      Some(Box::new(base))
    } else {
      None
    };
    if self.eat_word("implements")? {
      loop {
        self.skip_type()?;
        if !self.eat(",")? {
          break;
        }
      }
    }

    self.expect("{")?;
    let mut members = Vec::new();
    while !self.is("}") {
      if self.tok.kind == TokenKind::Eof {
        return Err(self.unexpected());
      }
      if let Some(member) = self.parse_class_member()? {
        members.push(member);
      }
    }
    self.expect("}")?;
    Ok(Class {
      name,
      super_class,
      members,
    })
  }

  fn parse_class_member(&mut self) -> Result<Option<ClassMember>, TranspileError> {
    if self.eat(";")? {
      return Ok(None);
    }
    if self.is("@") {
      return Err(self.error_here("Decorators are not supported"));
    }

    let mut is_static = false;
    let mut ambient = false;
    let mut is_async = false;
    let mut kind = MethodKind::Method;
    while self.tok.kind == TokenKind::Ident && CLASS_MODIFIERS.contains(&self.text()) {
      let word = self.text();
      let next = self.peek()?;
      let next_text = self.tok_text(next);
      if word == "static" && self.token_is(next, "{") {
        self.advance()?;
        return Ok(Some(ClassMember::StaticBlock(self.parse_block()?)));
      }
      let names_member = matches!(next.kind, TokenKind::Ident | TokenKind::Str | TokenKind::Num)
        || (next.kind == TokenKind::Punct && matches!(next_text, "[" | "*"));
      if !names_member || (word == "async" && next.nl_before) {
        break;
      }
      self.advance()?;
      match word {
        "static" => is_static = true,
        "abstract" | "declare" => ambient = true,
        "async" => is_async = true,
        "get" => kind = MethodKind::Get,
        "set" => kind = MethodKind::Set,
        _ => {}
      }
    }
    let is_generator = self.eat("*")?;

    // Index signature: `[key: string]: T;`
    if self.is("[") {
      let is_index = self
        .speculate(|p| {
          p.advance()?;
          if p.tok.kind == TokenKind::Ident {
            p.advance()?;
            if p.is(":") {
              return Ok(Some(()));
            }
          }
          Ok(None)
        })
        .is_some();
      if is_index {
        self.skip_type_annotation()?;
        self.expect("]")?;
        if self.is(":") {
          self.skip_type_annotation()?;
        }
        self.semicolon()?;
        return Ok(None);
      }
    }

    let key = self.parse_prop_key()?;
    let is_constructor = !is_static
      && match &key {
        PropKey::Ident(name) => name == "constructor",
        PropKey::Str(raw) => unquote(raw) == "constructor",
        _ => false,
      };
    self.eat("?")?;
    self.eat("!")?;

    if self.is("(") || self.is("<") {
      let kind = if is_constructor { MethodKind::Constructor } else { kind };
      let func = self.parse_function_rest(None, is_async, is_generator)?;
      return Ok(func.filter(|_| !ambient).map(|func| ClassMember::Method {
        key,
        kind,
        func,
        is_static,
      }));
    }

    if self.is(":") {
      self.skip_type_annotation()?;
    }
    let value = if self.eat("=")? {
      Some(self.parse_assign(false)?)
    } else {
      None
    };
    self.semicolon()?;
    if ambient {
      return Ok(None);
    }
    Ok(Some(ClassMember::Field { key, value, is_static }))
  }

  // =========================================================================
  // Patterns
  // =========================================================================

  pub(super) fn parse_binding_target(&mut self) -> Result<Pat, TranspileError> {
    if self.is("[") {
      return self.nested(Self::parse_array_pattern);
    }
    if self.is("{") {
      return self.nested(Self::parse_object_pattern);
    }
    Ok(Pat::Ident(self.binding_ident()?))
  }

  fn parse_binding_element(&mut self) -> Result<Pat, TranspileError> {
    let target = self.parse_binding_target()?;
    if self.eat("=")? {
      return Ok(Pat::Assign(Box::new(target), Box::new(self.parse_assign(false)?)));
    }
    Ok(target)
  }

  fn parse_array_pattern(&mut self) -> Result<Pat, TranspileError> {
    self.expect("[")?;
    let mut items = Vec::new();
    while !self.is("]") {
      if self.eat(",")? {
        items.push(None);
        continue;
      }
      let item = if self.eat("...")? {
        Pat::Rest(Box::new(self.parse_binding_target()?))
      } else {
        self.parse_binding_element()?
      };
      items.push(Some(item));
      if !self.is("]") {
        self.expect(",")?;
      }
    }
    self.expect("]")?;
    Ok(Pat::Array(items))
  }

  fn parse_object_pattern(&mut self) -> Result<Pat, TranspileError> {
    self.expect("{")?;
    let mut props = Vec::new();
    while !self.is("}") {
      if self.eat("...")? {
        props.push(ObjectPatProp::Rest(self.parse_binding_target()?));
      } else {
        let key_start = self.tok.start;
        let key = self.parse_prop_key()?;
        if self.eat(":")? {
          props.push(ObjectPatProp::KeyValue(key, self.parse_binding_element()?));
        } else {
          let PropKey::Ident(name) = key else {
            return Err(self.error_at(key_start, "Unexpected token"));
          };
          if is_reserved(&name) {
            return Err(self.error_at(key_start, format!("Unexpected keyword '{name}'")));
          }
          let default = if self.eat("=")? {
            Some(self.parse_assign(false)?)
          } else {
            None
          };
          props.push(ObjectPatProp::Shorthand(name, default));
        }
      }
      if !self.is("}") {
        self.expect(",")?;
      }
    }
    self.expect("}")?;
    Ok(Pat::Object(props))
  }

  /// Reinterpret an already-parsed expression as an assignment target.
  fn expr_to_pat(&self, expr: Expr, destructure: bool, pos: usize) -> Result<Pat, TranspileError> {
    let invalid = || self.error_at(pos, "Invalid left-hand side in assignment expression");
    match expr {
      Expr::Ident(name) => Ok(Pat::Ident(name)),
      member @ Expr::Member { .. } => Ok(Pat::Expr(Box::new(member))),
      Expr::Paren(inner) => match *inner {
        inner @ (Expr::Ident(_) | Expr::Member { .. }) => self.expr_to_pat(inner, false, pos),
        _ => Err(invalid()),
      },
      Expr::Object(props) if destructure => {
        let mut out = Vec::with_capacity(props.len());
        for prop in props {
          out.push(match prop {
            Prop::KeyValue(key, value) => ObjectPatProp::KeyValue(key, self.expr_to_pat(value, true, pos)?),
            Prop::Shorthand(name) => ObjectPatProp::Shorthand(name, None),
            Prop::ShorthandDefault(name, value) => ObjectPatProp::Shorthand(name, Some(value)),
            Prop::Spread(value) => ObjectPatProp::Rest(self.expr_to_pat(value, true, pos)?),
            Prop::Method { .. } => return Err(invalid()),
          });
        }
        Ok(Pat::Object(out))
      }
      Expr::Array(items) if destructure => {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
          out.push(match item {
            None => None,
            Some(Expr::Spread(inner)) => Some(Pat::Rest(Box::new(self.expr_to_pat(*inner, true, pos)?))),
            Some(item) => Some(self.expr_to_pat(item, true, pos)?),
          });
        }
        Ok(Pat::Array(out))
      }
      Expr::Assign { op, target, value } if destructure && op == "=" => Ok(Pat::Assign(target, value)),
      _ => Err(invalid()),
    }
  }

  // =========================================================================
  // Expressions
  // =========================================================================

  pub(super) fn parse_expression(&mut self, no_in: bool) -> Result<Expr, TranspileError> {
    let first = self.parse_assign(no_in)?;
    if !self.is(",") {
      return Ok(first);
    }
    let mut items = vec![first];
    while self.eat(",")? {
      items.push(self.parse_assign(no_in)?);
    }
    Ok(Expr::Seq(items))
  }

  pub(super) fn parse_assign(&mut self, no_in: bool) -> Result<Expr, TranspileError> {
    self.nested(|p| p.parse_assign_at_depth(no_in))
  }

  fn parse_assign_at_depth(&mut self, no_in: bool) -> Result<Expr, TranspileError> {
    if let Some(arrow) = self.try_arrow(no_in)? {
      return Ok(arrow);
    }
    if self.in_generator && self.is_word("yield") {
      return self.parse_yield(no_in);
    }

    let start = self.tok.start;
    let left = self.parse_conditional(no_in)?;
    if self.tok.kind == TokenKind::Punct && is_assign_op(self.text()) {
      let op = self.advance_text()?.to_string();
      let target = self.expr_to_pat(left, op == "=", start)?;
      let value = self.parse_assign(no_in)?;
      return Ok(Expr::Assign {
        op,
        target: Box::new(target),
        value: Box::new(value),
      });
    }
    Ok(left)
  }

  fn parse_yield(&mut self, no_in: bool) -> Result<Expr, TranspileError> {
    self.advance()?;
    let delegate = !self.tok.nl_before && self.eat("*")?;
    let ends = self.tok.nl_before
      || self.tok.kind == TokenKind::Eof
      || (self.tok.kind == TokenKind::Punct && matches!(self.text(), ")" | "]" | "}" | "," | ";" | ":"));
    let arg = if ends && !delegate {
      None
    } else {
      Some(Box::new(self.parse_assign(no_in)?))
    };
    Ok(Expr::Yield { arg, delegate })
  }

  fn try_arrow(&mut self, no_in: bool) -> Result<Option<Expr>, TranspileError> {
    if self.is_word("async") {
      let next = self.peek()?;
      if next.nl_before {
        return Ok(None);
      }
      if self.starts_with_ident(next) {
        let params = self.speculate(|p| {
          p.advance()?;
          let name = p.binding_ident()?;
          if p.is("=>") && !p.tok.nl_before {
            return Ok(Some(vec![Param {
              pat: Pat::Ident(name),
              this_property: false,
            }]));
          }
          Ok(None)
        });
        return match params {
          Some(params) => self.finish_arrow(params, true, no_in).map(Some),
          None => Ok(None),
        };
      }
      if self.token_is(next, "(") || self.token_is(next, "<") {
        let params = self.speculate(|p| {
          p.advance()?;
          p.arrow_head()
        });
        if let Some(params) = params {
          return self.finish_arrow(params, true, no_in).map(Some);
        }
      }
      return Ok(None);
    }

    if self.tok.kind == TokenKind::Ident && !is_reserved(self.text()) && !self.text().starts_with('#') {
      let next = self.peek()?;
      if self.token_is(next, "=>") && !next.nl_before {
        let name = self.binding_ident()?;
        let params = vec![Param {
          pat: Pat::Ident(name),
          this_property: false,
        }];
        return self.finish_arrow(params, false, no_in).map(Some);
      }
      return Ok(None);
    }

    if self.is("(") || self.is("<") {
      if let Some(params) = self.speculate(|p| p.arrow_head()) {
        return self.finish_arrow(params, false, no_in).map(Some);
      }
    }
    Ok(None)
  }

  /// `<T>(a: T): R =>` up to, not including, the arrow.
  fn arrow_head(&mut self) -> Result<Option<Vec<Param>>, TranspileError> {
    if self.is("<") {
      self.skip_type_params()?;
    }
    if !self.is("(") {
      return Ok(None);
    }
    let params = self.parse_params()?;
    if self.is(":") {
      self.skip_return_type()?;
    }
    if self.is("=>") && !self.tok.nl_before {
      return Ok(Some(params));
    }
    Ok(None)
  }

  fn finish_arrow(&mut self, params: Vec<Param>, is_async: bool, no_in: bool) -> Result<Expr, TranspileError> {
    self.expect("=>")?;
    let body = if self.is("{") {
      ArrowBody::Block(self.parse_function_body(false)?)
    } else {
      let saved = self.in_generator;
      self.in_generator = false;
      let body = self.parse_assign(no_in);
      self.in_generator = saved;
      ArrowBody::Expr(Box::new(body?))
    };
    Ok(Expr::Arrow(Box::new(Arrow { params, body, is_async })))
  }

  fn parse_conditional(&mut self, no_in: bool) -> Result<Expr, TranspileError> {
    let test = self.parse_binary(0, no_in)?;
    if !self.eat("?")? {
      return Ok(test);
    }
    let cons = self.parse_assign(false)?;
    self.expect(":")?;
    let alt = self.parse_assign(no_in)?;
    Ok(Expr::Cond {
      test: Box::new(test),
      cons: Box::new(cons),
      alt: Box::new(alt),
    })
  }

  fn binary_prec(&self, no_in: bool) -> Option<u8> {
    match self.tok.kind {
      TokenKind::Punct => binary_precedence(self.text()),
      TokenKind::Ident => match self.text() {
        "instanceof" => Some(8),
        "in" if !no_in => Some(8),
        "as" | "satisfies" if !self.tok.nl_before => Some(8),
        _ => None,
      },
      _ => None,
    }
  }

  fn parse_binary(&mut self, min_prec: u8, no_in: bool) -> Result<Expr, TranspileError> {
    let mut left = self.parse_unary()?;
    loop {
      let Some(prec) = self.binary_prec(no_in) else {
        break;
      };
      if prec <= min_prec {
        break;
      }
      if self.is_word("as") || self.is_word("satisfies") {
        self.advance()?;
        if !self.eat_word("const")? {
          self.skip_type()?;
        }
        continue;
      }
      let op = self.advance_text()?.to_string();
      let right = if op == "**" {
        self.nested(|p| p.parse_binary(prec - 1, no_in))?
      } else {
        self.nested(|p| p.parse_binary(prec, no_in))?
      };
      left = Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
      };
    }
    Ok(left)
  }

  fn parse_unary(&mut self) -> Result<Expr, TranspileError> {
    match self.tok.kind {
      TokenKind::Punct => match self.text() {
        "!" | "~" | "+" | "-" => {
          let op = self.advance_text()?.to_string();
          let arg = self.nested(Self::parse_unary)?;
          return Ok(Expr::Unary { op, arg: Box::new(arg) });
        }
        "++" | "--" => {
          let op = self.advance_text()?.to_string();
          let arg = self.nested(Self::parse_unary)?;
          return Ok(Expr::Update {
            op,
            prefix: true,
            arg: Box::new(arg),
          });
        }
        _ => {}
      },
      TokenKind::Ident => match self.text() {
        "typeof" | "void" | "delete" => {
          let op = self.advance_text()?.to_string();
          let arg = self.nested(Self::parse_unary)?;
          return Ok(Expr::Unary { op, arg: Box::new(arg) });
        }
        "await" => {
          let next = self.peek()?;
          let operand_follows = match next.kind {
            TokenKind::Eof => false,
            TokenKind::Punct => !matches!(
              self.tok_text(next),
              ")" | "]" | "}" | "," | ";" | ":" | "=" | "." | "?." | "=>" | "?"
            ),
            _ => true,
          };
          if operand_follows {
            self.advance()?;
            let arg = self.nested(Self::parse_unary)?;
            return Ok(Expr::Await(Box::new(arg)));
          }
        }
        _ => {}
      },
      _ => {}
    }

    let expr = self.parse_lhs()?;
    if (self.is("++") || self.is("--")) && !self.tok.nl_before {
      let op = self.advance_text()?.to_string();
      return Ok(Expr::Update {
        op,
        prefix: false,
        arg: Box::new(expr),
      });
    }
    Ok(expr)
  }

  /// Left-hand-side expression: primary followed by member accesses,
  /// calls and tagged templates.
  pub(super) fn parse_lhs(&mut self) -> Result<Expr, TranspileError> {
    let expr = if self.is_word("new") {
      self.parse_new()?
    } else {
      self.parse_primary()?
    };
    self.parse_chain(expr, true)
  }

  fn parse_chain(&mut self, mut expr: Expr, allow_call: bool) -> Result<Expr, TranspileError> {
    loop {
      match self.tok.kind {
        TokenKind::Template => {
          expr = self.parse_template(Some(expr))?;
        }
        TokenKind::Punct => match self.text() {
          "." => {
            self.advance()?;
            expr = Expr::Member {
              object: Box::new(expr),
              prop: self.member_name()?,
              optional: false,
            };
          }
          "?." => {
            self.advance()?;
            if self.is("<") {
              self.skip_type_params()?;
            }
            if self.is("(") {
              let args = self.parse_args()?;
              expr = Expr::Call {
                callee: Box::new(expr),
                args,
                optional: true,
              };
            } else if self.eat("[")? {
              let prop = self.parse_expression(false)?;
              self.expect("]")?;
              expr = Expr::Member {
                object: Box::new(expr),
                prop: MemberProp::Computed(Box::new(prop)),
                optional: true,
              };
            } else {
              expr = Expr::Member {
                object: Box::new(expr),
                prop: self.member_name()?,
                optional: true,
              };
            }
          }
          "[" => {
            self.advance()?;
            let prop = self.parse_expression(false)?;
            self.expect("]")?;
            expr = Expr::Member {
              object: Box::new(expr),
              prop: MemberProp::Computed(Box::new(prop)),
              optional: false,
            };
          }
          "(" if allow_call => {
            let args = self.parse_args()?;
            expr = Expr::Call {
              callee: Box::new(expr),
              args,
              optional: false,
            };
          }
          // Non-null assertion.
          "!" if !self.tok.nl_before => {
            self.advance()?;
          }
          "<" => {
            if self.speculate(|p| p.call_type_args()).is_none() {
              break;
            }
          }
          _ => break,
        },
        _ => break,
      }
    }
    Ok(expr)
  }

  fn member_name(&mut self) -> Result<MemberProp, TranspileError> {
    if self.tok.kind != TokenKind::Ident {
      return Err(self.unexpected());
    }
    let name = self.advance_text()?;
    Ok(match name.strip_prefix('#') {
      Some(private) => MemberProp::Private(private.to_string()),
      None => MemberProp::Ident(name.to_string()),
    })
  }

  fn parse_new(&mut self) -> Result<Expr, TranspileError> {
    self.expect_word("new")?;
    if self.eat(".")? {
      self.expect_word("target")?;
      return Ok(Expr::NewTarget);
    }
    let callee = if self.is_word("new") {
      self.nested(Self::parse_new)?
    } else {
      self.parse_primary()?
    };
    let callee = self.parse_chain(callee, false)?;
    let args = if self.is("(") { self.parse_args()? } else { Vec::new() };
    Ok(Expr::New {
      callee: Box::new(callee),
      args,
    })
  }

  pub(super) fn parse_args(&mut self) -> Result<Vec<Expr>, TranspileError> {
    self.expect("(")?;
    let mut args = Vec::new();
    while !self.is(")") {
      let arg = if self.eat("...")? {
        Expr::Spread(Box::new(self.parse_assign(false)?))
      } else {
        self.parse_assign(false)?
      };
      args.push(arg);
      if !self.is(")") {
        self.expect(",")?;
      }
    }
    self.expect(")")?;
    Ok(args)
  }

  fn parse_primary(&mut self) -> Result<Expr, TranspileError> {
    match self.tok.kind {
      TokenKind::Num | TokenKind::Str | TokenKind::Regex => Ok(Expr::Lit(self.advance_text()?.to_string())),
      TokenKind::Template => self.parse_template(None),
      TokenKind::Punct => match self.text() {
        "(" => {
          self.advance()?;
          let expr = self.parse_expression(false)?;
          self.expect(")")?;
          Ok(Expr::Paren(Box::new(expr)))
        }
        "[" => self.parse_array_literal(),
        "{" => self.parse_object_literal(),
        "/" | "/=" => {
          self.tok = self.lexer.regex_at(self.tok.start, self.tok.nl_before)?;
          Ok(Expr::Lit(self.advance_text()?.to_string()))
        }
        "<" => self.parse_jsx_element(),
        "@" => Err(self.error_here("Decorators are not supported")),
        _ => Err(self.unexpected()),
      },
      TokenKind::Ident => {
        let word = self.text();
        match word {
          "this" => {
            self.advance()?;
            Ok(Expr::This)
          }
          "super" => {
            self.advance()?;
            Ok(Expr::Super)
          }
          "null" | "true" | "false" => Ok(Expr::Lit(self.advance_text()?.to_string())),
          "function" => self.parse_function_expr(false),
          "class" => Ok(Expr::Class(Box::new(self.parse_class(false)?))),
          "new" => self.parse_new(),
          "import" => self.parse_dynamic_import(),
          "async" => {
            let next = self.peek()?;
            if self.token_is_word(next, "function") && !next.nl_before {
              self.advance()?;
              return self.parse_function_expr(true);
            }
            self.advance()?;
            self.value_refs.insert(word.to_string());
            Ok(Expr::Ident(word.to_string()))
          }
          _ if word.starts_with('#') || is_reserved(word) => Err(self.unexpected()),
          _ => {
            self.advance()?;
            self.value_refs.insert(word.to_string());
            Ok(Expr::Ident(word.to_string()))
          }
        }
      }
      TokenKind::Eof => Err(self.unexpected()),
    }
  }

  /// `import(x)` becomes `Promise.resolve().then(() => require(x))`.
  fn parse_dynamic_import(&mut self) -> Result<Expr, TranspileError> {
    let start = self.tok.start;
    self.expect_word("import")?;
    if self.is(".") {
      return Err(self.error_at(start, "`import.meta` is not supported"));
    }
    let mut args = self.parse_args()?;
    if args.len() != 1 {
      return Err(self.error_at(start, "`import()` requires exactly one argument"));
    }
    let specifier = args.remove(0);
    let load = Expr::Arrow(Box::new(Arrow {
      params: Vec::new(),
      body: ArrowBody::Expr(Box::new(call(ident("require"), vec![specifier]))),
      is_async: false,
    }));
    let resolved = call(member(ident("Promise"), "resolve"), Vec::new());
    Ok(call(member(resolved, "then"), vec![load]))
  }

  fn parse_array_literal(&mut self) -> Result<Expr, TranspileError> {
    self.expect("[")?;
    let mut items = Vec::new();
    while !self.is("]") {
      if self.eat(",")? {
        items.push(None);
        continue;
      }
      let item = if self.eat("...")? {
        Expr::Spread(Box::new(self.parse_assign(false)?))
      } else {
        self.parse_assign(false)?
      };
      items.push(Some(item));
      if !self.is("]") {
        self.expect(",")?;
      }
    }
    self.expect("]")?;
    Ok(Expr::Array(items))
  }

  fn parse_object_literal(&mut self) -> Result<Expr, TranspileError> {
    self.expect("{")?;
    let mut props = Vec::new();
    while !self.is("}") {
      props.push(self.parse_object_prop()?);
      if !self.is("}") {
        self.expect(",")?;
      }
    }
    self.expect("}")?;
    Ok(Expr::Object(props))
  }

  fn parse_object_prop(&mut self) -> Result<Prop, TranspileError> {
    if self.eat("...")? {
      return Ok(Prop::Spread(self.parse_assign(false)?));
    }

    let mut is_async = false;
    let mut kind = MethodKind::Method;
    if self.tok.kind == TokenKind::Ident && matches!(self.text(), "async" | "get" | "set") {
      let next = self.peek()?;
      let names_prop = matches!(next.kind, TokenKind::Ident | TokenKind::Str | TokenKind::Num)
        || self.token_is(next, "[")
        || self.token_is(next, "*");
      if names_prop && !(self.is_word("async") && next.nl_before) {
        match self.advance_text()? {
          "async" => is_async = true,
          "get" => kind = MethodKind::Get,
          _ => kind = MethodKind::Set,
        }
      }
    }
    let is_generator = self.eat("*")?;

    let key_start = self.tok.start;
    let key = self.parse_prop_key()?;
    if self.is("(") || self.is("<") {
      let Some(func) = self.parse_function_rest(None, is_async, is_generator)? else {
        return Err(self.error_at(self.prev_end, "Method requires a body"));
      };
      return Ok(Prop::Method { key, kind, func });
    }
    if is_async || is_generator || kind != MethodKind::Method {
      return Err(self.unexpected());
    }
    if self.eat(":")? {
      return Ok(Prop::KeyValue(key, self.parse_assign(false)?));
    }

    let PropKey::Ident(name) = key else {
      return Err(self.unexpected());
    };
    if is_reserved(&name) {
      return Err(self.error_at(key_start, format!("Unexpected keyword '{name}'")));
    }
    self.value_refs.insert(name.clone());
    if self.eat("=")? {
      return Ok(Prop::ShorthandDefault(name, self.parse_assign(false)?));
    }
    Ok(Prop::Shorthand(name))
  }

  pub(super) fn parse_prop_key(&mut self) -> Result<PropKey, TranspileError> {
    match self.tok.kind {
      TokenKind::Ident => {
        let name = self.advance_text()?;
        Ok(match name.strip_prefix('#') {
          Some(private) => PropKey::Private(private.to_string()),
          None => PropKey::Ident(name.to_string()),
        })
      }
      TokenKind::Str => Ok(PropKey::Str(self.advance_text()?.to_string())),
      TokenKind::Num => Ok(PropKey::Num(self.advance_text()?.to_string())),
      TokenKind::Punct if self.is("[") => {
        self.advance()?;
        let key = self.parse_assign(false)?;
        self.expect("]")?;
        Ok(PropKey::Computed(Box::new(key)))
      }
      _ => Err(self.unexpected()),
    }
  }

  fn parse_template(&mut self, tag: Option<Expr>) -> Result<Expr, TranspileError> {
    let mut quasis = Vec::new();
    let mut exprs = Vec::new();
    let start = self.tok.start;
    loop {
      let chunk = self.tok;
      let text = self.tok_text(chunk);
      let close = if chunk.tail { 1 } else { 2 };
      quasis.push(text[1..text.len() - close].to_string());
      self.advance()?;
      if chunk.tail {
        break;
      }
      exprs.push(self.parse_expression(false)?);
      if !self.is("}") {
        return Err(self.error_at(start, "Unterminated template"));
      }
      self.tok = self.lexer.template_continue_at(self.tok.start)?;
    }
    Ok(Expr::Template {
      tag: tag.map(Box::new),
      quasis,
      exprs,
    })
  }
}

pub fn binary_precedence(op: &str) -> Option<u8> {
  Some(match op {
    "??" => 1,
    "||" => 2,
    "&&" => 3,
    "|" => 4,
    "^" => 5,
    "&" => 6,
    "==" | "!=" | "===" | "!==" => 7,
    "<" | ">" | "<=" | ">=" | "instanceof" | "in" => 8,
    "<<" | ">>" | ">>>" => 9,
    "+" | "-" => 10,
    "*" | "/" | "%" => 11,
    "**" => 12,
    _ => return None,
  })
}

fn is_assign_op(op: &str) -> bool {
  matches!(
    op,
    "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "**=" | "<<=" | ">>=" | ">>>=" | "&=" | "|=" | "^=" | "&&=" | "||=" | "??="
  )
}
