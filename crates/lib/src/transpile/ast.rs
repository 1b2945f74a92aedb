//! Syntax tree for the JavaScript subset produced after type erasure.
//!
//! TypeScript-only syntax never reaches this tree: the parser skips type
//! annotations, declarations and assertions, and lowers JSX to
//! `React.createElement` calls while parsing. Literals keep their raw source
//! text so that output preserves the author's spelling.

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
  Expr(Expr),
  Var(VarDecl),
  Function(Function),
  Class(Class),
  Return(Option<Expr>),
  If {
    test: Expr,
    cons: Box<Stmt>,
    alt: Option<Box<Stmt>>,
  },
  Block(Vec<Stmt>),
  For {
    init: Option<ForInit>,
    test: Option<Expr>,
    update: Option<Expr>,
    body: Box<Stmt>,
  },
  ForIn {
    left: ForInit,
    right: Expr,
    kind: ForInKind,
    body: Box<Stmt>,
  },
  While {
    test: Expr,
    body: Box<Stmt>,
  },
  DoWhile {
    body: Box<Stmt>,
    test: Expr,
  },
  Break(Option<String>),
  Continue(Option<String>),
  Throw(Expr),
  Try {
    block: Vec<Stmt>,
    param: Option<Pat>,
    handler: Option<Vec<Stmt>>,
    finalizer: Option<Vec<Stmt>>,
  },
  Switch {
    discriminant: Expr,
    cases: Vec<SwitchCase>,
  },
  Labeled {
    label: String,
    body: Box<Stmt>,
  },
  Empty,
  Debugger,
  Enum(Enum),
  Import(ImportDecl),
  Export(ExportDecl),
  /// Pre-rendered statement text emitted by module lowering.
  Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
  Var(VarDecl),
  Expr(Expr),
  Pat(Pat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForInKind {
  In,
  Of,
  AwaitOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
  Var,
  Let,
  Const,
}

impl VarKind {
  pub fn as_str(self) -> &'static str {
    match self {
      VarKind::Var => "var",
      VarKind::Let => "let",
      VarKind::Const => "const",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
  pub kind: VarKind,
  pub decls: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
  pub target: Pat,
  pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
  /// `None` for `default:`.
  pub test: Option<Expr>,
  pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
  pub name: Option<String>,
  pub params: Vec<Param>,
  pub body: Vec<Stmt>,
  pub is_async: bool,
  pub is_generator: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
  pub pat: Pat,
  /// Constructor parameter property (`constructor(private x: T)`).
  pub this_property: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
  pub params: Vec<Param>,
  pub body: ArrowBody,
  pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
  Expr(Box<Expr>),
  Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
  pub name: Option<String>,
  pub super_class: Option<Box<Expr>>,
  pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
  Method {
    key: PropKey,
    kind: MethodKind,
    func: Function,
    is_static: bool,
  },
  Field {
    key: PropKey,
    value: Option<Expr>,
    is_static: bool,
  },
  StaticBlock(Vec<Stmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
  Method,
  Get,
  Set,
  Constructor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
  Ident(String),
  /// Raw string literal, quotes included.
  Str(String),
  Num(String),
  Computed(Box<Expr>),
  /// Private name without the leading `#`.
  Private(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
  KeyValue(PropKey, Expr),
  Shorthand(String),
  /// `{ a = 1 }`, only meaningful once converted to a pattern.
  ShorthandDefault(String, Expr),
  Method {
    key: PropKey,
    kind: MethodKind,
    func: Function,
  },
  Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
  Ident(String),
  Private(String),
  Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Ident(String),
  /// Raw literal text: numbers, strings, regexes, `true`, `false`, `null`.
  Lit(String),
  Template {
    tag: Option<Box<Expr>>,
    /// Raw text between delimiters.
    quasis: Vec<String>,
    exprs: Vec<Expr>,
  },
  Array(Vec<Option<Expr>>),
  Object(Vec<Prop>),
  Function(Box<Function>),
  Arrow(Box<Arrow>),
  Class(Box<Class>),
  Unary {
    op: String,
    arg: Box<Expr>,
  },
  Update {
    op: String,
    prefix: bool,
    arg: Box<Expr>,
  },
  Binary {
    op: String,
    left: Box<Expr>,
    right: Box<Expr>,
  },
  Assign {
    op: String,
    target: Box<Pat>,
    value: Box<Expr>,
  },
  Cond {
    test: Box<Expr>,
    cons: Box<Expr>,
    alt: Box<Expr>,
  },
  Call {
    callee: Box<Expr>,
    args: Vec<Expr>,
    optional: bool,
  },
  New {
    callee: Box<Expr>,
    args: Vec<Expr>,
  },
  Member {
    object: Box<Expr>,
    prop: MemberProp,
    optional: bool,
  },
  Seq(Vec<Expr>),
  Spread(Box<Expr>),
  Yield {
    arg: Option<Box<Expr>>,
    delegate: bool,
  },
  Await(Box<Expr>),
  Paren(Box<Expr>),
  This,
  Super,
  /// `new.target`
  NewTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pat {
  Ident(String),
  Object(Vec<ObjectPatProp>),
  Array(Vec<Option<Pat>>),
  Assign(Box<Pat>, Box<Expr>),
  Rest(Box<Pat>),
  /// Member-expression assignment target.
  Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectPatProp {
  KeyValue(PropKey, Pat),
  Shorthand(String, Option<Expr>),
  Rest(Pat),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enum {
  pub name: String,
  pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
  pub name: String,
  pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
  /// Module name with quotes removed.
  pub source: String,
  pub default: Option<String>,
  pub namespace: Option<String>,
  pub named: Vec<ImportSpecifier>,
  /// `import type ...`
  pub type_only: bool,
}

impl ImportDecl {
  pub fn has_bindings(&self) -> bool {
    self.default.is_some() || self.namespace.is_some() || !self.named.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpecifier {
  pub imported: String,
  pub local: String,
  /// `import { type X }`
  pub type_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportDecl {
  Default(Expr),
  DefaultFunction(Function),
  DefaultClass(Class),
  /// `export const|let|var|function|class|enum ...`
  Decl(Box<Stmt>),
  Named {
    specifiers: Vec<ExportSpecifier>,
    source: Option<String>,
  },
  All {
    source: String,
    alias: Option<String>,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
  pub local: String,
  pub exported: String,
}

impl Pat {
  /// Names bound by this pattern, in source order.
  pub fn bound_names(&self, out: &mut Vec<String>) {
    match self {
      Pat::Ident(name) => out.push(name.clone()),
      Pat::Object(props) => {
        for prop in props {
          match prop {
            ObjectPatProp::KeyValue(_, pat) | ObjectPatProp::Rest(pat) => pat.bound_names(out),
            ObjectPatProp::Shorthand(name, _) => out.push(name.clone()),
          }
        }
      }
      Pat::Array(items) => {
        for pat in items.iter().flatten() {
          pat.bound_names(out);
        }
      }
      Pat::Assign(pat, _) | Pat::Rest(pat) => pat.bound_names(out),
      Pat::Expr(_) => {}
    }
  }
}

impl Stmt {
  /// Top-level value names this declaration introduces.
  pub fn declared_names(&self) -> Vec<String> {
    let mut out = Vec::new();
    match self {
      Stmt::Var(decl) => {
        for declarator in &decl.decls {
          declarator.target.bound_names(&mut out);
        }
      }
      Stmt::Function(Function { name: Some(name), .. }) | Stmt::Class(Class { name: Some(name), .. }) => {
        out.push(name.clone())
      }
      Stmt::Enum(decl) => out.push(decl.name.clone()),
      _ => {}
    }
    out
  }
}

/// Shorthand constructors used by lowering passes.
pub fn ident(name: &str) -> Expr {
  Expr::Ident(name.to_string())
}

pub fn member(object: Expr, prop: &str) -> Expr {
  Expr::Member {
    object: Box::new(object),
    prop: MemberProp::Ident(prop.to_string()),
    optional: false,
  }
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
  Expr::Call {
    callee: Box::new(callee),
    args,
    optional: false,
  }
}

pub fn string_lit(value: &str) -> Expr {
  Expr::Lit(quote(value))
}

/// Render `value` as a double-quoted JavaScript string literal.
pub fn quote(value: &str) -> String {
  let mut out = String::with_capacity(value.len() + 2);
  out.push('"');
  for c in value.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      '\u{2028}' => out.push_str("\\u2028"),
      '\u{2029}' => out.push_str("\\u2029"),
      c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
      c => out.push(c),
    }
  }
  out.push('"');
  out
}

/// Decode a raw string literal (quotes included) into its value.
pub fn unquote(raw: &str) -> String {
  let inner = raw.get(1..raw.len().saturating_sub(1)).unwrap_or_default();
  let mut out = String::with_capacity(inner.len());
  let mut chars = inner.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('n') => out.push('\n'),
      Some('r') => out.push('\r'),
      Some('t') => out.push('\t'),
      Some('0') => out.push('\0'),
      Some('\n') | None => {}
      Some(other) => out.push(other),
    }
  }
  out
}

pub fn is_identifier_name(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if super::lexer::is_ident_start(c) => chars.all(super::lexer::is_ident_part),
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quote_escapes_control_and_quote_characters() {
    assert_eq!(quote("a\"b\\c\nd"), r#""a\"b\\c\nd""#);
    assert_eq!(quote("\u{1}"), r#""\x01""#);
  }

  #[test]
  fn unquote_handles_both_quote_styles() {
    assert_eq!(unquote("'react-native'"), "react-native");
    assert_eq!(unquote(r#""it\'s""#), "it's");
  }

  #[test]
  fn bound_names_walk_nested_patterns() {
    let pat = Pat::Object(vec![
      ObjectPatProp::Shorthand("a".into(), None),
      ObjectPatProp::KeyValue(
        PropKey::Ident("b".into()),
        Pat::Array(vec![Some(Pat::Ident("c".into())), None, Some(Pat::Rest(Box::new(Pat::Ident("d".into()))))]),
      ),
    ]);
    let mut names = Vec::new();
    pat.bound_names(&mut names);
    assert_eq!(names, vec!["a", "c", "d"]);
  }
}
