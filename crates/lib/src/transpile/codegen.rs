//! Pretty-printer for the lowered syntax tree.
//!
//! Parentheses are derived from operator precedence, so synthesized nodes
//! never need to carry explicit grouping. Source-level parentheses survive as
//! `Expr::Paren`.

use std::borrow::Cow;

use super::ast::*;
use super::parser::binary_precedence;

const PREC_ASSIGN: u8 = 1;
const PREC_COND: u8 = 2;
const PREC_UNARY: u8 = 15;
const PREC_POSTFIX: u8 = 16;
const PREC_CALL: u8 = 17;
const PREC_PRIMARY: u8 = 18;

pub fn print(body: &[Stmt]) -> String {
  let mut printer = Printer::default();
  for stmt in body {
    printer.stmt_inline(stmt);
    printer.out.push('\n');
  }
  printer.out
}

fn precedence(expr: &Expr) -> u8 {
  match expr {
    Expr::Seq(_) => 0,
    Expr::Assign { .. } | Expr::Arrow(_) | Expr::Yield { .. } | Expr::Spread(_) => PREC_ASSIGN,
    Expr::Cond { .. } => PREC_COND,
    Expr::Binary { op, .. } => PREC_COND + binary_precedence(op).unwrap_or(0),
    Expr::Unary { .. } | Expr::Await(_) | Expr::Update { prefix: true, .. } => PREC_UNARY,
    Expr::Update { prefix: false, .. } => PREC_POSTFIX,
    Expr::Call { .. } | Expr::Member { .. } | Expr::New { .. } | Expr::Template { tag: Some(_), .. } => PREC_CALL,
    _ => PREC_PRIMARY,
  }
}

/// Whether printing `expr` at the start of a statement (or as an arrow
/// body) would be misread as a block, function or class declaration.
fn leftmost_hazard(expr: &Expr) -> bool {
  match expr {
    Expr::Object(_) | Expr::Function(_) | Expr::Class(_) => true,
    Expr::Assign { target, .. } => match target.as_ref() {
      Pat::Object(_) => true,
      Pat::Expr(inner) => leftmost_hazard(inner),
      _ => false,
    },
    Expr::Binary { left, .. } => leftmost_hazard(left),
    Expr::Cond { test, .. } => leftmost_hazard(test),
    Expr::Call { callee, .. } => leftmost_hazard(callee),
    Expr::Member { object, .. } => leftmost_hazard(object),
    Expr::Seq(items) => items.first().is_some_and(leftmost_hazard),
    Expr::Update { prefix: false, arg, .. } => leftmost_hazard(arg),
    Expr::Template { tag: Some(tag), .. } => leftmost_hazard(tag),
    _ => false,
  }
}

fn contains_call(expr: &Expr) -> bool {
  match expr {
    Expr::Call { .. } => true,
    Expr::Member { object, .. } => contains_call(object),
    Expr::Template { tag: Some(tag), .. } => contains_call(tag),
    _ => false,
  }
}

fn is_integer_literal(expr: &Expr) -> bool {
  matches!(expr, Expr::Lit(raw) if raw.bytes().all(|b| b.is_ascii_digit()))
}

fn is_nullish_mix(op: &str, child: &Expr) -> bool {
  let Expr::Binary { op: child_op, .. } = child else {
    return false;
  };
  match op {
    "??" => child_op == "||" || child_op == "&&",
    "||" | "&&" => child_op == "??",
    _ => false,
  }
}

fn is_super_call(stmt: &Stmt) -> bool {
  matches!(stmt, Stmt::Expr(Expr::Call { callee, .. }) if matches!(callee.as_ref(), Expr::Super))
}

fn param_name(pat: &Pat) -> Option<&str> {
  match pat {
    Pat::Ident(name) => Some(name),
    Pat::Assign(inner, _) => param_name(inner),
    _ => None,
  }
}

fn numeric_value(expr: &Expr) -> Option<f64> {
  match expr {
    Expr::Lit(raw) => {
      let raw = raw.replace('_', "");
      let lower = raw.to_ascii_lowercase();
      if let Some(hex) = lower.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok().map(|n| n as f64);
      }
      if let Some(bin) = lower.strip_prefix("0b") {
        return i64::from_str_radix(bin, 2).ok().map(|n| n as f64);
      }
      if let Some(oct) = lower.strip_prefix("0o") {
        return i64::from_str_radix(oct, 8).ok().map(|n| n as f64);
      }
      raw.parse::<f64>().ok()
    }
    Expr::Unary { op, arg } if op == "-" => numeric_value(arg).map(|n| -n),
    Expr::Paren(inner) => numeric_value(inner),
    _ => None,
  }
}

fn format_number(n: f64) -> String {
  if n.fract() == 0.0 && n.abs() < 1e15 {
    format!("{}", n as i64)
  } else {
    n.to_string()
  }
}

fn is_string_init(expr: &Expr) -> bool {
  match expr {
    Expr::Lit(raw) => raw.starts_with('"') || raw.starts_with('\''),
    Expr::Template { tag: None, .. } => true,
    _ => false,
  }
}

#[derive(Default)]
struct Printer {
  out: String,
  indent: usize,
}

impl Printer {
  fn write(&mut self, text: &str) {
    self.out.push_str(text);
  }

  fn newline(&mut self) {
    self.out.push('\n');
    for _ in 0..self.indent {
      self.out.push_str("  ");
    }
  }

  // =========================================================================
  // Statements
  // =========================================================================

  fn stmt_inline(&mut self, stmt: &Stmt) {
    match stmt {
      Stmt::Expr(expr) => {
        if leftmost_hazard(expr) {
          self.write("(");
          self.expr(expr, 0);
          self.write(")");
        } else {
          self.expr(expr, 0);
        }
        self.write(";");
      }
      Stmt::Var(decl) => {
        self.var_decl(decl);
        self.write(";");
      }
      Stmt::Function(func) => self.function(func),
      Stmt::Class(class) => self.class(class),
      Stmt::Return(arg) => {
        self.write("return");
        if let Some(arg) = arg {
          self.write(" ");
          self.expr(arg, 0);
        }
        self.write(";");
      }
      Stmt::If { test, cons, alt } => {
        self.write("if (");
        self.expr(test, 0);
        self.write(") ");
        self.body(cons);
        if let Some(alt) = alt {
          self.write(" else ");
          if matches!(alt.as_ref(), Stmt::If { .. }) {
            self.stmt_inline(alt);
          } else {
            self.body(alt);
          }
        }
      }
      Stmt::Block(body) => self.block(body),
      Stmt::For {
        init,
        test,
        update,
        body,
      } => {
        self.write("for (");
        if let Some(init) = init {
          self.for_init(init);
        }
        self.write(";");
        if let Some(test) = test {
          self.write(" ");
          self.expr(test, 0);
        }
        self.write(";");
        if let Some(update) = update {
          self.write(" ");
          self.expr(update, 0);
        }
        self.write(") ");
        self.body(body);
      }
      Stmt::ForIn {
        left,
        right,
        kind,
        body,
      } => {
        self.write(if *kind == ForInKind::AwaitOf { "for await (" } else { "for (" });
        self.for_init(left);
        self.write(if *kind == ForInKind::In { " in " } else { " of " });
        self.expr(right, PREC_ASSIGN);
        self.write(") ");
        self.body(body);
      }
      Stmt::While { test, body } => {
        self.write("while (");
        self.expr(test, 0);
        self.write(") ");
        self.body(body);
      }
      Stmt::DoWhile { body, test } => {
        self.write("do ");
        self.body(body);
        self.write(" while (");
        self.expr(test, 0);
        self.write(");");
      }
      Stmt::Break(label) | Stmt::Continue(label) => {
        self.write(if matches!(stmt, Stmt::Break(_)) { "break" } else { "continue" });
        if let Some(label) = label {
          self.write(" ");
          self.write(label);
        }
        self.write(";");
      }
      Stmt::Throw(arg) => {
        self.write("throw ");
        self.expr(arg, 0);
        self.write(";");
      }
      Stmt::Try {
        block,
        param,
        handler,
        finalizer,
      } => {
        self.write("try ");
        self.block(block);
        if let Some(handler) = handler {
          self.write(" catch ");
          if let Some(param) = param {
            self.write("(");
            self.pat(param);
            self.write(") ");
          }
          self.block(handler);
        }
        if let Some(finalizer) = finalizer {
          self.write(" finally ");
          self.block(finalizer);
        }
      }
      Stmt::Switch { discriminant, cases } => {
        self.write("switch (");
        self.expr(discriminant, 0);
        self.write(") {");
        self.indent += 1;
        for case in cases {
          self.newline();
          match &case.test {
            Some(test) => {
              self.write("case ");
              self.expr(test, 0);
              self.write(":");
            }
            None => self.write("default:"),
          }
          self.indent += 1;
          for stmt in &case.body {
            self.newline();
            self.stmt_inline(stmt);
          }
          self.indent -= 1;
        }
        self.indent -= 1;
        self.newline();
        self.write("}");
      }
      Stmt::Labeled { label, body } => {
        self.write(label);
        self.write(": ");
        self.stmt_inline(body);
      }
      Stmt::Empty => self.write(";"),
      Stmt::Debugger => self.write("debugger;"),
      Stmt::Enum(decl) => self.enum_decl(decl),
      // Module declarations are rewritten before printing.
      Stmt::Import(_) | Stmt::Export(_) => {}
      Stmt::Raw(text) => {
        for (index, line) in text.lines().enumerate() {
          if index > 0 {
            self.newline();
          }
          self.write(line);
        }
      }
    }
  }

  fn block(&mut self, body: &[Stmt]) {
    if body.is_empty() {
      self.write("{}");
      return;
    }
    self.write("{");
    self.indent += 1;
    for stmt in body {
      self.newline();
      self.stmt_inline(stmt);
    }
    self.indent -= 1;
    self.newline();
    self.write("}");
  }

  /// Statement bodies are always braced.
  fn body(&mut self, stmt: &Stmt) {
    match stmt {
      Stmt::Block(body) => self.block(body),
      other => self.block(std::slice::from_ref(other)),
    }
  }

  fn for_init(&mut self, init: &ForInit) {
    match init {
      ForInit::Var(decl) => self.var_decl(decl),
      ForInit::Expr(expr) => self.expr(expr, 0),
      ForInit::Pat(pat) => self.pat(pat),
    }
  }

  fn var_decl(&mut self, decl: &VarDecl) {
    self.write(decl.kind.as_str());
    self.write(" ");
    for (index, declarator) in decl.decls.iter().enumerate() {
      if index > 0 {
        self.write(", ");
      }
      self.pat(&declarator.target);
      if let Some(init) = &declarator.init {
        self.write(" = ");
        self.expr(init, PREC_ASSIGN);
      }
    }
  }

  fn enum_decl(&mut self, decl: &Enum) {
    let name = decl.name.as_str();
    self.write(&format!("var {name};"));
    self.newline();
    self.write(&format!("(function ({name}) {{"));
    self.indent += 1;
    let mut next = Some(0.0);
    let mut prev: Option<&str> = None;
    for member in &decl.members {
      self.newline();
      let key = quote(&member.name);
      match &member.init {
        None => {
          let value = match (next, prev) {
            (Some(n), _) => format_number(n),
            (None, Some(prev)) => format!("{name}[{}] + 1", quote(prev)),
            (None, None) => "0".to_string(),
          };
          self.write(&format!("{name}[{name}[{key}] = {value}] = {key};"));
          next = next.map(|n| n + 1.0);
        }
        Some(init) => {
          if let Some(n) = numeric_value(init) {
            self.write(&format!("{name}[{name}[{key}] = {}] = {key};", format_number(n)));
            next = Some(n + 1.0);
          } else if is_string_init(init) {
            self.write(&format!("{name}[{key}] = "));
            self.expr(init, PREC_ASSIGN);
            self.write(";");
            next = None;
          } else {
            self.write(&format!("{name}[{name}[{key}] = "));
            self.expr(init, PREC_ASSIGN);
            self.write(&format!("] = {key};"));
            next = None;
          }
        }
      }
      prev = Some(&member.name);
    }
    self.indent -= 1;
    self.newline();
    self.write(&format!("}})({name} || ({name} = {{}}));"));
  }

  // =========================================================================
  // Functions and classes
  // =========================================================================

  fn function(&mut self, func: &Function) {
    if func.is_async {
      self.write("async ");
    }
    self.write("function");
    if func.is_generator {
      self.write("*");
    }
    if let Some(name) = &func.name {
      self.write(" ");
      self.write(name);
    }
    self.params(&func.params);
    self.write(" ");
    self.block(&func.body);
  }

  fn params(&mut self, params: &[Param]) {
    self.write("(");
    for (index, param) in params.iter().enumerate() {
      if index > 0 {
        self.write(", ");
      }
      self.pat(&param.pat);
    }
    self.write(")");
  }

  fn method_head(&mut self, key: &PropKey, kind: MethodKind, func: &Function) {
    if func.is_async {
      self.write("async ");
    }
    match kind {
      MethodKind::Get => self.write("get "),
      MethodKind::Set => self.write("set "),
      MethodKind::Method | MethodKind::Constructor => {}
    }
    if func.is_generator {
      self.write("*");
    }
    self.prop_key(key);
    self.params(&func.params);
    self.write(" ");
  }

  fn class(&mut self, class: &Class) {
    self.write("class");
    if let Some(name) = &class.name {
      self.write(" ");
      self.write(name);
    }
    if let Some(base) = &class.super_class {
      self.write(" extends ");
      self.expr(base, PREC_CALL);
    }
    self.write(" ");
    if class.members.is_empty() {
      self.write("{}");
      return;
    }
    self.write("{");
    self.indent += 1;
    for member in &class.members {
      self.newline();
      match member {
        ClassMember::Method {
          key,
          kind,
          func,
          is_static,
        } => {
          if *is_static {
            self.write("static ");
          }
          self.method_head(key, *kind, func);
          let body = if *kind == MethodKind::Constructor {
            constructor_body(func, class.super_class.is_some())
          } else {
            Cow::Borrowed(func.body.as_slice())
          };
          self.block(&body);
        }
        ClassMember::Field { key, value, is_static } => {
          if *is_static {
            self.write("static ");
          }
          self.prop_key(key);
          if let Some(value) = value {
            self.write(" = ");
            self.expr(value, PREC_ASSIGN);
          }
          self.write(";");
        }
        ClassMember::StaticBlock(body) => {
          self.write("static ");
          self.block(body);
        }
      }
    }
    self.indent -= 1;
    self.newline();
    self.write("}");
  }

  fn prop_key(&mut self, key: &PropKey) {
    match key {
      PropKey::Ident(name) | PropKey::Str(name) | PropKey::Num(name) => self.write(name),
      PropKey::Private(name) => {
        self.write("#");
        self.write(name);
      }
      PropKey::Computed(expr) => {
        self.write("[");
        self.expr(expr, PREC_ASSIGN);
        self.write("]");
      }
    }
  }

  // =========================================================================
  // Patterns
  // =========================================================================

  fn pat(&mut self, pat: &Pat) {
    match pat {
      Pat::Ident(name) => self.write(name),
      Pat::Object(props) => {
        if props.is_empty() {
          self.write("{}");
          return;
        }
        self.write("{ ");
        for (index, prop) in props.iter().enumerate() {
          if index > 0 {
            self.write(", ");
          }
          match prop {
            ObjectPatProp::KeyValue(key, value) => {
              self.prop_key(key);
              self.write(": ");
              self.pat(value);
            }
            ObjectPatProp::Shorthand(name, default) => {
              self.write(name);
              if let Some(default) = default {
                self.write(" = ");
                self.expr(default, PREC_ASSIGN);
              }
            }
            ObjectPatProp::Rest(rest) => {
              self.write("...");
              self.pat(rest);
            }
          }
        }
        self.write(" }");
      }
      Pat::Array(items) => {
        self.write("[");
        for (index, item) in items.iter().enumerate() {
          if index > 0 {
            self.write(", ");
          }
          if let Some(item) = item {
            self.pat(item);
          }
        }
        if matches!(items.last(), Some(None)) {
          self.write(",");
        }
        self.write("]");
      }
      Pat::Assign(target, default) => {
        self.pat(target);
        self.write(" = ");
        self.expr(default, PREC_ASSIGN);
      }
      Pat::Rest(inner) => {
        self.write("...");
        self.pat(inner);
      }
      Pat::Expr(expr) => self.expr(expr, PREC_CALL),
    }
  }

  // =========================================================================
  // Expressions
  // =========================================================================

  fn expr(&mut self, expr: &Expr, min: u8) {
    if precedence(expr) < min {
      self.write("(");
      self.expr_inner(expr);
      self.write(")");
    } else {
      self.expr_inner(expr);
    }
  }

  fn args(&mut self, args: &[Expr]) {
    self.write("(");
    for (index, arg) in args.iter().enumerate() {
      if index > 0 {
        self.write(", ");
      }
      self.expr(arg, PREC_ASSIGN);
    }
    self.write(")");
  }

  fn binary_operand(&mut self, operand: &Expr, min: u8, op: &str) {
    if is_nullish_mix(op, operand) {
      self.write("(");
      self.expr_inner(operand);
      self.write(")");
    } else {
      self.expr(operand, min);
    }
  }

  fn expr_inner(&mut self, expr: &Expr) {
    match expr {
      Expr::Ident(name) | Expr::Lit(name) => self.write(name),
      Expr::Template { tag, quasis, exprs } => {
        if let Some(tag) = tag {
          self.expr(tag, PREC_CALL);
        }
        self.write("`");
        for (index, quasi) in quasis.iter().enumerate() {
          self.write(quasi);
          if let Some(expr) = exprs.get(index) {
            self.write("${");
            self.expr(expr, 0);
            self.write("}");
          }
        }
        self.write("`");
      }
      Expr::Array(items) => {
        self.write("[");
        for (index, item) in items.iter().enumerate() {
          if index > 0 {
            self.write(", ");
          }
          if let Some(item) = item {
            self.expr(item, PREC_ASSIGN);
          }
        }
        if matches!(items.last(), Some(None)) {
          self.write(",");
        }
        self.write("]");
      }
      Expr::Object(props) => {
        if props.is_empty() {
          self.write("{}");
          return;
        }
        self.write("{ ");
        for (index, prop) in props.iter().enumerate() {
          if index > 0 {
            self.write(", ");
          }
          self.prop(prop);
        }
        self.write(" }");
      }
      Expr::Function(func) => self.function(func),
      Expr::Arrow(arrow) => {
        if arrow.is_async {
          self.write("async ");
        }
        self.params(&arrow.params);
        self.write(" => ");
        match &arrow.body {
          ArrowBody::Block(body) => self.block(body),
          ArrowBody::Expr(body) => {
            if leftmost_hazard(body) {
              self.write("(");
              self.expr(body, 0);
              self.write(")");
            } else {
              self.expr(body, PREC_ASSIGN);
            }
          }
        }
      }
      Expr::Class(class) => self.class(class),
      Expr::Unary { op, arg } => {
        self.write(op);
        let needs_space = op.chars().all(|c| c.is_ascii_alphabetic())
          || match arg.as_ref() {
            Expr::Unary { op: inner, .. } => (op == "-" || op == "+") && (inner == "-" || inner == "+"),
            Expr::Update { op: inner, prefix: true, .. } => (op == "-" || op == "+") && inner.starts_with(op.as_str()),
            _ => false,
          };
        if needs_space {
          self.write(" ");
        }
        self.expr(arg, PREC_UNARY);
      }
      Expr::Update { op, prefix, arg } => {
        if *prefix {
          self.write(op);
          self.expr(arg, PREC_POSTFIX);
        } else {
          self.expr(arg, PREC_POSTFIX);
          self.write(op);
        }
      }
      Expr::Binary { op, left, right } => {
        let prec = precedence(expr);
        let (left_min, right_min) = if op == "**" { (PREC_POSTFIX, prec) } else { (prec, prec + 1) };
        self.binary_operand(left, left_min, op);
        self.write(" ");
        self.write(op);
        self.write(" ");
        self.binary_operand(right, right_min, op);
      }
      Expr::Assign { op, target, value } => {
        self.pat(target);
        self.write(" ");
        self.write(op);
        self.write(" ");
        self.expr(value, PREC_ASSIGN);
      }
      Expr::Cond { test, cons, alt } => {
        self.expr(test, PREC_COND + 1);
        self.write(" ? ");
        self.expr(cons, PREC_ASSIGN);
        self.write(" : ");
        self.expr(alt, PREC_ASSIGN);
      }
      Expr::Call {
        callee,
        args,
        optional,
      } => {
        self.expr(callee, PREC_CALL);
        if *optional {
          self.write("?.");
        }
        self.args(args);
      }
      Expr::New { callee, args } => {
        self.write("new ");
        if contains_call(callee) {
          self.write("(");
          self.expr(callee, 0);
          self.write(")");
        } else {
          self.expr(callee, PREC_CALL);
        }
        self.args(args);
      }
      Expr::Member {
        object,
        prop,
        optional,
      } => {
        if is_integer_literal(object) {
          self.write("(");
          self.expr(object, 0);
          self.write(")");
        } else {
          self.expr(object, PREC_CALL);
        }
        match prop {
          MemberProp::Ident(name) => {
            self.write(if *optional { "?." } else { "." });
            self.write(name);
          }
          MemberProp::Private(name) => {
            self.write(if *optional { "?.#" } else { ".#" });
            self.write(name);
          }
          MemberProp::Computed(key) => {
            self.write(if *optional { "?.[" } else { "[" });
            self.expr(key, 0);
            self.write("]");
          }
        }
      }
      Expr::Seq(items) => {
        for (index, item) in items.iter().enumerate() {
          if index > 0 {
            self.write(", ");
          }
          self.expr(item, PREC_ASSIGN);
        }
      }
      Expr::Spread(arg) => {
        self.write("...");
        self.expr(arg, PREC_ASSIGN);
      }
      Expr::Yield { arg, delegate } => {
        self.write("yield");
        if *delegate {
          self.write("*");
        }
        if let Some(arg) = arg {
          self.write(" ");
          self.expr(arg, PREC_ASSIGN);
        }
      }
      Expr::Await(arg) => {
        self.write("await ");
        self.expr(arg, PREC_UNARY);
      }
      Expr::Paren(inner) => {
        self.write("(");
        self.expr(inner, 0);
        self.write(")");
      }
      Expr::This => self.write("this"),
      Expr::Super => self.write("super"),
      Expr::NewTarget => self.write("new.target"),
    }
  }

  fn prop(&mut self, prop: &Prop) {
    match prop {
      Prop::KeyValue(key, value) => {
        self.prop_key(key);
        self.write(": ");
        self.expr(value, PREC_ASSIGN);
      }
      Prop::Shorthand(name) => self.write(name),
      Prop::ShorthandDefault(name, value) => {
        self.write(name);
        self.write(" = ");
        self.expr(value, PREC_ASSIGN);
      }
      Prop::Method { key, kind, func } => {
        self.method_head(key, *kind, func);
        self.block(&func.body);
      }
      Prop::Spread(value) => {
        self.write("...");
        self.expr(value, PREC_ASSIGN);
      }
    }
  }
}

/// Constructor body with parameter properties assigned, after `super()` in
/// derived classes.
fn constructor_body(func: &Function, derived: bool) -> Cow<'_, [Stmt]> {
  let assigns: Vec<Stmt> = func
    .params
    .iter()
    .filter(|param| param.this_property)
    .filter_map(|param| param_name(&param.pat))
    .map(|name| Stmt::Raw(format!("this.{name} = {name};")))
    .collect();
  if assigns.is_empty() {
    return Cow::Borrowed(func.body.as_slice());
  }
  let mut body = func.body.clone();
  let at = if derived {
    body.iter().position(is_super_call).map(|index| index + 1).unwrap_or(0)
  } else {
    0
  };
  body.splice(at..at, assigns);
  Cow::Owned(body)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bin(op: &str, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
      op: op.to_string(),
      left: Box::new(left),
      right: Box::new(right),
    }
  }

  fn print_expr(expr: Expr) -> String {
    print(&[Stmt::Expr(expr)])
  }

  #[test]
  fn parenthesizes_by_precedence() {
    let expr = bin("*", bin("+", ident("a"), ident("b")), ident("c"));
    assert_eq!(print_expr(expr), "(a + b) * c;\n");
    let expr = bin("-", ident("a"), bin("-", ident("b"), ident("c")));
    assert_eq!(print_expr(expr), "a - (b - c);\n");
  }

  #[test]
  fn object_at_statement_start_is_wrapped() {
    let expr = member(Expr::Object(vec![]), "x");
    assert_eq!(print_expr(expr), "({}.x);\n");
  }

  #[test]
  fn nested_negation_keeps_space() {
    let expr = Expr::Unary {
      op: "-".into(),
      arg: Box::new(Expr::Unary {
        op: "-".into(),
        arg: Box::new(ident("x")),
      }),
    };
    assert_eq!(print_expr(expr), "- -x;\n");
  }

  #[test]
  fn enum_lowering() {
    let decl = Enum {
      name: "Color".into(),
      members: vec![
        EnumMember {
          name: "Red".into(),
          init: None,
        },
        EnumMember {
          name: "Green".into(),
          init: Some(Expr::Lit("5".into())),
        },
        EnumMember {
          name: "Blue".into(),
          init: None,
        },
        EnumMember {
          name: "Label".into(),
          init: Some(Expr::Lit("'x'".into())),
        },
      ],
    };
    let out = print(&[Stmt::Enum(decl)]);
    assert_eq!(
      out,
      "var Color;\n(function (Color) {\n  Color[Color[\"Red\"] = 0] = \"Red\";\n  Color[Color[\"Green\"] = 5] = \"Green\";\n  Color[Color[\"Blue\"] = 6] = \"Blue\";\n  Color[\"Label\"] = 'x';\n})(Color || (Color = {}));\n"
    );
  }
}
