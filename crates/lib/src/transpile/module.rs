//! Lowering of ES module syntax to the CommonJS convention understood by the
//! sandbox: `require(name)` calls and writes to `exports`.

use std::collections::HashSet;

use tracing::debug;

use super::ast::*;
use super::parser::ParsedModule;

const ES_MODULE_MARKER: &str = "Object.defineProperty(exports, \"__esModule\", { value: true });";

const INTEROP_HELPER: &str = "function _interopDefault(m) {\n  return m && m.__esModule ? m.default : m;\n}";

const REACT_MODULE: &str = "react";

pub struct Lowered {
  pub body: Vec<Stmt>,
  pub requires: Vec<String>,
  pub has_default_export: bool,
}

struct Lowering {
  value_refs: HashSet<String>,
  type_refs: HashSet<String>,
  declared: HashSet<String>,
  imported: HashSet<String>,
  temps: HashSet<String>,
  requires: Vec<String>,
  uses_interop: bool,
  has_exports: bool,
  has_default_export: bool,
}

pub fn lower(module: ParsedModule) -> Lowered {
  let ParsedModule {
    body,
    value_refs,
    type_refs,
    uses_jsx,
  } = module;

  let mut lowering = Lowering {
    value_refs,
    type_refs,
    declared: top_level_names(&body),
    imported: HashSet::new(),
    temps: HashSet::new(),
    requires: Vec::new(),
    uses_interop: false,
    has_exports: false,
    has_default_export: false,
  };

  let mut out = Vec::with_capacity(body.len());
  let mut tail = Vec::new();
  for stmt in body {
    match stmt {
      Stmt::Import(decl) => lowering.import(decl, &mut out),
      Stmt::Export(decl) => lowering.export(decl, &mut out, &mut tail),
      other => out.push(other),
    }
  }
  out.extend(tail);

  let mut prelude = Vec::new();
  if lowering.has_exports {
    prelude.push(Stmt::Raw(ES_MODULE_MARKER.to_string()));
  }
  if lowering.uses_interop {
    prelude.push(Stmt::Raw(INTEROP_HELPER.to_string()));
  }
  let react_bound = lowering.declared.contains("React") || lowering.imported.contains("React");
  if uses_jsx && !react_bound {
    debug!("injecting React binding for JSX");
    prelude.push(Stmt::Raw(format!("const React = require({});", quote(REACT_MODULE))));
    if !lowering.requires.iter().any(|name| name == REACT_MODULE) {
      lowering.requires.insert(0, REACT_MODULE.to_string());
    }
  }
  prelude.extend(out);

  Lowered {
    body: prelude,
    requires: lowering.requires,
    has_default_export: lowering.has_default_export,
  }
}

fn top_level_names(body: &[Stmt]) -> HashSet<String> {
  let mut names = HashSet::new();
  for stmt in body {
    let declared = match stmt {
      Stmt::Export(ExportDecl::Decl(inner)) => inner.declared_names(),
      Stmt::Export(ExportDecl::DefaultFunction(Function { name: Some(name), .. }))
      | Stmt::Export(ExportDecl::DefaultClass(Class { name: Some(name), .. })) => vec![name.clone()],
      other => other.declared_names(),
    };
    names.extend(declared);
  }
  names
}

impl Lowering {
  /// Imports referenced only from type positions are erased; imports never
  /// referenced at all are kept so their module is still resolved.
  fn keeps(&self, local: &str) -> bool {
    self.value_refs.contains(local) || !self.type_refs.contains(local)
  }

  fn add_require(&mut self, source: &str) {
    if !self.requires.iter().any(|name| name == source) {
      self.requires.push(source.to_string());
    }
  }

  fn temp_for(&mut self, source: &str) -> String {
    let base = format!("_{}", camelize(source));
    let mut candidate = base.clone();
    let mut counter = 2;
    while self.temps.contains(&candidate) || self.declared.contains(&candidate) {
      candidate = format!("{base}{counter}");
      counter += 1;
    }
    self.temps.insert(candidate.clone());
    candidate
  }

  fn import(&mut self, decl: ImportDecl, out: &mut Vec<Stmt>) {
    if decl.type_only {
      return;
    }
    let had_bindings = decl.has_bindings();
    let ImportDecl {
      source,
      default,
      namespace,
      named,
      ..
    } = decl;

    let mut defaults: Vec<String> = default.into_iter().filter(|local| self.keeps(local)).collect();
    let namespace = namespace.filter(|local| self.keeps(local));
    let mut fields = Vec::new();
    for spec in named {
      if spec.type_only || !self.keeps(&spec.local) {
        continue;
      }
      if spec.imported == "default" {
        defaults.push(spec.local);
      } else {
        fields.push(spec);
      }
    }

    if had_bindings && defaults.is_empty() && namespace.is_none() && fields.is_empty() {
      debug!(module = %source, "eliding type-only import");
      return;
    }

    self.add_require(&source);
    let module = format!("require({})", quote(&source));
    if !had_bindings {
      out.push(Stmt::Raw(format!("{module};")));
      return;
    }

    let parts = defaults.len() + usize::from(namespace.is_some()) + usize::from(!fields.is_empty());
    let target = if parts > 1 {
      let temp = self.temp_for(&source);
      out.push(Stmt::Raw(format!("var {temp} = {module};")));
      temp
    } else {
      module
    };

    for local in defaults {
      self.uses_interop = true;
      out.push(Stmt::Raw(format!("var {local} = _interopDefault({target});")));
      self.imported.insert(local);
    }
    if let Some(local) = namespace {
      out.push(Stmt::Raw(format!("var {local} = {target};")));
      self.imported.insert(local);
    }
    if !fields.is_empty() {
      let pattern = fields
        .iter()
        .map(|spec| {
          if spec.imported == spec.local {
            spec.local.clone()
          } else {
            format!("{}: {}", object_key(&spec.imported), spec.local)
          }
        })
        .collect::<Vec<_>>()
        .join(", ");
      out.push(Stmt::Raw(format!("var {{ {pattern} }} = {target};")));
      self.imported.extend(fields.into_iter().map(|spec| spec.local));
    }
  }

  fn export(&mut self, decl: ExportDecl, out: &mut Vec<Stmt>, tail: &mut Vec<Stmt>) {
    self.has_exports = true;
    match decl {
      ExportDecl::Default(expr) => {
        self.has_default_export = true;
        out.push(export_assign("default", expr));
      }
      ExportDecl::DefaultFunction(func) => {
        self.has_default_export = true;
        match func.name.clone() {
          Some(name) => {
            out.push(Stmt::Function(func));
            out.push(export_assign("default", ident(&name)));
          }
          None => out.push(export_assign("default", Expr::Function(Box::new(func)))),
        }
      }
      ExportDecl::DefaultClass(class) => {
        self.has_default_export = true;
        match class.name.clone() {
          Some(name) => {
            out.push(Stmt::Class(class));
            out.push(export_assign("default", ident(&name)));
          }
          None => out.push(export_assign("default", Expr::Class(Box::new(class)))),
        }
      }
      ExportDecl::Decl(stmt) => {
        let names = stmt.declared_names();
        out.push(*stmt);
        for name in names {
          out.push(export_assign(&name, ident(&name)));
        }
      }
      ExportDecl::Named {
        specifiers,
        source: None,
      } => {
        for spec in specifiers {
          if !self.declared.contains(&spec.local) && !self.imported.contains(&spec.local) {
            debug!(name = %spec.local, "dropping export of a type-only binding");
            continue;
          }
          if spec.exported == "default" {
            self.has_default_export = true;
          }
          tail.push(export_assign(&spec.exported, ident(&spec.local)));
        }
      }
      ExportDecl::Named {
        specifiers,
        source: Some(source),
      } => {
        self.add_require(&source);
        let temp = self.temp_for(&source);
        out.push(Stmt::Raw(format!("var {temp} = require({});", quote(&source))));
        for spec in specifiers {
          let value = if spec.local == "default" {
            self.uses_interop = true;
            format!("_interopDefault({temp})")
          } else {
            property_access(&temp, &spec.local)
          };
          if spec.exported == "default" {
            self.has_default_export = true;
          }
          out.push(Stmt::Raw(format!("{} = {value};", property_access("exports", &spec.exported))));
        }
      }
      ExportDecl::All { source, alias } => {
        self.add_require(&source);
        match alias {
          Some(alias) => {
            if alias == "default" {
              self.has_default_export = true;
            }
            out.push(Stmt::Raw(format!(
              "{} = require({});",
              property_access("exports", &alias),
              quote(&source)
            )));
          }
          None => {
            let temp = self.temp_for(&source);
            out.push(Stmt::Raw(format!(
              "var {temp} = require({source});\nObject.keys({temp}).forEach(function (key) {{\n  if (key !== \"default\" && !Object.prototype.hasOwnProperty.call(exports, key)) exports[key] = {temp}[key];\n}});",
              source = quote(&source)
            )));
          }
        }
      }
    }
  }
}

fn export_assign(name: &str, value: Expr) -> Stmt {
  let target = if is_identifier_name(name) {
    member(ident("exports"), name)
  } else {
    Expr::Member {
      object: Box::new(ident("exports")),
      prop: MemberProp::Computed(Box::new(string_lit(name))),
      optional: false,
    }
  };
  Stmt::Expr(Expr::Assign {
    op: "=".to_string(),
    target: Box::new(Pat::Expr(Box::new(target))),
    value: Box::new(value),
  })
}

fn property_access(object: &str, name: &str) -> String {
  if is_identifier_name(name) {
    format!("{object}.{name}")
  } else {
    format!("{object}[{}]", quote(name))
  }
}

fn object_key(name: &str) -> String {
  if is_identifier_name(name) { name.to_string() } else { quote(name) }
}

/// `@instantdb/react-native` -> `instantdbReactNative`
fn camelize(source: &str) -> String {
  let mut out = String::new();
  for segment in source.split(|c: char| !c.is_ascii_alphanumeric()).filter(|s| !s.is_empty()) {
    if out.is_empty() {
      out.push_str(segment);
      continue;
    }
    let mut chars = segment.chars();
    if let Some(first) = chars.next() {
      out.push(first.to_ascii_uppercase());
      out.push_str(chars.as_str());
    }
  }
  if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
    out.insert_str(0, "module");
  }
  out
}
