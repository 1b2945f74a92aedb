//! JSX lowering to classic-runtime `React.createElement` calls.
//!
//! Element content is lexed by position: the parser never asks the regular
//! tokenizer to read JSX text, which would choke on apostrophes and other
//! characters that are meaningless inside markup.

use super::TranspileError;
use super::ast::*;
use super::lexer::{JsxChild, TokenKind};
use super::parser::Parser;

const FACTORY: &str = "createElement";
const FRAGMENT: &str = "Fragment";
const PRAGMA_ROOT: &str = "React";

impl<'a> Parser<'a> {
  /// Parse a JSX element or fragment at the current `<` token and resume
  /// regular lexing after it.
  pub(super) fn parse_jsx_element(&mut self) -> Result<Expr, TranspileError> {
    self.uses_jsx = true;
    self.value_refs.insert(PRAGMA_ROOT.to_string());
    let (expr, end) = self.jsx_element_at(self.tok.start)?;
    self.resync(end)?;
    Ok(expr)
  }

  /// Parse the element whose `<` is at `lt`. Returns the lowered call and the
  /// offset just past the element.
  fn jsx_element_at(&mut self, lt: usize) -> Result<(Expr, usize), TranspileError> {
    self.nested(|p| p.jsx_element_body(lt))
  }

  fn jsx_element_body(&mut self, lt: usize) -> Result<(Expr, usize), TranspileError> {
    self.resync(lt + 1)?;

    if self.is(">") {
      let (children, end) = self.jsx_children(self.tok.end, None)?;
      let fragment = member(ident(PRAGMA_ROOT), FRAGMENT);
      return Ok((create_element(fragment, None, children), end));
    }

    let name = self.jsx_tag_name()?;
    let tag = self.jsx_tag_expr(&name);
    if self.is("<") {
      self.skip_type_params()?;
    }
    let mut props: Option<Vec<Prop>> = None;

    loop {
      if self.is("/") {
        self.advance()?;
        if self.tok.kind != TokenKind::Punct || !self.text().starts_with('>') {
          return Err(self.unexpected());
        }
        return Ok((create_element(tag, props, Vec::new()), self.tok.start + 1));
      }
      if self.tok.kind == TokenKind::Punct && self.text().starts_with('>') {
        let (children, end) = self.jsx_children(self.tok.start + 1, Some(&name))?;
        return Ok((create_element(tag, props, children), end));
      }

      let prop = if self.is("{") {
        self.advance()?;
        self.expect("...")?;
        let spread = self.parse_assign(false)?;
        self.expect("}")?;
        Prop::Spread(spread)
      } else if self.tok.kind == TokenKind::Ident {
        self.jsx_attribute()?
      } else {
        return Err(self.unexpected());
      };
      props.get_or_insert_with(Vec::new).push(prop);
    }
  }

  fn jsx_attribute(&mut self) -> Result<Prop, TranspileError> {
    let mut name = self.jsx_name()?;
    if self.is(":") {
      self.advance()?;
      name.push(':');
      name.push_str(&self.jsx_name()?);
    }
    let key = if is_identifier_name(&name) {
      PropKey::Ident(name)
    } else {
      PropKey::Str(quote(&name))
    };

    if !self.is("=") {
      return Ok(Prop::KeyValue(key, Expr::Lit("true".to_string())));
    }

    let eq_end = self.tok.end;
    self.tok = self.lexer.jsx_attr_value_at(eq_end)?;
    self.prev_end = eq_end;

    let value = match self.tok.kind {
      TokenKind::Str => {
        let raw = self.advance_text()?;
        let decoded = decode_entities(&raw[1..raw.len() - 1]);
        string_lit(&collapse_attribute_newlines(&decoded))
      }
      TokenKind::Punct if self.is("{") => {
        self.advance()?;
        if self.is("}") {
          return Err(self.error_here("JSX attributes must only be assigned a non-empty expression"));
        }
        let value = self.parse_assign(false)?;
        self.expect("}")?;
        value
      }
      TokenKind::Punct if self.is("<") => {
        self.uses_jsx = true;
        let (element, end) = self.jsx_element_at(self.tok.start)?;
        self.resync(end)?;
        element
      }
      _ => return Err(self.unexpected()),
    };
    Ok(Prop::KeyValue(key, value))
  }

  /// Read a JSX name (identifier characters plus `-`) at the current token.
  fn jsx_name(&mut self) -> Result<String, TranspileError> {
    if self.tok.kind != TokenKind::Ident {
      return Err(self.unexpected());
    }
    let start = self.tok.start;
    let end = self.lexer.jsx_name_end(start);
    let name = self.src[start..end].to_string();
    self.resync(end)?;
    Ok(name)
  }

  /// `Name`, `a-b`, `ns:name` or `Member.Expression`.
  fn jsx_tag_name(&mut self) -> Result<String, TranspileError> {
    let mut name = self.jsx_name()?;
    if self.is(":") {
      self.advance()?;
      name.push(':');
      name.push_str(&self.jsx_name()?);
      return Ok(name);
    }
    while self.eat(".")? {
      name.push('.');
      name.push_str(&self.jsx_name()?);
    }
    Ok(name)
  }

  fn jsx_tag_expr(&mut self, name: &str) -> Expr {
    let mut parts = name.split('.');
    let first = parts.next().unwrap_or_default();
    let intrinsic = name.contains(':')
      || name.contains('-')
      || (!name.contains('.') && first.starts_with(|c: char| c.is_ascii_lowercase()));
    if intrinsic {
      return string_lit(name);
    }
    let mut expr = if first == "this" {
      Expr::This
    } else {
      self.value_refs.insert(first.to_string());
      ident(first)
    };
    for part in parts {
      expr = member(expr, part);
    }
    expr
  }

  /// Parse element content from `pos` up to and including the closing tag.
  fn jsx_children(&mut self, pos: usize, name: Option<&str>) -> Result<(Vec<Expr>, usize), TranspileError> {
    let open = pos;
    let mut pos = pos;
    let mut children = Vec::new();
    loop {
      match self.lexer.jsx_child_at(pos) {
        JsxChild::Eof => return Err(self.error_at(open, "Unterminated JSX contents")),
        JsxChild::Text { start, end } => {
          let text = decode_entities(&self.src[start..end]);
          if let Some(cleaned) = clean_jsx_text(&text) {
            children.push(string_lit(&cleaned));
          }
          pos = end;
        }
        JsxChild::Expr(brace) => {
          self.resync(brace + 1)?;
          if self.is("}") {
            // `{}` or `{/* comment */}`
            pos = self.tok.end;
            continue;
          }
          let spread = self.eat("...")?;
          let expr = self.parse_expression(false)?;
          if !self.is("}") {
            return Err(self.error_here("Unexpected token, expected \"}\""));
          }
          pos = self.tok.end;
          children.push(if spread { Expr::Spread(Box::new(expr)) } else { expr });
        }
        JsxChild::Tag(lt) => {
          self.resync(lt + 1)?;
          if self.is("/") {
            self.advance()?;
            let closing = if self.tok.kind == TokenKind::Ident {
              Some(self.jsx_tag_name()?)
            } else {
              None
            };
            if self.tok.kind != TokenKind::Punct || !self.text().starts_with('>') {
              return Err(self.unexpected());
            }
            if closing.as_deref() != name {
              let expected = match name {
                Some(name) => format!("Expected corresponding JSX closing tag for <{name}>"),
                None => "Expected corresponding closing tag for JSX fragment".to_string(),
              };
              return Err(self.error_at(lt, expected));
            }
            return Ok((children, self.tok.start + 1));
          }
          let (child, end) = self.jsx_element_at(lt)?;
          children.push(child);
          pos = end;
        }
      }
    }
  }
}

fn create_element(tag: Expr, props: Option<Vec<Prop>>, children: Vec<Expr>) -> Expr {
  let props = match props {
    Some(props) => Expr::Object(props),
    None => Expr::Lit("null".to_string()),
  };
  let mut args = Vec::with_capacity(children.len() + 2);
  args.push(tag);
  args.push(props);
  args.extend(children);
  call(member(ident(PRAGMA_ROOT), FACTORY), args)
}

/// Apply JSX whitespace rules to a text child: lines are trimmed, blank lines
/// dropped, and the remaining lines joined with single spaces. Returns `None`
/// when nothing is left.
pub fn clean_jsx_text(text: &str) -> Option<String> {
  let lines: Vec<&str> = text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line)).collect();
  let last_non_empty = lines.iter().rposition(|line| line.chars().any(|c| c != ' ' && c != '\t'));
  let mut out = String::new();
  for (index, line) in lines.iter().enumerate() {
    let is_first = index == 0;
    let is_last = index == lines.len() - 1;
    let mut trimmed = line.replace('\t', " ");
    if !is_first {
      trimmed = trimmed.trim_start_matches(' ').to_string();
    }
    if !is_last {
      trimmed = trimmed.trim_end_matches(' ').to_string();
    }
    if trimmed.is_empty() {
      continue;
    }
    if Some(index) != last_non_empty {
      trimmed.push(' ');
    }
    out.push_str(&trimmed);
  }
  if out.is_empty() { None } else { Some(out) }
}

fn collapse_attribute_newlines(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  let mut chars = value.chars().peekable();
  while let Some(c) = chars.next() {
    if c == '\n' {
      while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
      }
      out.push(' ');
    } else {
      out.push(c);
    }
  }
  out
}

const ENTITIES: &[(&str, char)] = &[
  ("amp", '&'),
  ("lt", '<'),
  ("gt", '>'),
  ("quot", '"'),
  ("apos", '\''),
  ("nbsp", '\u{a0}'),
  ("copy", '\u{a9}'),
  ("reg", '\u{ae}'),
  ("trade", '\u{2122}'),
  ("hellip", '\u{2026}'),
  ("mdash", '\u{2014}'),
  ("ndash", '\u{2013}'),
  ("lsquo", '\u{2018}'),
  ("rsquo", '\u{2019}'),
  ("ldquo", '\u{201c}'),
  ("rdquo", '\u{201d}'),
  ("bull", '\u{2022}'),
  ("middot", '\u{b7}'),
  ("times", '\u{d7}'),
  ("divide", '\u{f7}'),
  ("deg", '\u{b0}'),
  ("larr", '\u{2190}'),
  ("rarr", '\u{2192}'),
  ("uarr", '\u{2191}'),
  ("darr", '\u{2193}'),
  ("hearts", '\u{2665}'),
  ("euro", '\u{20ac}'),
  ("pound", '\u{a3}'),
];

/// Decode HTML character references (`&amp;`, `&#123;`, `&#x1F600;`).
/// Unknown references are left as written.
pub fn decode_entities(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut rest = text;
  while let Some(amp) = rest.find('&') {
    out.push_str(&rest[..amp]);
    let after = &rest[amp + 1..];
    let decoded = after.find(';').filter(|end| *end <= 10).and_then(|end| {
      let name = &after[..end];
      let c = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
      } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
      } else {
        ENTITIES.iter().find(|(entity, _)| *entity == name).map(|(_, c)| *c)
      };
      c.map(|c| (c, end))
    });
    match decoded {
      Some((c, end)) => {
        out.push(c);
        rest = &after[end + 1..];
      }
      None => {
        out.push('&');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn text_whitespace_follows_jsx_rules() {
    assert_eq!(clean_jsx_text("\n      Hello\n      world\n    ").as_deref(), Some("Hello world"));
    assert_eq!(clean_jsx_text("  Count: ").as_deref(), Some("  Count: "));
    assert_eq!(clean_jsx_text("\n   \n  "), None);
    assert_eq!(clean_jsx_text("a\tb").as_deref(), Some("a b"));
  }

  #[test]
  fn entities_decode() {
    assert_eq!(decode_entities("Tom &amp; Jerry &#169; &#x1F600;"), "Tom & Jerry \u{a9} \u{1F600}");
    assert_eq!(decode_entities("a & b &unknown; c"), "a & b &unknown; c");
  }

  #[test]
  fn attribute_newlines_collapse() {
    assert_eq!(collapse_attribute_newlines("a\n     b"), "a b");
  }
}
