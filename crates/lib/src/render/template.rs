//! Document templates with escaped interpolation slots.
//!
//! # Slot Formats
//!
//! - `$${html:name}` - text, HTML-escaped (safe in element content and
//!   quoted attribute values)
//! - `$${json:name}` - a JSON value, serialized so it cannot terminate an
//!   enclosing `<script>` element
//!
//! Single `$` characters pass through unchanged, so template-literal
//! syntax in inline scripts needs no escaping.
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence.
//!
//! # Example
//!
//! ```
//! use buildlab_lib::render::template::{parse, Segment, Slot};
//!
//! let segments = parse("<title>$${html:title}</title>").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("<title>".to_string()),
//!     Segment::Slot(Slot::Html("title".to_string())),
//!     Segment::Literal("</title>".to_string()),
//! ]);
//! ```

use serde_json::Value;
use thiserror::Error;

/// A parsed interpolation point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
  /// `$${html:name}`
  Html(String),

  /// `$${json:name}`
  Json(String),
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Slot(Slot),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("unclosed slot at position {0}")]
  Unclosed(usize),

  #[error("unknown slot type: {0}")]
  UnknownType(String),

  #[error("malformed slot: {0}")]
  Malformed(String),

  #[error("unresolved slot: {0}")]
  Unresolved(String),

  #[error("failed to serialize slot '{name}': {message}")]
  Serialize { name: String, message: String },
}

/// Supplies slot values during substitution.
pub trait Resolver {
  /// Raw text for an `html` slot; escaping is applied by the caller.
  fn resolve_html(&self, name: &str) -> Result<&str, TemplateError>;

  fn resolve_json(&self, name: &str) -> Result<&Value, TemplateError>;
}

/// Parse a template into literal text and slots.
///
/// # Errors
///
/// Returns an error if a slot is unclosed, has no name or has an unknown
/// type.
pub fn parse(input: &str) -> Result<Vec<Segment>, TemplateError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }
    match chars.peek() {
      Some((_, '$')) => {
        chars.next();
        match chars.peek() {
          Some((_, '$')) => {
            chars.next();
            match chars.peek() {
              Some((_, '{')) => {
                // $$${ -> literal $${
                literal.push_str("$${");
                chars.next();
              }
              _ => literal.push_str("$$$"),
            }
          }
          Some((_, '{')) => {
            chars.next();
            if !literal.is_empty() {
              segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }

            let mut content = String::new();
            let mut closed = false;
            for (_, c) in chars.by_ref() {
              if c == '}' {
                closed = true;
                break;
              }
              content.push(c);
            }
            if !closed {
              return Err(TemplateError::Unclosed(pos));
            }
            segments.push(Segment::Slot(parse_slot(&content)?));
          }
          _ => literal.push_str("$$"),
        }
      }
      _ => literal.push('$'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

fn parse_slot(content: &str) -> Result<Slot, TemplateError> {
  let (kind, name) = content
    .split_once(':')
    .ok_or_else(|| TemplateError::Malformed(format!("missing colon in '{content}'")))?;
  if name.is_empty() {
    return Err(TemplateError::Malformed(format!("missing name in '{content}'")));
  }
  match kind {
    "html" => Ok(Slot::Html(name.to_string())),
    "json" => Ok(Slot::Json(name.to_string())),
    _ => Err(TemplateError::UnknownType(kind.to_string())),
  }
}

/// Parse and substitute in one step.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, TemplateError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

/// Substitute pre-parsed segments, escaping every value for its slot type.
pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<String, TemplateError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(text) => result.push_str(text),
      Segment::Slot(Slot::Html(name)) => result.push_str(&escape_html(resolver.resolve_html(name)?)),
      Segment::Slot(Slot::Json(name)) => {
        let value = resolver.resolve_json(name)?;
        let json = script_safe_json(value).map_err(|err| TemplateError::Serialize {
          name: name.clone(),
          message: err.to_string(),
        })?;
        result.push_str(&json);
      }
    }
  }

  Ok(result)
}

pub fn escape_html(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for ch in text.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(ch),
    }
  }
  out
}

/// Serialize `value` as JSON that is also inert inside a `<script>` element
/// and valid JavaScript.
///
/// `<` can only occur inside JSON strings, where `\u003c` is equivalent, so
/// neither `</script>` nor `<!--` survive. U+2028 and U+2029 are escaped for
/// engines that reject them in string literals.
pub fn script_safe_json(value: &Value) -> Result<String, serde_json::Error> {
  let json = serde_json::to_string(value)?;
  Ok(
    json
      .replace('<', "\\u003c")
      .replace('\u{2028}', "\\u2028")
      .replace('\u{2029}', "\\u2029"),
  )
}
