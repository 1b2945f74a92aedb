//! Extraction of the module body from a generated-code string.
//!
//! Generated builds follow a fixed template: optional commentary, the import
//! block, a single `App` component and the `export default App;` statement,
//! sometimes followed by more commentary. Sanitizing trims the noise around
//! that snippet without parsing it.

use crate::consts::{EXPORT_MARKER, IMPORT_MARKER};

/// Bound `code` to the span from its first import to the default export.
///
/// Text before the first `"import "` is dropped when the marker is not at the
/// very start, and text after the first `"export default App;"` is dropped.
/// Missing markers leave the corresponding end untouched, so a string without
/// either marker is returned unchanged.
pub fn sanitize(code: &str) -> &str {
  let mut body = code;

  match body.find(IMPORT_MARKER) {
    Some(start) if start > 0 => body = &body[start..],
    _ => {}
  }

  if let Some(end) = body.find(EXPORT_MARKER) {
    body = &body[..end + EXPORT_MARKER.len()];
  }

  body
}
