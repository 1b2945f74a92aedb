//! The fixed set of modules generated code may import.
//!
//! Each entry maps a module name to a JavaScript expression producing the
//! module object. Expressions only read the environment's host object (`host`
//! in the embedded interpreter, `window` in a document), so the whitelist is
//! the entire capability surface handed to generated code.

use crate::transpile::TranspiledModule;

/// One importable module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
  pub name: &'static str,
  /// Expression evaluated once per load, on first `require`.
  pub binding: &'static str,
}

/// Ordered, immutable module-name to binding mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Whitelist {
  entries: &'static [Entry],
}

const NATIVE: &[Entry] = &[
  Entry {
    name: "react",
    binding: "host.React",
  },
  Entry {
    name: "react-native",
    binding: "host.ReactNative",
  },
  Entry {
    name: "@instantdb/react-native",
    binding: "host.instant",
  },
];

const DOCUMENT: &[Entry] = &[
  Entry {
    name: "react",
    binding: "window.React",
  },
  Entry {
    name: "@instantdb/react",
    binding: "{ id: window.InstantReact.id, i: window.InstantReact.i, init: scopedInit, InstaQLEntity: window.InstantReact.InstaQLEntity || {} }",
  },
];

/// Modules available to previews rendered in-process.
pub fn native() -> Whitelist {
  Whitelist { entries: NATIVE }
}

/// Modules available inside the isolated preview document.
pub fn document() -> Whitelist {
  Whitelist { entries: DOCUMENT }
}

impl Whitelist {
  pub fn entries(&self) -> &'static [Entry] {
    self.entries
  }

  pub fn get(&self, name: &str) -> Option<&'static Entry> {
    self.entries.iter().find(|entry| entry.name == name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.get(name).is_some()
  }

  /// First statically required module that is not importable.
  pub fn first_missing<'m>(&self, module: &'m TranspiledModule) -> Option<&'m str> {
    module
      .requires
      .iter()
      .map(String::as_str)
      .find(|name| !self.contains(name))
  }

  /// Module name to binding expression, for loaders that run outside this
  /// process and build their own factories.
  pub fn to_json(&self) -> serde_json::Value {
    self
      .entries
      .iter()
      .map(|entry| (entry.name.to_string(), serde_json::Value::from(entry.binding)))
      .collect::<serde_json::Map<_, _>>()
      .into()
  }
}
