//! Rendering to a self-contained HTML document.
//!
//! The document cannot share a scope with this process, so the transpiled
//! module travels as data: it is embedded as JSON together with the
//! dependency manifest and the [`whitelist::document`] bindings, and an
//! inline loader evaluates it once every dependency has loaded.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::template::{self, Resolver, Segment, TemplateError};
use super::{Environment, ErrorPanel, MountScope};
use crate::error::PreviewError;
use crate::sandbox::{Whitelist, whitelist};
use crate::transpile::TranspiledModule;

const TEMPLATE: &str = include_str!("document.html");

const DEFAULT_TITLE: &str = "Preview";

/// A script the document loads before evaluating the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
  pub name: String,
  pub url: String,
}

impl Dependency {
  pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      url: url.into(),
    }
  }
}

/// The UI runtime, its DOM renderer, the in-browser transpiler, the
/// database client and the styling framework.
pub fn default_dependencies() -> Vec<Dependency> {
  vec![
    Dependency::new("react", "https://unpkg.com/react@18/umd/react.production.min.js"),
    Dependency::new("react-dom", "https://unpkg.com/react-dom@18/umd/react-dom.production.min.js"),
    Dependency::new("babel", "https://unpkg.com/@babel/standalone/babel.min.js"),
    Dependency::new("instant", "https://unpkg.com/@instantdb/react@0.22.45/dist/index.umd.js"),
    Dependency::new("tailwind", "https://cdn.tailwindcss.com"),
  ]
}

/// `[document]` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
  pub dependencies: Vec<Dependency>,
  /// How long the document waits for its dependencies before giving up.
  pub readiness_timeout_ms: u64,
}

impl Default for DocumentConfig {
  fn default() -> Self {
    Self {
      dependencies: default_dependencies(),
      readiness_timeout_ms: 15_000,
    }
  }
}

impl DocumentConfig {
  pub fn readiness_timeout(&self) -> Duration {
    Duration::from_millis(self.readiness_timeout_ms)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
  /// Waits on its dependencies, then evaluates the embedded module.
  Pending,
  /// Shows an error panel immediately and loads nothing.
  Errored,
}

#[derive(Debug, Clone)]
pub struct Document {
  pub html: String,
  pub state: DocumentState,
  pub dependencies: Vec<Dependency>,
}

struct Slots {
  title: String,
  config: Value,
}

impl Resolver for Slots {
  fn resolve_html(&self, name: &str) -> Result<&str, TemplateError> {
    match name {
      "title" => Ok(&self.title),
      _ => Err(TemplateError::Unresolved(name.to_string())),
    }
  }

  fn resolve_json(&self, name: &str) -> Result<&Value, TemplateError> {
    match name {
      "config" => Ok(&self.config),
      _ => Err(TemplateError::Unresolved(name.to_string())),
    }
  }
}

#[derive(Debug, Clone)]
pub struct DocumentEnvironment {
  config: DocumentConfig,
  segments: Vec<Segment>,
}

impl DocumentEnvironment {
  pub fn new(config: DocumentConfig) -> Result<Self, TemplateError> {
    let segments = template::parse(TEMPLATE)?;
    Ok(Self { config, segments })
  }

  pub fn config(&self) -> &DocumentConfig {
    &self.config
  }

  /// A document that shows `panel` without loading any dependency.
  pub fn error_document(&self, panel: &ErrorPanel, scope: &MountScope) -> Result<Document, TemplateError> {
    info!(kind = panel.kind.as_str(), "rendering errored document");
    self.render(scope, None, Some(panel))
  }

  fn render(
    &self,
    scope: &MountScope,
    module: Option<&TranspiledModule>,
    error: Option<&ErrorPanel>,
  ) -> Result<Document, TemplateError> {
    let state = if error.is_some() {
      DocumentState::Errored
    } else {
      DocumentState::Pending
    };
    let dependencies = match state {
      DocumentState::Pending => self.config.dependencies.clone(),
      DocumentState::Errored => Vec::new(),
    };

    let config = json!({
      "appId": scope.app_id,
      "timeoutMs": self.config.readiness_timeout_ms,
      "dependencies": dependencies,
      "whitelist": self.whitelist().to_json(),
      "module": module,
      "error": error,
    });
    let slots = Slots {
      title: scope.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
      config,
    };
    let html = template::substitute_segments(&self.segments, &slots)?;
    debug!(state = ?state, bytes = html.len(), "rendered document");

    Ok(Document {
      html,
      state,
      dependencies,
    })
  }
}

impl Environment for DocumentEnvironment {
  type Mounted = Document;

  fn name(&self) -> &'static str {
    "document"
  }

  fn whitelist(&self) -> Whitelist {
    whitelist::document()
  }

  fn mount(&self, module: TranspiledModule, scope: &MountScope) -> Result<Document, PreviewError> {
    self.render(scope, Some(&module), None).map_err(|err| PreviewError::Mount {
      message: format!("failed to render document: {err}"),
      stack: None,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transpile::transpile;

  fn environment() -> DocumentEnvironment {
    DocumentEnvironment::new(DocumentConfig::default()).unwrap()
  }

  /// Body of the first script opened by `open`.
  fn script_body<'a>(html: &'a str, open: &str) -> &'a str {
    let start = html.find(open).unwrap() + open.len();
    let end = start + html[start..].find("</script>").unwrap();
    &html[start..end]
  }

  /// The JSON payload embedded in the document.
  fn embedded_config(html: &str) -> Value {
    serde_json::from_str(script_body(html, CONFIG_SCRIPT)).unwrap()
  }

  const CONFIG_SCRIPT: &str = r#"<script id="buildlab-config" type="application/json">"#;

  /// Just enough of a browser for the inline loader: scripts are recorded
  /// instead of fetched, timers are collected and fired by hand.
  const BROWSER_STUBS: &str = r#"
var window = globalThis;
var phases = [];
var renders = 0;
var scripts = [];
var timers = [];
var rootElement = { innerHTML: "" };
window.console = { log: function () {}, warn: function () {}, error: function () {} };
window.addEventListener = function () {};
window.setTimeout = function (fn) {
  timers.push(fn);
  return timers.length;
};
window.clearTimeout = function (id) {
  timers[id - 1] = null;
};
window.React = {
  createElement: function (type) {
    return { type: type };
  },
};
window.ReactDOM = {
  createRoot: function () {
    return {
      render: function () {
        renders += 1;
      },
    };
  },
};
var document = {
  documentElement: {
    setAttribute: function (name, value) {
      if (name === "data-phase") phases.push(value);
    },
  },
  getElementById: function (id) {
    return id === "buildlab-config" ? { textContent: configText } : rootElement;
  },
  createElement: function () {
    return {};
  },
  head: {
    appendChild: function (script) {
      scripts.push(script);
    },
  },
};
"#;

  /// The document's inline loader running in an interpreter.
  struct Loader {
    context: rquickjs::Context,
    _runtime: rquickjs::Runtime,
  }

  impl Loader {
    fn start(html: &str) -> Self {
      let runtime = rquickjs::Runtime::new().unwrap();
      let context = rquickjs::Context::full(&runtime).unwrap();
      let config_text = serde_json::to_string(script_body(html, CONFIG_SCRIPT)).unwrap();
      let stubs = format!("var configText = {config_text};\n{BROWSER_STUBS}");
      let loader = script_body(html, "<script>").to_string();
      context.with(|ctx| {
        ctx.eval::<(), _>(stubs).unwrap();
        ctx.eval::<(), _>(loader).unwrap();
      });
      Self {
        context,
        _runtime: runtime,
      }
    }

    fn run(&self, script: &str) {
      self.context.with(|ctx| ctx.eval::<(), _>(script.to_string()).unwrap());
    }

    fn load(&self, index: usize) {
      self.run(&format!("scripts[{index}].onload();"));
    }

    fn fail(&self, index: usize) {
      self.run(&format!("scripts[{index}].onerror();"));
    }

    /// Fire the readiness timeout unless it was cleared.
    fn expire(&self) {
      self.run("if (timers[0]) timers[0]();");
    }

    fn phase(&self) -> String {
      self
        .context
        .with(|ctx| ctx.eval("phases.length === 0 ? 'loading' : phases[phases.length - 1]").unwrap())
    }

    fn renders(&self) -> i32 {
      self.context.with(|ctx| ctx.eval("renders").unwrap())
    }

    fn root_html(&self) -> String {
      self.context.with(|ctx| ctx.eval("rootElement.innerHTML").unwrap())
    }
  }

  fn three_dependency_document() -> String {
    let config = DocumentConfig {
      dependencies: vec![
        Dependency::new("a", "https://cdn.test/a.js"),
        Dependency::new("b", "https://cdn.test/b.js"),
        Dependency::new("c", "https://cdn.test/c.js"),
      ],
      readiness_timeout_ms: 500,
    };
    let module = transpile("export default function App() { return null; }\n").unwrap();
    DocumentEnvironment::new(config)
      .unwrap()
      .mount(module, &MountScope::default())
      .unwrap()
      .html
  }

  #[test]
  fn embeds_module_dependencies_and_scope() {
    let module = transpile("import React from 'react';\nexport default function App() { return <div>hi</div>; }\n").unwrap();
    let scope = MountScope::new(Some("app-123".to_string()), Some("Todo <List>".to_string()));
    let document = environment().mount(module.clone(), &scope).unwrap();

    assert_eq!(document.state, DocumentState::Pending);
    assert_eq!(document.dependencies.len(), 5);
    assert!(document.html.contains("<title>Todo &lt;List&gt;</title>"));

    let config = embedded_config(&document.html);
    assert_eq!(config["appId"], "app-123");
    assert_eq!(config["timeoutMs"], 15_000);
    assert_eq!(config["module"]["code"], module.code);
    assert_eq!(config["module"]["requires"], json!(["react"]));
    assert_eq!(config["whitelist"]["react"], "window.React");
    assert_eq!(config["dependencies"][4]["url"], "https://cdn.tailwindcss.com");
    assert!(config["error"].is_null());
  }

  #[test]
  fn embedded_code_cannot_break_out_of_the_script() {
    let source = "export default function App() { return \"</script><script>alert(1)</script>\"; }\n";
    let module = transpile(source).unwrap();
    let document = environment().mount(module, &MountScope::default()).unwrap();

    assert!(!document.html.contains("<script>alert(1)"));
    assert!(document.html.contains("\\u003c/script>"));
    let config = embedded_config(&document.html);
    assert!(config["module"]["code"].as_str().unwrap().contains("</script><script>alert(1)</script>"));
  }

  #[test]
  fn errored_documents_load_nothing() {
    let panel = ErrorPanel::from_error(&PreviewError::ModuleNotFound("fs".to_string()));
    let document = environment().error_document(&panel, &MountScope::default()).unwrap();

    assert_eq!(document.state, DocumentState::Errored);
    assert!(document.dependencies.is_empty());
    let config = embedded_config(&document.html);
    assert_eq!(config["error"]["message"], "Module not found: fs");
    assert_eq!(config["dependencies"], json!([]));
    assert!(config["module"].is_null());
    assert!(document.html.contains("<title>Preview</title>"));
  }

  #[test]
  fn configured_dependencies_replace_the_defaults() {
    let config = DocumentConfig {
      dependencies: vec![Dependency::new("react", "https://cdn.test/react.js")],
      readiness_timeout_ms: 500,
    };
    let environment = DocumentEnvironment::new(config).unwrap();
    let module = transpile("export default () => null;\n").unwrap();
    let document = environment.mount(module, &MountScope::default()).unwrap();
    let embedded = embedded_config(&document.html);
    assert_eq!(embedded["timeoutMs"], 500);
    assert_eq!(embedded["dependencies"], json!([{ "name": "react", "url": "https://cdn.test/react.js" }]));
  }

  // ===========================================================================
  // Loader
  // ===========================================================================

  #[test]
  fn loader_renders_once_after_every_dependency_loads() {
    let html = three_dependency_document();
    let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    for order in orders {
      let loader = Loader::start(&html);
      for (step, index) in order.iter().enumerate() {
        assert_eq!(loader.renders(), 0, "{order:?} rendered before step {step}");
        assert_eq!(loader.phase(), "loading");
        loader.load(*index);
      }
      assert_eq!(loader.renders(), 1, "{order:?}");
      assert_eq!(loader.phase(), "rendered");

      loader.load(order[0]);
      loader.fail(order[1]);
      loader.expire();
      assert_eq!(loader.renders(), 1, "{order:?} rendered twice");
      assert_eq!(loader.phase(), "rendered");
    }
  }

  #[test]
  fn failed_dependency_stops_the_loader() {
    let html = three_dependency_document();
    for failing in 0..3 {
      let loader = Loader::start(&html);
      loader.fail(failing);
      assert_eq!(loader.phase(), "errored");

      for index in 0..3 {
        loader.load(index);
      }
      loader.expire();
      assert_eq!(loader.renders(), 0);
      assert_eq!(loader.phase(), "errored");
      let name = ["a", "b", "c"][failing];
      assert!(loader.root_html().contains(&format!("Failed to load dependency &#39;{name}&#39;")));
    }
  }

  #[test]
  fn readiness_timeout_names_pending_dependencies() {
    let loader = Loader::start(&three_dependency_document());
    loader.load(1);
    loader.expire();
    assert_eq!(loader.phase(), "errored");
    assert!(loader.root_html().contains("Dependencies not loaded after 500 ms: a, c"));

    loader.load(0);
    loader.load(2);
    assert_eq!(loader.renders(), 0);
    assert_eq!(loader.phase(), "errored");
  }

  #[test]
  fn errored_document_never_renders() {
    let panel = ErrorPanel::from_error(&PreviewError::ModuleNotFound("fs".to_string()));
    let document = environment().error_document(&panel, &MountScope::default()).unwrap();
    let loader = Loader::start(&document.html);
    assert_eq!(loader.phase(), "errored");
    assert_eq!(loader.renders(), 0);
    assert!(loader.root_html().contains("Module not found: fs"));
  }

  #[test]
  fn template_has_only_known_slots() {
    let slots: Vec<_> = template::parse(TEMPLATE)
      .unwrap()
      .into_iter()
      .filter_map(|segment| match segment {
        Segment::Slot(slot) => Some(slot),
        Segment::Literal(_) => None,
      })
      .collect();
    assert_eq!(
      slots,
      vec![
        template::Slot::Html("title".to_string()),
        template::Slot::Json("config".to_string()),
      ]
    );
  }
}
