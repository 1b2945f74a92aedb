//! Evaluation of transpiled modules inside an embedded JavaScript interpreter.
//!
//! Every load gets a fresh QuickJS runtime. The module body runs inside a
//! function whose only free variables are `exports`, `module`, `require` and
//! `console`; `require` resolves names against the [`Whitelist`] passed to
//! [`load`] and nothing else. The runtime carries a memory cap, a stack cap
//! and an execution deadline enforced through the interrupt handler.
//!
//! The host runtime (`host.js`) supplies the whitelisted implementations: a
//! hooks-capable React, the React Native primitives and a local database
//! client. It also renders element trees to JSON for [`crate::render`].

pub mod whitelist;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use rquickjs::{CatchResultExt, CaughtError, Context, Ctx, Exception, Function, Object, Persistent, Runtime, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::error::PreviewError;
use crate::transpile::TranspiledModule;
pub use whitelist::Whitelist;

const HOST_RUNTIME: &str = include_str!("host.js");

const CONSOLE_TARGET: &str = "buildlab::sandbox::console";

/// Bounds for [`SandboxLimits::max_stack_size`]. The interpreter runs on the
/// calling thread, and spawned threads get 2 MiB by default, so the
/// interpreter's own overflow check has to trip well before that.
pub const MIN_STACK_SIZE: usize = 64 * 1024;
pub const MAX_STACK_SIZE: usize = 1024 * 1024;

/// Resource limits applied to each load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxLimits {
  /// Heap limit in bytes.
  pub memory_limit: usize,
  /// Interpreter stack limit in bytes.
  pub max_stack_size: usize,
  /// Wall-clock budget for a single evaluation, render or event, in
  /// milliseconds.
  pub timeout_ms: u64,
}

impl Default for SandboxLimits {
  fn default() -> Self {
    Self {
      memory_limit: 64 * 1024 * 1024,
      max_stack_size: MAX_STACK_SIZE,
      timeout_ms: 2_000,
    }
  }
}

impl SandboxLimits {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

/// Which export of the module became the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
  /// `module.exports.default`
  Default,
  /// `module.exports` itself
  ModuleExports,
  /// The named export `App`
  App,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
  Evaluate,
  Render,
}

impl Stage {
  fn error(self, message: String, stack: Option<String>) -> PreviewError {
    match self {
      Stage::Evaluate => PreviewError::Evaluation { message, stack },
      Stage::Render => PreviewError::Mount { message, stack },
    }
  }
}

/// An interpreter instance with the host runtime installed.
///
/// Field order matters: persistent handles must be released before the
/// context and runtime they belong to.
struct Sandbox {
  host: Persistent<Object<'static>>,
  context: Context,
  runtime: Runtime,
  deadline: Rc<Cell<Option<Instant>>>,
  missing: Rc<RefCell<Option<String>>>,
  limits: SandboxLimits,
}

fn setup_error(err: rquickjs::Error) -> PreviewError {
  error!(error = %err, "failed to initialize sandbox");
  PreviewError::Evaluation {
    message: format!("failed to initialize sandbox: {err}"),
    stack: None,
  }
}

fn console_sink(level: String, message: String) {
  match level.as_str() {
    "error" => error!(target: CONSOLE_TARGET, "{message}"),
    "warn" => warn!(target: CONSOLE_TARGET, "{message}"),
    "debug" => debug!(target: CONSOLE_TARGET, "{message}"),
    _ => info!(target: CONSOLE_TARGET, "{message}"),
  }
}

/// Message and stack of a caught JavaScript failure.
fn describe(err: CaughtError<'_>) -> (String, Option<String>) {
  match err {
    CaughtError::Exception(exception) => {
      let message = exception
        .message()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| "Uncaught exception".to_string());
      let stack = exception.stack().filter(|stack| !stack.trim().is_empty());
      (message, stack)
    }
    CaughtError::Value(value) => {
      let message = match value.as_string().and_then(|text| text.to_string().ok()) {
        Some(text) => text,
        None => format!("Uncaught {:?}", value.type_of()),
      };
      (message, None)
    }
    CaughtError::Error(err) => (err.to_string(), None),
  }
}

impl Sandbox {
  fn new(limits: &SandboxLimits, app_id: Option<&str>) -> Result<Self, PreviewError> {
    let runtime = Runtime::new().map_err(setup_error)?;
    runtime.set_memory_limit(limits.memory_limit);
    runtime.set_max_stack_size(limits.max_stack_size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE));

    let deadline: Rc<Cell<Option<Instant>>> = Rc::new(Cell::new(None));
    let watched = deadline.clone();
    runtime.set_interrupt_handler(Some(Box::new(move || {
      watched.get().is_some_and(|at| Instant::now() >= at)
    })));

    let context = Context::full(&runtime).map_err(setup_error)?;
    let app_id = app_id.map(str::to_string);
    let host = context
      .with(|ctx| -> rquickjs::Result<Persistent<Object<'static>>> {
        let install: Function = ctx.eval(HOST_RUNTIME)?;
        let sink = Function::new(ctx.clone(), console_sink)?;
        let host: Object = install.call((sink, app_id))?;
        Ok(Persistent::save(&ctx, host))
      })
      .map_err(setup_error)?;

    Ok(Self {
      host,
      context,
      runtime,
      deadline,
      missing: Rc::new(RefCell::new(None)),
      limits: limits.clone(),
    })
  }

  /// Run `f` under the execution deadline, then drain queued promise jobs.
  fn run<R>(
    &self,
    stage: Stage,
    f: impl for<'js> FnOnce(&Ctx<'js>, Object<'js>) -> rquickjs::Result<R>,
  ) -> Result<R, PreviewError> {
    self.deadline.set(Some(Instant::now() + self.limits.timeout()));

    let outcome = self.context.with(|ctx| {
      let host = self.host.clone().restore(&ctx).catch(&ctx).map_err(describe)?;
      f(&ctx, host).catch(&ctx).map_err(describe)
    });
    if outcome.is_ok() {
      self.drain_jobs();
    }

    let timed_out = self.deadline.get().is_some_and(|at| Instant::now() >= at);
    self.deadline.set(None);

    if let Some(name) = self.missing.borrow_mut().take() {
      return Err(PreviewError::ModuleNotFound(name));
    }

    outcome.map_err(|(message, stack)| {
      if timed_out {
        warn!(limit_ms = self.limits.timeout_ms, "sandbox execution timed out");
        stage.error(
          format!("Execution exceeded the time limit of {} ms", self.limits.timeout_ms),
          None,
        )
      } else {
        stage.error(message, stack)
      }
    })
  }

  fn drain_jobs(&self) {
    while self.runtime.is_job_pending() {
      if self.deadline.get().is_some_and(|at| Instant::now() >= at) {
        warn!("abandoning pending jobs after the deadline");
        break;
      }
      if let Err(err) = self.runtime.execute_pending_job() {
        warn!(error = %err, "pending job raised an exception");
      }
    }
  }

  /// `require` for one load: whitelist lookup, lazy instantiation, memoized.
  fn require_fn<'js>(&self, ctx: &Ctx<'js>, host: Object<'js>, whitelist: Whitelist) -> rquickjs::Result<Function<'js>> {
    let cache = Object::new(ctx.clone())?;
    let missing = self.missing.clone();
    Function::new(ctx.clone(), move |ctx: Ctx<'js>, name: String| -> rquickjs::Result<Value<'js>> {
      let cached: Value = cache.get(name.as_str())?;
      if !cached.is_undefined() {
        return Ok(cached);
      }
      let Some(entry) = whitelist.get(&name) else {
        warn!(module = %name, "generated code required a module outside the whitelist");
        missing.borrow_mut().get_or_insert_with(|| name.clone());
        return Err(Exception::throw_message(&ctx, &format!("Module not found: {name}")));
      };
      trace!(module = %name, "instantiating whitelisted module");
      let factory: Function = ctx.eval(format!("(function (host) {{ return {}; }})", entry.binding))?;
      let value: Value = factory.call((host.clone(),))?;
      cache.set(name.as_str(), value.clone())?;
      Ok(value)
    })
  }

  fn call_host<R>(
    &self,
    stage: Stage,
    method: &'static str,
    f: impl for<'js> FnOnce(&Ctx<'js>, Function<'js>) -> rquickjs::Result<R>,
  ) -> Result<R, PreviewError> {
    self.run(stage, |ctx, host| {
      let function: Function = host.get(method)?;
      f(ctx, function)
    })
  }
}

fn wrap(code: &str) -> String {
  format!("(function (exports, module, require, console) {{\n\"use strict\";\n{code}\n}})")
}

/// Pick the component in priority order: `module.exports.default`, then
/// `module.exports`, then `module.exports.App`. Only callable values count.
fn pick_export<'js>(exported: &Value<'js>) -> rquickjs::Result<Option<(Function<'js>, ExportKind)>> {
  if let Some(object) = exported.as_object() {
    let default: Value = object.get("default")?;
    if let Some(function) = default.as_function() {
      return Ok(Some((function.clone(), ExportKind::Default)));
    }
  }
  if let Some(function) = exported.as_function() {
    return Ok(Some((function.clone(), ExportKind::ModuleExports)));
  }
  if let Some(object) = exported.as_object() {
    let app: Value = object.get("App")?;
    if let Some(function) = app.as_function() {
      return Ok(Some((function.clone(), ExportKind::App)));
    }
  }
  Ok(None)
}

/// A loaded module's component, ready to be rendered.
pub struct ComponentFactory {
  factory: Persistent<Function<'static>>,
  export: ExportKind,
  sandbox: Sandbox,
}

impl std::fmt::Debug for ComponentFactory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ComponentFactory").field("export", &self.export).finish_non_exhaustive()
  }
}

/// Evaluate `module` against `whitelist` and extract its component.
///
/// Static imports are checked before any generated code runs. `app_id` is
/// forced onto every database client the module creates.
pub fn load(
  module: &TranspiledModule,
  whitelist: Whitelist,
  limits: &SandboxLimits,
  app_id: Option<&str>,
) -> Result<ComponentFactory, PreviewError> {
  if let Some(name) = whitelist.first_missing(module) {
    warn!(module = %name, "rejecting import outside the whitelist");
    return Err(PreviewError::ModuleNotFound(name.to_string()));
  }

  let sandbox = Sandbox::new(limits, app_id)?;
  let source = wrap(&module.code);
  let picked = sandbox.run(Stage::Evaluate, |ctx, host| {
    let wrapper: Function = ctx.eval(source.as_str())?;
    let exports = Object::new(ctx.clone())?;
    let module_object = Object::new(ctx.clone())?;
    module_object.set("exports", exports.clone())?;
    let require = sandbox.require_fn(ctx, host.clone(), whitelist)?;
    let console: Object = host.get("console")?;
    wrapper.call::<_, ()>((exports, module_object.clone(), require, console))?;

    let exported: Value = module_object.get("exports")?;
    Ok(pick_export(&exported)?.map(|(function, kind)| (Persistent::save(ctx, function), kind)))
  })?;

  let Some((factory, export)) = picked else {
    warn!("module produced no callable export");
    return Err(PreviewError::NoDefaultExport);
  };
  debug!(export = ?export, "module loaded");
  Ok(ComponentFactory {
    factory,
    export,
    sandbox,
  })
}

impl ComponentFactory {
  pub fn export(&self) -> ExportKind {
    self.export
  }

  /// Invoke the component and render its first tree.
  pub fn mount(self) -> Result<(Instance, String), PreviewError> {
    let factory = self.factory.clone();
    self.sandbox.call_host(Stage::Render, "mount", |ctx, mount| {
      let component = factory.restore(ctx)?;
      mount.call::<_, ()>((component,))
    })?;
    let instance = Instance {
      sandbox: self.into_sandbox(),
    };
    let tree = instance.flush()?;
    Ok((instance, tree))
  }

  fn into_sandbox(self) -> Sandbox {
    let ComponentFactory { factory, sandbox, .. } = self;
    drop(factory);
    sandbox
  }
}

/// A mounted component living in its own interpreter.
///
/// Trees cross the boundary as JSON strings.
pub struct Instance {
  sandbox: Sandbox,
}

impl std::fmt::Debug for Instance {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Instance").finish_non_exhaustive()
  }
}

impl Instance {
  /// Re-render until state settles and return the tree.
  pub fn flush(&self) -> Result<String, PreviewError> {
    self.sandbox.call_host(Stage::Render, "flush", |_, flush| flush.call(()))
  }

  /// Invoke a registered event handler with JSON-encoded arguments.
  pub fn dispatch(&self, handler: &str, args_json: &str) -> Result<String, PreviewError> {
    let handler = handler.to_string();
    let args_json = args_json.to_string();
    self
      .sandbox
      .call_host(Stage::Render, "dispatch", |_, dispatch| dispatch.call::<_, ()>((handler, args_json)))?;
    self.flush()
  }

  /// Move the virtual clock forward, firing due timers.
  pub fn advance(&self, by: Duration) -> Result<String, PreviewError> {
    let ms = by.as_millis() as f64;
    self
      .sandbox
      .call_host(Stage::Render, "advance", |_, advance| advance.call::<_, ()>((ms,)))?;
    self.flush()
  }

  /// Alerts raised so far, as a JSON array.
  pub fn alerts(&self) -> Result<String, PreviewError> {
    self.sandbox.call_host(Stage::Render, "alerts", |_, alerts| alerts.call(()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transpile::transpile;

  fn compile(source: &str) -> TranspiledModule {
    match transpile(source) {
      Ok(module) => module,
      Err(err) => panic!("transpile failed: {err}"),
    }
  }

  fn load_native(source: &str) -> Result<ComponentFactory, PreviewError> {
    load(&compile(source), whitelist::native(), &SandboxLimits::default(), None)
  }

  // ===========================================================================
  // Module resolution
  // ===========================================================================

  #[test]
  fn rejects_static_imports_outside_the_whitelist() {
    let err = load_native("import fs from 'fs';\nexport default function App() { return null; }\n").unwrap_err();
    assert_eq!(err, PreviewError::ModuleNotFound("fs".to_string()));
  }

  #[test]
  fn rejects_dynamic_requires_outside_the_whitelist() {
    let source = "const path = require('path');\nexport default function App() { return null; }\n";
    let err = load_native(source).unwrap_err();
    assert_eq!(err, PreviewError::ModuleNotFound("path".to_string()));
  }

  #[test]
  fn whitelisted_modules_resolve() {
    let source = "import React from 'react';\nimport { View } from 'react-native';\nexport default function App() { return <View />; }\n";
    let factory = load_native(source).unwrap();
    assert_eq!(factory.export(), ExportKind::Default);
  }

  // ===========================================================================
  // Export selection
  // ===========================================================================

  #[test]
  fn module_exports_is_used_when_there_is_no_default() {
    let source = "module.exports = function App() { return null; };\n";
    assert_eq!(load_native(source).unwrap().export(), ExportKind::ModuleExports);
  }

  #[test]
  fn named_app_export_is_the_last_resort() {
    let source = "export function App() { return null; }\n";
    assert_eq!(load_native(source).unwrap().export(), ExportKind::App);
  }

  #[test]
  fn non_callable_default_is_rejected() {
    let err = load_native("export default 42;\n").unwrap_err();
    assert_eq!(err, PreviewError::NoDefaultExport);
  }

  // ===========================================================================
  // Failures
  // ===========================================================================

  #[test]
  fn runtime_exceptions_become_evaluation_errors() {
    let source = "function explode() { throw new TypeError('bad value'); }\nexplode();\nexport default function App() { return null; }\n";
    match load_native(source).unwrap_err() {
      PreviewError::Evaluation { message, stack } => {
        assert_eq!(message, "bad value");
        assert!(stack.is_some_and(|stack| stack.contains("explode")));
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn runaway_recursion_is_an_evaluation_error() {
    let source = "function down(n) { return down(n + 1) + 1; }\ndown(0);\nexport default function App() { return null; }\n";
    assert!(matches!(load_native(source).unwrap_err(), PreviewError::Evaluation { .. }));
  }

  #[test]
  fn infinite_loops_hit_the_deadline() {
    let limits = SandboxLimits {
      timeout_ms: 100,
      ..SandboxLimits::default()
    };
    let module = compile("while (true) {}\nexport default function App() { return null; }\n");
    match load(&module, whitelist::native(), &limits, None).unwrap_err() {
      PreviewError::Evaluation { message, .. } => assert!(message.contains("time limit"), "{message}"),
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn module_scope_does_not_leak_into_globals() {
    let source = "var leaked = 1;\nexport default function App() { return typeof globalThis.leaked; }\n";
    let (_, tree) = load_native(source).unwrap().mount().unwrap();
    assert_eq!(tree, r#"[{"depth":0,"kind":"text","text":"undefined"}]"#);
  }

  // ===========================================================================
  // Rendering
  // ===========================================================================

  #[test]
  fn mount_renders_host_elements() {
    let source = "import React from 'react';\nimport { Text } from 'react-native';\nexport default function App() { return <Text style={[{ color: 'red' }, { fontSize: 12 }]}>Hi</Text>; }\n";
    let (_, tree) = load_native(source).unwrap().mount().unwrap();
    let tree: serde_json::Value = serde_json::from_str(&tree).unwrap();
    assert_eq!(tree[0]["name"], "Text");
    assert_eq!(tree[0]["props"]["style"]["color"], "red");
    assert_eq!(tree[0]["props"]["style"]["fontSize"], 12);
    assert_eq!(tree[1]["depth"], 1);
    assert_eq!(tree[1]["text"], "Hi");
  }

  #[test]
  fn dispatch_updates_state() {
    let source = r#"import React, { useState } from 'react';
import { Text, TouchableOpacity } from 'react-native';
export default function App() {
  const [count, setCount] = useState(0);
  return <TouchableOpacity onPress={() => setCount(count + 1)}><Text>{count}</Text></TouchableOpacity>;
}
"#;
    let (instance, tree) = load_native(source).unwrap().mount().unwrap();
    let tree: serde_json::Value = serde_json::from_str(&tree).unwrap();
    let handler = tree[0]["handlers"]["onPress"].as_str().unwrap().to_string();
    let tree: serde_json::Value = serde_json::from_str(&instance.dispatch(&handler, "[]").unwrap()).unwrap();
    assert_eq!(tree[2]["depth"], 2);
    assert_eq!(tree[2]["text"], "1");
  }

  #[test]
  fn render_exceptions_become_mount_errors() {
    let source = "export default function App() { throw new Error('render failed'); }\n";
    match load_native(source).unwrap().mount().unwrap_err() {
      PreviewError::Mount { message, .. } => assert_eq!(message, "render failed"),
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn alerts_are_recorded() {
    let source = "import { Alert } from 'react-native';\nexport default function App() { Alert.alert('Saved', 'Done'); return null; }\n";
    let (instance, _) = load_native(source).unwrap().mount().unwrap();
    let alerts: serde_json::Value = serde_json::from_str(&instance.alerts().unwrap()).unwrap();
    assert_eq!(alerts[0]["title"], "Saved");
    assert_eq!(alerts[0]["message"], "Done");
  }

  #[test]
  fn timers_run_on_the_virtual_clock() {
    let source = r#"import React, { useEffect, useState } from 'react';
export default function App() {
  const [ready, setReady] = useState('no');
  useEffect(() => {
    const id = setTimeout(() => setReady('yes'), 500);
    return () => clearTimeout(id);
  }, []);
  return ready;
}
"#;
    let (instance, tree) = load_native(source).unwrap().mount().unwrap();
    assert!(tree.contains("\"no\""));
    let tree = instance.advance(Duration::from_millis(500)).unwrap();
    assert!(tree.contains("\"yes\""));
  }
}
