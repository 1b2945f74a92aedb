//! In-process rendering through the embedded interpreter.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::node::{self, Node, NodeRecord};
use super::{Environment, ErrorPanel, MountScope, Placeholder};
use crate::error::PreviewError;
use crate::sandbox::{self, ExportKind, Instance, SandboxLimits, Whitelist, whitelist};
use crate::transpile::TranspiledModule;

/// Mounts modules into a fresh sandbox per run.
#[derive(Debug, Clone, Default)]
pub struct NativeEnvironment {
  limits: SandboxLimits,
}

impl NativeEnvironment {
  pub fn new(limits: SandboxLimits) -> Self {
    Self { limits }
  }

  pub fn limits(&self) -> &SandboxLimits {
    &self.limits
  }
}

impl Environment for NativeEnvironment {
  type Mounted = MountedPreview;

  fn name(&self) -> &'static str {
    "native"
  }

  fn whitelist(&self) -> Whitelist {
    whitelist::native()
  }

  fn mount(&self, module: TranspiledModule, scope: &MountScope) -> Result<MountedPreview, PreviewError> {
    let factory = sandbox::load(&module, self.whitelist(), &self.limits, scope.app_id.as_deref())?;
    let export = factory.export();
    let (instance, tree) = factory.mount()?;
    let tree = parse_tree(&tree)?;
    debug!(export = ?export, roots = tree.len(), "mounted preview");
    Ok(MountedPreview { instance, tree, export })
  }
}

fn parse_tree(json: &str) -> Result<Vec<Node>, PreviewError> {
  let records: Vec<NodeRecord> = serde_json::from_str(json).map_err(|err| invalid_tree(&err))?;
  node::from_records(records).map_err(|err| invalid_tree(&err))
}

fn invalid_tree(reason: &dyn std::fmt::Display) -> PreviewError {
  PreviewError::Mount {
    message: format!("renderer produced an invalid tree: {reason}"),
    stack: None,
  }
}

/// A call to `Alert.alert` made by the previewed component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
  pub title: String,
  pub message: Option<String>,
  #[serde(default)]
  pub buttons: Vec<String>,
}

/// A live component and its latest rendered tree.
#[derive(Debug)]
pub struct MountedPreview {
  instance: Instance,
  tree: Vec<Node>,
  export: ExportKind,
}

impl MountedPreview {
  pub fn tree(&self) -> &[Node] {
    &self.tree
  }

  pub fn export(&self) -> ExportKind {
    self.export
  }

  pub fn text(&self) -> String {
    node::text_content(&self.tree)
  }

  /// First handler for `event` whose element contains `label`.
  pub fn find_handler(&self, event: &str, label: Option<&str>) -> Option<String> {
    node::find_handler(&self.tree, event, label).map(str::to_string)
  }

  /// Invoke an event handler and re-render.
  pub fn dispatch(&mut self, handler: &str, args: &[Value]) -> Result<&[Node], PreviewError> {
    let args = Value::Array(args.to_vec()).to_string();
    let tree = self.instance.dispatch(handler, &args)?;
    self.tree = parse_tree(&tree)?;
    Ok(&self.tree)
  }

  /// Advance timers by `by` and re-render.
  pub fn advance(&mut self, by: Duration) -> Result<&[Node], PreviewError> {
    let tree = self.instance.advance(by)?;
    self.tree = parse_tree(&tree)?;
    Ok(&self.tree)
  }

  pub fn alerts(&self) -> Result<Vec<Alert>, PreviewError> {
    let json = self.instance.alerts()?;
    serde_json::from_str(&json).map_err(|err| PreviewError::Mount {
      message: format!("renderer produced invalid alerts: {err}"),
      stack: None,
    })
  }
}

/// What a [`HostView`] currently displays.
#[derive(Debug, Default)]
pub enum ViewContent {
  #[default]
  Empty,
  Placeholder(Placeholder),
  Preview(MountedPreview),
  Error(ErrorPanel),
}

impl ViewContent {
  pub fn is_error(&self) -> bool {
    matches!(self, ViewContent::Error(_))
  }
}

/// The slot a preview is mounted into. Every `show` replaces the previous
/// content entirely; the replaced preview and its interpreter are dropped.
#[derive(Debug, Default)]
pub struct HostView {
  content: ViewContent,
  generation: u64,
}

impl HostView {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn content(&self) -> &ViewContent {
    &self.content
  }

  /// Number of replacements so far.
  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn show(&mut self, content: ViewContent) {
    self.generation += 1;
    debug!(generation = self.generation, "replacing host view content");
    self.content = content;
  }

  pub fn preview(&self) -> Option<&MountedPreview> {
    match &self.content {
      ViewContent::Preview(preview) => Some(preview),
      _ => None,
    }
  }

  /// Dispatch to the mounted preview. A failing handler replaces the preview
  /// with its error panel, like an error thrown while rendering.
  pub fn dispatch(&mut self, handler: &str, args: &[Value]) -> Result<(), PreviewError> {
    let ViewContent::Preview(preview) = &mut self.content else {
      return Ok(());
    };
    if let Err(err) = preview.dispatch(handler, args) {
      warn!(handler, error = %err, "event handler failed");
      let panel = ErrorPanel::from_error(&err);
      self.show(ViewContent::Error(panel));
      return Err(err);
    }
    Ok(())
  }

  /// Advance the mounted preview's timers. Failures replace the preview
  /// the same way as in [`HostView::dispatch`].
  pub fn advance(&mut self, by: Duration) -> Result<(), PreviewError> {
    let ViewContent::Preview(preview) = &mut self.content else {
      return Ok(());
    };
    if let Err(err) = preview.advance(by) {
      warn!(elapsed_ms = by.as_millis() as u64, error = %err, "timer callback failed");
      let panel = ErrorPanel::from_error(&err);
      self.show(ViewContent::Error(panel));
      return Err(err);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transpile::transpile;

  fn mount(source: &str) -> Result<MountedPreview, PreviewError> {
    let module = transpile(source)?;
    NativeEnvironment::default().mount(module, &MountScope::default())
  }

  const TODO_LIST: &str = r#"import React, { useState } from 'react';
import { View, Text, TextInput, Button } from 'react-native';

export default function App() {
  const [draft, setDraft] = useState('');
  const [items, setItems] = useState<string[]>([]);
  return (
    <View>
      <TextInput value={draft} onChangeText={setDraft} />
      <Button title="Add" onPress={() => { setItems([...items, draft]); setDraft(''); }} />
      {items.map((item, index) => <Text key={index}>{item}</Text>)}
    </View>
  );
}
"#;

  #[test]
  fn handlers_drive_hook_state() {
    let mut preview = mount(TODO_LIST).unwrap();
    let change = preview.find_handler("onChangeText", None).unwrap();
    preview.dispatch(&change, &[Value::from("milk")]).unwrap();
    let add = preview.find_handler("onPress", Some("Add")).unwrap();
    preview.dispatch(&add, &[]).unwrap();

    assert!(preview.text().contains("milk"));
    let input = preview.tree()[0]
      .find(&|node: &Node| matches!(node, Node::Element { name, .. } if name == "TextInput"))
      .unwrap();
    let Node::Element { props, .. } = input else {
      unreachable!()
    };
    assert_eq!(props["value"], "");
  }

  #[test]
  fn unknown_handler_is_a_mount_error() {
    let mut preview = mount(TODO_LIST).unwrap();
    let err = preview.dispatch("h999", &[]).unwrap_err();
    assert!(matches!(err, PreviewError::Mount { .. }));
  }

  #[test]
  fn alerts_are_typed() {
    let source = r#"import { Alert, Button } from 'react-native';
export default function App() {
  return <Button title="Delete" onPress={() => Alert.alert('Delete?', 'This cannot be undone', [{ text: 'Cancel' }, { text: 'Delete' }])} />;
}
"#;
    let mut preview = mount(source).unwrap();
    let press = preview.find_handler("onPress", None).unwrap();
    preview.dispatch(&press, &[]).unwrap();
    assert_eq!(
      preview.alerts().unwrap(),
      vec![Alert {
        title: "Delete?".to_string(),
        message: Some("This cannot be undone".to_string()),
        buttons: vec!["Cancel".to_string(), "Delete".to_string()],
      }]
    );
  }

  #[test]
  fn host_view_is_last_write_wins() {
    let mut view = HostView::new();
    view.show(ViewContent::Placeholder(Placeholder::Loading));
    view.show(ViewContent::Preview(mount(TODO_LIST).unwrap()));
    assert_eq!(view.generation(), 2);
    assert!(view.preview().is_some());

    view.show(ViewContent::Error(ErrorPanel::from_error(&PreviewError::NoDefaultExport)));
    assert!(view.preview().is_none());
    assert!(view.content().is_error());
  }

  #[test]
  fn failing_handler_replaces_preview_with_panel() {
    let source = r#"import { Button } from 'react-native';
export default function App() {
  return <Button title="Crash" onPress={() => { throw new Error('handler exploded'); }} />;
}
"#;
    let mut view = HostView::new();
    view.show(ViewContent::Preview(mount(source).unwrap()));
    let press = view.preview().and_then(|preview| preview.find_handler("onPress", None)).unwrap();

    let err = view.dispatch(&press, &[]).unwrap_err();
    assert_eq!(err.to_string(), "handler exploded");
    match view.content() {
      ViewContent::Error(panel) => assert_eq!(panel.message, "handler exploded"),
      other => panic!("unexpected content: {other:?}"),
    }
  }

  #[test]
  fn deep_component_trees_mount() {
    let source = r#"import React from 'react';
import { View, Text } from 'react-native';
function Nest(props: { level: number }) {
  if (props.level === 0) return <Text>bottom</Text>;
  return <View><Nest level={props.level - 1} /></View>;
}
export default function App() {
  return <Nest level={150} />;
}
"#;
    let preview = mount(source).unwrap();
    assert_eq!(preview.text(), "bottom");

    let mut depth = 0;
    let mut node = &preview.tree()[0];
    while let Node::Element { children, .. } = node {
      depth += 1;
      node = &children[0];
    }
    assert_eq!(depth, 150);
  }

  #[test]
  fn failing_timer_replaces_preview_with_panel() {
    let source = r#"import React, { useState, useEffect } from 'react';
import { Text } from 'react-native';
export default function App() {
  const [ticks, setTicks] = useState(0);
  useEffect(() => {
    const id = setInterval(() => setTicks((t) => t + 1), 1000);
    return () => clearInterval(id);
  }, []);
  if (ticks > 2) throw new Error('too many ticks');
  return <Text>Ticks: {ticks}</Text>;
}
"#;
    let mut view = HostView::new();
    view.show(ViewContent::Preview(mount(source).unwrap()));

    view.advance(Duration::from_millis(2_000)).unwrap();
    assert_eq!(view.preview().map(MountedPreview::text).as_deref(), Some("Ticks: 2"));

    view.advance(Duration::from_millis(1_000)).unwrap_err();
    assert!(view.content().is_error());
  }
}
