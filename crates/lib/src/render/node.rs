//! The mounted view tree.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A node of a rendered preview. Event handler props are replaced by handler
/// ids that can be passed back to
/// [`MountedPreview::dispatch`](super::native::MountedPreview::dispatch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
  Element {
    name: String,
    #[serde(default)]
    props: Map<String, Value>,
    #[serde(default)]
    handlers: BTreeMap<String, String>,
    #[serde(default)]
    children: Vec<Node>,
  },
  Text {
    text: String,
  },
}

impl Node {
  /// Concatenated text of this node and its descendants.
  pub fn text_content(&self) -> String {
    let mut out = String::new();
    self.collect_text(&mut out);
    out
  }

  fn collect_text(&self, out: &mut String) {
    match self {
      Node::Text { text } => out.push_str(text),
      Node::Element { children, .. } => children.iter().for_each(|child| child.collect_text(out)),
    }
  }

  /// Depth-first search, self included.
  pub fn find(&self, predicate: &impl Fn(&Node) -> bool) -> Option<&Node> {
    if predicate(self) {
      return Some(self);
    }
    match self {
      Node::Element { children, .. } => children.iter().find_map(|child| child.find(predicate)),
      Node::Text { .. } => None,
    }
  }

  /// Visible label: the `title` prop of elements like `Button`, followed by
  /// the text content.
  pub fn label(&self) -> String {
    let mut out = String::new();
    if let Node::Element { props, .. } = self {
      if let Some(title) = props.get("title").and_then(Value::as_str) {
        out.push_str(title);
      }
    }
    self.collect_text(&mut out);
    out
  }

  pub fn handler(&self, event: &str) -> Option<&str> {
    match self {
      Node::Element { handlers, .. } => handlers.get(event).map(String::as_str),
      Node::Text { .. } => None,
    }
  }
}

pub fn text_content(nodes: &[Node]) -> String {
  nodes.iter().map(Node::text_content).collect()
}

/// First handler registered for `event` on an element whose label contains
/// `label`, in tree order.
pub fn find_handler<'a>(nodes: &'a [Node], event: &str, label: Option<&str>) -> Option<&'a str> {
  nodes.iter().find_map(|node| {
    node
      .find(&|candidate: &Node| {
        candidate.handler(event).is_some() && label.is_none_or(|label| candidate.label().contains(label))
      })
      .and_then(|found| found.handler(event))
  })
}

/// One entry of a pre-order listing: the node without its children, and how
/// deep it sits. This is the form the renderer hands trees over in.
#[derive(Debug, Deserialize)]
pub struct NodeRecord {
  pub depth: usize,
  #[serde(flatten)]
  pub node: Node,
}

/// Rebuild nested nodes from a pre-order listing without recursing.
///
/// `open` holds the elements on the path to the latest node, `open[d]`
/// being the one at depth `d`.
pub fn from_records(records: Vec<NodeRecord>) -> Result<Vec<Node>, String> {
  let mut roots = Vec::new();
  let mut open: Vec<Node> = Vec::new();
  for NodeRecord { depth, node } in records {
    if depth > open.len() {
      return Err(format!("node at depth {depth} has no parent"));
    }
    while open.len() > depth {
      close(&mut open, &mut roots);
    }
    match node {
      Node::Element { .. } => open.push(node),
      Node::Text { .. } => attach(&mut open, &mut roots, node),
    }
  }
  while !open.is_empty() {
    close(&mut open, &mut roots);
  }
  Ok(roots)
}

fn close(open: &mut Vec<Node>, roots: &mut Vec<Node>) {
  if let Some(node) = open.pop() {
    attach(open, roots, node);
  }
}

fn attach(open: &mut [Node], roots: &mut Vec<Node>, node: Node) {
  match open.last_mut() {
    Some(Node::Element { children, .. }) => children.push(node),
    _ => roots.push(node),
  }
}

/// Indented outline of a tree, one node per line.
pub fn outline(nodes: &[Node]) -> String {
  let mut out = String::new();
  for node in nodes {
    write_outline(node, 0, &mut out);
  }
  out
}

fn write_outline(node: &Node, depth: usize, out: &mut String) {
  let indent = "  ".repeat(depth);
  match node {
    Node::Text { text } => {
      let _ = writeln!(out, "{indent}{}", Value::String(text.clone()));
    }
    Node::Element {
      name,
      props,
      handlers,
      children,
    } => {
      let _ = write!(out, "{indent}<{name}");
      for (key, value) in props {
        let _ = write!(out, " {key}={value}");
      }
      for (event, id) in handlers {
        let _ = write!(out, " {event}=#{id}");
      }
      out.push_str(">\n");
      for child in children {
        write_outline(child, depth + 1, out);
      }
    }
  }
}
