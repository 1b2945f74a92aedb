//! A build from creation to interactive preview, through the file store.

use buildlab_lib::auth::{Principal, StaticTokenVerifier};
use buildlab_lib::build::{BuildStore, FileBuildStore};
use buildlab_lib::config::Config;
use buildlab_lib::generate::{GenerateRequest, Prompt, create_build};
use buildlab_lib::preview::{DocumentView, PreviewSurface};
use buildlab_lib::render::Placeholder;
use buildlab_lib::render::document::DocumentState;
use buildlab_lib::render::native::ViewContent;
use tempfile::TempDir;

const GENERATED: &str = r#"Here's a simple tally counter:

import React, { useState } from 'react';
import { View, Text, Button } from 'react-native';

function App() {
  const [taps, setTaps] = useState(0);
  return (
    <View>
      <Text>{'Taps: ' + taps}</Text>
      <Button title="Tap" onPress={() => setTaps(taps + 1)} />
    </View>
  );
}

export default App;

Tap the button to count!"#;

fn new_build(store: &FileBuildStore) -> String {
  let verifier = StaticTokenVerifier::new().with_token("secret", Principal::new("alice"));
  let request = GenerateRequest {
    token: Some("secret".to_string()),
    prompt: Prompt {
      initial_prompt: "A tally counter".to_string(),
    },
  };
  create_build(store, &verifier, &request).unwrap().build_id
}

#[test]
fn created_build_previews_once_code_is_attached() {
  let temp = TempDir::new().unwrap();
  let store = FileBuildStore::new(temp.path().join("builds.json"));
  let id = new_build(&store);

  let mut surface = PreviewSurface::new(store, &Config::default()).unwrap();
  assert!(matches!(surface.show(&id), ViewContent::Placeholder(Placeholder::NoCode)));

  surface.source().attach_code(&id, GENERATED, Some("app-1")).unwrap();
  match surface.show(&id) {
    ViewContent::Preview(preview) => assert_eq!(preview.text(), "Taps: 0"),
    other => panic!("unexpected content: {other:?}"),
  }

  let tap = surface
    .view()
    .preview()
    .and_then(|preview| preview.find_handler("onPress", Some("Tap")))
    .unwrap();
  surface.view_mut().dispatch(&tap, &[]).unwrap();
  surface.view_mut().dispatch(&tap, &[]).unwrap();
  assert_eq!(surface.view().preview().map(|preview| preview.text()).as_deref(), Some("Taps: 2"));
}

#[test]
fn document_variant_reads_the_same_build() {
  let temp = TempDir::new().unwrap();
  let store = FileBuildStore::new(temp.path().join("builds.json"));
  let id = new_build(&store);
  store.attach_code(&id, GENERATED, Some("app-1")).unwrap();

  let surface = PreviewSurface::new(store, &Config::default()).unwrap();
  match surface.document(&id).unwrap() {
    DocumentView::Document(document) => {
      assert_eq!(document.state, DocumentState::Pending);
      assert!(document.html.contains("<title>A tally counter</title>"));
      assert!(document.html.contains("\"appId\":\"app-1\""));
      assert!(!document.html.contains("Tap the button to count!"));
    }
    other => panic!("unexpected view: {other:?}"),
  }
}

#[test]
fn corrupt_store_surfaces_as_a_load_failure() {
  let temp = TempDir::new().unwrap();
  let path = temp.path().join("builds.json");
  std::fs::write(&path, "{ not json").unwrap();

  let mut surface = PreviewSurface::new(FileBuildStore::new(path), &Config::default()).unwrap();
  match surface.show("anything") {
    ViewContent::Placeholder(Placeholder::LoadFailed(message)) => assert!(message.contains("builds.json"), "{message}"),
    other => panic!("unexpected content: {other:?}"),
  }
}
