//! Preview command implementation.
//!
//! Renders a component in-process, optionally presses elements and advances
//! timers, then prints the resulting tree and any alerts.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use buildlab_lib::build::FileBuildStore;
use buildlab_lib::config::Config;
use buildlab_lib::pipeline::{Pipeline, Rendered};
use buildlab_lib::preview::PreviewSurface;
use buildlab_lib::render::native::ViewContent;
use buildlab_lib::render::{HostView, NativeEnvironment};
use serde_json::json;
use tracing::debug;

use super::{PreviewSource, file_scope, read_source};
use crate::output::{
  OutputFormat, print_info, print_json, print_panel, print_placeholder, print_tree, symbols,
};

pub fn cmd_preview(
  config: &Config,
  source: PreviewSource,
  presses: &[String],
  advance: Option<u64>,
  format: OutputFormat,
) -> Result<()> {
  match source {
    PreviewSource::File { path, app_id } => {
      let code = read_source(&path)?;
      let pipeline = Pipeline::new(NativeEnvironment::new(config.sandbox.clone()));
      let content = match pipeline.render(&code, &file_scope(&path, app_id)) {
        Rendered::Mounted(preview) => ViewContent::Preview(preview),
        Rendered::Error(panel) => ViewContent::Error(panel),
      };
      let mut view = HostView::new();
      view.show(content);
      interact(&mut view, presses, advance)?;
      report(&view, format)
    }
    PreviewSource::Build(id) => {
      let store = FileBuildStore::new(config.store_path());
      let mut surface = PreviewSurface::new(store, config).context("Failed to prepare preview surface")?;
      surface.show(&id);
      interact(surface.view_mut(), presses, advance)?;
      report(surface.view(), format)
    }
  }
}

/// Press each label in order, then advance timers. Stops at the first
/// failure; the view then holds its error panel.
fn interact(view: &mut HostView, presses: &[String], advance: Option<u64>) -> Result<()> {
  for label in presses {
    let Some(preview) = view.preview() else {
      return Ok(());
    };
    let Some(handler) = preview.find_handler("onPress", Some(label)) else {
      bail!("No pressable element labelled '{}'", label);
    };
    debug!(label = %label, handler = %handler, "pressing");
    if let Err(err) = view.dispatch(&handler, &[]) {
      debug!(label = %label, error = %err, "press failed");
      return Ok(());
    }
  }

  let Some(ms) = advance else {
    return Ok(());
  };
  if let Err(err) = view.advance(Duration::from_millis(ms)) {
    debug!(advance_ms = ms, error = %err, "timer advance failed");
  }
  Ok(())
}

fn report(view: &HostView, format: OutputFormat) -> Result<()> {
  match view.content() {
    ViewContent::Empty => bail!("Nothing was rendered"),
    ViewContent::Placeholder(placeholder) => {
      if format.is_json() {
        print_json(&json!({ "placeholder": placeholder, "title": placeholder.title() }))?;
      } else {
        print_placeholder(placeholder);
      }
      bail!("{}", placeholder.title());
    }
    ViewContent::Error(panel) => {
      if format.is_json() {
        print_json(&json!({ "error": panel }))?;
      } else {
        print_panel(panel);
      }
      bail!("Preview failed");
    }
    ViewContent::Preview(preview) => {
      let alerts = preview.alerts().context("Failed to read alerts")?;
      if format.is_json() {
        print_json(&json!({ "export": preview.export(), "tree": preview.tree(), "alerts": alerts }))?;
        return Ok(());
      }
      print_tree(preview.tree());
      for alert in &alerts {
        let mut line = format!("Alert {} {}", symbols::ARROW, alert.title);
        if let Some(message) = &alert.message {
          line.push_str(&format!(": {}", message));
        }
        if !alert.buttons.is_empty() {
          line.push_str(&format!(" [{}]", alert.buttons.join(", ")));
        }
        print_info(&line);
      }
      Ok(())
    }
  }
}
