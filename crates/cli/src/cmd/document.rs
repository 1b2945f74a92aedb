//! Document command implementation.
//!
//! Renders a component as a standalone HTML document. With `--preflight`,
//! every declared dependency is probed first and the document is only
//! written once all of them are reachable.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use buildlab_lib::build::FileBuildStore;
use buildlab_lib::config::Config;
use buildlab_lib::pipeline::{Pipeline, Rendered};
use buildlab_lib::preview::{DocumentView, PreviewSurface};
use buildlab_lib::render::document::DocumentState;
use buildlab_lib::render::readiness::{DependencyReport, DependencyStatus, HttpProbe, preflight};
use buildlab_lib::render::{Document, DocumentEnvironment};
use serde_json::json;

use super::{PreviewSource, file_scope, read_source};
use crate::output::{
  OutputFormat, format_duration, print_error, print_json, print_placeholder, print_stat, print_success,
  print_warning,
};

pub fn cmd_document(
  config: &Config,
  source: PreviewSource,
  output: Option<&Path>,
  run_preflight: bool,
  format: OutputFormat,
) -> Result<()> {
  let document = match source {
    PreviewSource::File { path, app_id } => {
      let code = read_source(&path)?;
      let environment =
        DocumentEnvironment::new(config.document.clone()).context("Failed to load document template")?;
      let pipeline = Pipeline::new(environment);
      let scope = file_scope(&path, app_id);
      match pipeline.render(&code, &scope) {
        Rendered::Mounted(document) => document,
        Rendered::Error(panel) => pipeline
          .environment()
          .error_document(&panel, &scope)
          .context("Failed to render error document")?,
      }
    }
    PreviewSource::Build(id) => {
      let store = FileBuildStore::new(config.store_path());
      let surface = PreviewSurface::new(store, config).context("Failed to load document template")?;
      match surface.document(&id).context("Failed to render document")? {
        DocumentView::Document(document) => document,
        DocumentView::Placeholder(placeholder) => {
          if format.is_json() {
            print_json(&json!({ "placeholder": placeholder, "title": placeholder.title() }))?;
          } else {
            print_placeholder(&placeholder);
          }
          bail!("{}", placeholder.title());
        }
      }
    }
  };

  if document.state == DocumentState::Errored {
    print_warning("Component failed to compile; the document shows the error panel");
  }

  let reports = if run_preflight && document.state == DocumentState::Pending {
    // Keep stdout for the HTML when no output file is given.
    let show = output.is_some() && !format.is_json();
    Some(check_dependencies(&document, config.document.readiness_timeout(), show)?)
  } else {
    None
  };

  match output {
    Some(path) => {
      std::fs::write(path, &document.html).with_context(|| format!("Failed to write {}", path.display()))?;
      if format.is_json() {
        print_json(&json!({
          "path": path,
          "state": document.state,
          "dependencies": document.dependencies,
          "preflight": reports,
        }))?;
      } else {
        print_success(&format!("Wrote {}", path.display()));
      }
    }
    None => print!("{}", document.html),
  }
  Ok(())
}

fn check_dependencies(document: &Document, timeout: Duration, show: bool) -> Result<Vec<DependencyReport>> {
  let runtime = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let probe = HttpProbe::new()?;

  match runtime.block_on(preflight(&document.dependencies, timeout, &probe)) {
    Ok(reports) => {
      if show {
        print_report(&reports);
      }
      Ok(reports)
    }
    Err(err) => {
      print_error(&err.to_string());
      bail!("Dependency preflight failed");
    }
  }
}

fn print_report(reports: &[DependencyReport]) {
  for report in reports {
    let status = match report.status {
      DependencyStatus::Loaded => "loaded",
      DependencyStatus::Failed => "failed",
      DependencyStatus::Unloaded => "unloaded",
    };
    let took = report
      .elapsed_ms
      .map(|ms| format!(" in {}", format_duration(Duration::from_millis(ms))))
      .unwrap_or_default();
    print_stat(&report.name, &format!("{}{}", status, took));
  }
}
