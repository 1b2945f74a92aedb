//! The preview surface: a build id in, something to display out.
//!
//! Lookup states that have nothing to render become placeholders. Everything
//! else runs through the pipeline on every request, so an edited build is
//! picked up on the next render.

use tracing::{debug, info};

use crate::build::{Build, BuildSource, QueryState};
use crate::config::Config;
use crate::pipeline::{Pipeline, Rendered};
use crate::render::native::ViewContent;
use crate::render::template::TemplateError;
use crate::render::{Document, DocumentEnvironment, HostView, MountScope, NativeEnvironment, Placeholder};

/// Result of rendering the isolated-document variant.
#[derive(Debug)]
pub enum DocumentView {
  Placeholder(Placeholder),
  Document(Document),
}

pub struct PreviewSurface<S> {
  source: S,
  native: Pipeline<NativeEnvironment>,
  document: Pipeline<DocumentEnvironment>,
  view: HostView,
}

impl<S: BuildSource> PreviewSurface<S> {
  pub fn new(source: S, config: &Config) -> Result<Self, TemplateError> {
    Ok(Self {
      source,
      native: Pipeline::new(NativeEnvironment::new(config.sandbox.clone())),
      document: Pipeline::new(DocumentEnvironment::new(config.document.clone())?),
      view: HostView::new(),
    })
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  pub fn view(&self) -> &HostView {
    &self.view
  }

  pub fn view_mut(&mut self) -> &mut HostView {
    &mut self.view
  }

  /// Look `id` up, mapping every state without renderable code to its
  /// placeholder.
  pub fn resolve(&self, id: &str) -> Result<Build, Placeholder> {
    match self.source.lookup(id) {
      QueryState::Loading => Err(Placeholder::Loading),
      QueryState::Failed(message) => Err(Placeholder::LoadFailed(message)),
      QueryState::Ready(None) => Err(Placeholder::NotFound),
      QueryState::Ready(Some(build)) if !build.has_code() => Err(Placeholder::NoCode),
      QueryState::Ready(Some(build)) => Ok(build),
    }
  }

  /// Render `id` in-process and mount the result into the host view,
  /// replacing whatever it showed before.
  pub fn show(&mut self, id: &str) -> &ViewContent {
    let content = match self.resolve(id) {
      Err(placeholder) => {
        debug!(build = id, placeholder = placeholder.title(), "showing placeholder");
        ViewContent::Placeholder(placeholder)
      }
      Ok(build) => {
        info!(build = id, "rendering preview");
        match self.native.render(&build.code, &scope(&build)) {
          Rendered::Mounted(preview) => ViewContent::Preview(preview),
          Rendered::Error(panel) => ViewContent::Error(panel),
        }
      }
    };
    self.view.show(content);
    self.view.content()
  }

  /// Render `id` as a standalone HTML document.
  pub fn document(&self, id: &str) -> Result<DocumentView, TemplateError> {
    let build = match self.resolve(id) {
      Ok(build) => build,
      Err(placeholder) => return Ok(DocumentView::Placeholder(placeholder)),
    };
    let scope = scope(&build);
    let document = match self.document.render(&build.code, &scope) {
      Rendered::Mounted(document) => document,
      Rendered::Error(panel) => self.document.environment().error_document(&panel, &scope)?,
    };
    Ok(DocumentView::Document(document))
  }
}

fn scope(build: &Build) -> MountScope {
  MountScope::new(build.app_id.clone(), Some(build.title.clone()))
}
