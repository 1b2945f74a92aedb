use anyhow::{Context, Result};
use buildlab_lib::build::{BuildStore, FileBuildStore};
use buildlab_lib::config::Config;

use super::read_source;
use crate::output::{OutputFormat, print_json, print_stat, print_success, print_warning};

pub fn cmd_attach(config: &Config, id: &str, file: &str, app_id: Option<&str>, format: OutputFormat) -> Result<()> {
  let code = read_source(file)?;
  let store = FileBuildStore::new(config.store_path());
  let build = store
    .attach_code(id, &code, app_id)
    .with_context(|| format!("Failed to attach code to build {}", id))?;

  if format.is_json() {
    return print_json(&build);
  }
  print_success(&format!("Attached {} bytes to {}", code.len(), build.id));
  if let Some(app_id) = &build.app_id {
    print_stat("App", app_id);
  }
  if !build.is_previewable {
    print_warning("The attached code is empty; the build is not previewable");
  }
  Ok(())
}
