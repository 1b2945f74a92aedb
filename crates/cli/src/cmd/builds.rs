use anyhow::{Context, Result};
use buildlab_lib::build::{BuildStore, FileBuildStore};
use buildlab_lib::config::Config;

use crate::output::{OutputFormat, print_info, print_json, short_id, symbols};

pub fn cmd_builds(config: &Config, owner: &str, format: OutputFormat) -> Result<()> {
  let store = FileBuildStore::new(config.store_path());
  let builds = store
    .list_by_owner(owner)
    .with_context(|| format!("Failed to list builds for {}", owner))?;

  if format.is_json() {
    return print_json(&builds);
  }
  if builds.is_empty() {
    print_info(&format!("No builds for {}", owner));
    return Ok(());
  }
  for build in &builds {
    let marker = if build.is_previewable { symbols::SUCCESS } else { symbols::INFO };
    println!("  {} {}  {}  {}", marker, short_id(&build.id), build.created_at, build.title);
  }
  Ok(())
}
