use anyhow::{Result, bail};
use buildlab_lib::build::{BuildSource, FileBuildStore, QueryState};
use buildlab_lib::config::Config;

use crate::output::{OutputFormat, print_error, print_json, print_stat, print_success};

pub fn cmd_show(config: &Config, id: &str, code: bool, format: OutputFormat) -> Result<()> {
  let store = FileBuildStore::new(config.store_path());

  let build = match store.lookup(id) {
    QueryState::Ready(Some(build)) => build,
    QueryState::Ready(None) => {
      print_error(&format!("Build not found: {}", id));
      bail!("Build not found");
    }
    QueryState::Failed(message) => {
      print_error(&format!("Error loading build: {}", message));
      bail!("Error loading build");
    }
    QueryState::Loading => bail!("Build is still loading"),
  };

  if format.is_json() {
    return print_json(&build);
  }
  print_success(&build.title);
  print_stat("Id", &build.id);
  print_stat("Created", &build.created_at);
  if let Some(owner) = &build.owner {
    print_stat("Owner", owner);
  }
  if let Some(app_id) = &build.app_id {
    print_stat("App", app_id);
  }
  print_stat("Previewable", if build.is_previewable { "yes" } else { "no" });
  if code && build.has_code() {
    println!();
    println!("{}", build.code);
  }
  Ok(())
}
