use anyhow::{Result, bail};
use buildlab_lib::auth::StaticTokenVerifier;
use buildlab_lib::build::FileBuildStore;
use buildlab_lib::config::Config;
use buildlab_lib::generate::{GenerateRequest, Prompt, create_build};

use crate::output::{OutputFormat, print_error, print_json, print_stat, print_success};

pub fn cmd_create(config: &Config, prompt: &str, token: Option<String>, format: OutputFormat) -> Result<()> {
  let store = FileBuildStore::new(config.store_path());
  let verifier = StaticTokenVerifier::from_config(&config.auth);
  let request = GenerateRequest {
    token,
    prompt: Prompt {
      initial_prompt: prompt.to_string(),
    },
  };

  match create_build(&store, &verifier, &request) {
    Ok(response) => {
      if format.is_json() {
        print_json(&response)?;
      } else {
        print_success(&format!("Created build {}", response.build_id));
        print_stat("Store", &store.path().display().to_string());
      }
      Ok(())
    }
    Err(err) => {
      if format.is_json() {
        print_json(&serde_json::json!({ "status": err.status(), "body": err.body() }))?;
      } else {
        print_error(&format!("{} ({})", err, err.status()));
      }
      bail!("Build creation failed");
    }
  }
}
