use anyhow::Result;
use buildlab_lib::sanitize::sanitize;

use super::read_source;

pub fn cmd_sanitize(file: &str) -> Result<()> {
  let raw = read_source(file)?;
  println!("{}", sanitize(&raw));
  Ok(())
}
