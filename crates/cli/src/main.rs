mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use buildlab_lib::config::Config;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{
  PreviewSource, cmd_attach, cmd_builds, cmd_create, cmd_document, cmd_preview, cmd_sanitize, cmd_show, cmd_transpile,
};
use output::OutputFormat;

/// buildlab - preview generated UI components
#[derive(Parser)]
#[command(name = "buildlab")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Strip prose around generated code
  Sanitize {
    /// File with generated output, or "-" for stdin
    #[arg(default_value = "-")]
    file: String,
  },

  /// Transpile a component module to plain script
  Transpile {
    /// Component source, or "-" for stdin
    #[arg(default_value = "-")]
    file: String,
  },

  /// Render a component in-process and print its tree
  Preview {
    /// Component source file
    #[arg(required_unless_present = "build", conflicts_with = "build")]
    file: Option<String>,

    /// Render a stored build instead of a file
    #[arg(short, long)]
    build: Option<String>,

    /// Database application id for file previews
    #[arg(long)]
    app_id: Option<String>,

    /// Press the element with this label (repeatable, in order)
    #[arg(long = "press", value_name = "LABEL")]
    presses: Vec<String>,

    /// Advance timers by this many milliseconds after the presses
    #[arg(long, value_name = "MS")]
    advance: Option<u64>,
  },

  /// Render a component as a standalone HTML document
  Document {
    /// Component source file
    #[arg(required_unless_present = "build", conflicts_with = "build")]
    file: Option<String>,

    /// Render a stored build instead of a file
    #[arg(short, long)]
    build: Option<String>,

    /// Database application id for file documents
    #[arg(long)]
    app_id: Option<String>,

    /// Write the document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Check that every dependency is reachable before writing
    #[arg(long)]
    preflight: bool,
  },

  /// Create a build from a prompt
  Create {
    /// Prompt describing the component
    prompt: String,

    /// Bearer token of the caller
    #[arg(long, env = "BUILDLAB_TOKEN")]
    token: Option<String>,
  },

  /// Attach generated code to a build
  Attach {
    /// Build id
    id: String,

    /// File with the generated output
    file: String,

    /// Database application id
    #[arg(long)]
    app_id: Option<String>,
  },

  /// List builds created by a user
  Builds {
    /// Owner to list builds for
    #[arg(long)]
    owner: String,
  },

  /// Show a stored build
  Show {
    /// Build id
    id: String,

    /// Print the stored code
    #[arg(long)]
    code: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let config = Config::load().context("Failed to load configuration")?;
  let format = cli.format;

  match cli.command {
    Commands::Sanitize { file } => cmd_sanitize(&file),
    Commands::Transpile { file } => cmd_transpile(&file, format),
    Commands::Preview {
      file,
      build,
      app_id,
      presses,
      advance,
    } => cmd_preview(&config, PreviewSource::new(file, build, app_id), &presses, advance, format),
    Commands::Document {
      file,
      build,
      app_id,
      output,
      preflight,
    } => cmd_document(
      &config,
      PreviewSource::new(file, build, app_id),
      output.as_deref(),
      preflight,
      format,
    ),
    Commands::Create { prompt, token } => cmd_create(&config, &prompt, token, format),
    Commands::Attach { id, file, app_id } => cmd_attach(&config, &id, &file, app_id.as_deref(), format),
    Commands::Builds { owner } => cmd_builds(&config, &owner, format),
    Commands::Show { id, code } => cmd_show(&config, &id, code, format),
  }
}
