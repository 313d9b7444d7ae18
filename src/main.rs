mod app;
mod catalog;
mod config;
mod event;
mod query;
mod ui;

#[cfg(test)]
mod test_support;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "catadmin")]
#[command(about = "A terminal admin console for a REST product catalog")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./catadmin.yaml, then $XDG_CONFIG_HOME/catadmin/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Catalog API base URL (overrides config and CATADMIN_BASE_URL)
  #[arg(short, long)]
  base_url: Option<String>,

  /// Products per page
  #[arg(long)]
  page_size: Option<usize>,

  /// Write logs to this file
  #[arg(long)]
  log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration, then let the command line win
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }
  if let Some(page_size) = args.page_size {
    config.page_size = page_size;
  }
  if let Some(log_file) = args.log_file {
    config.log_file = Some(log_file);
  }
  config.validate()?;

  // The TUI owns the terminal, so logs only ever go to a file
  let _guard = match &config.log_file {
    Some(path) => Some(init_logging(path)?),
    None => None,
  };

  // Initialize and run the app
  let mut app = app::App::new(&config)?;
  app.run().await?;

  Ok(())
}

/// Send tracing output to `path` through a background writer.
///
/// The returned guard flushes on drop and must outlive the app.
fn init_logging(path: &Path) -> Result<WorkerGuard> {
  let file_name = path
    .file_name()
    .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;
  let directory = match path.parent() {
    Some(dir) if !dir.as_os_str().is_empty() => dir,
    _ => Path::new("."),
  };
  std::fs::create_dir_all(directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let appender = tracing_appender::rolling::never(directory, file_name);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}
