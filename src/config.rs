use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://dummyjson.com";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_STALE_SECS: u64 = 60;

/// Environment variable overriding `api.base_url`
pub const BASE_URL_ENV: &str = "CATADMIN_BASE_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Number of products per page
  #[serde(default = "default_page_size")]
  pub page_size: usize,
  /// Seconds a fetched page is served before a read refetches it
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  /// Write tracing output to this file; logging is off when unset
  pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api: ApiConfig::default(),
      page_size: default_page_size(),
      stale_secs: default_stale_secs(),
      title: None,
      log_file: None,
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_page_size() -> usize {
  DEFAULT_PAGE_SIZE
}

fn default_stale_secs() -> u64 {
  DEFAULT_STALE_SECS
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./catadmin.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/catadmin/config.yaml
  ///
  /// No file at all means defaults; only an explicit path must exist.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var(BASE_URL_ENV) {
      if !url.trim().is_empty() {
        config.api.base_url = url;
      }
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("catadmin.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("catadmin").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    // An empty file is a valid "all defaults" config
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Check values that serde can't: URL shape and page size.
  pub fn validate(&self) -> Result<()> {
    self.base_url()?;
    if self.page_size == 0 {
      return Err(eyre!("page_size must be greater than 0"));
    }
    Ok(())
  }

  /// Parsed API base URL.
  pub fn base_url(&self) -> Result<Url> {
    let raw = self.api.base_url.trim();
    if raw.is_empty() {
      return Err(eyre!("api.base_url must not be empty"));
    }
    let url = Url::parse(raw).map_err(|e| eyre!("Invalid api.base_url {}: {}", raw, e))?;
    match url.scheme() {
      "http" | "https" => Ok(url),
      other => Err(eyre!("Unsupported scheme in api.base_url: {}", other)),
    }
  }

  pub fn stale_time(&self) -> Duration {
    Duration::from_secs(self.stale_secs)
  }

  /// Header title: explicit title or the API host.
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    self
      .base_url()
      .ok()
      .map(|u| host_label(&u))
      .filter(|host| !host.is_empty())
      .unwrap_or_else(|| "catalog".to_string())
  }
}

/// `host`, or `host:port` when the URL names a non-default port
pub fn host_label(url: &Url) -> String {
  let host = url.host_str().unwrap_or_default();
  match url.port() {
    Some(port) => format!("{}:{}", host, port),
    None => host.to_string(),
  }
}
