use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::request::RequestConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub log: LogConfig,
  #[serde(default)]
  pub store: StoreConfig,
  /// Named requests, addressable by name from the command line
  #[serde(default)]
  pub requests: BTreeMap<String, RequestConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Level for this crate's logs (e.g. "info", "debug"); RUST_LOG wins
  pub level: Option<String>,
  /// Write daily-rolling log files here instead of stderr
  pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
  /// SQLite store location (defaults to the platform data directory)
  pub path: Option<PathBuf>,
  /// Disable persistence entirely
  #[serde(default)]
  pub disabled: bool,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fetchloop.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fetchloop/config.yaml
  ///
  /// No file at all means defaults, unless the path was explicit.
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("fetchloop.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fetchloop").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Parse and validate config file contents.
  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;

    for (name, request) in &config.requests {
      request
        .validate()
        .map_err(|e| eyre!("Request '{}': {}", name, e))?;
    }

    Ok(config)
  }

  /// Look up a named request.
  pub fn request(&self, name: &str) -> Option<&RequestConfig> {
    self.requests.get(name)
  }
}
