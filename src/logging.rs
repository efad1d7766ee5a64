//! Tracing subscriber setup.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Keeps the non-blocking file writer flushing; hold it until exit.
pub struct LogGuard {
  _guard: Option<WorkerGuard>,
}

/// Pick this crate's level: `-v` flags beat the config file.
pub fn level_for(config: &LogConfig, verbose: u8) -> &str {
  match verbose {
    0 => config.level.as_deref().unwrap_or("warn"),
    1 => "info",
    2 => "debug",
    _ => "trace",
  }
}

/// Filter directive: everything else stays at warn.
pub fn filter_directive(level: &str) -> String {
  format!("warn,fetchloop={}", level)
}

/// Install the global subscriber. `RUST_LOG` overrides everything.
pub fn init(config: &LogConfig, verbose: u8) -> Result<LogGuard> {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(filter_directive(level_for(config, verbose))))
    .map_err(|e| eyre!("Invalid log filter: {}", e))?;

  match &config.dir {
    Some(dir) => {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      let appender = tracing_appender::rolling::daily(dir, "fetchloop.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);

      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install logger: {}", e))?;

      Ok(LogGuard {
        _guard: Some(guard),
      })
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| eyre!("Failed to install logger: {}", e))?;

      Ok(LogGuard { _guard: None })
    }
  }
}
