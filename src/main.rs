use clap::{ArgAction, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use fetchloop::cache::derive_cache_key;
use fetchloop::config::Config;
use fetchloop::{
  logging, render, FetchEngine, KeyValueStore, LifecycleState, Method, NoopStore,
  ReqwestTransport, RequestConfig, SqliteStore,
};

#[derive(Parser, Debug)]
#[command(name = "fetchloop")]
#[command(about = "Fetch, cache and poll a JSON resource")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./fetchloop.yaml or $XDG_CONFIG_HOME/fetchloop/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// SQLite store location, overriding the config file
  #[arg(long, global = true)]
  store: Option<PathBuf>,

  /// Don't read or write any cache store
  #[arg(long, global = true)]
  no_store: bool,

  /// More log output (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch once and print the result
  Get(RequestArgs),
  /// Keep printing state changes; press Enter to retry
  Watch {
    #[command(flatten)]
    request: RequestArgs,

    /// Exit after this many settled (success or error) states
    #[arg(long)]
    count: Option<usize>,

    /// One line per state, cut to this many characters
    #[arg(long, value_name = "WIDTH", num_args = 0..=1, default_missing_value = "120")]
    compact: Option<usize>,
  },
}

#[derive(clap::Args, Debug, Default)]
struct RequestArgs {
  /// Named request from the config file, or a URL
  target: String,

  #[arg(short = 'X', long)]
  method: Option<Method>,

  /// Extra header as "Name: value" (repeatable)
  #[arg(short = 'H', long = "header")]
  headers: Vec<String>,

  /// JSON request body
  #[arg(short, long)]
  body: Option<String>,

  /// Cache the response under this key
  #[arg(long)]
  cache_key: Option<String>,

  /// Cache under a key derived from method, URL and body
  #[arg(long)]
  cache: bool,

  /// Cache expiration in milliseconds
  #[arg(long)]
  cache_ttl: Option<u64>,

  /// Polling interval in milliseconds
  #[arg(long)]
  poll: Option<u64>,

  /// Per-request network timeout in milliseconds
  #[arg(long)]
  timeout: Option<u64>,
}

/// Build the request from a named config entry or a URL, then apply flags.
fn resolve_request(config: &Config, args: &RequestArgs) -> Result<RequestConfig> {
  let mut request = match config.request(&args.target) {
    Some(named) => named.clone(),
    None => RequestConfig::new(args.target.clone()),
  };

  if let Some(method) = args.method {
    request.method = method;
  }

  for header in &args.headers {
    let (name, value) = header
      .split_once(':')
      .ok_or_else(|| eyre!("Invalid header '{}', expected \"Name: value\"", header))?;
    request
      .headers
      .insert(name.trim().to_string(), value.trim().to_string());
  }

  if let Some(body) = &args.body {
    let body = serde_json::from_str(body).map_err(|e| eyre!("Invalid JSON body: {}", e))?;
    request.body = Some(body);
  }

  if let Some(ttl) = args.cache_ttl {
    request.cache_expiration_ms = ttl;
  }

  if let Some(poll) = args.poll {
    request.polling_interval_ms = Some(poll);
  }

  if let Some(key) = &args.cache_key {
    request.cache_key = Some(key.clone());
  } else if args.cache && request.cache_key().is_none() {
    request.cache_key = Some(derive_cache_key(&request));
  }

  request.validate()?;
  Ok(request)
}

fn open_store(args: &Args, config: &Config) -> Result<Arc<dyn KeyValueStore>> {
  if args.no_store || config.store.disabled {
    return Ok(Arc::new(NoopStore));
  }

  let store = match args.store.as_ref().or(config.store.path.as_ref()) {
    Some(path) => SqliteStore::open_at(path),
    None => SqliteStore::open(),
  }
  .map_err(|e| eyre!("Failed to open cache store: {}", e))?;

  Ok(Arc::new(store))
}

fn build_engine(args: &Args, config: &Config, request_args: &RequestArgs) -> Result<FetchEngine> {
  let request = resolve_request(config, request_args)?;
  let transport = match request_args.timeout {
    Some(ms) => ReqwestTransport::with_timeout(Duration::from_millis(ms))?,
    None => ReqwestTransport::new()?,
  };
  let store = open_store(args, config)?;

  tracing::info!(url = %request.url, cache_key = ?request.cache_key, "Starting engine");
  Ok(FetchEngine::new(request, Arc::new(transport), store)?)
}

async fn run_get(engine: FetchEngine) -> Result<ExitCode> {
  let mut events = engine.subscribe();
  engine.start();

  while let Some(state) = events.next().await {
    if state.is_loading() {
      continue;
    }

    engine.dispose();
    return if state.is_error() {
      eprintln!("Error: {}", state.error().unwrap_or("unknown error"));
      Ok(ExitCode::FAILURE)
    } else {
      println!("{}", render::render(&state));
      Ok(ExitCode::SUCCESS)
    };
  }

  Err(eyre!("Engine stopped before the request settled"))
}

fn watch_line(state: &LifecycleState, compact: Option<usize>) -> String {
  let stamp = chrono::Local::now().format("%H:%M:%S");
  match compact {
    Some(width) => format!("[{}] {}", stamp, render::status_line(state, width)),
    None => format!("[{}] {}", stamp, render::render(state)),
  }
}

async fn run_watch(
  engine: FetchEngine,
  count: Option<usize>,
  compact: Option<usize>,
) -> Result<ExitCode> {
  let mut events = engine.subscribe();
  let mut stdin = BufReader::new(tokio::io::stdin()).lines();
  let mut stdin_open = true;
  let mut settled = 0usize;

  let ctrl_c = tokio::signal::ctrl_c();
  tokio::pin!(ctrl_c);

  engine.start();

  loop {
    tokio::select! {
      state = events.next() => {
        let Some(state) = state else {
          break;
        };
        println!("{}", watch_line(&state, compact));

        if !state.is_loading() {
          settled += 1;
          if count.is_some_and(|n| settled >= n) {
            break;
          }
        }
      }
      line = stdin.next_line(), if stdin_open => {
        match line {
          Ok(Some(_)) => {
            tracing::info!("Manual retry");
            engine.retry();
          }
          Ok(None) => stdin_open = false,
          Err(e) => {
            tracing::warn!(error = %e, "Failed to read stdin, retry disabled");
            stdin_open = false;
          }
        }
      }
      _ = &mut ctrl_c => break,
    }
  }

  engine.dispose();
  Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log, args.verbose)?;

  match &args.command {
    Command::Get(request) => {
      let engine = build_engine(&args, &config, request)?;
      run_get(engine).await
    }
    Command::Watch {
      request,
      count,
      compact,
    } => {
      let engine = build_engine(&args, &config, request)?;
      run_watch(engine, *count, *compact).await
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(target: &str) -> RequestArgs {
    RequestArgs {
      target: target.to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn test_resolve_literal_url() {
    let request = resolve_request(&Config::default(), &args("https://example.com/a")).unwrap();
    assert_eq!(request, RequestConfig::new("https://example.com/a"));
  }

  #[test]
  fn test_resolve_named_request_with_overrides() {
    let config = Config::parse(
      "requests:\n  users:\n    url: https://example.com/users\n    cache_key: users\n",
    )
    .unwrap();
    let mut request_args = args("users");
    request_args.method = Some(Method::POST);
    request_args.headers = vec!["Authorization: Bearer t".to_string()];
    request_args.body = Some(r#"{"a":1}"#.to_string());
    request_args.poll = Some(2000);
    request_args.cache_ttl = Some(0);

    let request = resolve_request(&config, &request_args).unwrap();
    assert_eq!(request.url, "https://example.com/users");
    assert_eq!(request.method, Method::POST);
    assert_eq!(
      request.headers.get("Authorization").map(String::as_str),
      Some("Bearer t")
    );
    assert_eq!(request.body, Some(serde_json::json!({"a": 1})));
    assert_eq!(request.polling_interval_ms, Some(2000));
    assert_eq!(request.cache_expiration_ms, 0);
    assert_eq!(request.cache_key.as_deref(), Some("users"));
  }

  #[test]
  fn test_resolve_derived_cache_key() {
    let mut request_args = args("https://example.com/a");
    request_args.cache = true;
    let request = resolve_request(&Config::default(), &request_args).unwrap();
    assert_eq!(
      request.cache_key,
      Some(derive_cache_key(&RequestConfig::new("https://example.com/a")))
    );
  }

  #[test]
  fn test_resolve_rejects_bad_input() {
    let mut request_args = args("https://example.com/a");
    request_args.headers = vec!["no-colon".to_string()];
    assert!(resolve_request(&Config::default(), &request_args).is_err());

    let mut request_args = args("https://example.com/a");
    request_args.body = Some("{".to_string());
    assert!(resolve_request(&Config::default(), &request_args).is_err());

    let mut request_args = args("https://example.com/a");
    request_args.poll = Some(0);
    assert!(resolve_request(&Config::default(), &request_args).is_err());

    assert!(resolve_request(&Config::default(), &args("users")).is_err());
  }

  #[test]
  fn test_cli_parses() {
    let args = Args::try_parse_from([
      "fetchloop",
      "-vv",
      "watch",
      "https://example.com/a",
      "-X",
      "post",
      "-H",
      "Accept: application/json",
      "--poll",
      "1000",
      "--count",
      "3",
    ])
    .unwrap();
    assert_eq!(args.verbose, 2);
    match args.command {
      Command::Watch {
        request,
        count,
        compact,
      } => {
        assert_eq!(request.method, Some(Method::POST));
        assert_eq!(request.poll, Some(1000));
        assert_eq!(count, Some(3));
        assert_eq!(compact, None);
      }
      other => panic!("unexpected command: {:?}", other),
    }
  }

  #[test]
  fn test_compact_flag() {
    let args =
      Args::try_parse_from(["fetchloop", "watch", "https://example.com/a", "--compact"]).unwrap();
    assert!(matches!(args.command, Command::Watch { compact: Some(120), .. }));

    let args = Args::try_parse_from([
      "fetchloop",
      "watch",
      "https://example.com/a",
      "--compact=12",
    ])
    .unwrap();
    assert!(matches!(args.command, Command::Watch { compact: Some(12), .. }));
  }

  #[test]
  fn test_watch_line_compact() {
    let state = LifecycleState {
      phase: fetchloop::Phase::Error,
      data: None,
      error_message: Some("HTTP error! Status: 503".to_string()),
      source: None,
    };
    assert!(watch_line(&state, Some(80)).ends_with("] error: HTTP error! Status: 503"));
    assert!(watch_line(&state, Some(10)).ends_with("] error: ..."));
    assert!(watch_line(&state, None).ends_with("Press Enter to retry"));
  }
}
