//! lifelink-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, spawns the expiry sweeper, and serves the JSON
//! API over HTTP. Every setting can also come from a `LIFELINK_`-prefixed
//! environment variable.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use lifelink_core::{
  eligibility::CooldownPolicy, requisition::FulfillmentPolicy,
};
use lifelink_engine::{Engine, EngineConfig, LogTransport};
use lifelink_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
struct ServerConfig {
  #[serde(default = "default_host")]
  host:                String,
  #[serde(default = "default_port")]
  port:                u16,
  #[serde(default = "default_store_path")]
  store_path:          PathBuf,
  #[serde(default = "default_fan_out_limit")]
  fan_out_limit:       usize,
  #[serde(default = "default_fan_out_concurrency")]
  fan_out_concurrency: usize,
  #[serde(default = "default_dispatch_attempts")]
  dispatch_attempts:   u32,
  #[serde(default = "default_cooldown_days")]
  cooldown_days:       i64,
  /// When false, requisitions only fulfil on the requester's say-so.
  #[serde(default = "default_auto_fulfill")]
  auto_fulfill:        bool,
  #[serde(default = "default_sweep_interval_secs")]
  sweep_interval_secs: u64,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 5380 }
fn default_store_path() -> PathBuf { PathBuf::from("lifelink.db") }
fn default_fan_out_limit() -> usize { 100 }
fn default_fan_out_concurrency() -> usize { 8 }
fn default_dispatch_attempts() -> u32 { 3 }
fn default_cooldown_days() -> i64 { 90 }
fn default_auto_fulfill() -> bool { true }
fn default_sweep_interval_secs() -> u64 { 60 }

impl ServerConfig {
  fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      fan_out_limit:       self.fan_out_limit,
      fan_out_concurrency: self.fan_out_concurrency,
      dispatch_attempts:   self.dispatch_attempts,
      cooldown:            CooldownPolicy { days: self.cooldown_days },
      fulfillment:         if self.auto_fulfill {
        FulfillmentPolicy::Auto
      } else {
        FulfillmentPolicy::Manual
      },
      sweep_interval:      Duration::from_secs(self.sweep_interval_secs),
      ..EngineConfig::default()
    }
  }
}

// ─── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "LifeLink donor-matching server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("LIFELINK"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Build the engine and start the background expiry sweeper.
  let engine = Arc::new(Engine::new(
    Arc::new(store),
    Arc::new(LogTransport),
    server_cfg.engine_config(),
  ));
  let _sweeper = Arc::clone(&engine).spawn_sweeper();

  let app = lifelink_api::api_router(engine).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
