//! Galleria album service.
//!
//! Usage:
//!
//! ```text
//! galleria [--config <path>]
//! ```
//!
//! Configuration is layered: defaults, then the TOML file (`galleria.toml`
//! unless `--config` names another, missing files are fine), then `.env`,
//! then `GALLERIA__*` environment variables.

use std::sync::Arc;

use anyhow::Context;
use galleria_albums::{build_app, AppState};
use galleria_config::{ConfigLoader, DEFAULT_ENV_PREFIX};
use galleria_server::{os_signal, sync_check, HealthRegistry, Server, ServerConfig};
use galleria_telemetry::init_logging;

const DEFAULT_CONFIG_FILE: &str = "galleria.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config_path_from_args(std::env::args().skip(1))?;

    let config = ConfigLoader::new()
        .with_optional_file(&config_path)?
        .with_dotenv()?
        .with_env_prefix(DEFAULT_ENV_PREFIX)
        .load()
        .with_context(|| format!("failed to load configuration from {config_path}"))?;

    init_logging(&config.logging.to_log_config())?;
    tracing::info!(
        version = galleria_albums::VERSION,
        addr = %config.server.http_addr,
        issuer = %config.oidc.issuer_url,
        "starting galleria"
    );

    let health = HealthRegistry::global();
    health.register_health_hook("process", sync_check(|| true));

    let state = AppState::in_memory(&config)?.with_health(Arc::clone(&health));
    let app = build_app(&config, state)?;

    let server_config = ServerConfig::builder()
        .http_addr(config.server.http_addr.clone())
        .shutdown_timeout(config.server.shutdown_timeout())
        .keep_alive(config.server.keep_alive)
        .build();

    Server::new(server_config, app).run_until(os_signal()).await?;
    Ok(())
}

fn config_path_from_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<String> {
    let mut path = DEFAULT_CONFIG_FILE.to_string();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                path = args.next().context("--config requires a path")?;
            }
            other => anyhow::bail!("unknown argument '{other}'"),
        }
    }
    Ok(path)
}
