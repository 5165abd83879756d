//! # userhub server
//!
//! Serves the user directory API. Subcommands cover one-off maintenance:
//!
//! - `db migrate`: apply the embedded MySQL schema migrations
//! - `hash-password`: print the `AUTH_PASSWORD_HASH` value for a password
//!   read from stdin

use std::{io::BufRead, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use userhub_config::{ConfigLoad, ConfigLoader};
use userhub_core::{AuthCrypto, ConnectionPool, PoolConfig, QueryExecutor};
use userhub_server::{
    infra::{
        app_state::MySqlPoolSlot,
        startup::{build_app_state, connection_manager},
    },
    routes::create_app,
};
use zeroize::Zeroizing;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "userhub-server")]
#[command(about = "User directory API with bearer-token authentication")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Alternate env file (defaults to ./.env when present)
    #[arg(long, global = true, env = "USERHUB_ENV_FILE")]
    env_file: Option<PathBuf>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Db(DbCommand),
    /// Read a password from stdin and print its Argon2id hash
    HashPassword,
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.env_file.clone() {
        loader = loader.with_env_file(path);
    }

    match cli.command {
        Some(Command::Db(DbCommand::Migrate)) => run_db_migrate(&loader).await,
        Some(Command::HashPassword) => run_hash_password(&loader),
        None => run_server(&loader, cli.serve).await,
    }
}

fn load_config(loader: &ConfigLoader) -> anyhow::Result<ConfigLoad> {
    let load = loader.load().context("failed to load configuration")?;

    if let Some(path) = load.config.metadata.env_file_path.as_ref() {
        info!(path = %path.display(), "loaded env file");
    }
    for warning in &load.warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(
                    message = %warning.message,
                    hint = %hint,
                    "configuration warning"
                )
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }
    Ok(load)
}

async fn run_server(
    loader: &ConfigLoader,
    args: ServeArgs,
) -> anyhow::Result<()> {
    let ConfigLoad { mut config, .. } = load_config(loader)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    let config = Arc::new(config);
    let slot = Arc::new(MySqlPoolSlot::new());
    let state = build_app_state(config.clone(), slot.clone()).await?;

    let maintenance = config.database.maintenance_interval.map(|period| {
        info!(?period, "pool maintenance enabled");
        state.executor.pool().spawn_maintenance(period)
    });

    let bind_address = config.server.bind_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    let addr = listener.local_addr().context("listener has no address")?;
    info!(%addr, "userhub server listening");

    let served = axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(handle) = maintenance {
        handle.abort();
    }
    slot.shutdown().await;
    info!("server shutdown complete");

    served.context("HTTP server failed")
}

async fn run_db_migrate(loader: &ConfigLoader) -> anyhow::Result<()> {
    let ConfigLoad { config, .. } = load_config(loader)?;
    let manager = connection_manager(&config.database);
    let target = manager.target().to_string();

    let pool = ConnectionPool::connect(
        manager,
        PoolConfig {
            max_connections: 1,
            min_connections: 0,
            max_idle: 1,
            acquire_timeout: config.database.acquire_timeout,
        },
    )
    .await
    .context("invalid pool configuration")?;
    let executor = QueryExecutor::new(pool.clone());

    let migrated = executor
        .migrate()
        .await
        .with_context(|| format!("database migration failed for {target}"));
    pool.shutdown().await;
    migrated?;

    info!(db = %target, "database migrations applied successfully");
    Ok(())
}

fn run_hash_password(loader: &ConfigLoader) -> anyhow::Result<()> {
    let ConfigLoad { config, .. } = load_config(loader)?;
    let crypto = AuthCrypto::new(&config.auth.password_pepper)
        .context("invalid password pepper")?;

    let mut line = Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }

    let hash = crypto
        .hash_password(password)
        .context("failed to hash password")?;
    println!("{hash}");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, starting shutdown"),
        _ = terminate => info!("received SIGTERM, starting shutdown"),
    }
}
