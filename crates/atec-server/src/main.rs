use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use atec_auth::SharedCryptor;
use atec_core::models::user::Role;
use atec_server::config::{self, AppConfig, DEFAULT_CONFIG_PATH};
use atec_server::state::{AppState, Backends};
use atec_storage::repository::UserRepository;
use clap::{Parser, Subcommand};
use eyre::WrapErr;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "atec-server")]
#[command(about = "ATEC questionnaire service")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, global = true, env = "ATEC_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Create the admin account from INIT_ADMIN_* before serving.
        #[arg(long, default_value_t = false)]
        init_admin_account: bool,
        /// Seed the stock ATEC package when no package is active.
        #[arg(long, default_value_t = false)]
        init_package: bool,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = config::load(&cli.config)?;
    init_tracing(&config.log_level);

    match cli.command {
        Command::Serve {
            init_admin_account,
            init_package,
        } => serve(config, init_admin_account, init_package).await,
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();
}

async fn serve(config: AppConfig, init_admin_account: bool, init_package: bool) -> eyre::Result<()> {
    let key = std::fs::read(&config.crypto.private_key_path).wrap_err_with(|| {
        format!("failed to read private key at {}", config.crypto.private_key_path.display())
    })?;
    let cryptor = Arc::new(SharedCryptor::new(&key, &config.crypto.iv_hex, config.crypto.bcrypt_cost)?);

    let backends = Backends::connect(&config).await?;
    let users = backends.users.clone();
    let tracker = TaskTracker::new();
    let state = AppState::new(&config, cryptor, backends, tracker.clone());

    if init_admin_account {
        let email = required_env("INIT_ADMIN_EMAIL")?;
        let password = required_env("INIT_ADMIN_PASSWORD")?;
        let username = required_env("INIT_ADMIN_USERNAME")?;
        state.auth.init_admin_account(&email, &password, &username).await?;
    }
    if init_package {
        let admin = users
            .find_by_role(Role::Admin, 1, 0)
            .await
            .wrap_err("seeding the default package needs an admin account")?
            .into_iter()
            .next()
            .ok_or_else(|| eyre::eyre!("seeding the default package needs an admin account"))?;
        if let Some(id) = state.packages.ensure_default_package(admin.id).await? {
            info!(package_id = %id, "default package created");
        }
    }

    let grace = config.shutdown_grace();
    let app = atec_server::app(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server.port)).await?;
    info!(port = config.server.port, "atec-server listening");

    let (stopping_tx, stopping_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            let _ = stopping_tx.send(());
        })
        .into_future();

    tokio::select! {
        res = server => res?,
        _ = async {
            if stopping_rx.await.is_ok() {
                tokio::time::sleep(grace).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => warn!(grace_secs = grace.as_secs(), "in-flight requests still running after grace period, closing"),
    }

    tracker.close();
    if tokio::time::timeout(grace, tracker.wait()).await.is_err() {
        warn!(pending = tracker.len(), "detached tasks still running at exit");
    }
    info!("atec-server stopped");
    Ok(())
}

fn required_env(key: &str) -> eyre::Result<String> {
    std::env::var(key).wrap_err_with(|| format!("{key} must be set"))
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
