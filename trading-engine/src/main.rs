//! Exchange server binary
//!
//! Loads `.env`, reads the configuration, wires the services together (on
//! PostgreSQL when `DATABASE_URL` is set, in memory otherwise) and serves the
//! API until Ctrl-C or SIGTERM.

mod demo;

use std::sync::Arc;

use account_service::{AccountService, RepositoryType};
use admin_service::{AdminService, AuditLog, InMemoryAuditLog, PostgresAuditLog};
use api_gateway::config::AppConfig;
use api_gateway::exchange::Exchange;
use api_gateway::AppState;
use clap::Parser;
use common::db::{init_db_pool, run_migrations};
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, FmtSubscriber};

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Listening address; defaults to 0.0.0.0 on PORT
    #[clap(short, long)]
    addr: Option<String>,

    /// Seed demo assets, markets, accounts and orders
    #[clap(short, long)]
    demo: bool,

    /// PostgreSQL URL, overrides DATABASE_URL
    #[clap(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // DEBUG=1 raises the default level; RUST_LOG still takes precedence
    let env_debug = std::env::var("DEBUG").unwrap_or_else(|_| "0".to_string());
    let log_level = if env_debug == "1" { Level::DEBUG } else { Level::INFO };
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::CLOSE)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        debug!("Debug logging enabled");
    }

    let mut config = AppConfig::from_env()?;
    if args.database_url.is_some() {
        config.database_url = args.database_url.clone();
    }

    info!("Starting exchange...");

    let (accounts, audit): (AccountService, Arc<dyn AuditLog>) = match &config.database_url {
        Some(url) => {
            let pool = init_db_pool(url, config.db_pool_size).await?;
            run_migrations(&pool).await?;
            (
                AccountService::with_repository(RepositoryType::Postgres(pool.clone())),
                Arc::new(PostgresAuditLog::new(pool)),
            )
        }
        None => {
            info!("DATABASE_URL not set, keeping accounts and audit log in memory");
            (AccountService::new(), Arc::new(InMemoryAuditLog::new()))
        }
    };

    let exchange = Exchange::new(Arc::new(accounts), Arc::new(AdminService::new(audit)), &config);
    exchange.start().await?;

    if args.demo {
        info!("Creating demo data...");
        demo::seed(&exchange, &config).await?;
    }

    let addr = args.addr.unwrap_or_else(|| format!("0.0.0.0:{}", config.port));
    let addr: std::net::SocketAddr = addr.parse()?;
    let app = api_gateway::router(Arc::new(AppState::new(exchange, config)));

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Shutting down");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
