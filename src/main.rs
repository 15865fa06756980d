use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moderation_gateway::cli::{self, Commands, TokenCommands};
use moderation_gateway::config::{self, Config, Environment};
use moderation_gateway::moderation::RandomAnalyzer;
use moderation_gateway::store::{self, PgStore};
use moderation_gateway::{tokens, AppState};

/// How long shutdown waits for detached usage writes before closing the store.
const USAGE_DRAIN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load()?;
    init_tracing(&cfg.environment);

    let args = cli::Cli::parse();

    let result = match args.command {
        Some(Commands::Serve { port }) => run_server(cfg, port).await,
        Some(Commands::Migrate) => run_migrations(&cfg).await,
        Some(Commands::Token { command }) => handle_token_command(&cfg, command).await,
        None => run_server(cfg, None).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn init_tracing(environment: &Environment) {
    let filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
        |_| "moderation_gateway=debug,modgate=debug,tower_http=debug".into(),
    ));

    let registry = tracing_subscriber::registry().with(filter);
    if matches!(environment, Environment::Production) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_server(cfg: Config, port: Option<u16>) -> anyhow::Result<()> {
    let store = store::open(&cfg).await?;

    let port = port.unwrap_or(cfg.port);
    let listener = tokio::net::TcpListener::bind((cfg.host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {}:{}", cfg.host, port))?;
    let addr = listener.local_addr()?;
    let environment = cfg.environment;

    let state = Arc::new(AppState::new(cfg, store.clone(), Arc::new(RandomAnalyzer))?);
    let recorder = state.recorder.clone();
    let app = moderation_gateway::router(state);

    tracing::info!(%environment, "moderation gateway listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server stopped");
    recorder.drain(USAGE_DRAIN_GRACE).await;
    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
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
    tracing::info!("shutdown signal received");
}

async fn run_migrations(cfg: &Config) -> anyhow::Result<()> {
    if cfg.uses_memory_store() {
        anyhow::bail!("DATABASE_URL points at the in-memory store; nothing to migrate");
    }
    let db = PgStore::connect(&cfg.database_url, cfg.db_max_connections).await?;
    db.migrate().await?;
    println!("Migrations applied.");
    db.pool().close().await;
    Ok(())
}

async fn handle_token_command(cfg: &Config, cmd: TokenCommands) -> anyhow::Result<()> {
    if cfg.uses_memory_store() {
        anyhow::bail!("token commands need a persistent DATABASE_URL; the in-memory store would discard the result");
    }
    let store = store::open(cfg).await?;

    let outcome = match cmd {
        TokenCommands::Create { admin, description } => {
            let token = tokens::issue(store.as_ref(), admin, description).await?;
            println!("Token created.");
            println!("  ID:     {}", token.id);
            println!("  Admin:  {}", token.is_admin);
            println!("  Secret: {}", token.secret);
            println!("Store the secret now; it cannot be shown again.");
            Ok(())
        }
        TokenCommands::List => {
            let tokens = tokens::list(store.as_ref()).await?;
            if tokens.is_empty() {
                println!("No tokens.");
            }
            for t in tokens {
                println!(
                    "{}  admin={:<5}  uses={:<6}  last_used={}  {}",
                    t.id,
                    t.is_admin,
                    t.usage_count,
                    t.last_used_at
                        .map(|ts| ts.to_rfc3339())
                        .unwrap_or_else(|| "never".into()),
                    t.description.unwrap_or_default(),
                );
            }
            Ok(())
        }
        TokenCommands::Revoke { token } => {
            if store.delete_token(&token).await? {
                println!("Token deleted.");
                Ok(())
            } else {
                Err(anyhow::anyhow!("token not found"))
            }
        }
    };

    store.close().await;
    outcome
}
