use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use battle_stats_api::config::{self, AppConfig};
use battle_stats_api::database::models::User;
use battle_stats_api::database::{BattleStore, DatabaseManager, MemoryBattleStore, PgBattleStore};
use battle_stats_api::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "battle-stats-api")]
#[command(about = "Token-gated query and statistics API over battle records")]
#[command(version)]
struct Args {
    /// Listen port (overrides BATTLE_API_PORT / PORT)
    #[arg(long)]
    port: Option<u16>,

    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Postgres connection string (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Serve battles from a JSON file held in memory instead of Postgres
    #[arg(long, conflicts_with = "database_url")]
    fixture: Option<PathBuf>,

    /// Principal allowed to request tokens when serving a fixture (repeatable)
    #[arg(long = "user", requires = "fixture")]
    users: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and JWT_SECRET can live there
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config: AppConfig = config::config().clone();
    if let Some(url) = &args.database_url {
        config.database.url = Some(url.clone());
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    config.validate().map_err(anyhow::Error::msg)?;

    tracing::info!("Starting Battle Stats API in {:?} mode", config.environment);

    let store = build_store(&args, &config).await?;
    let state = AppState::new(store, config.clone()).context("token signing setup")?;

    let addr: SocketAddr = format!("{}:{}", args.bind, config.api.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.bind, config.api.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Battle Stats API listening on http://{}", addr);

    axum::serve(listener, battle_stats_api::app(state)).await?;
    Ok(())
}

async fn build_store(args: &Args, config: &AppConfig) -> anyhow::Result<Arc<dyn BattleStore>> {
    if let Some(path) = &args.fixture {
        let battles = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let users = args.users.iter().map(User::new).collect();
        let store = MemoryBattleStore::from_json(&battles, users)?;
        tracing::info!("Serving {} battles from {}", store.battles().len(), path.display());
        return Ok(Arc::new(store));
    }

    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::health_check(&pool).await?;
    Ok(Arc::new(PgBattleStore::new(pool, &config.database)?))
}
