use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use folio::config::{Backend, Cli, Config};
use folio::db;
use folio::routes;
use folio::state::AppState;
use folio::store::{MemoryStore, SqliteStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    let store: Arc<dyn Store> = match config.database.backend {
        Backend::Sqlite => {
            let data_dir = Config::data_dir(&cli)?;
            std::fs::create_dir_all(&data_dir)?;
            tracing::info!("Data directory: {}", data_dir.display());

            let db_path = config.db_path();
            let pool = db::create_pool(&db_path)?;
            db::run_migrations(&pool)?;
            tracing::info!("Database ready at {}", db_path.display());
            Arc::new(SqliteStore::new(pool))
        }
        Backend::Memory => {
            tracing::warn!("Using in-memory store; nothing will be persisted");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, config.clone());
    let app = routes::app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Folio listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
