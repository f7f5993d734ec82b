use log::info;
use tokio::net::TcpListener;
use vision_pim::config::{AppConfig, Backend};
use vision_pim::store::{InMemoryStore, Store};
use vision_pim::{connect_postgres, seed, serve_with};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info) // Default to Info for everything
        .filter_module("sqlx", LevelFilter::Warn) // Suppress sqlx Debug logs
        .parse_default_env()
        .init();

    let config = AppConfig::load()?;
    info!(
        "Configuration loaded: server={}:{}, backend={:?}",
        config.server.host, config.server.port, config.database.backend
    );

    match config.database.backend {
        Backend::Memory => run(InMemoryStore::new(), &config).await,
        Backend::Postgres => {
            info!("Connecting to PostgreSQL...");
            let store = connect_postgres(&config).await?;
            run(store, &config).await
        }
    }
}

async fn run<S: Store + 'static>(store: S, config: &AppConfig) -> anyhow::Result<()> {
    // Load seed data for demonstration (optional)
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        info!("Loading seed data...");
        seed::load_seed_data(&store).await?;
    }

    let listener = TcpListener::bind(config.server_address()).await?;
    serve_with(listener, store, config).await
}
