use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use threadline_api::{
    build_router,
    config::{Config, StorageBackend},
    state::AppState,
};
use threadline_llm::HttpClientFactory;
use threadline_persist::ChatStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Threadline API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let store = connect_store(&config).await?;

    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        Arc::new(HttpClientFactory),
    ));

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn connect_store(config: &Config) -> anyhow::Result<ChatStore> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(ChatStore::in_memory())
        }
        #[cfg(feature = "mongodb")]
        StorageBackend::Mongodb => {
            let uri = config
                .mongodb_uri
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("MONGODB_URI is required for the mongodb backend"))?;

            tracing::info!("Connecting to MongoDB");
            let client = threadline_persist::MongoPersistenceClient::connect(uri, &config.storage.database).await?;
            tracing::info!("MongoDB connected");
            Ok(ChatStore::new(Arc::new(client)))
        }
        #[cfg(not(feature = "mongodb"))]
        StorageBackend::Mongodb => Err(anyhow::anyhow!(
            "storage.backend = \"mongodb\" requires building with the `mongodb` feature"
        )),
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        }
        _ => {
            registry.with(tracing_subscriber::fmt::layer().pretty()).init();
        }
    }
}
