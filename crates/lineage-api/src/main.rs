use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lineage_api::{build_router, config::Config, state::AppState};
use lineage_kg::{CachedGraph, KnowledgeGraph, WikidataClient, WikidataConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("Starting Lineage API server");
    tracing::info!(
        domain = %config.explorer.domain,
        default_depth = config.explorer.default_depth,
        "Config loaded: {}:{}",
        config.server.host,
        config.server.port
    );

    // Knowledge graph backend, labels cached across sessions
    let client = WikidataClient::new(WikidataConfig::from(&config.wikidata))?;
    let graph: Arc<dyn KnowledgeGraph> =
        Arc::new(CachedGraph::new(client, config.wikidata.label_cache_size));

    let state = Arc::new(AppState::from_graph(config.clone(), graph)?);

    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("WebSocket: ws://{}/ws", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
