use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aggregator;
mod cache;
mod config;
mod pricing;
mod render;
mod routes;
mod sources;

use aggregator::Aggregator;
use cache::SystemClock;
use config::Config;
use routes::{create_router, AppState};
use sources::HttpSources;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "status_dashboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let sources = Arc::new(HttpSources::new(config.clone())?);
    let aggregator = Arc::new(Aggregator::new(sources, Arc::new(SystemClock), config.clone()));

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        config: Arc::new(config),
        aggregator,
    };

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server starting on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
