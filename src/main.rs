use anyhow::Context;
use optjournal::{api, config::Config, db::init_db, ImportOrchestrator, JournalStore, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;

    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("failed to open database at {}", config.database_path))?;

    let store: Arc<dyn JournalStore> = Arc::new(Repository::new(pool));
    let orchestrator = Arc::new(ImportOrchestrator::new(store, config.empty_day_policy));

    let app = api::create_router(api::AppState::new(orchestrator));

    let addr = SocketAddr::new(config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!(%addr, empty_day_policy = %config.empty_day_policy, "Server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
