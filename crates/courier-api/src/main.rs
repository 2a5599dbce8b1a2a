//! Courier API server entry point.

use std::sync::Arc;

use courier_api::config::ServerConfig;
use courier_api::error::AppError;
use courier_api::state::AppState;
use courier_core::clock::SystemClock;
use courier_core::repository::EventRepository;
use courier_event_store::in_memory::InMemoryEventRepository;
use courier_event_store::pg_event_repository::PgEventRepository;
use courier_messaging::spawn_relay_workers;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Courier API server");

    let config = ServerConfig::from_env()?;
    let addr = config.socket_addr()?;

    let event_repository: Arc<dyn EventRepository> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            sqlx::migrate!("../../migrations").run(&pool).await?;
            tracing::info!("using PostgreSQL event store");
            Arc::new(PgEventRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; events are kept in memory only");
            Arc::new(InMemoryEventRepository::new())
        }
    };

    let app_state = AppState::new(event_repository, Arc::new(SystemClock))?;
    let queue = Arc::clone(&app_state.queue);
    let workers = spawn_relay_workers(
        Arc::clone(&app_state.service),
        Arc::clone(&queue),
        config.relay_workers,
    );
    tracing::info!(relay_workers = config.relay_workers, "relay workers started");

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = courier_api::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let the workers finish what is already queued.
    queue.close();
    for worker in workers {
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "relay worker panicked");
        }
    }
    tracing::info!("Courier API server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
