use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod handlers;
mod models;
mod rate_limit;
mod state;
mod upload;

use pagemill_core::{Config, TaskStore, sweep_stale_files};
use pagemill_extract::Extractor;
use pagemill_extract::strategy::ExtractionStrategy;
use pagemill_extract::strategy::lopdf::LopdfStrategy;
use pagemill_mupdf::MupdfStrategy;
use rate_limit::ClientRateLimiter;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Log to stdout and to pagemill.log in the working directory.
    let file_appender = tracing_appender::rolling::never(".", "pagemill.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    let mut config = Config::load();
    if let Ok(dir) = std::env::var("PAGEMILL_UPLOAD_DIR") {
        config.upload_dir = dir.into();
    }
    if let Ok(dir) = std::env::var("PAGEMILL_RESULTS_DIR") {
        config.results_dir = dir.into();
    }
    if let Ok(host) = std::env::var("PAGEMILL_HOST") {
        config.host = host;
    }
    if let Some(port) = std::env::var("PAGEMILL_PORT").ok().and_then(|p| p.parse().ok()) {
        config.port = port;
    }
    let config = Arc::new(config);

    std::fs::create_dir_all(&config.upload_dir)?;
    std::fs::create_dir_all(&config.results_dir)?;

    // The task store is memory-resident, so files left behind by an earlier
    // run have no owner and are swept by age.
    sweep_stale_files(&[&config.upload_dir, &config.results_dir], config.retention);

    let strategies: Vec<Arc<dyn ExtractionStrategy>> =
        vec![Arc::new(MupdfStrategy::new()), Arc::new(LopdfStrategy)];
    let extractor = Arc::new(Extractor::with_config(strategies, config.extract_config()));

    let state = Arc::new(AppState {
        store: TaskStore::new(),
        extractor,
        rate_limiter: ClientRateLimiter::new(config.rate_limit, config.rate_window),
        config: config.clone(),
    });

    // Allow large file uploads (500MB)
    let body_limit = axum::extract::DefaultBodyLimit::max(500 * 1024 * 1024);

    let app = axum::Router::new()
        .route("/api/upload", axum::routing::post(handlers::upload::upload))
        .route(
            "/api/status/{task_id}",
            axum::routing::get(handlers::status::status),
        )
        .route(
            "/api/download/{task_id}",
            axum::routing::get(handlers::download::download),
        )
        .route(
            "/api/tasks/{task_id}",
            axum::routing::delete(handlers::delete::delete),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit::require_quota,
        ))
        .layer(CorsLayer::permissive())
        .layer(body_limit)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(%addr, "listening");
    println!("Listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
