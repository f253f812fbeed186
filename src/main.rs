use axum::{routing::get, Router};
use std::env;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::{trace::TraceLayer, cors::{Any, CorsLayer}};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutor_lms_store::{config::Config, routes, storage::FileStorage, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "tutor_lms_store=info,tower_http=info".into())
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let storage = FileStorage::new(&config.data_dir).with_quota(config.storage_quota);
    let store = Store::open(storage, config.storage_key.clone());
    tracing::info!(data_dir = %config.data_dir.display(), key = %config.storage_key, "store ready");

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::router(Arc::new(Mutex::new(store))))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on http://0.0.0.0:{}", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}
