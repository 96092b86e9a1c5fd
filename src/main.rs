mod config;
mod error;
mod playlist;
mod relay;
mod routes;
mod state;

use axum::{extract::DefaultBodyLimit, Extension, Router};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir};

use crate::config::Config;
use crate::playlist::store::SongStore;
use crate::playlist::sync::SyncService;

const BODY_LIMIT: usize = 64 * 1024;   // ingress 只有小 JSON

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().init();

    let cfg = Config::from_env();
    let pool = SqlitePool::connect(&cfg.database_url).await?;
    let store = SongStore::new(pool);
    store.ensure_schema().await?;

    let hub = state::new_hub(cfg.history_capacity);
    let sync = SyncService::new(store.clone(), cfg.feed_url.clone())?;
    if cfg.sync_enabled {
        tokio::spawn(sync.clone().run_interval(cfg.sync_interval));  // 背景對帳
    } else {
        tracing::info!("scheduled playlist sync is off");
    }

    let app = Router::new()
        .merge(routes::router())
        .fallback_service(ServeDir::new("static"))
        .layer(Extension(hub))
        .layer(Extension(store))
        .layer(Extension(sync))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT));

    let addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%addr, feed = %cfg.feed_url, "relay server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
