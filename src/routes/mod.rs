use axum::Router;

pub mod chat;
pub mod songs;
pub mod ws;

pub fn router() -> Router {
    Router::new()
        .nest("/api", chat::router().merge(songs::router()))
        .merge(ws::router())
}
