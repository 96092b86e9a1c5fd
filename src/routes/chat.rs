//! routes/chat.rs — 訊息 ingress 與歷史快照

use axum::{extract::Extension, routing::{get, post}, Json, Router};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::relay::hub::Submission;
use crate::relay::ChatMessage;
use crate::state::SharedHub;

pub fn router() -> Router {
    Router::new()
        .route("/message", post(post_message))
        .route("/messages", get(get_messages))
}

/* ---------------- ingress ---------------- */
async fn post_message(
    Extension(hub): Extension<SharedHub>,
    Json(input): Json<Submission>,
) -> AppResult<Json<Value>> {
    let msg = hub.write().await.submit(input)?;
    tracing::debug!(from = %msg.username, "message relayed");
    Ok(Json(json!({ "success": true })))
}

/* ---------------- 快照 ---------------- */
async fn get_messages(Extension(hub): Extension<SharedHub>) -> Json<Vec<ChatMessage>> {
    Json(hub.read().await.snapshot())
}
