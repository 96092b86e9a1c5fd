use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::fmt::Display;

use crate::playlist::sync::SyncError;
use crate::relay::hub::SubmitError;

pub type AppResult<T> = Result<T, AppErr>;

#[derive(thiserror::Error, Debug)]   // ✅ thiserror 宏
pub enum AppErr {
    /// ingress 缺欄位,對外一律同一句話(哪個欄位缺留在 log 就好)
    #[error("Missing required fields")]
    Validation(#[from] SubmitError),

    #[error("Bad request: {0}")]
    Bad(String),

    #[error("DB: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Upstream feed: {0}")]
    Feed(#[from] reqwest::Error),
}

impl From<SyncError> for AppErr {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Fetch(e) => AppErr::Feed(e),
            SyncError::Store(e) => AppErr::Db(e),
        }
    }
}

impl IntoResponse for AppErr {
    fn into_response(self) -> axum::response::Response {
        let code = match &self {
            AppErr::Validation(_) | AppErr::Bad(_) => StatusCode::BAD_REQUEST,
            AppErr::Feed(_) => StatusCode::BAD_GATEWAY,
            AppErr::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // SQL 細節不外漏
        let msg = match &self {
            AppErr::Db(e) => {
                tracing::error!(error = %e, "database access failed");
                "Database access failed".to_string()
            }
            other => other.to_string(),
        };
        (code, Json(json!({ "error": msg }))).into_response()
    }
}

/* ── 小助手：把任何 error 轉成 Bad ── */
pub fn bad<E: Display>(e: E) -> AppErr { AppErr::Bad(e.to_string()) }
