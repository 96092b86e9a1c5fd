pub mod history;
pub mod hub;

use serde::{Deserialize, Serialize};

/* ------------ 聊天訊息 ------------ */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub username: String,
    pub message: String,
    /// producer 給什麼就轉什麼,不解析
    pub timestamp: String,
    #[serde(rename = "userColor", skip_serializing_if = "Option::is_none")]
    pub user_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}
