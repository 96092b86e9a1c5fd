//! relay/hub.rs — 訂閱者名冊 + 廣播

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::history::HistoryBuffer;
use super::ChatMessage;

/* ---------------- wire 事件 ---------------- */

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    InitialMessages { messages: Vec<ChatMessage> },
    NewMessage { message: ChatMessage },
}

impl WireEvent {
    /// 序列化一次,所有訂閱者共用同一份
    fn frame(&self) -> Option<Arc<str>> {
        serde_json::to_string(self).ok().map(Arc::from)
    }
}

/* ---------------- 投遞端點 ---------------- */

/// 對單一訂閱者的一次投遞;Err 表示對端已經不在了
pub trait EventSink: Send + Sync {
    fn send(&self, frame: Arc<str>) -> Result<(), SinkGone>;
}

#[derive(Debug)]
pub struct SinkGone;

impl EventSink for tokio::sync::mpsc::UnboundedSender<Arc<str>> {
    fn send(&self, frame: Arc<str>) -> Result<(), SinkGone> {
        tokio::sync::mpsc::UnboundedSender::send(self, frame).map_err(|_| SinkGone)
    }
}

/* ---------------- ingress payload ---------------- */

#[derive(Debug, Default, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "userColor")]
    pub user_color: Option<String>,
    pub channel: Option<String>,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

/* ---------------- hub ---------------- */

pub struct ChatHub {
    history: HistoryBuffer,
    sinks: HashMap<u64, Box<dyn EventSink>>,
    next_id: u64,
}

impl ChatHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: HistoryBuffer::new(capacity),
            sinks: HashMap::new(),
            next_id: 0,
        }
    }

    /// 註冊訂閱者,先補發目前的歷史快照再列入廣播名單。
    /// 補發失敗視同斷線,不列入。
    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let backlog = WireEvent::InitialMessages { messages: self.history.snapshot() };
        if let Some(frame) = backlog.frame() {
            if sink.send(frame).is_ok() {
                self.sinks.insert(id, sink);
                tracing::debug!(
                    subscriber = id,
                    online = self.sinks.len(),
                    backlog = self.history.len(),
                    "subscriber joined"
                );
            }
        }
        id
    }

    /// 重複呼叫無害
    pub fn unsubscribe(&mut self, id: u64) {
        if self.sinks.remove(&id).is_some() {
            tracing::debug!(subscriber = id, online = self.sinks.len(), "subscriber left");
        }
    }

    /// 每個事件只序列化一次;投遞失敗的訂閱者直接除名,不重試
    pub fn publish(&mut self, event: &WireEvent) {
        let Some(frame) = event.frame() else { return };
        let mut gone = Vec::new();
        for (id, sink) in &self.sinks {
            if sink.send(frame.clone()).is_err() {
                gone.push(*id);
            }
        }
        for id in gone {
            self.sinks.remove(&id);
            tracing::debug!(subscriber = id, "pruned dead subscriber");
        }
    }

    /// 進入點:驗證 → 配 id → 入歷史 → 廣播
    pub fn submit(&mut self, input: Submission) -> Result<ChatMessage, SubmitError> {
        if input.username.is_empty() {
            return Err(SubmitError::MissingField("username"));
        }
        if input.message.is_empty() {
            return Err(SubmitError::MissingField("message"));
        }
        if input.timestamp.is_empty() {
            return Err(SubmitError::MissingField("timestamp"));
        }
        let msg = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            username: input.username,
            message: input.message,
            timestamp: input.timestamp,
            user_color: input.user_color,
            channel: input.channel,
        };
        self.history.append(msg.clone());
        self.publish(&WireEvent::NewMessage { message: msg.clone() });
        Ok(msg)
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.history.snapshot()
    }
}
