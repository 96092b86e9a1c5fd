//! routes/ws.rs — 即時訊息推送

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::state::SharedHub;

pub fn router() -> Router {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(ws: WebSocketUpgrade, Extension(hub): Extension<SharedHub>) -> impl IntoResponse {
    ws.on_upgrade(move |sock| subscriber_session(sock, hub))
}

/* ---------------- per subscriber ---------------- */
async fn subscriber_session(sock: WebSocket, hub: SharedHub) {
    // channel 先塞進 hub,initial_messages 跟之後的廣播走同一條隊伍
    let (tx, mut rx) = mpsc::unbounded_channel::<Arc<str>>();
    let id = hub.write().await.subscribe(Box::new(tx));

    let (mut out, mut inbound) = sock.split();
    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(f) => {
                    if out.send(Message::Text(f.to_string())).await.is_err() {
                        break;
                    }
                }
                None => break, // hub 已把我們除名
            },
            msg = inbound.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {} // 訂閱端只收不送,其他 frame 一律忽略
            },
        }
    }
    hub.write().await.unsubscribe(id);
}
