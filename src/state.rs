use std::sync::Arc;

use tokio::sync::RwLock;

use crate::relay::hub::ChatHub;

/* ------------ 聊天中繼 ------------ */

/// hub 全部走這一把鎖:訂閱 + 補發快照是同一個臨界區,
/// 不會有「快照拿完、廣播名單還沒進去」的空窗。
pub type SharedHub = Arc<RwLock<ChatHub>>;

pub fn new_hub(capacity: usize) -> SharedHub {
    Arc::new(RwLock::new(ChatHub::new(capacity)))
}
