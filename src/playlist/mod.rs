pub mod query;
pub mod store;
pub mod sync;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/* ------------ 歌曲 ------------ */

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub creator: Option<String>,
    pub album: Option<String>,
    /// 顯示用字串,"m:ss" 或 "h:mm:ss"
    pub duration: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// 播放次數,由站上的播放追蹤器累加
    pub occurrence: i64,
    pub last_played: Option<DateTime<Utc>>,
}

/// "17:38" → 1058;解析不了一律當 0
pub fn duration_secs(text: &str) -> i64 {
    let parts: Vec<&str> = text.split(':').collect();
    let nums: Vec<i64> = parts
        .iter()
        .filter_map(|p| p.trim().parse::<i64>().ok())
        .filter(|n| *n >= 0)
        .collect();
    if nums.len() != parts.len() {
        return 0;
    }
    match nums[..] {
        [m, s] => m * 60 + s,
        [h, m, s] => h * 3600 + m * 60 + s,
        _ => 0,
    }
}

/// 秒數 → "m:ss" / "h:mm:ss";負數一律 "0:00"
pub fn format_duration(total: i64) -> String {
    if total <= 0 {
        return "0:00".into();
    }
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
