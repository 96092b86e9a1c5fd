//! routes/songs.rs — 歌單查詢、統計、手動同步

use axum::{
    extract::{Extension, Query},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{bad, AppResult};
use crate::playlist::query::{self, PageRequest, PageResult, RawPageQuery};
use crate::playlist::store::SongStore;
use crate::playlist::sync::SyncService;
use crate::playlist::{duration_secs, format_duration, Song};

pub fn router() -> Router {
    Router::new()
        .route("/songs", get(get_songs))
        .route("/songs/most-played", get(most_played))
        .route("/stats", get(get_stats))
        .route("/latest-song-time", get(latest_song_time))
        .route("/playlist/status", get(playlist_status))
        .route("/playlist/sync", post(force_sync))
}

/* ---------------- 分頁回應 ---------------- */

/// 新舊兩代前端吃的欄位不一樣,乾脆同一份 body 兩套都給:
/// dashboard 用 songs/totalSongs/hasNext,舊版還在讀 content/totalElements/last。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageBody {
    songs: Vec<Song>,
    total_songs: i64,
    current_page: i64,
    total_pages: i64,
    has_next: bool,
    has_previous: bool,
    showing_songs: usize,
    content: Vec<Song>,
    total_elements: i64,
    number: i64,
    first: bool,
    last: bool,
}

impl From<PageResult> for PageBody {
    fn from(p: PageResult) -> Self {
        Self {
            songs: p.items.clone(),
            total_songs: p.total_elements,
            current_page: p.page_number,
            total_pages: p.total_pages,
            has_next: !p.is_last,
            has_previous: !p.is_first,
            showing_songs: p.items.len(),
            content: p.items,
            total_elements: p.total_elements,
            number: p.page_number,
            first: p.is_first,
            last: p.is_last,
        }
    }
}

/* ---------------- handlers ---------------- */

async fn get_songs(
    Extension(store): Extension<SongStore>,
    Query(raw): Query<RawPageQuery>,
) -> AppResult<Json<PageBody>> {
    let req = PageRequest::parse(raw).map_err(bad)?;
    let catalog = store.fetch_all().await?;
    Ok(Json(query::run(&req, catalog).into()))
}

async fn most_played(Extension(store): Extension<SongStore>) -> AppResult<Json<Vec<Song>>> {
    Ok(Json(store.top_played(20).await?))
}

async fn get_stats(Extension(store): Extension<SongStore>) -> AppResult<Json<Value>> {
    let catalog = store.fetch_all().await?;
    let total_secs: i64 = catalog.iter().map(|s| duration_secs(&s.duration)).sum();
    let most_played = store.most_played().await?;
    Ok(Json(json!({
        "totalSongs": catalog.len(),
        "totalDuration": format_duration(total_secs),
        "mostPlayedSong": most_played,
    })))
}

async fn latest_song_time(Extension(store): Extension<SongStore>) -> AppResult<Json<Value>> {
    let latest = store.latest_added_at().await?;
    Ok(Json(json!({ "timestamp": latest.map(|t| t.to_rfc3339()) })))
}

async fn playlist_status(Extension(store): Extension<SongStore>) -> AppResult<Json<Value>> {
    let total = store.count().await?;
    let available = total > 0;
    Ok(Json(json!({
        "totalSongs": total,
        "isAvailable": available,
        "status": if available { "ready" } else { "syncing" },
        "totalPlays": store.total_plays().await?,
        "playedSongs": store.played_count().await?,
    })))
}

/// 跑完整輪對帳才回應,順便回報這輪動了多少
async fn force_sync(Extension(sync): Extension<SyncService>) -> AppResult<Json<Value>> {
    let report = sync.sync_once().await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Playlist sync completed",
        "added": report.added,
        "removed": report.removed,
        "repaired": report.repaired,
    })))
}
