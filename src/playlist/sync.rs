//! playlist/sync.rs — 抓遠端歌單 feed,跟資料庫對帳

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use percent_encoding::percent_decode_str;
use tokio::sync::Mutex;
use tokio::time;

use super::format_duration;
use super::store::{NewSong, SongStore};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const FETCH_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);
const DELETE_BATCH: usize = 100;
const INSERT_BATCH: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("feed fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("store update failed: {0}")]
    Store(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedTrack {
    pub title: String,
    pub duration: String,
}

#[derive(Debug, Default, PartialEq)]
pub struct SyncReport {
    pub fetched: usize,
    pub added: u64,
    pub removed: u64,
    pub repaired: u64,
}

#[derive(Clone)]
pub struct SyncService {
    store: SongStore,
    http: reqwest::Client,
    feed_url: String,
    /// 同一時間只允許一輪對帳在跑
    lock: Arc<Mutex<()>>,
}

impl SyncService {
    pub fn new(store: SongStore, feed_url: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { store, http, feed_url, lock: Arc::new(Mutex::new(())) })
    }

    /// 背景排程。interval 的第一個 tick 是立即的,吃掉它:啟動時不同步
    pub async fn run_interval(self, every: Duration) {
        let mut tick = time::interval(every);
        tick.tick().await;
        loop {
            tick.tick().await;
            if let Err(e) = self.sync_once().await {
                tracing::warn!(error = %e, "playlist sync failed");
            }
        }
    }

    /// 手動或排程都走這裡
    pub async fn sync_once(&self) -> Result<SyncReport, SyncError> {
        let _running = self.lock.lock().await;

        let body = self.fetch_feed().await?;
        let tracks = parse_feed(&body);
        if tracks.is_empty() {
            // 空 feed 多半是對面壞掉,不能拿來清空整個目錄
            tracing::warn!("feed came back empty, leaving catalog untouched");
            return Ok(SyncReport::default());
        }

        let report = self.reconcile(tracks).await?;
        tracing::info!(
            fetched = report.fetched,
            added = report.added,
            removed = report.removed,
            repaired = report.repaired,
            "playlist sync completed"
        );
        Ok(report)
    }

    async fn fetch_feed(&self) -> Result<String, reqwest::Error> {
        let mut delay = RETRY_BASE_DELAY;
        let mut attempt = 1;
        loop {
            let result = async {
                self.http
                    .get(&self.feed_url)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await
            }
            .await;
            match result {
                Ok(body) => return Ok(body),
                Err(e) if attempt < FETCH_ATTEMPTS => {
                    tracing::warn!(attempt, error = %e, "feed fetch failed, retrying");
                    time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// feed 是事實標準:不在 feed 的刪掉、新出現的補進來、
    /// 資料庫裡時長壞掉而 feed 有好值的修掉。播放次數不動。
    async fn reconcile(&self, tracks: Vec<FeedTrack>) -> Result<SyncReport, sqlx::Error> {
        let existing: HashMap<String, String> = self
            .store
            .fetch_all()
            .await?
            .into_iter()
            .map(|s| (s.title, s.duration))
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut fresh: Vec<NewSong> = Vec::new();
        let mut repaired = 0u64;
        for t in &tracks {
            if !seen.insert(&t.title) {
                continue; // feed 自己重複
            }
            match existing.get(&t.title) {
                None => fresh.push(NewSong {
                    title: t.title.clone(),
                    duration: t.duration.clone(),
                    created_at: Utc::now(),
                }),
                Some(stale) if broken_duration(stale) && !broken_duration(&t.duration) => {
                    repaired += self.store.fix_duration(&t.title, &t.duration, stale).await?;
                }
                Some(_) => {}
            }
        }

        let stale: Vec<String> = existing
            .keys()
            .filter(|title| !seen.contains(title.as_str()))
            .cloned()
            .collect();

        let mut removed = 0u64;
        for chunk in stale.chunks(DELETE_BATCH) {
            removed += self.store.delete_by_titles(chunk).await?;
        }
        let mut added = 0u64;
        for chunk in fresh.chunks(INSERT_BATCH) {
            added += self.store.insert_new(chunk).await?;
        }

        Ok(SyncReport { fetched: tracks.len(), added, removed, repaired })
    }
}

fn broken_duration(d: &str) -> bool {
    d == "0:00" || d.contains("-1")
}

/* ---------------- feed 解析 ---------------- */

/// 掃 `<leaf … uri="…" duration="…">`。feed 是 VLC 吐的簡單 XML,
/// 格式固定,照屬性字串撿就夠了。
fn parse_feed(xml: &str) -> Vec<FeedTrack> {
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(pos) = rest.find("<leaf") {
        rest = &rest[pos + 5..];
        let element = match rest.find('>') {
            Some(end) => &rest[..end],
            None => rest,
        };
        let Some(uri) = attr(element, "uri") else { continue };
        let Some(title) = title_from_uri(&uri) else { continue };
        let secs = attr(element, "duration")
            .and_then(|d| d.trim().parse::<i64>().ok())
            .unwrap_or(0);
        out.push(FeedTrack { title, duration: format_duration(secs) });
    }
    out
}

fn attr(element: &str, name: &str) -> Option<String> {
    let marker = format!("{name}=\"");
    let start = element.find(&marker)? + marker.len();
    let end = element[start..].find('"')? + start;
    Some(unescape_xml(&element[start..end]))
}

fn unescape_xml(s: &str) -> String {
    s.replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// uri 最後一段路徑就是歌名:去掉 .mp3、解 percent-encoding、
/// 底線換空白、連續空白縮成一格。不是 .mp3 的一律略過。
fn title_from_uri(uri: &str) -> Option<String> {
    let file = uri.rsplit('/').next()?;
    let stem = file.strip_suffix(".mp3")?;
    let decoded = percent_decode_str(stem).decode_utf8_lossy();
    let title = decoded
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<node ro="ro" name="Undefined">
 <node ro="ro" name="Playlist" id="1">
  <leaf ro="ro" name="4%20Elements%20II" id="6" duration="238" uri="file:///C:/sharec/FFTBattleground-battle/4%20Elements%20II%20-%20World%20of%20Magic.mp3"/>
  <leaf ro="ro" name="Aerith" id="7" duration="-1" uri="file:///C:/sharec/FFTBattleground-battle/Aerith%27s_Theme.mp3"/>
  <leaf ro="ro" name="cover" id="8" duration="10" uri="file:///C:/sharec/FFTBattleground-battle/cover.jpg"/>
 </node>
</node>"#;

    #[test]
    fn parses_leaf_elements_from_the_feed() {
        let tracks = parse_feed(SAMPLE);
        assert_eq!(
            tracks,
            vec![
                FeedTrack { title: "4 Elements II - World of Magic".into(), duration: "3:58".into() },
                FeedTrack { title: "Aerith's Theme".into(), duration: "0:00".into() },
            ]
        );
    }

    #[test]
    fn non_mp3_entries_are_skipped() {
        let xml = r#"<leaf duration="10" uri="vlc://nop"/>
                     <leaf duration="10" uri="file:///C:/music/art.png"/>"#;
        assert!(parse_feed(xml).is_empty());
    }

    #[test]
    fn titles_are_cleaned_up() {
        let xml = r#"<leaf duration="61" uri="file:///srv/Some__Very%20%20Messy_Title.mp3"/>"#;
        let tracks = parse_feed(xml);
        assert_eq!(tracks[0].title, "Some Very Messy Title");
        assert_eq!(tracks[0].duration, "1:01");
    }

    #[test]
    fn xml_entities_in_uris_are_decoded() {
        let xml = r#"<leaf duration="5" uri="file:///srv/Rock%20&amp;%20Roll.mp3"/>"#;
        assert_eq!(parse_feed(xml)[0].title, "Rock & Roll");
    }

    #[test]
    fn garbage_durations_become_zero() {
        let xml = r#"<leaf duration="oops" uri="file:///srv/a.mp3"/>
                     <leaf uri="file:///srv/b.mp3"/>"#;
        let tracks = parse_feed(xml);
        assert_eq!(tracks[0].duration, "0:00");
        assert_eq!(tracks[1].duration, "0:00");
    }

    /* ---------------- reconcile ---------------- */

    async fn service_with_store() -> (SyncService, sqlx::SqlitePool) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SongStore::new(pool.clone());
        store.ensure_schema().await.unwrap();
        let svc = SyncService::new(store, "http://feed.invalid/playlist.xml".into()).unwrap();
        (svc, pool)
    }

    fn track(title: &str, duration: &str) -> FeedTrack {
        FeedTrack { title: title.into(), duration: duration.into() }
    }

    #[tokio::test]
    async fn reconcile_adds_removes_and_repairs() {
        let (svc, pool) = service_with_store().await;
        svc.store
            .insert_new(&[
                NewSong { title: "stays".into(), duration: "0:00".into(), created_at: Utc::now() },
                NewSong { title: "leaves".into(), duration: "2:00".into(), created_at: Utc::now() },
            ])
            .await
            .unwrap();
        sqlx::query("UPDATE songs SET occurrence = 7 WHERE title = 'stays'")
            .execute(&pool)
            .await
            .unwrap();

        let report = svc
            .reconcile(vec![track("stays", "3:10"), track("brand new", "1:30")])
            .await
            .unwrap();
        assert_eq!(report, SyncReport { fetched: 2, added: 1, removed: 1, repaired: 1 });

        let all = svc.store.fetch_all().await.unwrap();
        let titles: Vec<_> = all.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["stays", "brand new"]);

        // 修了時長,播放次數不能動
        assert_eq!(all[0].duration, "3:10");
        assert_eq!(all[0].occurrence, 7);
    }

    #[tokio::test]
    async fn reconcile_ignores_feed_duplicates() {
        let (svc, _pool) = service_with_store().await;
        let report = svc
            .reconcile(vec![track("dup", "1:00"), track("dup", "1:00"), track("solo", "2:00")])
            .await
            .unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(svc.store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn reconcile_leaves_good_durations_alone() {
        let (svc, _pool) = service_with_store().await;
        svc.store
            .insert_new(&[NewSong { title: "fine".into(), duration: "2:30".into(), created_at: Utc::now() }])
            .await
            .unwrap();

        let report = svc.reconcile(vec![track("fine", "9:59")]).await.unwrap();
        assert_eq!(report.repaired, 0);
        assert_eq!(svc.store.fetch_all().await.unwrap()[0].duration, "2:30");
    }

    #[tokio::test]
    async fn broken_feed_duration_never_overwrites() {
        let (svc, _pool) = service_with_store().await;
        svc.store
            .insert_new(&[NewSong { title: "bad both".into(), duration: "0:00".into(), created_at: Utc::now() }])
            .await
            .unwrap();

        let report = svc.reconcile(vec![track("bad both", "0:00")]).await.unwrap();
        assert_eq!(report.repaired, 0);
    }
}
