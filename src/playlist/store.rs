//! playlist/store.rs — sqlite 歌曲目錄

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::Song;

/// 同步要寫進目錄的新歌
#[derive(Debug, Clone, PartialEq)]
pub struct NewSong {
    pub title: String,
    pub duration: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SongStore {
    pool: SqlitePool,
}

impl SongStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 啟動時建表,已存在就跳過
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS songs (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT    NOT NULL UNIQUE,
                creator     TEXT,
                album       TEXT,
                duration    TEXT    NOT NULL DEFAULT '0:00',
                location    TEXT,
                created_at  TEXT    NOT NULL,
                updated_at  TEXT,
                occurrence  INTEGER NOT NULL DEFAULT 0,
                last_played TEXT
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// 整份目錄,照 id(進庫順序)走,排序分頁交給 query 層
    pub async fn fetch_all(&self) -> Result<Vec<Song>, sqlx::Error> {
        sqlx::query_as::<_, Song>(
            "SELECT id, title, creator, album, duration, location,
                    created_at, updated_at, occurrence, last_played
             FROM songs ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await
    }

    pub async fn latest_added_at(&self) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        sqlx::query_scalar("SELECT created_at FROM songs ORDER BY created_at DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
    }

    /// 播放次數同分時取 id 小的(先進目錄者勝)
    pub async fn most_played(&self) -> Result<Option<Song>, sqlx::Error> {
        sqlx::query_as::<_, Song>(
            "SELECT id, title, creator, album, duration, location,
                    created_at, updated_at, occurrence, last_played
             FROM songs ORDER BY occurrence DESC, id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn top_played(&self, limit: i64) -> Result<Vec<Song>, sqlx::Error> {
        sqlx::query_as::<_, Song>(
            "SELECT id, title, creator, album, duration, location,
                    created_at, updated_at, occurrence, last_played
             FROM songs ORDER BY occurrence DESC, id ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn total_plays(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COALESCE(SUM(occurrence), 0) FROM songs")
            .fetch_one(&self.pool)
            .await
    }

    pub async fn played_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE occurrence > 0")
            .fetch_one(&self.pool)
            .await
    }

    /// 逐筆 INSERT OR IGNORE,撞到同名歌不算錯,回傳實際寫入筆數
    pub async fn insert_new(&self, entries: &[NewSong]) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for e in entries {
            let done = sqlx::query(
                "INSERT OR IGNORE INTO songs (title, duration, created_at, occurrence)
                 VALUES (?, ?, ?, 0)",
            )
            .bind(&e.title)
            .bind(&e.duration)
            .bind(e.created_at)
            .execute(&self.pool)
            .await?;
            inserted += done.rows_affected();
        }
        Ok(inserted)
    }

    pub async fn delete_by_titles(&self, titles: &[String]) -> Result<u64, sqlx::Error> {
        if titles.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; titles.len()].join(", ");
        let sql = format!("DELETE FROM songs WHERE title IN ({placeholders})");
        let mut q = sqlx::query(&sql);
        for t in titles {
            q = q.bind(t);
        }
        Ok(q.execute(&self.pool).await?.rows_affected())
    }

    /// 只在目前資料庫的時長仍是 `stale` 時才覆寫,順便補 updated_at
    pub async fn fix_duration(
        &self,
        title: &str,
        fresh: &str,
        stale: &str,
    ) -> Result<u64, sqlx::Error> {
        let done = sqlx::query(
            "UPDATE songs SET duration = ?, updated_at = ? WHERE title = ? AND duration = ?",
        )
        .bind(fresh)
        .bind(Utc::now())
        .bind(title)
        .bind(stale)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    // in-memory sqlite 一條連線一個庫,所以 pool 固定單連線
    async fn test_store() -> SongStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SongStore::new(pool);
        store.ensure_schema().await.unwrap();
        store
    }

    fn entry(title: &str, duration: &str, at: i64) -> NewSong {
        NewSong {
            title: title.into(),
            duration: duration.into(),
            created_at: DateTime::from_timestamp(at, 0).unwrap(),
        }
    }

    async fn set_plays(store: &SongStore, title: &str, plays: i64) {
        sqlx::query("UPDATE songs SET occurrence = ? WHERE title = ?")
            .bind(plays)
            .bind(title)
            .execute(&store.pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn inserts_and_reads_back_in_id_order() {
        let store = test_store().await;
        let added = store
            .insert_new(&[entry("First", "3:10", 1_700_000_000), entry("Second", "4:00", 1_700_000_100)])
            .await
            .unwrap();
        assert_eq!(added, 2);

        let all = store.fetch_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "First");
        assert_eq!(all[0].duration, "3:10");
        assert_eq!(all[0].occurrence, 0);
        assert_eq!(all[0].created_at, DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        assert!(all[0].updated_at.is_none());
        assert!(all[0].id < all[1].id);
    }

    #[tokio::test]
    async fn duplicate_titles_are_ignored_not_errors() {
        let store = test_store().await;
        assert_eq!(store.insert_new(&[entry("Same", "1:00", 1)]).await.unwrap(), 1);
        assert_eq!(store.insert_new(&[entry("Same", "9:99", 2)]).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn latest_added_at_tracks_the_newest_row() {
        let store = test_store().await;
        assert_eq!(store.latest_added_at().await.unwrap(), None);

        store
            .insert_new(&[entry("Old", "1:00", 1_700_000_000), entry("New", "1:00", 1_700_009_999)])
            .await
            .unwrap();
        assert_eq!(
            store.latest_added_at().await.unwrap(),
            Some(DateTime::from_timestamp(1_700_009_999, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn play_counters_aggregate() {
        let store = test_store().await;
        store
            .insert_new(&[
                entry("a", "1:00", 1),
                entry("b", "1:00", 2),
                entry("c", "1:00", 3),
            ])
            .await
            .unwrap();
        set_plays(&store, "b", 5).await;
        set_plays(&store, "c", 2).await;

        assert_eq!(store.total_plays().await.unwrap(), 7);
        assert_eq!(store.played_count().await.unwrap(), 2);
        assert_eq!(store.most_played().await.unwrap().unwrap().title, "b");

        let top = store.top_played(2).await.unwrap();
        let titles: Vec<_> = top.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn most_played_tie_goes_to_the_earliest_row() {
        let store = test_store().await;
        store
            .insert_new(&[entry("first in", "1:00", 1), entry("second in", "1:00", 2)])
            .await
            .unwrap();
        set_plays(&store, "first in", 4).await;
        set_plays(&store, "second in", 4).await;

        assert_eq!(store.most_played().await.unwrap().unwrap().title, "first in");
    }

    #[tokio::test]
    async fn empty_catalog_has_no_most_played() {
        let store = test_store().await;
        assert_eq!(store.most_played().await.unwrap(), None);
        assert_eq!(store.total_plays().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deletes_only_the_named_titles() {
        let store = test_store().await;
        store
            .insert_new(&[entry("keep", "1:00", 1), entry("drop1", "1:00", 2), entry("drop2", "1:00", 3)])
            .await
            .unwrap();

        let removed = store
            .delete_by_titles(&["drop1".into(), "drop2".into(), "never-there".into()])
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let left = store.fetch_all().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].title, "keep");
        assert_eq!(store.delete_by_titles(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn fix_duration_only_touches_the_stale_value() {
        let store = test_store().await;
        store.insert_new(&[entry("broken", "0:00", 1)]).await.unwrap();

        assert_eq!(store.fix_duration("broken", "3:10", "0:00").await.unwrap(), 1);
        // 已經修好,再跑一次不該動任何東西
        assert_eq!(store.fix_duration("broken", "3:10", "0:00").await.unwrap(), 0);

        let all = store.fetch_all().await.unwrap();
        assert_eq!(all[0].duration, "3:10");
        assert!(all[0].updated_at.is_some());
    }
}
