//! config.rs — 環境變數;缺的、壞的一律回退預設值

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://songs.db?mode=rwc";
pub const DEFAULT_FEED_URL: &str = "http://www.fftbattleground.com/fftbg/playlist.xml";
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;
pub const DEFAULT_SYNC_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub history_capacity: usize,
    pub feed_url: String,
    pub sync_interval: Duration,
    pub sync_enabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", DEFAULT_PORT),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
            history_capacity: env_or("HISTORY_CAPACITY", DEFAULT_HISTORY_CAPACITY),
            feed_url: std::env::var("PLAYLIST_FEED_URL")
                .unwrap_or_else(|_| DEFAULT_FEED_URL.into()),
            sync_interval: Duration::from_secs(env_or("FEED_SYNC_SECS", DEFAULT_SYNC_SECS)),
            sync_enabled: env_or("FEED_SYNC_ENABLED", true),
        }
    }
}

fn env_or<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unparsable env var, falling back to default");
            default
        }),
        Err(_) => default,
    }
}
