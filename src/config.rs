use std::env;
use std::path::PathBuf;

pub const DEFAULT_FEED_PAGE_SIZE: usize = 20;
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CasagramConfig {
    pub db_path: PathBuf,
    pub feed_page_size: usize,
    pub realtime_debounce_ms: u64,
    pub max_upload_bytes: u64,
}

impl CasagramConfig {
    pub fn from_env() -> Self {
        let db_path = env::var("CASAGRAM_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("casagram.db"));
        let feed_page_size = env::var("CASAGRAM_FEED_PAGE_SIZE")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_FEED_PAGE_SIZE);
        let realtime_debounce_ms = env::var("CASAGRAM_DEBOUNCE_MS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_DEBOUNCE_MS);
        let max_upload_bytes = env::var("CASAGRAM_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        Self {
            db_path,
            feed_page_size,
            realtime_debounce_ms,
            max_upload_bytes,
        }
    }
}

impl Default for CasagramConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("casagram.db"),
            feed_page_size: DEFAULT_FEED_PAGE_SIZE,
            realtime_debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}
