use std::env;
use std::time::Duration;

/// Which catalog store backend to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Connect + total timeout pair for one class of outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub node_env: String,

    // Storage
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub db_max_connections: u32,

    // Structured API
    pub api_connect_timeout_ms: u64,
    pub api_timeout_ms: u64,

    // Playlist fallback
    pub playlist_connect_timeout_ms: u64,
    pub playlist_timeout_ms: u64,
    pub max_playlist_mb: usize,
    pub max_retries: u32,

    // EPG
    pub epg_enabled: bool,
    pub epg_timeout_ms: u64,
    pub epg_cap: usize,
    pub epg_throttle_ms: u64,
    pub epg_listing_limit: Option<u32>,

    // Sync
    pub parallel_category_sync: bool,

    // Misc
    pub user_agent: String,
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Server
            port: parse_env("PORT", 3001),
            node_env: env::var("NODE_ENV").unwrap_or_else(|_| "development".to_string()),

            // Storage
            store_backend: match env::var("CATALOG_STORE").as_deref() {
                Ok("memory") => StoreBackend::Memory,
                _ => StoreBackend::Postgres,
            },
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/iptv_catalog".to_string()),
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 15),

            // Structured API
            api_connect_timeout_ms: parse_env("API_CONNECT_TIMEOUT_MS", 15_000),
            api_timeout_ms: parse_env("API_TIMEOUT_MS", 30_000),

            // Playlist fallback (bulk transfer, minutes)
            playlist_connect_timeout_ms: parse_env("PLAYLIST_CONNECT_TIMEOUT_MS", 60_000),
            playlist_timeout_ms: parse_env("PLAYLIST_TIMEOUT_MS", 600_000),
            max_playlist_mb: parse_env("MAX_PLAYLIST_MB", 200),
            max_retries: parse_env("MAX_RETRIES", 3),

            // EPG
            epg_enabled: parse_bool_env("EPG_ENABLED", true),
            epg_timeout_ms: parse_env("EPG_TIMEOUT_MS", 45_000),
            epg_cap: parse_env("EPG_CAP", 50),
            epg_throttle_ms: parse_env("EPG_THROTTLE_MS", 100),
            epg_listing_limit: env::var("EPG_LISTING_LIMIT").ok().and_then(|v| v.parse().ok()),

            // Sync
            parallel_category_sync: parse_bool_env("PARALLEL_CATEGORY_SYNC", false),

            // Misc
            user_agent: env::var("USER_AGENT")
                .unwrap_or_else(|_| "VLC/3.0.20 LibVLC/3.0.20".to_string()),
        }
    }

    pub fn api_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_millis(self.api_connect_timeout_ms),
            request: Duration::from_millis(self.api_timeout_ms),
        }
    }

    pub fn playlist_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_millis(self.playlist_connect_timeout_ms),
            request: Duration::from_millis(self.playlist_timeout_ms),
        }
    }

    pub fn epg_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_millis(self.api_connect_timeout_ms),
            request: Duration::from_millis(self.epg_timeout_ms),
        }
    }

    pub fn epg_throttle(&self) -> Duration {
        Duration::from_millis(self.epg_throttle_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
