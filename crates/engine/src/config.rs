// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process flags and `config.properties` loading.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

/// Marketplace polling engine.
#[derive(Debug, Parser)]
#[command(name = "fleawatch", version, about)]
pub struct EngineConfig {
    /// Path to the properties config file.
    #[arg(long, env = "FLEAWATCH_CONFIG", default_value = "config.properties")]
    pub config: PathBuf,

    /// Override for storage.data.dir.
    #[arg(long, env = "FLEAWATCH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log format (json or text).
    #[arg(long, env = "FLEAWATCH_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "FLEAWATCH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Line-oriented `key=value` file contents.
///
/// `#`-prefixed and blank lines are ignored; keys and values are trimmed.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    pub fn parse(contents: &str) -> Self {
        let mut entries = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries.insert(key.trim().to_owned(), value.trim().to_owned());
            }
        }
        Self { entries }
    }

    pub fn get_str(&self, key: &str, default: &str) -> String {
        self.entries.get(key).cloned().unwrap_or_else(|| default.to_owned())
    }

    pub fn get_opt(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Unparseable values fall back to the default.
    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.entries.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.entries.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    /// All entries whose key starts with `prefix`.
    pub fn with_prefix(&self, prefix: &str) -> HashMap<String, String> {
        self.entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// HTTP client tuning.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

/// Worker pool sizing.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub core_size: usize,
    pub max_size: usize,
    pub queue_capacity: usize,
    pub keepalive: Duration,
}

/// Session-token refresh behavior.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Enables the proactive background refresh tick.
    pub auto_update: bool,
    pub update_interval: Duration,
    /// When false, refresh is disabled and only statically configured
    /// cookies are used.
    pub dynamic_enabled: bool,
    /// Minimum interval between refreshes (reactive throttle window).
    pub min_refresh_interval: Duration,
}

/// Persistent file layout.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub backup_enabled: bool,
    pub backup_interval: Duration,
    pub history_max_entries: usize,
    pub items_max_per_user: usize,
}

/// One site adapter's endpoint configuration.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub base_url: String,
    pub search_endpoint: String,
    pub request_delay: Duration,
    pub max_rows_per_page: u64,
    pub app_key: String,
}

/// Fallback settings for users with no persisted settings file.
#[derive(Debug, Clone)]
pub struct ParserDefaults {
    pub check_interval_s: u64,
    pub max_age_min: u64,
    pub max_pages: u64,
    pub rows_per_page: u64,
    pub notify_new_only: bool,
}

/// Fully resolved engine configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub pool: PoolConfig,
    pub token: TokenConfig,
    pub storage: StorageConfig,
    pub adapter: AdapterConfig,
    pub defaults: ParserDefaults,
    pub stats_interval: Duration,
    pub shutdown_grace: Duration,
    /// Inter-item pacing for notification delivery.
    pub notify_delay: Duration,
    /// Chat admin recipient for operational notices, if configured.
    pub admin_id: Option<u64>,
}

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

impl AppConfig {
    /// Load from a properties file. A missing file yields built-in defaults;
    /// an unreadable existing file is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let props = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;
            Properties::parse(&contents)
        } else {
            tracing::info!(path = %path.display(), "config file absent, using defaults");
            Properties::default()
        };
        Ok(Self::from_properties(&props))
    }

    pub fn from_properties(props: &Properties) -> Self {
        Self {
            http: HttpConfig {
                connect_timeout: Duration::from_millis(props.get_u64("http.connect.timeout", 10_000)),
                read_timeout: Duration::from_millis(props.get_u64("http.read.timeout", 15_000)),
                user_agent: props.get_str("http.user.agent", DEFAULT_USER_AGENT),
                max_retries: props.get_u64("http.max.retries", 3) as u32,
                retry_delay: Duration::from_millis(props.get_u64("http.retry.delay", 1_000)),
            },
            pool: PoolConfig {
                core_size: props.get_u64("thread.pool.core.size", 4) as usize,
                max_size: props.get_u64("thread.pool.max.size", 16) as usize,
                queue_capacity: props.get_u64("thread.pool.queue.capacity", 32) as usize,
                keepalive: Duration::from_secs(props.get_u64("thread.pool.keepalive.seconds", 60)),
            },
            token: TokenConfig {
                auto_update: props.get_bool("cookie.auto.update", true),
                update_interval: Duration::from_secs(
                    props.get_u64("cookie.update.interval.minutes", 60) * 60,
                ),
                dynamic_enabled: props.get_bool("cookie.dynamic.enabled", true),
                min_refresh_interval: Duration::from_secs(
                    props.get_u64("cookie.cache.ttl.minutes", 30) * 60,
                ),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from(props.get_str("storage.data.dir", "data")),
                backup_enabled: props.get_bool("storage.backup.enabled", true),
                backup_interval: Duration::from_secs(
                    props.get_u64("storage.backup.interval.hours", 24) * 3600,
                ),
                history_max_entries: props.get_u64("history.max.entries", 50_000) as usize,
                items_max_per_user: props.get_u64("storage.items.max.per.user", 500) as usize,
            },
            adapter: AdapterConfig {
                base_url: props
                    .get_str("api.goofish.base_url", "https://h5.api.m.goofish.com"),
                search_endpoint: props.get_str(
                    "api.goofish.search.endpoint",
                    "/h5/mtop.taobao.idlemtopsearch.pc.search/1.0/",
                ),
                request_delay: Duration::from_millis(
                    props.get_u64("api.goofish.delay.between.requests", 2_000),
                ),
                max_rows_per_page: props.get_u64("api.goofish.max.products.per.page", 30),
                app_key: props.get_str("api.goofish.app_key", "34839810"),
            },
            defaults: ParserDefaults {
                check_interval_s: props.get_u64("parser.default.check_interval", 60),
                max_age_min: props.get_u64("parser.default.max_age_minutes", 1_440),
                max_pages: props.get_u64("parser.default.max_pages", 3),
                rows_per_page: props.get_u64("parser.default.rows_per_page", 30),
                notify_new_only: props.get_bool("parser.default.notify_new_only", true),
            },
            stats_interval: Duration::from_secs(props.get_u64("stats.interval.minutes", 10) * 60),
            shutdown_grace: Duration::from_secs(props.get_u64("shutdown.grace.seconds", 30)),
            notify_delay: Duration::from_millis(props.get_u64("notify.send.delay", 800)),
            admin_id: props.get_opt("telegram.admin.id").and_then(|v| v.parse().ok()),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
