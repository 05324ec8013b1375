// Service configuration resolved from the process environment

use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_STORAGE_ROOT: &str = "runner_workspace";
pub const DEFAULT_LANGUAGES_CONFIG: &str = "config/languages.json";
pub const DEFAULT_MAX_CONCURRENT: usize = 4;
pub const DEFAULT_ADMISSION_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown job store backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub redis_url: String,
    pub bind_addr: String,
    pub storage_root: PathBuf,
    pub languages_config: PathBuf,
    pub max_concurrent: usize,
    pub admission_timeout_ms: u64,
    pub store: StoreBackend,
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            languages_config: PathBuf::from(DEFAULT_LANGUAGES_CONFIG),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            admission_timeout_ms: DEFAULT_ADMISSION_TIMEOUT_MS,
            store: StoreBackend::Redis,
            log_format: LogFormat::Text,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup, so tests don't have to
    /// mutate the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_concurrent = match lookup("ALGOFORGE_MAX_CONCURRENT") {
            Some(raw) => parse_number::<usize>("ALGOFORGE_MAX_CONCURRENT", &raw)?,
            None => defaults.max_concurrent,
        };
        if max_concurrent == 0 {
            return Err("ALGOFORGE_MAX_CONCURRENT must be at least 1".to_string());
        }

        let admission_timeout_ms = match lookup("ALGOFORGE_ADMISSION_TIMEOUT_MS") {
            Some(raw) => parse_number::<u64>("ALGOFORGE_ADMISSION_TIMEOUT_MS", &raw)?,
            None => defaults.admission_timeout_ms,
        };

        let store = match lookup("ALGOFORGE_STORE") {
            Some(raw) => raw.parse()?,
            None => defaults.store,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::to_lowercase) {
            Some(ref f) if f == "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            bind_addr: lookup("ALGOFORGE_BIND").unwrap_or(defaults.bind_addr),
            storage_root: lookup("ALGOFORGE_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            languages_config: lookup("ALGOFORGE_LANGUAGES_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.languages_config),
            max_concurrent,
            admission_timeout_ms,
            store,
            log_format,
        })
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("{} must be a non-negative integer, got '{}'", key, raw))
}
