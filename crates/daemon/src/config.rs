// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server configuration: recognized options, loaded from environment
//! variables with an optional `config.toml` overlay in a layered style —
//! env wins over file, file wins over built-in defaults.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    Stdio,
    Http,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine home directory for default workspace_dir")]
    NoHomeDir,
    #[error("cannot read config file {path}: {source}")]
    ReadFile { path: PathBuf, #[source] source: std::io::Error },
    #[error("cannot parse config file {path}: {source}")]
    ParseFile { path: PathBuf, #[source] source: toml::de::Error },
    #[error("invalid transport_type {0:?}, expected \"stdio\" or \"http\"")]
    InvalidTransportType(String),
}

/// Optional `config.toml` overlay. Every field is optional; absent fields
/// fall through to env vars, then to [`Config::default`]'s built-ins.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    workspace_dir: Option<PathBuf>,
    store_path: Option<PathBuf>,
    transport_type: Option<String>,
    http_addr: Option<String>,
    http_port: Option<u16>,
    max_sessions: Option<usize>,
    session_ttl_secs: Option<u64>,
    max_disk_per_session: Option<u64>,
    total_disk_limit: Option<u64>,
    cleanup_interval_secs: Option<u64>,
    max_workers: Option<usize>,
    job_ttl_secs: Option<u64>,
    job_queue_capacity: Option<usize>,
    cors_origins: Option<Vec<String>>,
    api_key: Option<String>,
    rate_limit_per_minute: Option<u32>,
    log_level: Option<String>,
    enable_otel: Option<bool>,
    otel_endpoint: Option<String>,
    otel_headers: Option<BTreeMap<String, String>>,
    service_name: Option<String>,
    service_version: Option<String>,
    environment: Option<String>,
    trace_sample_rate: Option<f64>,
}

/// Server configuration. Constructed via [`Config::load`],
/// which layers env vars over an optional `config.toml` over built-in
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace_dir: PathBuf,
    pub store_path: PathBuf,
    pub transport_type: TransportType,
    pub http_addr: String,
    pub http_port: u16,
    pub max_sessions: usize,
    pub session_ttl: Duration,
    pub max_disk_per_session: u64,
    pub total_disk_limit: u64,
    pub cleanup_interval: Duration,
    pub max_workers: usize,
    pub job_ttl: Duration,
    pub job_queue_capacity: usize,
    pub cors_origins: Vec<String>,
    pub api_key: Option<String>,
    pub rate_limit_per_minute: u32,
    pub log_level: String,
    pub enable_otel: bool,
    pub otel_endpoint: Option<String>,
    pub otel_headers: BTreeMap<String, String>,
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub trace_sample_rate: f64,
}

const DEFAULT_MAX_SESSIONS: usize = 10;
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_MAX_DISK_PER_SESSION: u64 = 1 << 30; // 1 GiB
const DEFAULT_TOTAL_DISK_LIMIT: u64 = 10 << 30; // 10 GiB
const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_MAX_WORKERS: usize = 5;
const DEFAULT_JOB_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_JOB_QUEUE_CAPACITY: usize = 256;
const DEFAULT_RATE_LIMIT: u32 = 60;

impl Config {
    /// Built-in defaults, before any env/file overlay.
    fn builtin_defaults() -> Self {
        Self {
            workspace_dir: PathBuf::from("/tmp/.container-kit/workspaces"),
            store_path: PathBuf::from("/tmp/.container-kit/store"),
            transport_type: TransportType::Stdio,
            http_addr: "127.0.0.1".to_string(),
            http_port: 8080,
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_ttl: DEFAULT_SESSION_TTL,
            max_disk_per_session: DEFAULT_MAX_DISK_PER_SESSION,
            total_disk_limit: DEFAULT_TOTAL_DISK_LIMIT,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            max_workers: DEFAULT_MAX_WORKERS,
            job_ttl: DEFAULT_JOB_TTL,
            job_queue_capacity: DEFAULT_JOB_QUEUE_CAPACITY,
            cors_origins: Vec::new(),
            api_key: None,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT,
            log_level: "info".to_string(),
            enable_otel: false,
            otel_endpoint: None,
            otel_headers: BTreeMap::new(),
            service_name: "container-kit-server".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            trace_sample_rate: 0.0,
        }
    }

    /// `workspace_dir` default: `$HOME/.container-kit/workspaces`, falling
    /// back to a tmp directory when `HOME` is unset.
    fn default_workspace_dir() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(".container-kit/workspaces"))
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Loads configuration: env vars layered over an optional `config.toml`
    /// (path from `CK_CONFIG_FILE`, if set) layered over built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::builtin_defaults();
        config.workspace_dir = Self::default_workspace_dir();

        if let Ok(path) = std::env::var("CK_CONFIG_FILE") {
            let path = PathBuf::from(path);
            let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile { path: path.clone(), source: e })?;
            let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseFile { path, source: e })?;
            config.apply_file(file)?;
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        if let Some(v) = file.workspace_dir {
            self.workspace_dir = v;
        }
        if let Some(v) = file.store_path {
            self.store_path = v;
        }
        if let Some(v) = file.transport_type {
            self.transport_type = parse_transport_type(&v)?;
        }
        if let Some(v) = file.http_addr {
            self.http_addr = v;
        }
        if let Some(v) = file.http_port {
            self.http_port = v;
        }
        if let Some(v) = file.max_sessions {
            self.max_sessions = v;
        }
        if let Some(v) = file.session_ttl_secs {
            self.session_ttl = Duration::from_secs(v);
        }
        if let Some(v) = file.max_disk_per_session {
            self.max_disk_per_session = v;
        }
        if let Some(v) = file.total_disk_limit {
            self.total_disk_limit = v;
        }
        if let Some(v) = file.cleanup_interval_secs {
            self.cleanup_interval = Duration::from_secs(v);
        }
        if let Some(v) = file.max_workers {
            self.max_workers = v;
        }
        if let Some(v) = file.job_ttl_secs {
            self.job_ttl = Duration::from_secs(v);
        }
        if let Some(v) = file.job_queue_capacity {
            self.job_queue_capacity = v;
        }
        if let Some(v) = file.cors_origins {
            self.cors_origins = v;
        }
        if let Some(v) = file.api_key {
            self.api_key = Some(v);
        }
        if let Some(v) = file.rate_limit_per_minute {
            self.rate_limit_per_minute = v;
        }
        if let Some(v) = file.log_level {
            self.log_level = v;
        }
        if let Some(v) = file.enable_otel {
            self.enable_otel = v;
        }
        if let Some(v) = file.otel_endpoint {
            self.otel_endpoint = Some(v);
        }
        if let Some(v) = file.otel_headers {
            self.otel_headers = v;
        }
        if let Some(v) = file.service_name {
            self.service_name = v;
        }
        if let Some(v) = file.service_version {
            self.service_version = v;
        }
        if let Some(v) = file.environment {
            self.environment = v;
        }
        if let Some(v) = file.trace_sample_rate {
            self.trace_sample_rate = v;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("CK_WORKSPACE_DIR") {
            self.workspace_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("CK_STORE_PATH") {
            self.store_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("CK_TRANSPORT_TYPE") {
            self.transport_type = parse_transport_type(&v)?;
        }
        if let Ok(v) = std::env::var("CK_HTTP_ADDR") {
            self.http_addr = v;
        }
        if let Ok(v) = env_parsed::<u16>("CK_HTTP_PORT") {
            self.http_port = v;
        }
        if let Ok(v) = env_parsed::<usize>("CK_MAX_SESSIONS") {
            self.max_sessions = v;
        }
        if let Ok(v) = env_parsed::<u64>("CK_SESSION_TTL_SECS") {
            self.session_ttl = Duration::from_secs(v);
        }
        if let Ok(v) = env_parsed::<u64>("CK_MAX_DISK_PER_SESSION") {
            self.max_disk_per_session = v;
        }
        if let Ok(v) = env_parsed::<u64>("CK_TOTAL_DISK_LIMIT") {
            self.total_disk_limit = v;
        }
        if let Ok(v) = env_parsed::<u64>("CK_CLEANUP_INTERVAL_SECS") {
            self.cleanup_interval = Duration::from_secs(v);
        }
        if let Ok(v) = env_parsed::<usize>("CK_MAX_WORKERS") {
            self.max_workers = v;
        }
        if let Ok(v) = env_parsed::<u64>("CK_JOB_TTL_SECS") {
            self.job_ttl = Duration::from_secs(v);
        }
        if let Ok(v) = env_parsed::<usize>("CK_JOB_QUEUE_CAPACITY") {
            self.job_queue_capacity = v;
        }
        if let Ok(v) = std::env::var("CK_CORS_ORIGINS") {
            self.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        if let Ok(v) = std::env::var("CK_API_KEY") {
            self.api_key = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env_parsed::<u32>("CK_RATE_LIMIT_PER_MINUTE") {
            self.rate_limit_per_minute = v;
        }
        // Bare LOG_LEVEL (no CK_ prefix) is also recognized, for operators
        // wiring this daemon up alongside other services sharing the var.
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            self.log_level = v;
        } else if let Ok(v) = std::env::var("CK_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Ok(v) = env_parsed::<bool>("CK_ENABLE_OTEL") {
            self.enable_otel = v;
        }
        if let Ok(v) = std::env::var("CK_OTEL_ENDPOINT") {
            self.otel_endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("CK_OTEL_HEADERS") {
            self.otel_headers = parse_otel_headers(&v);
        }
        if let Ok(v) = std::env::var("CK_SERVICE_NAME") {
            self.service_name = v;
        }
        if let Ok(v) = std::env::var("CK_SERVICE_VERSION") {
            self.service_version = v;
        }
        if let Ok(v) = std::env::var("CK_ENVIRONMENT") {
            self.environment = v;
        }
        if let Ok(v) = env_parsed::<f64>("CK_TRACE_SAMPLE_RATE") {
            self.trace_sample_rate = v;
        }
        Ok(())
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<T, ()> {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).ok_or(())
}

/// Parses `CK_OTEL_HEADERS` in the OTLP-standard `key1=value1,key2=value2`
/// form (same shape as `OTEL_EXPORTER_OTLP_HEADERS`). Malformed pairs
/// (missing `=`) are skipped rather than failing config load outright.
fn parse_otel_headers(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let pair = pair.trim();
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn parse_transport_type(value: &str) -> Result<TransportType, ConfigError> {
    match value {
        "stdio" => Ok(TransportType::Stdio),
        "http" => Ok(TransportType::Http),
        other => Err(ConfigError::InvalidTransportType(other.to_string())),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
