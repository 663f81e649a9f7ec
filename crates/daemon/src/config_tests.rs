use super::*;
use serial_test::serial;

fn clear_env() {
    for key in [
        "CK_CONFIG_FILE",
        "CK_WORKSPACE_DIR",
        "CK_STORE_PATH",
        "CK_TRANSPORT_TYPE",
        "CK_HTTP_ADDR",
        "CK_HTTP_PORT",
        "CK_MAX_SESSIONS",
        "CK_SESSION_TTL_SECS",
        "CK_MAX_DISK_PER_SESSION",
        "CK_TOTAL_DISK_LIMIT",
        "CK_CLEANUP_INTERVAL_SECS",
        "CK_MAX_WORKERS",
        "CK_JOB_TTL_SECS",
        "CK_JOB_QUEUE_CAPACITY",
        "CK_CORS_ORIGINS",
        "CK_API_KEY",
        "CK_RATE_LIMIT_PER_MINUTE",
        "LOG_LEVEL",
        "CK_LOG_LEVEL",
        "CK_ENABLE_OTEL",
        "CK_OTEL_ENDPOINT",
        "CK_OTEL_HEADERS",
        "CK_SERVICE_NAME",
        "CK_SERVICE_VERSION",
        "CK_ENVIRONMENT",
        "CK_TRACE_SAMPLE_RATE",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_match_spec() {
    clear_env();
    let config = Config::load().expect("load");
    assert_eq!(config.max_sessions, DEFAULT_MAX_SESSIONS);
    assert_eq!(config.session_ttl, DEFAULT_SESSION_TTL);
    assert_eq!(config.max_disk_per_session, DEFAULT_MAX_DISK_PER_SESSION);
    assert_eq!(config.total_disk_limit, DEFAULT_TOTAL_DISK_LIMIT);
    assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
    assert_eq!(config.rate_limit_per_minute, DEFAULT_RATE_LIMIT);
    assert_eq!(config.transport_type, TransportType::Stdio);
    assert_eq!(config.log_level, "info");
    assert!(config.otel_headers.is_empty());
}

#[test]
#[serial]
fn env_overrides_defaults() {
    clear_env();
    std::env::set_var("CK_MAX_SESSIONS", "42");
    std::env::set_var("CK_SESSION_TTL_SECS", "3600");
    std::env::set_var("LOG_LEVEL", "debug");
    std::env::set_var("CK_CORS_ORIGINS", "https://a.test, https://b.test");

    let config = Config::load().expect("load");
    assert_eq!(config.max_sessions, 42);
    assert_eq!(config.session_ttl, Duration::from_secs(3600));
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.cors_origins, vec!["https://a.test", "https://b.test"]);
    clear_env();
}

#[test]
#[serial]
fn invalid_transport_type_is_rejected() {
    clear_env();
    std::env::set_var("CK_TRANSPORT_TYPE", "carrier-pigeon");
    let err = Config::load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidTransportType(_)));
    clear_env();
}

#[test]
#[serial]
fn file_overlay_is_overridden_by_env() {
    clear_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "max_sessions = 7\nlog_level = \"warn\"\n").expect("write");
    std::env::set_var("CK_CONFIG_FILE", path.to_str().expect("utf8 path"));
    std::env::set_var("LOG_LEVEL", "trace");

    let config = Config::load().expect("load");
    assert_eq!(config.max_sessions, 7, "file overlay applies when env doesn't override it");
    assert_eq!(config.log_level, "trace", "env wins over file");
    clear_env();
}

#[test]
#[serial]
fn otel_headers_parsed_from_env_and_overridden_by_file() {
    clear_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[otel_headers]\nauthorization = \"file-token\"\n").expect("write");
    std::env::set_var("CK_CONFIG_FILE", path.to_str().expect("utf8 path"));
    std::env::set_var("CK_OTEL_HEADERS", "authorization=Bearer abc, x-tenant=acme");

    let config = Config::load().expect("load");
    assert_eq!(config.otel_headers.get("authorization").map(String::as_str), Some("Bearer abc"), "env wins over file");
    assert_eq!(config.otel_headers.get("x-tenant").map(String::as_str), Some("acme"));
    clear_env();
}

#[test]
fn otel_headers_skips_malformed_pairs() {
    let headers = parse_otel_headers("authorization=Bearer abc,malformed,x-tenant=acme");
    assert_eq!(headers.len(), 2);
    assert_eq!(headers.get("authorization").map(String::as_str), Some("Bearer abc"));
    assert_eq!(headers.get("x-tenant").map(String::as_str), Some("acme"));
}
