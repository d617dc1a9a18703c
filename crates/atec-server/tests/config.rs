use std::collections::HashMap;
use std::io::Write;

use atec_server::config::{self, AppConfig};

const MINIMAL: &str = r#"{
    "postgres": { "dsn": "postgres://atec@localhost/atec" },
    "crypto": { "private_key_path": "/etc/atec/key.pem", "iv_hex": "000102030405060708090a0b0c0d0e0f" },
    "redis": { "cache": { "url": "redis://localhost:6379/0" }, "lock": { "url": "redis://localhost:6379/1" } }
}"#;

#[test]
fn missing_sections_take_defaults() {
    let config: AppConfig = serde_json::from_str(MINIMAL).unwrap();

    assert_eq!(config.log_level, "info");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.shutdown_grace().as_secs(), 10);
    assert_eq!(config.cache.nil_ttl_secs, 60);
    assert_eq!(config.postgres.pool_settings().statement_timeout.as_millis(), 15_000);
    assert!(!config.mail.enabled);
    assert!(config.rate_limit.trusted_proxies.is_empty());
}

#[test]
fn environment_overrides_win() {
    let mut config: AppConfig = serde_json::from_str(MINIMAL).unwrap();
    let env: HashMap<&str, &str> = HashMap::from([
        ("ATEC_DATABASE_URL", "postgres://prod/atec"),
        ("ATEC_REDIS_URL", "redis://cache:6379"),
        ("ATEC_PORT", "9000"),
        ("ATEC_LOG_LEVEL", "debug"),
    ]);

    config
        .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(config.postgres.dsn, "postgres://prod/atec");
    assert_eq!(config.redis.cache.url, "redis://cache:6379");
    assert_eq!(config.redis.lock.url, "redis://cache:6379");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.log_level, "debug");
}

#[test]
fn bad_port_override_is_an_error() {
    let mut config: AppConfig = serde_json::from_str(MINIMAL).unwrap();
    let result = config.apply_overrides(|key| (key == "ATEC_PORT").then(|| "eighty".to_string()));
    assert!(result.is_err());
}

#[test]
fn load_reads_the_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MINIMAL.as_bytes()).unwrap();

    let config = config::load(file.path()).unwrap();
    assert_eq!(config.crypto.bcrypt_cost, 10);

    assert!(config::load(std::path::Path::new("/nonexistent/atec.json")).is_err());
}
