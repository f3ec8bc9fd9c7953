//! Loading engine configuration from JSON

#[path = "testutils/mod.rs"]
mod testutils;

use std::io::Write;
use std::time::Duration;

use testutils::test_fixture::{init_logging, TestFixture};
use txnlite::{Database, EngineConfig, ExecutionError, IsolationLevel};

#[test]
fn test_config_from_file() {
    init_logging();
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    write!(
        file,
        r#"{{
            "lock_timeout_ms": 25,
            "default_isolation_level": "RepeatableRead",
            "gc": {{ "enabled": false }}
        }}"#
    )
    .unwrap();

    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.lock_timeout(), Some(Duration::from_millis(25)));
    assert_eq!(config.max_active_transactions, 1024);
    assert!(!config.gc.enabled);

    let db = Database::with_config(config).unwrap();
    assert!(!db.gc_running());
    let txn = db.begin().unwrap();
    assert_eq!(txn.isolation_level(), IsolationLevel::RepeatableRead);
    assert_eq!(txn.lock_timeout(), Some(Duration::from_millis(25)));
    db.commit(&txn).unwrap();
}

#[test]
fn test_invalid_config_files() {
    init_logging();
    assert!(matches!(
        EngineConfig::from_file("/nonexistent/txnlite.json"),
        Err(ExecutionError::ConfigError(_))
    ));
    assert!(matches!(
        EngineConfig::from_json_str("{ not json"),
        Err(ExecutionError::ConfigError(_))
    ));

    assert!(matches!(
        EngineConfig::from_json_str(r#"{"default_isolation_level": "Serializable"}"#),
        Err(ExecutionError::ConfigError(_))
    ));

    // Configurations built in code are checked when the database starts
    let config = EngineConfig {
        default_isolation_level: IsolationLevel::ReadUncommitted,
        ..EngineConfig::default()
    };
    assert!(matches!(
        Database::with_config(config),
        Err(ExecutionError::ConfigError(_))
    ));
}

#[test]
fn test_active_transaction_limit() {
    let config = EngineConfig {
        max_active_transactions: 2,
        ..EngineConfig::default().without_gc()
    };
    let fixture = TestFixture::with_config(config).expect("Failed to create fixture");

    let a = fixture.begin();
    let b = fixture.begin();
    let err = fixture.db().begin().unwrap_err();
    assert!(matches!(err, ExecutionError::CapacityExceeded(_)));
    assert!(err.is_fatal());

    fixture.db().commit(&a).unwrap();
    let c = fixture.begin();
    fixture.db().rollback(&b).unwrap();
    fixture.db().rollback(&c).unwrap();
}
