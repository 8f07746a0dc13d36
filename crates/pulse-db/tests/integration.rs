//! Offline unit tests for pulse-db pool configuration and row types.
//! These tests do not require a live database connection.

use pulse_core::{AppConfig, Environment};
use pulse_db::{NewBrand, PoolConfig, SyncRunRow};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        metricool_base_url: "https://app.metricool.com".to_string(),
        metricool_timeout_secs: 30,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        api_keys: vec![],
        rate_limit_max_requests: 120,
        rate_limit_window_secs: 60,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`SyncRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn sync_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = SyncRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        source: "manual".to_string(),
        status: "running".to_string(),
        started_at: Utc::now(),
        finished_at: None,
        created: 0_i32,
        updated: 0_i32,
        marked_deleted: 0_i32,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.source, "manual");
    assert_eq!(row.status, "running");
    assert!(row.finished_at.is_none());
    assert_eq!(row.created, 0);
    assert!(row.error_message.is_none());
}

#[test]
fn new_brand_default_has_empty_snapshot() {
    let brand = NewBrand {
        id: 7,
        label: "Acme".to_string(),
        ..NewBrand::default()
    };

    assert_eq!(brand.id, 7);
    assert!(brand.instagram.is_none());
    assert!(brand.raw_snapshot.is_null());
}
