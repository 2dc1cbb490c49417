//! Tests for the health module

use super::*;
use crate::mock::{MockConnection, MockDriver};
use tenantdb_core::{ConnectionConfig, DatabaseDriver};

async fn open_mock() -> (std::sync::Arc<MockDriver>, std::sync::Arc<MockConnection>) {
    let driver = MockDriver::new();
    driver.connect(&ConnectionConfig::new("a")).await.unwrap();
    let conn = driver.connections()[0].clone();
    (driver, conn)
}

#[tokio::test]
async fn test_probe_alive_connection() {
    let (_driver, conn) = open_mock().await;

    let latency = probe_liveness(conn.as_ref()).await;

    assert!(latency.is_ok());
    assert_eq!(MockConnection::count(&conn.authenticate_calls), 1);
}

#[tokio::test]
async fn test_probe_dead_connection() {
    let (_driver, conn) = open_mock().await;
    conn.kill();

    let err = probe_liveness(conn.as_ref()).await.unwrap_err();

    assert!(matches!(err, ProbeError::AuthenticationFailed(_)));
    assert!(err.to_string().contains("connection reset by peer"));
}

#[tokio::test]
async fn test_probe_closed_connection_skips_round_trip() {
    use tenantdb_core::Connection;

    let (_driver, conn) = open_mock().await;
    conn.close().await.unwrap();

    let err = probe_liveness(conn.as_ref()).await.unwrap_err();

    assert_eq!(err, ProbeError::ConnectionClosed);
    assert_eq!(MockConnection::count(&conn.authenticate_calls), 0);
}
