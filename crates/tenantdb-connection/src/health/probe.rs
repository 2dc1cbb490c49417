//! Liveness probe for cached connections
//!
//! A cached connection is only reused after an authentication round-trip
//! succeeds. Staleness is never stored, it is discovered here.

use std::time::{Duration, Instant};

use tenantdb_core::Connection;

/// Result of a liveness probe: round-trip time on success
pub type ProbeResult = Result<Duration, ProbeError>;

/// Why a connection failed its liveness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The connection was already closed locally
    ConnectionClosed,
    /// The authentication round-trip failed
    AuthenticationFailed(String),
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::ConnectionClosed => write!(f, "Connection is closed"),
            ProbeError::AuthenticationFailed(msg) => write!(f, "Liveness probe failed: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Probe a connection with an authentication round-trip.
///
/// # Example
///
/// ```ignore
/// use tenantdb_connection::health::probe_liveness;
///
/// let latency = probe_liveness(connection.as_ref()).await?;
/// tracing::debug!(?latency, "connection alive");
/// ```
pub async fn probe_liveness(conn: &dyn Connection) -> ProbeResult {
    if conn.is_closed() {
        return Err(ProbeError::ConnectionClosed);
    }

    let start = Instant::now();
    match conn.authenticate().await {
        Ok(()) => Ok(start.elapsed()),
        Err(e) => Err(ProbeError::AuthenticationFailed(e.to_string())),
    }
}
