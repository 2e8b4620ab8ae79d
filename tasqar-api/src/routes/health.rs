/// Health check endpoint
///
/// Reports that the server is running and whether the database answers.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "database_latency_ms": 2,
///   "pool": { "active_connections": 1, "idle_connections": 4, "total_connections": 5 }
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use tasqar_shared::db::pool::{self, PoolStats};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: &'static str,

    /// Application version
    pub version: &'static str,

    /// "connected" or "disconnected"
    pub database: &'static str,

    /// Round-trip time of the probe query; absent when it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_latency_ms: Option<u64>,

    /// Connection pool usage
    pub pool: PoolStats,
}

/// Health check handler
///
/// Always answers 200 so load balancers can tell a live process from a dead
/// one; `status` is "degraded" when the database is unreachable.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let latency = match pool::health_check(&state.db).await {
        Ok(elapsed) => Some(elapsed.as_millis() as u64),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            None
        }
    };
    let connected = latency.is_some();

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database: if connected { "connected" } else { "disconnected" },
        database_latency_ms: latency,
        pool: pool::get_pool_stats(&state.db),
    })
}
