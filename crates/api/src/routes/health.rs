//! Health, readiness and liveness endpoints.
//!
//! Only a configured-but-unreachable remote database makes the service
//! unhealthy; the local backend is always considered available.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// `local` or `remote`
    pub backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseHealth>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl DatabaseHealth {
    const UNREACHABLE: Self = Self {
        connected: false,
        latency_ms: None,
    };
}

/// Pings the pool when the remote backend is selected.
async fn check_database(state: &AppState) -> Option<DatabaseHealth> {
    if !state.backends.remote_configured() {
        return None;
    }
    let Some(pool) = &state.pool else {
        return Some(DatabaseHealth::UNREACHABLE);
    };

    persistence::metrics::record_pool_metrics(pool);
    Some(match persistence::db::ping(pool).await {
        Some(rtt) => DatabaseHealth {
            connected: true,
            latency_ms: Some(rtt.as_millis() as u64),
        },
        None => DatabaseHealth::UNREACHABLE,
    })
}

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = check_database(&state).await;
    let (code, status) = match &database {
        Some(db) if !db.connected => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
        _ => (StatusCode::OK, "healthy"),
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            backend: state.backends.backend_type(),
            database,
        }),
    )
}

/// GET /api/health/live
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse { status: "alive" })
}

/// GET /api/health/ready
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    match check_database(&state).await {
        Some(db) if !db.connected => Err(StatusCode::SERVICE_UNAVAILABLE),
        _ => Ok(Json(StatusResponse { status: "ready" })),
    }
}
