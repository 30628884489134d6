//! Liveness and database health.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: bool,
    pub migrations_total: usize,
    pub migrations_applied: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database = state.db.health_check().await;
    let (total, applied) = rental_db::migrations::migration_status(state.db.pool())
        .await
        .unwrap_or((0, 0));

    let healthy = database && applied >= total;
    let status = if healthy {
        StatusCode::OK
    } else {
        tracing::warn!(database, total, applied, "Health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };

    let report = HealthReport {
        status: if healthy { "ok" } else { "degraded" },
        database,
        migrations_total: total,
        migrations_applied: applied,
    };
    (status, Json(report))
}
