//! Broken-item report endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rental_core::input::{NewReport, ReportTransition};
use rental_core::BrokenItemReport;
use rental_db::ReportFilter;

use super::{created, flash, FlashResponse, Payload, QueryParams};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/broken-items", get(list).post(report))
        .route("/api/broken-items/{id}", get(show))
        .route("/api/broken-items/{id}/status", post(update_status))
}

async fn list(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<ReportFilter>,
) -> ApiResult<Json<Vec<BrokenItemReport>>> {
    Ok(Json(state.db.reports().list(&filter).await?))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BrokenItemReport>> {
    state
        .db
        .reports()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Report", &id))
}

async fn report(
    State(state): State<AppState>,
    Payload(input): Payload<NewReport>,
) -> ApiResult<(StatusCode, FlashResponse<BrokenItemReport>)> {
    let report = state.db.reports().report(&input).await?;
    Ok(created("Damage reported, item held for review", report))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Payload(transition): Payload<ReportTransition>,
) -> ApiResult<FlashResponse<BrokenItemReport>> {
    let report = state.db.reports().update_status(&id, &transition).await?;
    Ok(flash(format!("Report moved to {:?}", report.status), report))
}
