//! Loan endpoints.
//!
//! ```text
//! POST /api/loans              ──► take one from stock, Active
//! POST /api/loans/{id}/return  ──► put it back, Returned
//! POST /api/loans/{id}/cancel  ──► put it back, Cancelled
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rental_core::input::{LoanChanges, NewLoan};
use rental_core::Loan;
use rental_db::LoanFilter;
use tracing::info;

use super::{created, flash, FlashResponse, Payload, QueryParams};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/loans", get(list).post(create))
        .route("/api/loans/{id}", get(show).put(update).delete(remove))
        .route("/api/loans/{id}/return", post(return_loan))
        .route("/api/loans/{id}/cancel", post(cancel))
}

async fn list(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<LoanFilter>,
) -> ApiResult<Json<Vec<Loan>>> {
    Ok(Json(state.db.loans().list(&filter).await?))
}

async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Loan>> {
    state
        .db
        .loans()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Loan", &id))
}

async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<NewLoan>,
) -> ApiResult<(StatusCode, FlashResponse<Loan>)> {
    let loan = state.db.loans().create(&input).await?;
    info!(loan_id = %loan.id, item_id = %loan.item_id, "Loan created");
    Ok(created(format!("Loan created for {}", loan.renter_name), loan))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Payload(changes): Payload<LoanChanges>,
) -> ApiResult<FlashResponse<Loan>> {
    let loan = state.db.loans().update(&id, &changes).await?;
    Ok(flash("Loan updated", loan))
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<FlashResponse<()>> {
    state.db.loans().delete(&id).await?;
    Ok(flash("Loan deleted", ()))
}

async fn return_loan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FlashResponse<Loan>> {
    let loan = state.db.loans().return_loan(&id).await?;
    Ok(flash(format!("Loan returned by {}", loan.renter_name), loan))
}

async fn cancel(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<FlashResponse<Loan>> {
    let loan = state.db.loans().cancel(&id).await?;
    Ok(flash("Loan cancelled", loan))
}
