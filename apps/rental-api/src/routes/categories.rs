//! Category endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rental_core::input::{CategoryChanges, NewCategory};
use rental_core::Category;

use super::{created, flash, FlashResponse, Payload};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list).post(create))
        .route("/api/categories/{id}", get(show).put(update).delete(remove))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db.categories().list().await?))
}

async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Category>> {
    state
        .db
        .categories()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Category", &id))
}

async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<NewCategory>,
) -> ApiResult<(StatusCode, FlashResponse<Category>)> {
    let category = state.db.categories().create(&input).await?;
    Ok(created(format!("Category '{}' created", category.name), category))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Payload(changes): Payload<CategoryChanges>,
) -> ApiResult<FlashResponse<Category>> {
    let category = state.db.categories().update(&id, &changes).await?;
    Ok(flash("Category updated", category))
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<FlashResponse<()>> {
    state.db.categories().delete(&id).await?;
    Ok(flash("Category deleted", ()))
}
