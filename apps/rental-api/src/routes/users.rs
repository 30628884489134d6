//! Staff account endpoints. Password hashes never leave the server.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rental_core::input::{NewUser, UserChanges};
use rental_core::User;

use super::{created, flash, FlashResponse, Payload};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list).post(create))
        .route("/api/users/{id}", get(show).put(update).delete(remove))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db.users().list().await?))
}

async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<User>> {
    state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User", &id))
}

async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<NewUser>,
) -> ApiResult<(StatusCode, FlashResponse<User>)> {
    let user = state.db.users().create(&input).await?;
    Ok(created(format!("User {} created", user.email), user))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Payload(changes): Payload<UserChanges>,
) -> ApiResult<FlashResponse<User>> {
    let user = state.db.users().update(&id, &changes).await?;
    Ok(flash("User updated", user))
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<FlashResponse<()>> {
    state.db.users().delete(&id).await?;
    Ok(flash("User deleted", ()))
}
