//! Notification inbox.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use rental_core::Notification;
use serde::Deserialize;

use super::{flash, FlashResponse, QueryParams};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/{id}/notifications", get(inbox))
        .route("/api/notifications/{id}/read", post(mark_read))
}

async fn inbox(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    QueryParams(query): QueryParams<InboxQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications = state
        .db
        .notifications()
        .list_for_user(&user_id, query.unread)
        .await?;
    Ok(Json(notifications))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FlashResponse<Notification>> {
    let notification = state.db.notifications().mark_read(&id).await?;
    Ok(flash("Notification marked as read", notification))
}
