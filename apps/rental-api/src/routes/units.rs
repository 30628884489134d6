//! Unit endpoints. Creation lives under `/api/items/{id}/units`.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use rental_core::input::UnitChanges;
use rental_core::ItemUnit;

use super::{flash, FlashResponse, Payload};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/units/{id}", get(show).put(update).delete(remove))
}

async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ItemUnit>> {
    state
        .db
        .units()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Unit", &id))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Payload(changes): Payload<UnitChanges>,
) -> ApiResult<FlashResponse<ItemUnit>> {
    let unit = state.db.units().update(&id, &changes).await?;
    Ok(flash(format!("Unit {} updated", unit.unit_code), unit))
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<FlashResponse<()>> {
    state.db.units().delete(&id).await?;
    Ok(flash("Unit deleted", ()))
}
