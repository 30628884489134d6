//! Item endpoints, including the units nested under an item.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rental_core::input::{ItemChanges, NewItem, NewUnit};
use rental_core::{Item, ItemUnit};
use rental_db::{ItemDetail, ItemFilter};

use super::{created, flash, FlashResponse, Payload, QueryParams};
use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/items", get(list).post(create))
        .route("/api/items/{id}", get(show).put(update).delete(remove))
        .route("/api/items/{id}/units", get(list_units).post(create_unit))
}

async fn list(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<ItemFilter>,
) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(state.db.items().list(&filter).await?))
}

/// The item with its units.
async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ItemDetail>> {
    Ok(Json(state.db.items().get_detail(&id).await?))
}

async fn create(
    State(state): State<AppState>,
    Payload(input): Payload<NewItem>,
) -> ApiResult<(StatusCode, FlashResponse<Item>)> {
    let item = state.db.items().create(&input).await?;
    Ok(created(format!("Item '{}' created", item.name), item))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Payload(changes): Payload<ItemChanges>,
) -> ApiResult<FlashResponse<Item>> {
    let item = state.db.items().update(&id, &changes).await?;
    Ok(flash("Item updated", item))
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<FlashResponse<()>> {
    state.db.items().delete(&id).await?;
    Ok(flash("Item deleted", ()))
}

async fn list_units(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ItemUnit>>> {
    Ok(Json(state.db.units().list_for_item(&id).await?))
}

async fn create_unit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Payload(input): Payload<NewUnit>,
) -> ApiResult<(StatusCode, FlashResponse<ItemUnit>)> {
    let unit = state.db.units().create(&id, &input).await?;
    Ok(created(format!("Unit {} added", unit.unit_code), unit))
}
