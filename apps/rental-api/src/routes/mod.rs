//! # HTTP Routes
//!
//! One module per resource. Each exposes `router()`, merged in
//! [`crate::build_router`].
//!
//! ## Response Shapes
//! ```text
//! GET     ──► 200  <resource or list>
//! POST    ──► 201  { "message": "Loan created", "data": {...} }
//! PUT     ──► 200  { "message": "Loan updated", "data": {...} }
//! DELETE  ──► 200  { "message": "Loan deleted", "data": null }
//! error   ──► 4xx/5xx  { "code": "...", "message": "...", "field": "..." }
//! ```

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;

pub mod categories;
pub mod health;
pub mod items;
pub mod loans;
pub mod notifications;
pub mod reports;
pub mod units;
pub mod users;

/// Body of a successful mutation: what happened plus the affected record.
#[derive(Debug, Serialize)]
pub struct Flash<T> {
    pub message: String,
    pub data: T,
}

pub type FlashResponse<T> = Json<Flash<T>>;

pub fn flash<T: Serialize>(message: impl Into<String>, data: T) -> FlashResponse<T> {
    Json(Flash {
        message: message.into(),
        data,
    })
}

pub fn created<T: Serialize>(
    message: impl Into<String>,
    data: T,
) -> (StatusCode, FlashResponse<T>) {
    (StatusCode::CREATED, flash(message, data))
}

/// JSON request body whose rejection uses the [`ApiError`] shape.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Payload(value))
    }
}

/// Query string whose rejection uses the [`ApiError`] shape.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(QueryParams(value))
    }
}
