//! JSON extractor whose rejections use the API error format.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use super::error::ApiError;

/// Drop-in replacement for [`axum::Json`] in handler arguments.
///
/// Malformed bodies and values outside the fixed enumerations are answered
/// with `400 VALIDATION_ERROR` instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(ApiJson(value))
    }
}
