//! Request body extraction that reports failures in the API envelope.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// JSON body extractor.
///
/// Unlike `axum::Json` it does not insist on a `Content-Type` header, treats an
/// empty or `null` body as the type's default (so missing fields are reported
/// by validation rather than by the parser), and rejects anything else that
/// does not deserialize with a `BadRequest` envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            tracing::debug!("Failed to read request body: {}", e);
            ApiError::bad_request("Invalid request body")
        })?;

        parse_body(&bytes).map(ApiJson)
    }
}

fn parse_body<T: DeserializeOwned + Default>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(T::default());
    }

    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| {
        tracing::debug!("Malformed JSON body: {}", e);
        ApiError::bad_request("Invalid request body")
    })?;

    if value.is_null() {
        return Ok(T::default());
    }

    serde_json::from_value(value).map_err(|e| {
        tracing::debug!("Unexpected JSON body shape: {}", e);
        ApiError::bad_request("Invalid request body")
    })
}
