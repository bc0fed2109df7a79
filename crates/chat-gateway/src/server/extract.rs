//! Request extractors for the REST surface

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use chat_core::Snowflake;
use serde::de::DeserializeOwned;
use validator::Validate;

use super::error::ApiError;

/// Header naming the calling user
pub const CALLER_HEADER: &str = "x-user-id";

/// The user a REST request acts for, taken from `X-User-Id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub Snowflake);

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Snowflake::parse(value).ok())
            .filter(|id| !id.is_zero())
            .map(CallerId)
            .ok_or(ApiError::MissingCaller)
    }
}

/// JSON body that passed `validator` checks
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| ApiError::invalid_request(e.body_text()))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Query string that passed `validator` checks
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_request(e.body_text()))?;

        value.validate()?;

        Ok(ValidatedQuery(value))
    }
}

/// Parse a path segment as an id
pub fn parse_id(raw: &str, name: &str) -> Result<Snowflake, ApiError> {
    Snowflake::parse(raw).map_err(|_| ApiError::invalid_path(format!("Invalid {name} format")))
}
