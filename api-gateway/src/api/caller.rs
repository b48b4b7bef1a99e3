//! Caller identity extractors
//!
//! Callers identify themselves with the `x-user-id` header. Admin routes also
//! require the caller to be one of the configured admin IDs.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The account making the request
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", USER_ID_HEADER)))?;

        value
            .to_str()
            .ok()
            .and_then(|id| Uuid::parse_str(id.trim()).ok())
            .map(Caller)
            .ok_or_else(|| ApiError::Unauthorized(format!("Invalid {} header", USER_ID_HEADER)))
    }
}

impl Caller {
    /// Fail unless the caller is `account_id` or an admin
    pub fn require_access(&self, state: &AppState, account_id: Uuid) -> Result<(), ApiError> {
        if self.0 == account_id || state.config.is_admin(self.0) {
            return Ok(());
        }
        Err(ApiError::Forbidden(format!("No access to account {}", account_id)))
    }
}

/// A caller listed in the admin IDs
#[derive(Debug, Clone, Copy)]
pub struct AdminCaller(pub Uuid);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Caller(id) = Caller::from_request_parts(parts, state).await?;
        if !state.config.is_admin(id) {
            return Err(ApiError::Forbidden(format!("{} is not an administrator", id)));
        }
        Ok(AdminCaller(id))
    }
}

/// JSON body whose rejections use the API error envelope
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}
