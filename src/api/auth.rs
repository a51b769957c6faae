//! Bearer-token gates for the API.
//!
//! The real user-facing authentication system lives outside this service;
//! these extractors are the integration seam it plugs into. Two tokens are
//! configured at startup: a general API token for field clients and an admin
//! token for operational endpoints.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use super::error::ApiError;

/// Trait for state types that carry the configured tokens.
pub trait HasTokens {
    fn api_token(&self) -> &str;
    fn admin_token(&self) -> &str;
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Extractor for endpoints any authenticated client may call.
/// Accepts either the API token or the admin token.
pub struct ApiAuth;

impl<S> FromRequestParts<S> for ApiAuth
where
    S: HasTokens + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) if token == state.api_token() || token == state.admin_token() => {
                Ok(ApiAuth)
            }
            Some(_) => Err(ApiError::unauthorized("Invalid token")),
            None => Err(ApiError::unauthorized("Not authenticated")),
        }
    }
}

/// Extractor for operational endpoints. Only the admin token is accepted.
pub struct AdminAuth;

impl<S> FromRequestParts<S> for AdminAuth
where
    S: HasTokens + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) if token == state.admin_token() => Ok(AdminAuth),
            Some(token) if token == state.api_token() => {
                Err(ApiError::forbidden("Admin token required"))
            }
            Some(_) => Err(ApiError::unauthorized("Invalid token")),
            None => Err(ApiError::unauthorized("Not authenticated")),
        }
    }
}
