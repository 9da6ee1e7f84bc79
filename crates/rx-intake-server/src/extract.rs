//! Caller identity extraction.
//!
//! Identity arrives via `x-user-id` / `x-user-role` headers. This extractor
//! is the seam where real token verification would sit; everything behind it
//! receives an already-built [`Caller`].

use axum::{extract::FromRequestParts, http::request::Parts};

use rx_intake_core::{auth::Role, Caller, CoreError};

use crate::error::ApiError;

pub struct Identity(pub Caller);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, "x-user-id").filter(|v| !v.is_empty());
        let role = header(parts, "x-user-role").and_then(|v| Role::parse(&v));

        match (user_id, role) {
            (Some(user_id), Some(role)) => Ok(Identity(Caller { user_id, role })),
            _ => Err(CoreError::Unauthenticated.into()),
        }
    }
}

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
