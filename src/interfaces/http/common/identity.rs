//! Tenant and user identity from request headers
//!
//! Authentication happens upstream; the gateway in front of this service
//! forwards the resolved identity as headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use super::ApiError;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";

/// Tenant the request acts for. Required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantId(pub Uuid);

/// Acting user, when known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorId(pub Option<Uuid>);

fn header_uuid(parts: &Parts, name: &str) -> Result<Option<Uuid>, ApiError> {
    let Some(value) = parts.headers.get(name) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .map(Some)
        .ok_or_else(|| ApiError::bad_request(format!("Header {name} must be a UUID")))
}

impl<S> FromRequestParts<S> for TenantId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_uuid(parts, TENANT_HEADER)?
            .map(TenantId)
            .ok_or_else(|| ApiError::bad_request(format!("Missing {TENANT_HEADER} header")))
    }
}

impl<S> FromRequestParts<S> for ActorId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_uuid(parts, USER_HEADER).map(ActorId)
    }
}
