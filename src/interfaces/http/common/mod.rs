//! Shared HTTP building blocks: response envelope, error mapping, identity
//! headers and the validating JSON extractor

pub mod error;
pub mod identity;
pub mod validated_json;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::pagination::PaginatedResult;

pub use error::ApiError;
pub use identity::{ActorId, TenantId, TENANT_HEADER, USER_HEADER};
pub use validated_json::ValidatedJson;

/// Standard response envelope
///
/// Success: `{"success": true, "data": {...}}`,
/// failure: `{"success": false, "data": null, "error": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Page of items with paging metadata
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    /// 1-based
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T, U> From<PaginatedResult<U>> for PaginatedResponse<T>
where
    T: From<U>,
{
    fn from(result: PaginatedResult<U>) -> Self {
        let result = result.map(T::from);
        Self {
            items: result.items,
            total: result.total,
            page: result.page,
            limit: result.limit,
            total_pages: result.total_pages,
        }
    }
}
