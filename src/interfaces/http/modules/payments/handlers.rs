//! Payment HTTP handlers
//!
//! The callback endpoint answers in the provider's protocol (plain `OK`), not
//! in the JSON envelope. Business failures are logged and acknowledged so the
//! provider stops retrying; a bad signature and storage outages are not.

use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::{CallbackProcessor, InitiatePayment, PaymentService, ACK_BODY};
use crate::interfaces::http::common::{ApiError, ApiResponse, TenantId, ValidatedJson};
use crate::shared::errors::{DomainError, DomainResult};

use super::dto::*;

#[derive(Clone)]
pub struct PaymentAppState {
    pub payments: Arc<PaymentService>,
    pub callbacks: Arc<CallbackProcessor>,
}

async fn acknowledge(state: &PaymentAppState, params: CallbackParams) -> Response {
    let result = state.callbacks.handle_callback(&params.data, &params.ss1).await;
    callback_response(result)
}

fn callback_response<T>(result: DomainResult<T>) -> Response {
    match result {
        Ok(_) => (StatusCode::OK, ACK_BODY).into_response(),
        Err(DomainError::InvalidSignature) => {
            (StatusCode::BAD_REQUEST, "Invalid signature").into_response()
        }
        Err(
            e @ (DomainError::MalformedCallback(_)
            | DomainError::UnknownTransaction(_)
            | DomainError::AmountMismatch { .. }
            | DomainError::UnrecognizedStatus { .. }),
        ) => {
            warn!(error = %e, "Payment callback not applied");
            (StatusCode::OK, ACK_BODY).into_response()
        }
        Err(e) => {
            error!(error = %e, "Payment callback failed, provider will retry");
            (StatusCode::SERVICE_UNAVAILABLE, "Temporarily unavailable").into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/callback",
    tag = "Payments",
    params(CallbackParams),
    responses(
        (status = 200, description = "Callback acknowledged", body = String, example = json!("OK")),
        (status = 400, description = "Invalid signature"),
        (status = 503, description = "Storage unavailable, retry later")
    )
)]
pub async fn payment_callback_get(
    State(state): State<PaymentAppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    acknowledge(&state, params).await
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/callback",
    tag = "Payments",
    request_body(content = CallbackParams, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Callback acknowledged", body = String, example = json!("OK")),
        (status = 400, description = "Invalid signature"),
        (status = 503, description = "Storage unavailable, retry later")
    )
)]
pub async fn payment_callback_post(
    State(state): State<PaymentAppState>,
    Form(params): Form<CallbackParams>,
) -> Response {
    acknowledge(&state, params).await
}

#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "Payments",
    params(("X-Tenant-Id" = Uuid, Header)),
    request_body = InitiatePaymentRequest,
    responses(
        (status = 201, description = "Provider order created", body = ApiResponse<PaymentInitiatedDto>),
        (status = 400, description = "Reservation closed or already paid"),
        (status = 404, description = "Reservation not found"),
        (status = 502, description = "Payment provider unavailable")
    )
)]
pub async fn initiate_payment(
    State(state): State<PaymentAppState>,
    TenantId(tenant_id): TenantId,
    ValidatedJson(request): ValidatedJson<InitiatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentInitiatedDto>>), ApiError> {
    let initiated = state
        .payments
        .initiate(InitiatePayment {
            tenant_id,
            reservation_id: request.reservation_id,
            payment_type: request.payment_type,
            amount: request.amount,
            description: request.description,
            email: request.email,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(initiated.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/cancel",
    tag = "Payments",
    params(OrderQuery),
    responses(
        (status = 200, description = "Pending payment marked failed", body = ApiResponse<PaymentDto>),
        (status = 404, description = "Unknown order")
    )
)]
pub async fn payment_cancelled(
    State(state): State<PaymentAppState>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<ApiResponse<PaymentDto>>, ApiError> {
    let payment = state.payments.mark_cancelled(&query.orderid).await?;
    Ok(Json(ApiResponse::success(payment.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/success",
    tag = "Payments",
    params(OrderQuery),
    responses(
        (status = 200, description = "Provider-side order status", body = ApiResponse<ProviderStatusDto>),
        (status = 404, description = "Unknown order"),
        (status = 502, description = "Payment provider unavailable")
    )
)]
pub async fn payment_succeeded(
    State(state): State<PaymentAppState>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<ApiResponse<ProviderStatusDto>>, ApiError> {
    let status = state.payments.provider_status(&query.orderid).await?;
    Ok(Json(ApiResponse::success(ProviderStatusDto {
        reference: query.orderid,
        status,
    })))
}
