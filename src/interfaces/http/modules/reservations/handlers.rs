//! Reservation HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::application::{
    CancelReservation, CheckinReservation, CheckoutReservation, CreateReservation,
    RescheduleReservation, ReservationService,
};
use crate::domain::repositories::ReservationFilter;
use crate::interfaces::http::common::{
    ActorId, ApiError, ApiResponse, PaginatedResponse, TenantId, ValidatedJson,
};
use crate::shared::pagination::{PaginationParams, DEFAULT_PAGE_LIMIT};

use super::dto::*;

/// Application state for reservation handlers.
#[derive(Clone)]
pub struct ReservationAppState {
    pub service: Arc<ReservationService>,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    tag = "Reservations",
    params(("X-Tenant-Id" = Uuid, Header), ("X-User-Id" = Option<Uuid>, Header)),
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation confirmed", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Invalid body or window, inactive requester or vehicle out of service"),
        (status = 404, description = "Vehicle or requester not found"),
        (status = 409, description = "Vehicle not available for these dates, or being booked concurrently")
    )
)]
pub async fn create_reservation(
    State(state): State<ReservationAppState>,
    TenantId(tenant_id): TenantId,
    ActorId(actor_id): ActorId,
    ValidatedJson(request): ValidatedJson<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationDto>>), ApiError> {
    let reservation = state
        .service
        .create(CreateReservation {
            tenant_id,
            asset_id: request.asset_id,
            requester_id: request.requester_id,
            start_at: request.start_at,
            end_at: request.end_at,
            amount: request.amount,
            guarantee_amount: request.guarantee_amount,
            notes: request.notes,
            actor_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(reservation.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations",
    tag = "Reservations",
    params(("X-Tenant-Id" = Uuid, Header), ListReservationsQuery),
    responses(
        (status = 200, description = "Reservations of the tenant, latest start first", body = ApiResponse<PaginatedResponse<ReservationDto>>)
    )
)]
pub async fn list_reservations(
    State(state): State<ReservationAppState>,
    TenantId(tenant_id): TenantId,
    Query(query): Query<ListReservationsQuery>,
) -> ApiResult<PaginatedResponse<ReservationDto>> {
    let filter = ReservationFilter {
        asset_id: query.asset_id,
        requester_id: query.requester_id,
        status: query.status,
    };
    let page = PaginationParams::new(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
    );

    let result = state.service.list(tenant_id, filter, page).await?;
    Ok(Json(ApiResponse::success(result.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    params(("id" = Uuid, Path, description = "Reservation ID"), ("X-Tenant-Id" = Uuid, Header)),
    responses(
        (status = 200, description = "Reservation details", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<ReservationAppState>,
    TenantId(tenant_id): TenantId,
    Path(id): Path<Uuid>,
) -> ApiResult<ReservationDto> {
    let reservation = state.service.get(tenant_id, id).await?;
    Ok(Json(ApiResponse::success(reservation.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/checkout",
    tag = "Reservations",
    params(("id" = Uuid, Path), ("X-Tenant-Id" = Uuid, Header), ("X-User-Id" = Option<Uuid>, Header)),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Vehicle handed over", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Not confirmed, before the start date, or odometer below the vehicle's"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn checkout_reservation(
    State(state): State<ReservationAppState>,
    TenantId(tenant_id): TenantId,
    ActorId(actor_id): ActorId,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CheckoutRequest>,
) -> ApiResult<ReservationDto> {
    let reservation = state
        .service
        .checkout(CheckoutReservation {
            tenant_id,
            reservation_id: id,
            odometer: request.odometer,
            fuel_level: request.fuel_level,
            payment_method: request.payment_method,
            guarantee_reference: request.guarantee_reference,
            notes: request.notes,
            actor_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(reservation.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/checkin",
    tag = "Reservations",
    params(("id" = Uuid, Path), ("X-Tenant-Id" = Uuid, Header), ("X-User-Id" = Option<Uuid>, Header)),
    request_body = CheckinRequest,
    responses(
        (status = 200, description = "Vehicle returned", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Not checked out, or odometer below the check-out reading"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn checkin_reservation(
    State(state): State<ReservationAppState>,
    TenantId(tenant_id): TenantId,
    ActorId(actor_id): ActorId,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CheckinRequest>,
) -> ApiResult<ReservationDto> {
    let reservation = state
        .service
        .checkin(CheckinReservation {
            tenant_id,
            reservation_id: id,
            odometer: request.odometer,
            fuel_level: request.fuel_level,
            damage_reports: request.damage_reports.into_iter().map(Into::into).collect(),
            notes: request.notes,
            actor_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(reservation.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/cancel",
    tag = "Reservations",
    params(("id" = Uuid, Path), ("X-Tenant-Id" = Uuid, Header), ("X-User-Id" = Option<Uuid>, Header)),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Reservation cancelled, with the late-cancellation fee", body = ApiResponse<CancellationDto>),
        (status = 400, description = "Reservation cannot be cancelled from its status"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn cancel_reservation(
    State(state): State<ReservationAppState>,
    TenantId(tenant_id): TenantId,
    ActorId(actor_id): ActorId,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CancelRequest>,
) -> ApiResult<CancellationDto> {
    let outcome = state
        .service
        .cancel(CancelReservation {
            tenant_id,
            reservation_id: id,
            reason: request.reason,
            actor_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(outcome.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/reschedule",
    tag = "Reservations",
    params(("id" = Uuid, Path), ("X-Tenant-Id" = Uuid, Header), ("X-User-Id" = Option<Uuid>, Header)),
    request_body = RescheduleRequest,
    responses(
        (status = 200, description = "Reservation moved", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Only confirmed reservations can be rescheduled"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Vehicle not available for the new dates")
    )
)]
pub async fn reschedule_reservation(
    State(state): State<ReservationAppState>,
    TenantId(tenant_id): TenantId,
    ActorId(actor_id): ActorId,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<RescheduleRequest>,
) -> ApiResult<ReservationDto> {
    let reservation = state
        .service
        .reschedule(RescheduleReservation {
            tenant_id,
            reservation_id: id,
            start_at: request.start_at,
            end_at: request.end_at,
            amount: request.amount,
            actor_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(reservation.into())))
}
