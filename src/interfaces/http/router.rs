//! API router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::common::{ApiResponse, PaginatedResponse};
use super::modules::health::{self, HealthState};
use super::modules::metrics::{self, http_metrics_middleware, MetricsState};
use super::modules::payments::{self, dto as payment_dto, PaymentAppState};
use super::modules::reservations::{self, dto as reservation_dto, ReservationAppState};
use crate::application::{CallbackProcessor, PaymentService, ReservationService};

/// Everything the HTTP layer needs. Handlers extract their own slice via
/// `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub reservations: Arc<ReservationService>,
    pub payments: Arc<PaymentService>,
    pub callbacks: Arc<CallbackProcessor>,
    pub db: Option<DatabaseConnection>,
    pub lock_backend: &'static str,
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Arc<Instant>,
}

impl FromRef<AppState> for ReservationAppState {
    fn from_ref(s: &AppState) -> Self {
        ReservationAppState {
            service: Arc::clone(&s.reservations),
        }
    }
}

impl FromRef<AppState> for PaymentAppState {
    fn from_ref(s: &AppState) -> Self {
        PaymentAppState {
            payments: Arc::clone(&s.payments),
            callbacks: Arc::clone(&s.callbacks),
        }
    }
}

impl FromRef<AppState> for HealthState {
    fn from_ref(s: &AppState) -> Self {
        HealthState {
            db: s.db.clone(),
            lock_backend: s.lock_backend,
            started_at: Arc::clone(&s.started_at),
        }
    }
}

impl FromRef<AppState> for MetricsState {
    fn from_ref(s: &AppState) -> Self {
        MetricsState {
            handle: s.metrics.clone(),
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        reservations::create_reservation,
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::checkout_reservation,
        reservations::checkin_reservation,
        reservations::cancel_reservation,
        reservations::reschedule_reservation,
        payments::initiate_payment,
        payments::payment_callback_get,
        payments::payment_callback_post,
        payments::payment_cancelled,
        payments::payment_succeeded,
    ),
    components(
        schemas(
            ApiResponse<reservation_dto::ReservationDto>,
            PaginatedResponse<reservation_dto::ReservationDto>,
            reservation_dto::CreateReservationRequest,
            reservation_dto::CheckoutRequest,
            reservation_dto::CheckinRequest,
            reservation_dto::CancelRequest,
            reservation_dto::RescheduleRequest,
            reservation_dto::DamageReportDto,
            reservation_dto::ReservationDto,
            reservation_dto::CheckoutDto,
            reservation_dto::CheckinDto,
            reservation_dto::DocumentsDto,
            reservation_dto::CancellationDto,
            payment_dto::CallbackParams,
            payment_dto::InitiatePaymentRequest,
            payment_dto::PaymentDto,
            payment_dto::PaymentInitiatedDto,
            payment_dto::ProviderStatusDto,
            health::HealthResponse,
            health::ComponentHealth,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and database reachability."),
        (name = "Reservations", description = "Vehicle reservation lifecycle: create, check-out, check-in, cancel, reschedule. Every request is scoped to the tenant in `X-Tenant-Id`. Amounts are in minor currency units."),
        (name = "Payments", description = "Payment initiation, provider callbacks and payer redirects. The callback endpoint answers the literal `OK` expected by the provider."),
    ),
    info(
        title = "Fleet Reservations API",
        version = "1.0.0",
        description = "Multi-tenant vehicle reservation engine.

## Identity

Authentication happens upstream. Requests carry the tenant in `X-Tenant-Id`
and, optionally, the acting user in `X-User-Id`.

## Response format

```json
{\"success\": true, \"data\": {...}}
```

On error:
```json
{\"success\": false, \"data\": null, \"error\": \"description\"}
```

A `409` with `Retry-After: 1` means the vehicle was being booked by a
concurrent request; retrying is safe.",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let origin = if allowed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the API router with all routes
pub fn create_api_router(state: AppState, cors_origins: &[String]) -> Router {
    let reservation_routes = Router::new()
        .route(
            "/",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route("/{id}", get(reservations::get_reservation))
        .route("/{id}/checkout", post(reservations::checkout_reservation))
        .route("/{id}/checkin", post(reservations::checkin_reservation))
        .route("/{id}/cancel", post(reservations::cancel_reservation))
        .route("/{id}/reschedule", post(reservations::reschedule_reservation));

    let payment_routes = Router::new()
        .route("/", post(payments::initiate_payment))
        .route(
            "/callback",
            get(payments::payment_callback_get).post(payments::payment_callback_post),
        )
        .route("/cancel", get(payments::payment_cancelled))
        .route("/success", get(payments::payment_succeeded));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        .nest("/api/v1/reservations", reservation_routes)
        .nest("/api/v1/payments", payment_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}
