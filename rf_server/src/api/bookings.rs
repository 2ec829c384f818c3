//! Booking lifecycle API handlers.
//!
//! Creation returns the booking id and total cost; cancellation returns
//! the applied penalty and resulting refund. Every handoff transition maps
//! onto one endpoint.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rentfleet::booking::{
    Booking, BookingStatus, Caller, CancellationOutcome, CompletionRequest, CreateBookingRequest,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::metrics;

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub status: BookingStatus,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub total_cost: i64,
    pub transaction_ref: String,
    pub cancel_penalty: Option<i64>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            vehicle_id: b.vehicle_id,
            status: b.status,
            time_start: b.time_start,
            time_end: b.time_end,
            total_cost: b.total_cost,
            transaction_ref: b.transaction_ref,
            cancel_penalty: b.cancel_penalty,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoShowRequest {
    pub reason: String,
}

/// `POST /api/v1/bookings`
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<BookingResponse>)> {
    let booking = state.bookings.create(&caller, request).await?;
    metrics::booking_created();
    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// `GET /api/v1/bookings/me?status=`
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<Json<Vec<BookingResponse>>> {
    let status = parse_status(filter.status.as_deref())?;
    let bookings = state.bookings.list_for_renter(caller.id, status).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// `GET /api/v1/bookings/status/{status}` (staff view)
pub async fn bookings_by_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(status): Path<String>,
) -> ApiResult<Json<Vec<BookingResponse>>> {
    if !caller.is_staff() {
        return Err(ApiError::Forbidden(
            "only staff may list bookings across users".to_string(),
        ));
    }
    let status: BookingStatus = status.parse().map_err(ApiError::from)?;
    let bookings = state.bookings.list_by_status(status).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// `GET /api/v1/bookings/{id}`
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<BookingResponse>> {
    let booking = state.bookings.by_id(booking_id).await?;
    if caller.id != booking.renter_id && caller.id != booking.owner_id && !caller.is_staff() {
        return Err(ApiError::Forbidden(
            "caller is not a party to this booking".to_string(),
        ));
    }
    Ok(Json(booking.into()))
}

/// `POST /api/v1/bookings/{id}/deliver`
pub async fn deliver(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.bookings.deliver(&caller, booking_id).await?;
    Ok(StatusCode::OK)
}

/// `POST /api/v1/bookings/{id}/receive`
pub async fn receive(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.bookings.receive(&caller, booking_id).await?;
    Ok(StatusCode::OK)
}

/// `POST /api/v1/bookings/{id}/return`
pub async fn return_vehicle(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.bookings.return_vehicle(&caller, booking_id).await?;
    Ok(StatusCode::OK)
}

/// `POST /api/v1/bookings/{id}/complete`
pub async fn complete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<CompletionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let record = state.bookings.complete(&caller, booking_id, request).await?;
    Ok(Json(serde_json::json!({
        "final_contract_id": record.id,
        "cost_settlement": record.cost_settlement,
        "time_finish": record.time_finish,
    })))
}

/// `POST /api/v1/bookings/{id}/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<CancellationOutcome>> {
    let outcome = state.bookings.cancel(&caller, booking_id).await?;
    metrics::booking_cancelled(false);
    Ok(Json(outcome))
}

/// `POST /api/v1/bookings/{id}/no-show`
pub async fn cancel_no_show(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<NoShowRequest>,
) -> ApiResult<Json<CancellationOutcome>> {
    let outcome = state
        .bookings
        .cancel_no_show(&caller, booking_id, &request.reason)
        .await?;
    metrics::booking_cancelled(true);
    Ok(Json(outcome))
}

/// `POST /api/v1/bookings/{id}/pay-wallet`
pub async fn pay_with_wallet(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.settlement.pay_with_wallet(&caller, booking_id).await?;
    metrics::payment_confirmed("wallet");
    Ok(StatusCode::OK)
}

fn parse_status(raw: Option<&str>) -> ApiResult<Option<BookingStatus>> {
    raw.map(|s| s.parse::<BookingStatus>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}
