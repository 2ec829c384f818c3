//! Payment API handlers.
//!
//! Initiation endpoints hand the client a signed gateway redirect URL; the
//! callback endpoints receive the gateway's signed GET requests and feed
//! them to the settlement coordinator. Callbacks answer with a bare
//! accept/reject status; the gateway owns all retries.

use axum::{
    Json,
    extract::{Extension, Query, State},
    http::{HeaderMap, StatusCode},
};
use rentfleet::booking::{BookingStatus, Caller};
use rentfleet::db::repository::WalletLedger;
use rentfleet::settlement::{SettlementError, TopUpOutcome};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct BookingPaymentRequest {
    pub booking_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    /// Whole currency units.
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct PaymentUrlResponse {
    pub payment_url: String,
}

/// `POST /api/v1/payments/booking`: redirect URL paying for a booking.
pub async fn booking_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    Json(request): Json<BookingPaymentRequest>,
) -> ApiResult<Json<PaymentUrlResponse>> {
    let booking = state.bookings.by_id(request.booking_id).await?;
    if caller.id != booking.renter_id {
        return Err(ApiError::Forbidden(
            "only the renter may pay for this booking".to_string(),
        ));
    }
    if booking.status != BookingStatus::Pending {
        return Err(ApiError::Conflict(
            "booking has already been paid".to_string(),
        ));
    }

    let url = state
        .gateway
        .booking_payment_url(&booking, &client_ip(&headers), state.clock.now());
    Ok(Json(PaymentUrlResponse { payment_url: url }))
}

/// `POST /api/v1/payments/top-up`: redirect URL crediting the caller's
/// wallet. The created `PENDING` transaction id doubles as the gateway
/// transaction reference.
pub async fn top_up(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    Json(request): Json<TopUpRequest>,
) -> ApiResult<Json<PaymentUrlResponse>> {
    let transaction = state
        .wallet
        .create_pending_topup(caller.id, request.amount)
        .await?;
    let url = state
        .gateway
        .top_up_url(&transaction, &client_ip(&headers), state.clock.now());
    Ok(Json(PaymentUrlResponse { payment_url: url }))
}

/// `GET /api/v1/payments/callback`: gateway booking-payment callback.
pub async fn booking_callback(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<serde_json::Value>> {
    match state.settlement.confirm_booking_payment(&params).await {
        Ok(_) => {
            metrics::payment_confirmed("gateway");
            Ok(Json(json!({ "code": "00", "message": "success" })))
        }
        Err(e) => Err(reject_callback(e)),
    }
}

/// `GET /api/v1/payments/top-up/callback`: gateway top-up callback.
pub async fn top_up_callback(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    match state.settlement.credit_top_up(&params).await {
        Ok(TopUpOutcome::Credited { .. }) => {
            metrics::top_up_credited();
            Ok((StatusCode::OK, Json(json!({ "code": "00", "message": "success" }))))
        }
        Ok(TopUpOutcome::AlreadyCredited) => {
            Ok((StatusCode::OK, Json(json!({ "code": "00", "message": "success" }))))
        }
        Err(e) => Err(reject_callback(e)),
    }
}

fn reject_callback(err: SettlementError) -> ApiError {
    let reason = match &err {
        SettlementError::InvalidSignature => "signature",
        SettlementError::GatewayFailure(_) => "gateway_failure",
        SettlementError::UnknownTransaction(_) => "unknown_transaction",
        SettlementError::MissingParameter(_) | SettlementError::MalformedParameter(_) => {
            "malformed"
        }
        SettlementError::Booking(_) => "booking_state",
        SettlementError::Wallet(_) => "wallet_state",
    };
    metrics::callback_rejected(reason);
    err.into()
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
        assert_eq!(client_ip(&HeaderMap::new()), "127.0.0.1");
    }
}
