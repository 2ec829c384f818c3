//! API error mapping.
//!
//! Translates core errors into the HTTP failure classes callers branch on:
//! 400 validation, 403 authorization, 404 not-found, 409 conflict (slot and
//! state conflicts, insufficient balance). Integrity failures in gateway
//! callbacks collapse into a generic 400 so the gateway learns nothing
//! beyond accept/reject; details stay in the logs.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rentfleet::booking::BookingError;
use rentfleet::settlement::SettlementError;
use rentfleet::wallet::WalletError;
use serde::Serialize;

/// API error with HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(self) -> String {
        match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.message_ref(), "server error");
        }
        let body = ErrorResponse {
            error: if status.is_server_error() {
                // don't leak internals
                "internal server error".to_string()
            } else {
                self.message()
            },
        };
        (status, Json(body)).into_response()
    }
}

impl ApiError {
    fn message_ref(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match &err {
            BookingError::Database(_) => ApiError::Internal(err.to_string()),
            BookingError::InvalidTimeWindow
            | BookingError::InvalidPhoneNumber
            | BookingError::OutsideOperatingHours { .. }
            | BookingError::OwnVehicle
            | BookingError::UnknownStatus(_) => ApiError::BadRequest(err.to_string()),
            BookingError::SlotConflict
            | BookingError::DuplicateBooking
            | BookingError::StateConflict { .. }
            | BookingError::CancelNotAllowed { .. } => ApiError::Conflict(err.to_string()),
            BookingError::BookingNotFound(_)
            | BookingError::VehicleNotFound(_)
            | BookingError::ContractNotFound(_) => ApiError::NotFound(err.to_string()),
            BookingError::Unauthorized(_) => ApiError::Forbidden(err.to_string()),
            BookingError::Wallet(wallet) => wallet_error(wallet, &err),
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        wallet_error(&err, &err)
    }
}

fn wallet_error(err: &WalletError, display: &dyn std::fmt::Display) -> ApiError {
    match err {
        WalletError::Database(_) => ApiError::Internal(display.to_string()),
        WalletError::WalletNotFound(_) | WalletError::TransactionNotFound(_) => {
            ApiError::NotFound(display.to_string())
        }
        WalletError::InsufficientBalance { .. } | WalletError::AlreadySettled(_) => {
            ApiError::Conflict(display.to_string())
        }
        WalletError::InvalidAmount(_)
        | WalletError::AmountMismatch { .. }
        | WalletError::UnknownStatus(_) => ApiError::BadRequest(display.to_string()),
        WalletError::NotOwner(_) => ApiError::Forbidden(display.to_string()),
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        match err {
            // integrity failures: generic rejection, details logged upstream
            SettlementError::InvalidSignature => {
                ApiError::BadRequest("payment rejected".to_string())
            }
            SettlementError::Wallet(WalletError::AmountMismatch { .. }) => {
                tracing::warn!("top-up amount mismatch rejected");
                ApiError::BadRequest("payment rejected".to_string())
            }
            SettlementError::GatewayFailure(code) => {
                ApiError::BadRequest(format!("gateway reported failure code {code}"))
            }
            SettlementError::MissingParameter(_) | SettlementError::MalformedParameter(_) => {
                ApiError::BadRequest(err.to_string())
            }
            SettlementError::UnknownTransaction(_) => ApiError::NotFound(err.to_string()),
            SettlementError::Booking(inner) => inner.into(),
            SettlementError::Wallet(inner) => inner.into(),
        }
    }
}

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rentfleet::booking::BookingStatus;
    use uuid::Uuid;

    #[test]
    fn booking_errors_map_to_http_classes() {
        let cases: Vec<(BookingError, StatusCode)> = vec![
            (BookingError::InvalidTimeWindow, StatusCode::BAD_REQUEST),
            (BookingError::SlotConflict, StatusCode::CONFLICT),
            (BookingError::DuplicateBooking, StatusCode::CONFLICT),
            (
                BookingError::StateConflict {
                    action: "delivered",
                    required: BookingStatus::Confirmed,
                },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::BookingNotFound(Uuid::new_v4()),
                StatusCode::NOT_FOUND,
            ),
            (BookingError::Unauthorized("cancel"), StatusCode::FORBIDDEN),
            (
                BookingError::Wallet(WalletError::InsufficientBalance {
                    available: 0,
                    required: 1,
                }),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn state_conflict_names_the_required_source_state() {
        let err = BookingError::StateConflict {
            action: "delivered",
            required: BookingStatus::Confirmed,
        };
        assert_eq!(err.to_string(), "only CONFIRMED bookings may be delivered");
    }

    #[test]
    fn integrity_failures_stay_generic() {
        let api: ApiError = SettlementError::InvalidSignature.into();
        assert_eq!(api.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(api.message_ref(), "payment rejected");

        let api: ApiError = SettlementError::Wallet(WalletError::AmountMismatch {
            declared: 100,
            reported: 99,
        })
        .into();
        assert_eq!(api.message_ref(), "payment rejected");
    }
}
