//! HTTP API for the rentfleet server.
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `GET /health` - Server health status
//! - `GET /api/v1/payments/callback` - Gateway booking-payment callback (signed)
//! - `GET /api/v1/payments/top-up/callback` - Gateway top-up callback (signed)
//!
//! ## Bookings (JWT required)
//! - `POST /api/v1/bookings` - Create booking
//! - `GET  /api/v1/bookings/me` - Caller's bookings, optional `?status=`
//! - `GET  /api/v1/bookings/status/{status}` - Bookings by status (staff)
//! - `GET  /api/v1/bookings/{id}` - Booking details
//! - `POST /api/v1/bookings/{id}/deliver` - Owner hands the vehicle over
//! - `POST /api/v1/bookings/{id}/receive` - Renter acknowledges the handoff
//! - `POST /api/v1/bookings/{id}/return` - Renter returns the vehicle
//! - `POST /api/v1/bookings/{id}/complete` - Owner settles the rental
//! - `POST /api/v1/bookings/{id}/cancel` - Renter or owner cancels
//! - `POST /api/v1/bookings/{id}/no-show` - Owner cancels a no-show
//! - `POST /api/v1/bookings/{id}/pay-wallet` - Pay from wallet balance
//!
//! ## Payments (JWT required)
//! - `POST /api/v1/payments/booking` - Gateway redirect URL for a booking
//! - `POST /api/v1/payments/top-up` - Gateway redirect URL for a top-up
//!
//! ## Wallet (JWT required)
//! - `GET  /api/v1/wallet` - Balance
//! - `GET  /api/v1/wallet/transactions` - Recent ledger entries
//! - `POST /api/v1/wallet/withdrawals` - Request a withdrawal
//! - `POST /api/v1/wallet/withdrawals/{id}/cancel` - Cancel own request
//! - `POST /api/v1/wallet/withdrawals/{id}/approve` - Approve (staff)
//!
//! ## Contracts (JWT required)
//! - `GET /api/v1/contracts/booking/{booking_id}` - Contract + final record
//!
//! Identity tokens are issued externally; the middleware only validates
//! them and extracts the caller id and role.

pub mod bookings;
pub mod contracts;
pub mod error;
pub mod middleware;
pub mod payments;
pub mod wallet;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use rentfleet::db::repository::ContractStore;
use rentfleet::notify::Notifier;
use rentfleet::{
    BookingManager, Clock, PaymentGateway, SettlementCoordinator, db::repository::WalletLedger,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; every field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingManager>,
    pub settlement: Arc<SettlementCoordinator>,
    pub wallet: Arc<dyn WalletLedger>,
    pub contracts: Arc<dyn ContractStore>,
    pub gateway: Arc<PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub pool: Arc<PgPool>,
    pub jwt_secret: Arc<str>,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let root_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", create_v1_router(state.clone()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    // Gateway callbacks authenticate through their signature, not a JWT.
    let public_routes = Router::new()
        .route("/payments/callback", get(payments::booking_callback))
        .route("/payments/top-up/callback", get(payments::top_up_callback));

    let protected_routes = Router::new()
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/me", get(bookings::my_bookings))
        .route("/bookings/status/{status}", get(bookings::bookings_by_status))
        .route("/bookings/{booking_id}", get(bookings::get_booking))
        .route("/bookings/{booking_id}/deliver", post(bookings::deliver))
        .route("/bookings/{booking_id}/receive", post(bookings::receive))
        .route("/bookings/{booking_id}/return", post(bookings::return_vehicle))
        .route("/bookings/{booking_id}/complete", post(bookings::complete))
        .route("/bookings/{booking_id}/cancel", post(bookings::cancel))
        .route("/bookings/{booking_id}/no-show", post(bookings::cancel_no_show))
        .route("/bookings/{booking_id}/pay-wallet", post(bookings::pay_with_wallet))
        .route("/payments/booking", post(payments::booking_payment))
        .route("/payments/top-up", post(payments::top_up))
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/transactions", get(wallet::transactions))
        .route("/wallet/withdrawals", post(wallet::create_withdrawal))
        .route("/wallet/withdrawals/{tx_id}/cancel", post(wallet::cancel_withdrawal))
        .route("/wallet/withdrawals/{tx_id}/approve", post(wallet::approve_withdrawal))
        .route("/contracts/booking/{booking_id}", get(contracts::contract_for_booking))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1")
        .fetch_one(&*state.pool)
        .await
        .is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": state.clock.now().to_rfc3339(),
    });

    (status_code, Json(response))
}
