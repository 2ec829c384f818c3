//! Wallet API handlers.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rentfleet::booking::Caller;
use rentfleet::db::repository::WalletLedger;
use rentfleet::notify::Notification;
use rentfleet::wallet::{TransactionStatus, WalletTransaction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use super::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub amount: i64,
    pub status: TransactionStatus,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<WalletTransaction> for TransactionResponse {
    fn from(tx: WalletTransaction) -> Self {
        Self {
            id: tx.id,
            amount: tx.amount,
            status: tx.status,
            reference: tx.reference,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    /// Whole currency units.
    pub amount: i64,
}

/// `GET /api/v1/wallet`
pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<WalletResponse>> {
    let wallet = state.wallet.wallet_for_user(caller.id).await?;
    Ok(Json(WalletResponse {
        balance: wallet.balance,
        updated_at: wallet.updated_at,
    }))
}

/// `GET /api/v1/wallet/transactions?limit=`
pub async fn transactions(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<TransactionResponse>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let entries = state.wallet.transactions_for_user(caller.id, limit).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// `POST /api/v1/wallet/withdrawals`
///
/// The request stays `PENDING` until staff approve it; the amount is
/// reserved against further withdrawals but the balance only moves on
/// approval.
pub async fn create_withdrawal(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<WithdrawalRequest>,
) -> ApiResult<(StatusCode, Json<TransactionResponse>)> {
    let tx = state
        .wallet
        .create_pending_withdrawal(caller.id, request.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(tx.into())))
}

/// `POST /api/v1/wallet/withdrawals/{id}/cancel`: owner cancels their own
/// pending request.
pub async fn cancel_withdrawal(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(tx_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.wallet.cancel_pending(tx_id, Some(caller.id)).await?;
    Ok(StatusCode::OK)
}

/// `POST /api/v1/wallet/withdrawals/{id}/approve`: staff settle the
/// request, moving the balance.
pub async fn approve_withdrawal(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(tx_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !caller.is_staff() {
        return Err(ApiError::Forbidden(
            "only staff may approve withdrawals".to_string(),
        ));
    }
    let owner = state
        .wallet
        .transaction_by_id(tx_id)
        .await?
        .map(|tx| tx.user_id);
    state.wallet.approve_pending(tx_id, None).await?;
    if let Some(owner) = owner {
        state.notifier.notify(
            owner,
            Notification::WithdrawalDecided {
                transaction_id: tx_id,
                approved: true,
            },
        );
    }
    Ok(StatusCode::OK)
}
