//! Contract API handlers.

use axum::{
    Json,
    extract::{Extension, Path, State},
};
use rentfleet::booking::Caller;
use rentfleet::contract::{Contract, FinalContract};
use rentfleet::db::repository::ContractStore;
use serde::Serialize;
use uuid::Uuid;

use super::AppState;
use super::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct ContractResponse {
    pub contract: Contract,
    pub final_contract: Option<FinalContract>,
}

/// `GET /api/v1/contracts/booking/{booking_id}`
///
/// Visible to the two parties and staff.
pub async fn contract_for_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<ContractResponse>> {
    let contract = state
        .contracts
        .by_booking(booking_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no contract for booking {booking_id}")))?;

    if caller.id != contract.renter_id && caller.id != contract.owner_id && !caller.is_staff() {
        return Err(ApiError::Forbidden(
            "caller is not a party to this contract".to_string(),
        ));
    }

    let final_contract = state.contracts.final_by_booking(booking_id).await?;
    Ok(Json(ContractResponse {
        contract,
        final_contract,
    }))
}
