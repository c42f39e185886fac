// ============================================================================
// TRANSACTION ROUTES - Verified deposits/withdrawals and pool history
// ============================================================================

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use super::{with_store, ApiError, ApiJson, AppState};
use crate::ledger::RecordTransactionRequest;
use crate::storage::DEFAULT_TRANSACTION_LIMIT;

/// POST /api/transactions
///
/// Body: `{chain, txHashOrSig, poolId, userAddress, amount, txType}`.
/// The claim is checked against the chain before anything is written.
pub async fn record_transaction_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RecordTransactionRequest>,
) -> Result<Json<Value>, ApiError> {
    let transaction = state.processor.record_transaction(request).await?;
    Ok(Json(json!({
        "success": true,
        "transaction": transaction,
    })))
}

/// GET /api/pools/{pool_id}/transactions - newest first, capped.
pub async fn pool_transactions_handler(
    State(state): State<AppState>,
    Path(pool_id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    let data = with_store(&state.store, move |store| {
        store.list_transactions_for_pool(pool_id, DEFAULT_TRANSACTION_LIMIT)
    })
    .await?;
    Ok(Json(json!({
        "success": true,
        "data": data,
    })))
}
