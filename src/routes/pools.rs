// ============================================================================
// POOL ROUTES - Pool CRUD and participants
// ============================================================================

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use super::{with_store, ApiError, ApiJson, AppState};
use crate::storage::NewPool;

/// POST /api/pools
pub async fn create_pool_handler(
    State(state): State<AppState>,
    ApiJson(new_pool): ApiJson<NewPool>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if !new_pool.has_required_fields() {
        warn!(name = %new_pool.name, chain = %new_pool.chain, "Pool creation missing required fields");
        return Err(ApiError::missing_fields());
    }

    let pool = with_store(&state.store, move |store| store.create_pool(new_pool)).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "pool": pool,
        })),
    ))
}

/// GET /api/pools - newest first
pub async fn list_pools_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let data = with_store(&state.store, |store| store.list_pools()).await?;
    Ok(Json(json!({
        "success": true,
        "data": data,
    })))
}

/// GET /api/pools/{pool_id}
pub async fn get_pool_handler(
    State(state): State<AppState>,
    Path(pool_id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    let pool = with_store(&state.store, move |store| store.get_pool(pool_id))
        .await?
        .ok_or_else(ApiError::pool_not_found)?;
    Ok(Json(json!({
        "success": true,
        "pool": pool,
    })))
}

/// GET /api/pools/{pool_id}/participants - largest holders first
pub async fn pool_participants_handler(
    State(state): State<AppState>,
    Path(pool_id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    let data = with_store(&state.store, move |store| {
        if store.get_pool(pool_id)?.is_none() {
            return Ok(None);
        }
        store.list_participants(pool_id).map(Some)
    })
    .await?
    .ok_or_else(ApiError::pool_not_found)?;

    Ok(Json(json!({
        "success": true,
        "data": data,
    })))
}
