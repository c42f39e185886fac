use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use super::{ApiError, AppState};

/// GET /api/dashboard/{wallet_address}
///
/// Pools the wallet created plus pools it holds a position in, newest first.
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let pools = state.dashboard.get_dashboard(&wallet_address).await?;
    Ok(Json(json!({
        "success": true,
        "pools": pools,
    })))
}
