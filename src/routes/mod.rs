// ============================================================================
// POOL LEDGER HTTP ROUTES
// ============================================================================
//
// Thin axum handlers over the ledger core. Every error leaves as
// `{ "error": "<generic message>" }`; details go to the log only.
//
// Route Organization:
// - transactions.rs: Record a verified deposit/withdraw, pool history
// - pools.rs:        Pool CRUD and participant listing
// - dashboard.rs:    Per-wallet dashboard feed
//
// ============================================================================

pub mod dashboard;
pub mod pools;
pub mod transactions;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::ledger::{DashboardAggregator, ProcessError, TransactionProcessor, ValidationError};
use crate::storage::{LedgerError, LedgerResult, LedgerStore};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub processor: TransactionProcessor,
    pub store: LedgerStore,
    pub dashboard: DashboardAggregator,
}

impl AppState {
    pub fn new(processor: TransactionProcessor) -> Self {
        let store = processor.store().clone();
        Self {
            dashboard: DashboardAggregator::new(store.clone()),
            store,
            processor,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => msg,
            ApiError::Internal => "Server error",
        }
    }

    pub fn pool_not_found() -> Self {
        ApiError::NotFound("Pool not found".to_string())
    }

    pub fn missing_fields() -> Self {
        ApiError::BadRequest("Missing required fields".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<ProcessError> for ApiError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::Validation(ValidationError::MissingFields) => ApiError::missing_fields(),
            ProcessError::Validation(other) => ApiError::BadRequest(other.to_string()),
            ProcessError::NotVerified => ApiError::BadRequest("Could not verify transaction on-chain".to_string()),
            ProcessError::AlreadyRecorded(_) => ApiError::Conflict("Transaction already recorded".to_string()),
            ProcessError::PoolNotFound(_) => ApiError::pool_not_found(),
            ProcessError::Storage(_) => ApiError::Internal,
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::PoolNotFound(_) => ApiError::pool_not_found(),
            LedgerError::DuplicateReference(_) => ApiError::Conflict("Transaction already recorded".to_string()),
            other => {
                error!(error = %other, "❌ Storage operation failed");
                ApiError::Internal
            }
        }
    }
}

// ============================================================================
// EXTRACTORS
// ============================================================================

/// `Json<T>` whose rejections leave as `400 {error}` instead of axum's
/// plain-text 400/415/422. The serde detail is logged, never returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                warn!(status = %rejection.status(), error = %rejection.body_text(), "Rejected request body");
                Err(ApiError::missing_fields())
            }
        }
    }
}

/// Run blocking store work off the async runtime.
pub(crate) async fn with_store<T, F>(store: &LedgerStore, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&LedgerStore) -> LedgerResult<T> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || work(&store))
        .await
        .map_err(|e| {
            error!(error = %e, "❌ Storage worker panicked");
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

// ============================================================================
// HEALTH
// ============================================================================

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let pools = with_store(&state.store, |store| store.pool_count()).await?;
    Ok(Json(json!({
        "status": "healthy",
        "version": VERSION,
        "pools": pools,
    })))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        // Transactions
        .route("/api/transactions", post(transactions::record_transaction_handler))
        .route("/api/pools/{pool_id}/transactions", get(transactions::pool_transactions_handler))
        // Pools
        .route("/api/pools", post(pools::create_pool_handler).get(pools::list_pools_handler))
        .route("/api/pools/{pool_id}", get(pools::get_pool_handler))
        .route("/api/pools/{pool_id}/participants", get(pools::pool_participants_handler))
        // Dashboard
        .route("/api/dashboard/{wallet_address}", get(dashboard::dashboard_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
