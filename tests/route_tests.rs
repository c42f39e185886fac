//! HTTP Route Tests
//!
//! Handlers are called directly with `State`/`ApiJson`/`Path` extractors, plus a
//! few requests through the real router to pin status codes and bodies.


use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use pool_ledger::routes::{self, dashboard, pools, transactions, ApiError, ApiJson};
use pool_ledger::RecordTransactionRequest;
use test_helpers::*;

fn body(value: Value) -> ApiJson<RecordTransactionRequest> {
    ApiJson(serde_json::from_value(value).unwrap())
}

// ============================================================================
// POST /api/transactions
// ============================================================================

#[tokio::test]
async fn test_verified_deposit_returns_transaction() {
    let ledger = create_seeded_ledger(true);

    let Json(response) = transactions::record_transaction_handler(
        State(ledger.state.clone()),
        body(json!({
            "chain": "Sepolia",
            "txHashOrSig": "0xabc",
            "poolId": 1,
            "userAddress": "0xu1",
            "amount": "100",
            "txType": "Deposit"
        })),
    )
    .await
    .unwrap();

    assert_eq!(response["success"], true);
    let tx = &response["transaction"];
    assert_eq!(tx["pool_id"], 1);
    assert_eq!(tx["transaction_type"], "deposit");
    assert_eq!(tx["amount"], json!(100));
    assert!(tx["amount"].is_i64());
    assert_eq!(tx["user_address"], "0xu1");
    assert_eq!(tx["tx_hash_or_sig"], "0xabc");
    assert!(tx["id"].is_u64());
    assert!(tx["created_on"].is_string());

    assert_eq!(balance(&ledger.store, 1), 100.0);
    assert_eq!(ledger.store.get_participant(1, "0xu1").unwrap().unwrap().amount, 100.0);
}

#[tokio::test]
async fn test_unverified_deposit_is_400_and_changes_nothing() {
    let ledger = create_seeded_ledger(false);

    let err = transactions::record_transaction_handler(
        State(ledger.state.clone()),
        ApiJson(deposit(1, "0xu1", "100", "0xabc")),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.message(), "Could not verify transaction on-chain");
    assert_eq!(balance(&ledger.store, 1), 0.0);
    assert!(ledger.store.get_participant(1, "0xu1").unwrap().is_none());
    assert_eq!(ledger.store.transaction_count().unwrap(), 0);
}

#[tokio::test]
async fn test_missing_fields_is_400() {
    let ledger = create_seeded_ledger(true);

    let err = transactions::record_transaction_handler(
        State(ledger.state.clone()),
        body(json!({ "chain": "Sepolia", "poolId": 1, "amount": "5" })),
    )
    .await
    .unwrap_err();

    assert_eq!(err, ApiError::BadRequest("Missing required fields".to_string()));
    assert_eq!(ledger.verifier.calls(), 0);
}

#[tokio::test]
async fn test_withdraw_of_full_position_deletes_row() {
    let ledger = create_seeded_ledger(true);
    seed_participant(&ledger.store, 1, "0xu1", 100.0);

    let Json(response) = transactions::record_transaction_handler(
        State(ledger.state.clone()),
        ApiJson(withdraw(1, "0xu1", "100", "0xdef")),
    )
    .await
    .unwrap();

    assert_eq!(response["transaction"]["transaction_type"], "withdraw");
    assert!(ledger.store.get_participant(1, "0xu1").unwrap().is_none());
    assert_eq!(balance(&ledger.store, 1), -100.0);
    assert_eq!(pool(&ledger.store, 1).active_entries, 0);
}

#[tokio::test]
async fn test_duplicate_and_unknown_pool_statuses() {
    let ledger = create_seeded_ledger(true);
    let state = ledger.state.clone();

    transactions::record_transaction_handler(State(state.clone()), ApiJson(deposit(1, "0xu1", "1", "0xr1")))
        .await
        .unwrap();
    let dup = transactions::record_transaction_handler(State(state.clone()), ApiJson(deposit(1, "0xu1", "1", "0xr1")))
        .await
        .unwrap_err();
    assert_eq!(dup.status(), StatusCode::CONFLICT);
    assert_eq!(dup.message(), "Transaction already recorded");

    let missing = transactions::record_transaction_handler(State(state), ApiJson(deposit(77, "0xu1", "1", "0xr2")))
        .await
        .unwrap_err();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(missing.message(), "Pool not found");
}

// ============================================================================
// GET /api/pools/{pool_id}/transactions
// ============================================================================

#[tokio::test]
async fn test_pool_history_is_newest_first_and_capped() {
    let ledger = create_seeded_ledger(true);
    for i in 0..55 {
        ledger
            .processor
            .record_transaction(deposit(1, "0xu1", "1", &format!("0xhist{}", i)))
            .await
            .unwrap();
    }

    let Json(response) = transactions::pool_transactions_handler(State(ledger.state.clone()), Path(1))
        .await
        .unwrap();

    let data = response["data"].as_array().unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(data.len(), 50);
    assert_eq!(data[0]["tx_hash_or_sig"], "0xhist54");
    let ids: Vec<u64> = data.iter().map(|t| t["id"].as_u64().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] > w[1]));
}

#[tokio::test]
async fn test_pool_history_for_unused_pool_is_empty() {
    let ledger = create_seeded_ledger(true);
    let Json(response) = transactions::pool_transactions_handler(State(ledger.state.clone()), Path(3))
        .await
        .unwrap();
    assert_eq!(response["data"], json!([]));
}

// ============================================================================
// POOLS
// ============================================================================

#[tokio::test]
async fn test_create_list_and_get_pool() {
    let ledger = create_test_ledger(true);

    let (status, Json(created)) = pools::create_pool_handler(
        State(ledger.state.clone()),
        ApiJson(serde_json::from_value(json!({
            "name": "Beta",
            "chain": "SolanaDevnet",
            "ownerAddress": "So1Owner",
            "isNativeToken": false,
            "tokenAddress": "MintAddr",
            "withdrawLockValue": 2,
            "withdrawLockUnit": "weeks"
        }))
        .unwrap()),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["pool"]["id"], 1);
    assert_eq!(created["pool"]["token_address"], "MintAddr");
    assert_eq!(created["pool"]["active_entries"], 0);

    let Json(listed) = pools::list_pools_handler(State(ledger.state.clone())).await.unwrap();
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let Json(fetched) = pools::get_pool_handler(State(ledger.state.clone()), Path(1)).await.unwrap();
    assert_eq!(fetched["pool"]["name"], "Beta");

    let err = pools::get_pool_handler(State(ledger.state.clone()), Path(2)).await.unwrap_err();
    assert_eq!(err, ApiError::pool_not_found());
}

#[tokio::test]
async fn test_create_pool_requires_fields() {
    let ledger = create_test_ledger(true);

    let err = pools::create_pool_handler(
        State(ledger.state.clone()),
        ApiJson(serde_json::from_value(json!({ "name": "NoChain", "ownerAddress": "0xo" })).unwrap()),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.message(), "Missing required fields");
    assert_eq!(ledger.store.pool_count().unwrap(), 0);
}

#[tokio::test]
async fn test_participants_ordered_by_amount() {
    let ledger = create_seeded_ledger(true);
    seed_participant(&ledger.store, 1, "0xsmall", 1.0);
    seed_participant(&ledger.store, 1, "0xbig", 50.0);
    seed_participant(&ledger.store, 1, "0xmid", 10.0);

    let Json(response) = pools::pool_participants_handler(State(ledger.state.clone()), Path(1))
        .await
        .unwrap();
    let users: Vec<&str> = response["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["user_address"].as_str().unwrap())
        .collect();
    assert_eq!(users, vec!["0xbig", "0xmid", "0xsmall"]);

    let err = pools::pool_participants_handler(State(ledger.state.clone()), Path(5)).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// DASHBOARD + HEALTH
// ============================================================================

#[tokio::test]
async fn test_dashboard_handler_wraps_entries() {
    let ledger = create_seeded_ledger(true);
    ledger.processor.record_transaction(deposit(1, "0xu1", "5", "0xdash")).await.unwrap();

    let Json(response) = dashboard::dashboard_handler(State(ledger.state.clone()), Path("0xu1".to_string()))
        .await
        .unwrap();

    assert_eq!(response["success"], true);
    assert_eq!(response["pools"][0]["type"], "Deposit");
    assert_eq!(response["pools"][0]["withdraw_lock_seconds"], 432_000);
}

#[tokio::test]
async fn test_health_reports_pool_count() {
    let ledger = create_seeded_ledger(true);
    let Json(response) = routes::health_handler(State(ledger.state.clone())).await.unwrap();
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["pools"], 1);
    assert_eq!(response["version"], routes::VERSION);
}

// ============================================================================
// THROUGH THE ROUTER
// ============================================================================

async fn serve(ledger: &TestLedger) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::router(ledger.state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_router_error_bodies() {
    let ledger = create_seeded_ledger(false);
    let base = serve(&ledger).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/transactions", base))
        .json(&json!({
            "chain": "Sepolia", "txHashOrSig": "0xabc", "poolId": "1",
            "userAddress": "0xu1", "amount": 100, "txType": "deposit"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Could not verify transaction on-chain" }));

    let response = client.get(format!("{}/api/pools/9", base)).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Pool not found" }));
}

#[tokio::test]
async fn test_router_records_and_lists() {
    let ledger = create_seeded_ledger(true);
    let base = serve(&ledger).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/transactions", base))
        .json(&json!({
            "chain": "Sepolia", "txHashOrSig": "0xabc", "poolId": 1,
            "userAddress": "0xu1", "amount": "100", "txType": "Deposit"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = client
        .get(format!("{}/api/pools/1/transactions", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"][0]["tx_hash_or_sig"], "0xabc");

    let health: Value = client.get(format!("{}/health", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_router_malformed_bodies_get_json_errors() {
    let ledger = create_seeded_ledger(true);
    let base = serve(&ledger).await;
    let client = reqwest::Client::new();
    let missing = json!({ "error": "Missing required fields" });

    for path in ["/api/transactions", "/api/pools"] {
        let url = format!("{}{}", base, path);

        // Valid JSON, wrong shape
        let response = client
            .post(&url)
            .header("content-type", "application/json")
            .body("[1]")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "{} array body", path);
        assert_eq!(response.json::<Value>().await.unwrap(), missing);

        // Truncated JSON
        let response = client
            .post(&url)
            .header("content-type", "application/json")
            .body(r#"{"chain": "Sepolia""#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "{} truncated body", path);
        assert_eq!(response.json::<Value>().await.unwrap(), missing);

        // Not JSON at all
        let response = client
            .post(&url)
            .header("content-type", "application/x-www-form-urlencoded")
            .body("chain=Sepolia")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "{} form body", path);
        assert_eq!(response.json::<Value>().await.unwrap(), missing);
    }

    assert_eq!(ledger.store.transaction_count().unwrap(), 0);
    assert_eq!(ledger.store.pool_count().unwrap(), 1);
    assert_eq!(ledger.verifier.calls(), 0);
}

#[tokio::test]
async fn test_router_whole_amounts_are_json_integers() {
    let ledger = create_seeded_ledger(true);
    let base = serve(&ledger).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{}/api/transactions", base))
        .json(&json!({
            "chain": "Sepolia", "txHashOrSig": "0xint", "poolId": 1,
            "userAddress": "0xu1", "amount": "100", "txType": "deposit"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["transaction"]["amount"], json!(100));

    let pool: Value = client.get(format!("{}/api/pools/1", base)).send().await.unwrap().json().await.unwrap();
    assert!(pool["pool"]["current_pool_balance"].is_i64());

    let feed: Value = client.get(format!("{}/api/dashboard/0xu1", base)).send().await.unwrap().json().await.unwrap();
    assert!(feed["pools"][0]["deposit_amount"].is_i64());
}
