//! Minimal JSON-RPC 2.0 client shared by the EVM and Solana probes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::OracleError;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

/// Call `method` and return its `result` (`Value::Null` when the node has none).
pub async fn call(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Value,
) -> Result<Value, OracleError> {
    let request = JsonRpcRequest { jsonrpc: "2.0", id: 1, method, params };

    let response = client
        .post(url)
        .json(&request)
        .send()
        .await?
        .error_for_status()?;

    let body: JsonRpcResponse = response.json().await?;

    if let Some(err) = body.error {
        return Err(OracleError::Rpc { code: err.code, message: err.message });
    }
    Ok(body.result.unwrap_or(Value::Null))
}
