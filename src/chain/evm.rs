//! EVM-family probe: a transaction counts as verified once its receipt
//! reports `status == 1`.

use serde_json::{json, Value};

use super::{rpc, OracleError};

/// Reject anything that is not a 32-byte `0x`-prefixed hex hash before
/// spending a network round trip on it.
pub fn validate_tx_hash(hash: &str) -> Result<(), OracleError> {
    let digits = hash
        .strip_prefix("0x")
        .or_else(|| hash.strip_prefix("0X"))
        .ok_or_else(|| OracleError::MalformedReference(hash.to_string()))?;

    match hex::decode(digits) {
        Ok(bytes) if bytes.len() == 32 => Ok(()),
        _ => Err(OracleError::MalformedReference(hash.to_string())),
    }
}

/// `true` iff the receipt exists and its status is success.
///
/// Nodes encode status as a hex quantity (`"0x1"`); some gateways return a
/// plain number, so both are accepted.
pub fn receipt_succeeded(receipt: &Value) -> bool {
    match receipt.get("status") {
        Some(Value::String(s)) => {
            let digits = s.trim_start_matches("0x").trim_start_matches("0X");
            u64::from_str_radix(digits, 16).map(|v| v == 1).unwrap_or(false)
        }
        Some(Value::Number(n)) => n.as_u64() == Some(1),
        _ => false,
    }
}

pub async fn verify_receipt(client: &reqwest::Client, rpc_url: &str, hash: &str) -> Result<bool, OracleError> {
    validate_tx_hash(hash)?;
    let receipt = rpc::call(client, rpc_url, "eth_getTransactionReceipt", json!([hash])).await?;
    Ok(!receipt.is_null() && receipt_succeeded(&receipt))
}
