//! Solana-style probe: a signature counts as verified when the node returns
//! the transaction at all. Versioned (v0) transactions are accepted.

use serde_json::{json, Value};

use super::{rpc, OracleError};

pub fn transaction_params(signature: &str) -> Value {
    json!([
        signature,
        {
            "encoding": "jsonParsed",
            "maxSupportedTransactionVersion": 0,
            "commitment": "confirmed"
        }
    ])
}

pub async fn verify_signature(client: &reqwest::Client, rpc_url: &str, signature: &str) -> Result<bool, OracleError> {
    if signature.trim().is_empty() || signature.chars().any(char::is_whitespace) {
        return Err(OracleError::MalformedReference(signature.to_string()));
    }
    let transaction = rpc::call(client, rpc_url, "getTransaction", transaction_params(signature)).await?;
    Ok(!transaction.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_accept_versioned_transactions() {
        let params = transaction_params("5sig");
        assert_eq!(params[0], "5sig");
        assert_eq!(params[1]["maxSupportedTransactionVersion"], 0);
        assert_eq!(params[1]["encoding"], "jsonParsed");
    }
}
