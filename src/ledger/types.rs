//! Inbound request shape, validation, and the processor error taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::storage::{LedgerError, NewTransaction, TransactionType};

// ============================================================================
// ERRORS
// ============================================================================

/// Input shape problems, detected before the oracle is consulted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required fields")]
    MissingFields,

    #[error("Invalid transaction type: {0}")]
    InvalidTransactionType(String),

    #[error("Invalid pool id: {0}")]
    InvalidPoolId(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Everything `record_transaction` can fail with.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Oracle said no (or could not be reached). Nothing was written.
    #[error("Could not verify transaction on-chain")]
    NotVerified,

    #[error("Transaction already recorded: {0}")]
    AlreadyRecorded(String),

    #[error("Pool not found: {0}")]
    PoolNotFound(u64),

    /// The atomic unit failed and was rolled back.
    #[error("Storage failure: {0}")]
    Storage(LedgerError),
}

impl From<LedgerError> for ProcessError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::DuplicateReference(reference) => ProcessError::AlreadyRecorded(reference),
            LedgerError::PoolNotFound(id) => ProcessError::PoolNotFound(id),
            other => ProcessError::Storage(other),
        }
    }
}

// ============================================================================
// REQUEST
// ============================================================================

/// Body of `POST /api/transactions`.
///
/// Fields are loose JSON values: the frontend sends `poolId` and `amount`
/// either as numbers or as strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTransactionRequest {
    pub chain: Option<Value>,
    pub tx_hash_or_sig: Option<Value>,
    pub pool_id: Option<Value>,
    pub user_address: Option<Value>,
    pub amount: Option<Value>,
    pub tx_type: Option<Value>,
}

/// A request that passed validation. Only this type reaches the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransaction {
    pub chain: String,
    pub transaction_type: TransactionType,
    pub pool_id: u64,
    pub user_address: String,
    pub amount: f64,
    pub reference: String,
}

fn text(field: &Option<Value>) -> Option<String> {
    match field {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

impl RecordTransactionRequest {
    pub fn new(
        chain: &str,
        tx_type: &str,
        pool_id: u64,
        user_address: &str,
        amount: &str,
        reference: &str,
    ) -> Self {
        Self {
            chain: Some(Value::from(chain)),
            tx_hash_or_sig: Some(Value::from(reference)),
            pool_id: Some(Value::from(pool_id)),
            user_address: Some(Value::from(user_address)),
            amount: Some(Value::from(amount)),
            tx_type: Some(Value::from(tx_type)),
        }
    }

    pub fn validate(&self) -> Result<ValidatedTransaction, ValidationError> {
        let (Some(chain), Some(reference), Some(pool_id), Some(user_address), Some(amount), Some(tx_type)) = (
            text(&self.chain),
            text(&self.tx_hash_or_sig),
            text(&self.pool_id),
            text(&self.user_address),
            text(&self.amount),
            text(&self.tx_type),
        ) else {
            return Err(ValidationError::MissingFields);
        };

        let transaction_type = tx_type
            .parse::<TransactionType>()
            .map_err(|_| ValidationError::InvalidTransactionType(tx_type.clone()))?;

        let pool_id = pool_id
            .parse::<u64>()
            .map_err(|_| ValidationError::InvalidPoolId(pool_id.clone()))?;

        let amount = match amount.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            _ => return Err(ValidationError::InvalidAmount(amount)),
        };

        Ok(ValidatedTransaction {
            chain,
            transaction_type,
            pool_id,
            user_address,
            amount,
            reference,
        })
    }
}

impl ValidatedTransaction {
    pub fn to_new_transaction(&self) -> NewTransaction {
        NewTransaction {
            chain: self.chain.clone(),
            pool_id: self.pool_id,
            transaction_type: self.transaction_type,
            amount: self.amount,
            user_address: self.user_address.clone(),
            tx_hash_or_sig: self.reference.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> RecordTransactionRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_accepts_numbers_and_strings() {
        let req = body(json!({
            "chain": "Sepolia", "txHashOrSig": "0xabc", "poolId": 1,
            "userAddress": "0xu1", "amount": "100", "txType": "Deposit"
        }));
        let tx = req.validate().unwrap();
        assert_eq!(tx.pool_id, 1);
        assert_eq!(tx.amount, 100.0);
        assert_eq!(tx.transaction_type, TransactionType::Deposit);

        let req = body(json!({
            "chain": "Sepolia", "txHashOrSig": "0xabc", "poolId": "7",
            "userAddress": "0xu1", "amount": 12.5, "txType": "withdraw"
        }));
        let tx = req.validate().unwrap();
        assert_eq!(tx.pool_id, 7);
        assert_eq!(tx.amount, 12.5);
        assert_eq!(tx.transaction_type, TransactionType::Withdraw);
    }

    #[test]
    fn test_missing_amount_is_missing_fields() {
        let req = body(json!({
            "chain": "Sepolia", "txHashOrSig": "0xabc", "poolId": 1,
            "userAddress": "0xu1", "txType": "Deposit"
        }));
        assert_eq!(req.validate(), Err(ValidationError::MissingFields));
    }

    #[test]
    fn test_blank_field_is_missing() {
        let mut req = RecordTransactionRequest::new("Sepolia", "deposit", 1, "0xu1", "5", "0xabc");
        req.chain = Some(json!("   "));
        assert_eq!(req.validate(), Err(ValidationError::MissingFields));
    }

    #[test]
    fn test_rejects_bad_values() {
        let req = RecordTransactionRequest::new("Sepolia", "stake", 1, "0xu1", "5", "0xabc");
        assert!(matches!(req.validate(), Err(ValidationError::InvalidTransactionType(_))));

        let req = RecordTransactionRequest::new("Sepolia", "deposit", 1, "0xu1", "-5", "0xabc");
        assert!(matches!(req.validate(), Err(ValidationError::InvalidAmount(_))));

        let req = RecordTransactionRequest::new("Sepolia", "deposit", 1, "0xu1", "abc", "0xabc");
        assert!(matches!(req.validate(), Err(ValidationError::InvalidAmount(_))));

        let mut req = RecordTransactionRequest::new("Sepolia", "deposit", 1, "0xu1", "5", "0xabc");
        req.pool_id = Some(json!("one"));
        assert!(matches!(req.validate(), Err(ValidationError::InvalidPoolId(_))));
    }

    #[test]
    fn test_zero_amount_is_allowed() {
        let req = RecordTransactionRequest::new("Sepolia", "deposit", 1, "0xu1", "0", "0xabc");
        assert_eq!(req.validate().unwrap().amount, 0.0);
    }
}
