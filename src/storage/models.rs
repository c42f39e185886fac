//! Ledger row types.
//!
//! Rows are persisted as JSON blobs inside redb tables, so the `Serialize`
//! shape here is both the on-disk format and the HTTP response format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TRANSACTION TYPE + SIGNED DELTA
// ============================================================================

/// Canonical transaction kind. Always serialized lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdraw,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
        }
    }

    /// Signed effect of this transaction on a pool's aggregates.
    pub fn delta(&self, amount: f64) -> BalanceDelta {
        match self {
            TransactionType::Deposit => BalanceDelta { balance: amount, entries: 1 },
            TransactionType::Withdraw => BalanceDelta { balance: -amount, entries: -1 },
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    /// Case-insensitive: "Deposit", "DEPOSIT" and "deposit" are the same kind.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "deposit" => Ok(TransactionType::Deposit),
            "withdraw" => Ok(TransactionType::Withdraw),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

// ============================================================================
// AMOUNTS
// ============================================================================

/// Smallest tracked fraction of a token (1e-9, lamport precision).
///
/// Amounts are stored and sent as `f64`; every running sum is taken in
/// integer base units.
pub const BASE_UNITS_PER_TOKEN: f64 = 1_000_000_000.0;

pub fn to_base_units(amount: f64) -> i128 {
    (amount * BASE_UNITS_PER_TOKEN).round() as i128
}

pub fn from_base_units(units: i128) -> f64 {
    units as f64 / BASE_UNITS_PER_TOKEN
}

/// `a + b`, exact to one base unit.
pub fn add_amounts(a: f64, b: f64) -> f64 {
    from_base_units(to_base_units(a).saturating_add(to_base_units(b)))
}

/// Whole amounts serialize as JSON integers (`100`, not `100.0`).
pub(crate) mod amount_format {
    use serde::Serializer;

    /// 2^53: above this an `f64` no longer holds every integer.
    const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

    pub fn serialize<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if amount.fract() == 0.0 && amount.abs() < MAX_EXACT_INTEGER {
            serializer.serialize_i64(*amount as i64)
        } else {
            serializer.serialize_f64(*amount)
        }
    }

    pub fn serialize_option<S: Serializer>(amount: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match amount {
            Some(amount) => serialize(amount, serializer),
            None => serializer.serialize_none(),
        }
    }
}

/// Pool adjustment computed before the store is touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceDelta {
    pub balance: f64,
    pub entries: i64,
}

impl BalanceDelta {
    /// Apply to a pool's running totals. A null balance counts as zero and
    /// `active_entries` saturates at zero.
    pub fn apply(&self, balance: Option<f64>, active_entries: u64) -> (f64, u64) {
        let new_balance = add_amounts(balance.unwrap_or(0.0), self.balance);
        let new_entries = if self.entries >= 0 {
            active_entries.saturating_add(self.entries as u64)
        } else {
            active_entries.saturating_sub(self.entries.unsigned_abs())
        };
        (new_balance, new_entries)
    }
}

// ============================================================================
// POOL
// ============================================================================

/// A tracked on-chain vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: u64,
    pub name: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub discord: Option<String>,

    pub chain: String,
    pub is_native_token: bool,
    pub token_address: Option<String>,
    pub contract_address: Option<String>,
    pub token_account: Option<String>,

    pub rate_per_second: Option<f64>,
    pub max_deposit_percentage: Option<f64>,
    pub fee_percentage: Option<f64>,
    pub wait_seconds: Option<u64>,
    pub yield_value: Option<f64>,
    pub yield_unit: Option<String>,
    pub deposit_limit: Option<f64>,
    pub withdraw_fee: Option<f64>,
    pub withdraw_lock_value: Option<u64>,
    pub withdraw_lock_unit: Option<String>,

    pub owner_address: String,
    pub operator_address: Option<String>,

    /// Net of all applied deposits and withdrawals. `None` until the first one.
    #[serde(serialize_with = "amount_format::serialize_option")]
    pub current_pool_balance: Option<f64>,
    pub active_entries: u64,
    pub created_on: DateTime<Utc>,
}

/// Pool creation payload (camelCase, as sent by the frontend).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewPool {
    pub name: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub discord: Option<String>,

    pub chain: String,
    pub is_native_token: bool,
    pub token_address: Option<String>,
    pub contract_address: Option<String>,
    pub token_account: Option<String>,

    pub rate_per_second: Option<f64>,
    pub max_deposit_percentage: Option<f64>,
    pub fee_percentage: Option<f64>,
    pub wait_seconds: Option<u64>,
    pub yield_value: Option<f64>,
    pub yield_unit: Option<String>,
    pub deposit_limit: Option<f64>,
    pub withdraw_fee: Option<f64>,
    pub withdraw_lock_value: Option<u64>,
    pub withdraw_lock_unit: Option<String>,

    pub owner_address: String,
    pub operator_address: Option<String>,
}

impl NewPool {
    pub fn has_required_fields(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.chain.trim().is_empty()
            && !self.owner_address.trim().is_empty()
    }

    pub(crate) fn into_pool(self, id: u64, created_on: DateTime<Utc>) -> Pool {
        Pool {
            id,
            name: self.name,
            image: self.image,
            description: self.description,
            website: self.website,
            twitter: self.twitter,
            telegram: self.telegram,
            discord: self.discord,
            chain: self.chain,
            is_native_token: self.is_native_token,
            token_address: self.token_address,
            contract_address: self.contract_address,
            token_account: self.token_account,
            rate_per_second: self.rate_per_second,
            max_deposit_percentage: self.max_deposit_percentage,
            fee_percentage: self.fee_percentage,
            wait_seconds: self.wait_seconds,
            yield_value: self.yield_value,
            yield_unit: self.yield_unit,
            deposit_limit: self.deposit_limit,
            withdraw_fee: self.withdraw_fee,
            withdraw_lock_value: self.withdraw_lock_value,
            withdraw_lock_unit: self.withdraw_lock_unit,
            owner_address: self.owner_address,
            operator_address: self.operator_address,
            current_pool_balance: None,
            active_entries: 0,
            created_on,
        }
    }
}

// ============================================================================
// PARTICIPANT
// ============================================================================

/// A user's net deposited balance within one pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub pool_id: u64,
    pub user_address: String,
    #[serde(serialize_with = "amount_format::serialize")]
    pub amount: f64,
    pub deposit_timestamp: DateTime<Utc>,
}

/// What a participant adjustment did to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantChange {
    Created,
    Updated,
    Removed,
    /// Withdrawal from a user with no row; nothing to adjust.
    Absent,
    /// Zero-amount deposit from a user with no row; no position opened.
    Unchanged,
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// Immutable audit row for a verified on-chain transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: u64,
    pub pool_id: u64,
    pub transaction_type: TransactionType,
    #[serde(serialize_with = "amount_format::serialize")]
    pub amount: f64,
    pub user_address: String,
    pub tx_hash_or_sig: String,
    pub created_on: DateTime<Utc>,
}

/// Insert payload; id and timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub chain: String,
    pub pool_id: u64,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub user_address: String,
    pub tx_hash_or_sig: String,
}
