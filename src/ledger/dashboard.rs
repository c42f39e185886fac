//! Dashboard Aggregator: one time-ordered feed per wallet, mixing the pools
//! it created with the pools it holds a balance in.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::storage::{LedgerError, LedgerResult, LedgerStore, Participant, Pool};

// ============================================================================
// LOCK DURATION NORMALIZATION
// ============================================================================

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 3_600;
pub const SECONDS_PER_DAY: u64 = 86_400;
pub const SECONDS_PER_WEEK: u64 = 604_800;
/// Months are normalized as 30 days.
pub const SECONDS_PER_MONTH: u64 = 2_592_000;

/// Seconds per unit. Unknown units count as seconds.
pub fn lock_unit_multiplier(unit: &str) -> u64 {
    match unit.trim().to_ascii_lowercase().as_str() {
        "second" | "seconds" => 1,
        "minute" | "minutes" => SECONDS_PER_MINUTE,
        "hour" | "hours" => SECONDS_PER_HOUR,
        "day" | "days" => SECONDS_PER_DAY,
        "week" | "weeks" => SECONDS_PER_WEEK,
        "month" | "months" => SECONDS_PER_MONTH,
        _ => 1,
    }
}

pub fn lock_duration_secs(value: u64, unit: &str) -> u64 {
    value.saturating_mul(lock_unit_multiplier(unit))
}

// ============================================================================
// ENTRIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DashboardEntryKind {
    #[serde(rename = "Pool Created")]
    PoolCreated,
    #[serde(rename = "Deposit")]
    Deposit,
}

/// One feed row: the pool's fields plus what the wallet did with it.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardEntry {
    #[serde(rename = "type")]
    pub kind: DashboardEntryKind,
    #[serde(flatten)]
    pub pool: Pool,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::storage::models::amount_format::serialize_option"
    )]
    pub deposit_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdraw_lock_seconds: Option<u64>,
}

impl DashboardEntry {
    pub fn created(pool: Pool) -> Self {
        Self {
            kind: DashboardEntryKind::PoolCreated,
            pool,
            deposit_amount: None,
            deposit_timestamp: None,
            withdraw_lock_seconds: None,
        }
    }

    pub fn deposit(pool: Pool, participant: &Participant) -> Self {
        let lock_seconds = lock_duration_secs(
            pool.withdraw_lock_value.unwrap_or(0),
            pool.withdraw_lock_unit.as_deref().unwrap_or("seconds"),
        );
        Self {
            kind: DashboardEntryKind::Deposit,
            pool,
            deposit_amount: Some(participant.amount),
            deposit_timestamp: Some(participant.deposit_timestamp),
            withdraw_lock_seconds: Some(lock_seconds),
        }
    }

    /// Creation time for created pools, deposit time for deposits.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self.kind {
            DashboardEntryKind::PoolCreated => self.pool.created_on,
            DashboardEntryKind::Deposit => self.deposit_timestamp.unwrap_or(self.pool.created_on),
        }
    }
}

/// Merge both sets, newest first.
pub fn merge_entries(mut created: Vec<DashboardEntry>, deposits: Vec<DashboardEntry>) -> Vec<DashboardEntry> {
    created.extend(deposits);
    created.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    created
}

/// Keep one participation per pool: the one with the latest deposit.
fn latest_per_pool(participations: Vec<Participant>) -> Vec<Participant> {
    let mut latest: HashMap<u64, Participant> = HashMap::new();
    for participant in participations {
        match latest.get(&participant.pool_id) {
            Some(existing) if existing.deposit_timestamp >= participant.deposit_timestamp => {}
            _ => {
                latest.insert(participant.pool_id, participant);
            }
        }
    }
    latest.into_values().collect()
}

fn deposit_entries(store: &LedgerStore, wallet: &str) -> LedgerResult<Vec<DashboardEntry>> {
    let mut entries = Vec::new();
    for participant in latest_per_pool(store.participations_of(wallet)?) {
        match store.get_pool(participant.pool_id)? {
            Some(pool) => entries.push(DashboardEntry::deposit(pool, &participant)),
            None => warn!(pool_id = participant.pool_id, wallet = %wallet, "Participant row points at a missing pool"),
        }
    }
    Ok(entries)
}

// ============================================================================
// AGGREGATOR
// ============================================================================

#[derive(Clone)]
pub struct DashboardAggregator {
    store: LedgerStore,
}

impl DashboardAggregator {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Read-only; both halves are fetched concurrently from MVCC snapshots.
    pub async fn get_dashboard(&self, wallet: &str) -> LedgerResult<Vec<DashboardEntry>> {
        let worker = |e: tokio::task::JoinError| LedgerError::Worker(e.to_string());

        let (owned_store, owned_wallet) = (self.store.clone(), wallet.to_string());
        let (deposit_store, deposit_wallet) = (self.store.clone(), wallet.to_string());

        let (owned, deposits) = tokio::join!(
            tokio::task::spawn_blocking(move || owned_store.pools_owned_by(&owned_wallet)),
            tokio::task::spawn_blocking(move || deposit_entries(&deposit_store, &deposit_wallet)),
        );

        let created: Vec<DashboardEntry> = owned.map_err(worker)??.into_iter().map(DashboardEntry::created).collect();
        let deposits = deposits.map_err(worker)??;

        debug!(wallet = %wallet, created = created.len(), deposits = deposits.len(), "Dashboard assembled");
        Ok(merge_entries(created, deposits))
    }
}
