// ============================================================================
// POOL LEDGER - STORAGE LAYER
// ============================================================================
//
// ReDB: ACID-compliant embedded database holding every ledger row.
//
// ARCHITECTURE:
// ┌─────────────────────────────────────────────────────────────────┐
// │                        LedgerStore                              │
// │                            │                                    │
// │        ┌───────────────────┼────────────────────┐               │
// │        ▼                   ▼                    ▼               │
// │     POOLS            PARTICIPANTS          TRANSACTIONS         │
// │   id → Pool       "pool:user" → row        id → record          │
// │                                                                 │
// │     METADATA (id counters)      TX_REFERENCES (replay guard)    │
// └─────────────────────────────────────────────────────────────────┘
//
// CONCURRENCY MODEL:
// - Reads: MVCC snapshots, never block writers
// - Writes: ReDB allows ONE write transaction at a time. Every atomic unit
//   (`run_atomic`) is a single write transaction, so two units touching the
//   same pool or participant are serialized and cannot lose updates.
//
// No in-memory cache: every unit re-reads current rows inside its own
// write transaction.
//
// ============================================================================

pub mod models;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

pub use models::{
    add_amounts, to_base_units, BalanceDelta, NewPool, NewTransaction, Participant, ParticipantChange,
    Pool, TransactionRecord, TransactionType,
};

// ============================================================================
// REDB TABLE DEFINITIONS
// ============================================================================

/// Pools: PoolId (u64) → Pool (JSON)
const POOLS: TableDefinition<u64, &[u8]> = TableDefinition::new("pools");

/// Participants: "pool_id:user_address" → Participant (JSON)
const PARTICIPANTS: TableDefinition<&str, &[u8]> = TableDefinition::new("participants");

/// Transactions: TxId (u64) → TransactionRecord (JSON)
const TRANSACTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("transactions");

/// Per-pool history index: (PoolId, TxId) → ()
const POOL_TRANSACTIONS: TableDefinition<(u64, u64), ()> = TableDefinition::new("pool_transactions");

/// Recorded chain references: "chain:reference" → TxId
const TX_REFERENCES: TableDefinition<&str, u64> = TableDefinition::new("tx_references");

/// Metadata: counter name → last issued id
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const POOL_ID_COUNTER: &str = "last_pool_id";
const TRANSACTION_ID_COUNTER: &str = "last_transaction_id";

/// Page size for pool transaction history.
pub const DEFAULT_TRANSACTION_LIMIT: usize = 50;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pool not found: {0}")]
    PoolNotFound(u64),

    #[error("Transaction already recorded: {0}")]
    DuplicateReference(String),

    #[error("Storage worker failed: {0}")]
    Worker(String),
}

macro_rules! storage_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for LedgerError {
                fn from(e: $ty) -> Self {
                    LedgerError::Storage(e.to_string())
                }
            }
        )*
    };
}

storage_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

pub type LedgerResult<T> = Result<T, LedgerError>;

fn encode<T: Serialize>(row: &T) -> LedgerResult<Vec<u8>> {
    Ok(serde_json::to_vec(row)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> LedgerResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn participant_key(pool_id: u64, user_address: &str) -> String {
    format!("{}:{}", pool_id, user_address)
}

/// Replay-guard key. EVM hashes are hex and compared case-insensitively;
/// base58 signatures are case-sensitive and kept verbatim.
fn reference_key(chain: &str, reference: &str) -> String {
    let reference = if reference.starts_with("0x") || reference.starts_with("0X") {
        reference.to_ascii_lowercase()
    } else {
        reference.to_string()
    };
    format!("{}:{}", chain.to_ascii_lowercase(), reference)
}

// ============================================================================
// LEDGER STORE
// ============================================================================

/// Durable store for pools, participants and transactions.
///
/// `Clone` is cheap (Arc handle). All methods are blocking; async callers
/// run them on `tokio::task::spawn_blocking`.
#[derive(Clone)]
pub struct LedgerStore {
    db: Arc<Database>,
}

impl LedgerStore {
    /// Create or open the ledger database under `path`.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let dir = path.as_ref();
        info!(path = %dir.display(), "Opening ledger database");

        std::fs::create_dir_all(dir)?;
        let db = Database::create(dir.join("ledger.redb"))?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(POOLS)?;
            let _ = write_txn.open_table(PARTICIPANTS)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(POOL_TRANSACTIONS)?;
            let _ = write_txn.open_table(TX_REFERENCES)?;
            let _ = write_txn.open_table(METADATA)?;
        }
        write_txn.commit()?;

        let store = Self { db: Arc::new(db) };
        info!(pools = store.pool_count()?, "Ledger database ready");
        Ok(store)
    }

    // ========================================================================
    // ATOMIC UNITS
    // ========================================================================

    /// Run `unit` inside one write transaction.
    ///
    /// `Ok` commits every staged write; `Err` aborts the transaction and
    /// nothing staged by `unit` becomes visible.
    pub fn run_atomic<T, F>(&self, unit: F) -> LedgerResult<T>
    where
        F: FnOnce(&LedgerTxn<'_>) -> LedgerResult<T>,
    {
        let write_txn = self.db.begin_write()?;
        let outcome = unit(&LedgerTxn { txn: &write_txn });

        match outcome {
            Ok(value) => {
                write_txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = write_txn.abort() {
                    error!(error = %abort_err, "❌ Abort after failed unit also failed");
                }
                Err(e)
            }
        }
    }

    // ========================================================================
    // POOLS
    // ========================================================================

    pub fn create_pool(&self, new_pool: NewPool) -> LedgerResult<Pool> {
        let pool = self.run_atomic(|txn| {
            let id = txn.next_id(POOL_ID_COUNTER)?;
            let pool = new_pool.into_pool(id, Utc::now());
            txn.put_pool(&pool)?;
            Ok(pool)
        })?;

        info!(pool_id = pool.id, name = %pool.name, chain = %pool.chain, "Pool created");
        Ok(pool)
    }

    pub fn get_pool(&self, id: u64) -> LedgerResult<Option<Pool>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(POOLS)?;
        let row = table.get(id)?;
        row.map(|bytes| decode(bytes.value())).transpose()
    }

    /// All pools, newest first.
    pub fn list_pools(&self) -> LedgerResult<Vec<Pool>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(POOLS)?;

        let mut pools = Vec::new();
        for entry in table.iter()?.rev() {
            let (_, value) = entry?;
            pools.push(decode::<Pool>(value.value())?);
        }
        Ok(pools)
    }

    pub fn pools_owned_by(&self, owner_address: &str) -> LedgerResult<Vec<Pool>> {
        Ok(self
            .list_pools()?
            .into_iter()
            .filter(|pool| pool.owner_address == owner_address)
            .collect())
    }

    pub fn pool_count(&self) -> LedgerResult<u64> {
        use redb::ReadableTableMetadata;
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(POOLS)?;
        Ok(table.len()?)
    }

    // ========================================================================
    // PARTICIPANTS
    // ========================================================================

    pub fn get_participant(&self, pool_id: u64, user_address: &str) -> LedgerResult<Option<Participant>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PARTICIPANTS)?;
        let key = participant_key(pool_id, user_address);
        let row = table.get(key.as_str())?;
        row.map(|bytes| decode(bytes.value())).transpose()
    }

    /// Participants of one pool, largest balance first.
    pub fn list_participants(&self, pool_id: u64) -> LedgerResult<Vec<Participant>> {
        let mut participants = self.scan_participants(|p| p.pool_id == pool_id)?;
        participants.sort_by(|a, b| {
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.user_address.cmp(&b.user_address))
        });
        Ok(participants)
    }

    /// Every active participation of one wallet, across pools.
    pub fn participations_of(&self, user_address: &str) -> LedgerResult<Vec<Participant>> {
        self.scan_participants(|p| p.user_address == user_address)
    }

    fn scan_participants(&self, keep: impl Fn(&Participant) -> bool) -> LedgerResult<Vec<Participant>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PARTICIPANTS)?;

        let mut rows = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let participant: Participant = decode(value.value())?;
            if keep(&participant) {
                rows.push(participant);
            }
        }
        Ok(rows)
    }

    /// Overwrite a participant row with arbitrary bytes.
    #[cfg(test)]
    pub(crate) fn put_raw_participant(&self, pool_id: u64, user_address: &str, bytes: &[u8]) -> LedgerResult<()> {
        let key = participant_key(pool_id, user_address);
        let write_txn = self.db.begin_write()?;
        write_txn.open_table(PARTICIPANTS)?.insert(key.as_str(), bytes)?;
        write_txn.commit()?;
        Ok(())
    }

    // ========================================================================
    // TRANSACTIONS
    // ========================================================================

    /// Transactions of one pool, newest first, at most `limit`.
    ///
    /// Reverse range read over the pool's index. Ids are issued inside the
    /// single writer, so id order is creation order.
    pub fn list_transactions_for_pool(&self, pool_id: u64, limit: usize) -> LedgerResult<Vec<TransactionRecord>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(POOL_TRANSACTIONS)?;
        let rows = read_txn.open_table(TRANSACTIONS)?;

        let mut transactions = Vec::with_capacity(limit.min(DEFAULT_TRANSACTION_LIMIT));
        for entry in index.range((pool_id, 0)..=(pool_id, u64::MAX))?.rev().take(limit) {
            let (key, _) = entry?;
            let (_, tx_id) = key.value();
            match rows.get(tx_id)? {
                Some(bytes) => transactions.push(decode::<TransactionRecord>(bytes.value())?),
                None => error!(pool_id, tx_id, "❌ History index points at a missing transaction"),
            }
        }
        Ok(transactions)
    }

    pub fn transaction_count(&self) -> LedgerResult<u64> {
        use redb::ReadableTableMetadata;
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        Ok(table.len()?)
    }
}

// ============================================================================
// LEDGER TRANSACTION (staged writes inside one atomic unit)
// ============================================================================

/// Handle passed to `run_atomic` closures. Every read sees the unit's own
/// staged writes; nothing is visible to other readers until commit.
pub struct LedgerTxn<'db> {
    txn: &'db WriteTransaction,
}

impl LedgerTxn<'_> {
    fn next_id(&self, counter: &str) -> LedgerResult<u64> {
        let mut table = self.txn.open_table(METADATA)?;
        let last = table.get(counter)?.map(|v| v.value()).unwrap_or(0);
        let next = last + 1;
        table.insert(counter, next)?;
        Ok(next)
    }

    fn put_pool(&self, pool: &Pool) -> LedgerResult<()> {
        let bytes = encode(pool)?;
        let mut table = self.txn.open_table(POOLS)?;
        table.insert(pool.id, bytes.as_slice())?;
        Ok(())
    }

    pub fn pool(&self, id: u64) -> LedgerResult<Option<Pool>> {
        let table = self.txn.open_table(POOLS)?;
        let bytes = table.get(id)?.map(|v| v.value().to_vec());
        bytes.map(|b| decode(&b)).transpose()
    }

    /// Append an audit row. Rejects a chain reference that was already recorded.
    pub fn insert_transaction(&self, new_tx: NewTransaction) -> LedgerResult<TransactionRecord> {
        let key = reference_key(&new_tx.chain, &new_tx.tx_hash_or_sig);
        {
            let references = self.txn.open_table(TX_REFERENCES)?;
            if references.get(key.as_str())?.is_some() {
                return Err(LedgerError::DuplicateReference(new_tx.tx_hash_or_sig));
            }
        }

        let record = TransactionRecord {
            id: self.next_id(TRANSACTION_ID_COUNTER)?,
            pool_id: new_tx.pool_id,
            transaction_type: new_tx.transaction_type,
            amount: new_tx.amount,
            user_address: new_tx.user_address,
            tx_hash_or_sig: new_tx.tx_hash_or_sig,
            created_on: Utc::now(),
        };

        let bytes = encode(&record)?;
        self.txn.open_table(TRANSACTIONS)?.insert(record.id, bytes.as_slice())?;
        self.txn.open_table(POOL_TRANSACTIONS)?.insert((record.pool_id, record.id), ())?;
        self.txn.open_table(TX_REFERENCES)?.insert(key.as_str(), record.id)?;
        Ok(record)
    }

    /// Read-modify-write of the pool totals within this unit.
    pub fn apply_pool_delta(&self, pool_id: u64, delta: BalanceDelta) -> LedgerResult<Pool> {
        let mut pool = self.pool(pool_id)?.ok_or(LedgerError::PoolNotFound(pool_id))?;
        let (balance, entries) = delta.apply(pool.current_pool_balance, pool.active_entries);
        pool.current_pool_balance = Some(balance);
        pool.active_entries = entries;
        self.put_pool(&pool)?;
        Ok(pool)
    }

    fn participant(&self, key: &str) -> LedgerResult<Option<Participant>> {
        let table = self.txn.open_table(PARTICIPANTS)?;
        let bytes = table.get(key)?.map(|v| v.value().to_vec());
        bytes.map(|b| decode(&b)).transpose()
    }

    fn put_participant(&self, key: &str, participant: &Participant) -> LedgerResult<()> {
        let bytes = encode(participant)?;
        self.txn.open_table(PARTICIPANTS)?.insert(key, bytes.as_slice())?;
        Ok(())
    }

    /// Upsert on (pool, user): insert with `amount`, or add to the existing row.
    /// A zero deposit never opens a position.
    pub fn credit_participant(
        &self,
        pool_id: u64,
        user_address: &str,
        amount: f64,
        at: DateTime<Utc>,
    ) -> LedgerResult<ParticipantChange> {
        let key = participant_key(pool_id, user_address);
        let (row, change) = match self.participant(&key)? {
            Some(mut existing) => {
                existing.amount = add_amounts(existing.amount, amount);
                existing.deposit_timestamp = at;
                (existing, ParticipantChange::Updated)
            }
            None if to_base_units(amount) <= 0 => return Ok(ParticipantChange::Unchanged),
            None => (
                Participant {
                    pool_id,
                    user_address: user_address.to_string(),
                    amount,
                    deposit_timestamp: at,
                },
                ParticipantChange::Created,
            ),
        };
        self.put_participant(&key, &row)?;
        Ok(change)
    }

    /// Subtract from (pool, user); the row is deleted once it reaches ≤ 0.
    pub fn debit_participant(&self, pool_id: u64, user_address: &str, amount: f64) -> LedgerResult<ParticipantChange> {
        let key = participant_key(pool_id, user_address);
        let Some(mut existing) = self.participant(&key)? else {
            return Ok(ParticipantChange::Absent);
        };

        existing.amount = add_amounts(existing.amount, -amount);
        if to_base_units(existing.amount) <= 0 {
            self.txn.open_table(PARTICIPANTS)?.remove(key.as_str())?;
            Ok(ParticipantChange::Removed)
        } else {
            self.put_participant(&key, &existing)?;
            Ok(ParticipantChange::Updated)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
