//! Transaction Processor: validate → verify on-chain → apply in one atomic unit.
//!
//! Verification strictly precedes the first durable write. A request the
//! oracle does not confirm never opens a write transaction.

use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::types::{ProcessError, RecordTransactionRequest, ValidatedTransaction};
use crate::chain::ChainVerifier;
use crate::storage::{LedgerError, LedgerResult, LedgerStore, ParticipantChange, TransactionRecord, TransactionType};

#[derive(Clone)]
pub struct TransactionProcessor {
    store: LedgerStore,
    verifier: Arc<dyn ChainVerifier>,
}

impl TransactionProcessor {
    pub fn new(store: LedgerStore, verifier: Arc<dyn ChainVerifier>) -> Self {
        Self { store, verifier }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Record one claimed on-chain deposit or withdrawal.
    ///
    /// On success exactly one transaction row is inserted, one pool row is
    /// updated and at most one participant row is created, updated or
    /// deleted. On any failure nothing is persisted.
    pub async fn record_transaction(&self, request: RecordTransactionRequest) -> Result<TransactionRecord, ProcessError> {
        let request_id = Uuid::new_v4();
        self.record(request)
            .instrument(info_span!("record_transaction", %request_id))
            .await
    }

    async fn record(&self, request: RecordTransactionRequest) -> Result<TransactionRecord, ProcessError> {
        let tx = request.validate().map_err(|e| {
            warn!(error = %e, "Rejected malformed transaction request");
            e
        })?;

        if !self.verifier.verify(&tx.chain, &tx.reference).await {
            warn!(
                chain = %tx.chain,
                pool_id = tx.pool_id,
                user = %tx.user_address,
                reference = %tx.reference,
                "❌ Transaction not verified on-chain, ledger untouched"
            );
            return Err(ProcessError::NotVerified);
        }

        let store = self.store.clone();
        let unit = tx.clone();
        let applied = tokio::task::spawn_blocking(move || apply_verified(&store, &unit))
            .await
            .map_err(|e| LedgerError::Worker(e.to_string()))
            .and_then(|result| result);

        match applied {
            Ok((record, change)) => {
                info!(
                    tx_id = record.id,
                    pool_id = record.pool_id,
                    user = %record.user_address,
                    kind = %record.transaction_type,
                    amount = record.amount,
                    reference = %record.tx_hash_or_sig,
                    participant = ?change,
                    "✅ Transaction recorded"
                );
                Ok(record)
            }
            Err(e @ (LedgerError::DuplicateReference(_) | LedgerError::PoolNotFound(_))) => {
                warn!(pool_id = tx.pool_id, user = %tx.user_address, reference = %tx.reference, error = %e, "Transaction rejected, unit rolled back");
                Err(e.into())
            }
            Err(e) => {
                error!(pool_id = tx.pool_id, user = %tx.user_address, reference = %tx.reference, error = %e, "❌ Ledger unit failed, rolled back");
                Err(e.into())
            }
        }
    }
}

/// Apply a verified transaction's three effects inside one atomic unit.
///
/// Blocking; callers on the async runtime go through `spawn_blocking`.
pub fn apply_verified(store: &LedgerStore, tx: &ValidatedTransaction) -> LedgerResult<(TransactionRecord, ParticipantChange)> {
    let delta = tx.transaction_type.delta(tx.amount);

    store.run_atomic(|txn| {
        let record = txn.insert_transaction(tx.to_new_transaction())?;
        txn.apply_pool_delta(tx.pool_id, delta)?;

        let change = match tx.transaction_type {
            TransactionType::Deposit => {
                txn.credit_participant(tx.pool_id, &tx.user_address, tx.amount, record.created_on)?
            }
            TransactionType::Withdraw => txn.debit_participant(tx.pool_id, &tx.user_address, tx.amount)?,
        };

        if change == ParticipantChange::Absent {
            warn!(pool_id = tx.pool_id, user = %tx.user_address, "Withdrawal from a user with no participant row");
        }
        Ok((record, change))
    })
}
