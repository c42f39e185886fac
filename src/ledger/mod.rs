//! Ledger core: the transaction processor and the read-only dashboard.

pub mod dashboard;
pub mod processor;
pub mod types;

pub use dashboard::{lock_duration_secs, DashboardAggregator, DashboardEntry, DashboardEntryKind};
pub use processor::{apply_verified, TransactionProcessor};
pub use types::{ProcessError, RecordTransactionRequest, ValidatedTransaction, ValidationError};
