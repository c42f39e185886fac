//! Pool Ledger
//!
//! Verified off-chain ledger for on-chain staking pools.
//!
//! ## Architecture
//!
//! - **Storage**: ReDB (ACID), one write transaction per ledger unit
//! - **Server**: Axum
//! - **Oracle**: JSON-RPC receipt/signature lookups (EVM + Solana)
//! - **Rule**: nothing is written until the chain confirms the claim

pub mod chain;
pub mod config;
pub mod ledger;
pub mod routes;
pub mod storage;

// ============================================================================
// PUBLIC API
// ============================================================================

// Storage
pub use storage::{
    LedgerError, LedgerResult, LedgerStore, NewPool, Participant, ParticipantChange, Pool,
    TransactionRecord, TransactionType,
};

// Chain verification
pub use chain::{ChainEndpoint, ChainKind, ChainRegistry, ChainVerifier, OracleError, RpcChainVerifier};

// Ledger core
pub use ledger::{
    DashboardAggregator, DashboardEntry, ProcessError, RecordTransactionRequest, TransactionProcessor,
    ValidationError,
};

// HTTP
pub use config::{AppConfig, ConfigError};
pub use routes::{router, ApiError, ApiJson, AppState};
