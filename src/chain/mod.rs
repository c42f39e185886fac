//! # Chain Verification Oracle
//!
//! Answers one question: did transaction `reference` happen, and succeed, on
//! chain `chain`? The answer is a plain `bool`. Transport failures, node
//! errors, malformed references, timeouts and unknown chains all come back
//! as `false` and are logged here; callers never see an error.
//!
//! | Kind   | RPC method                  | Verified when            |
//! |--------|-----------------------------|--------------------------|
//! | Evm    | `eth_getTransactionReceipt` | receipt present, status 1 |
//! | Solana | `getTransaction`            | result non-null          |

pub mod evm;
pub mod rpc;
pub mod solana;

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC node error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed transaction reference: {0}")]
    MalformedReference(String),
}

// ============================================================================
// VERIFIER SEAM
// ============================================================================

/// Read-only oracle consulted before any ledger write.
#[async_trait]
pub trait ChainVerifier: Send + Sync {
    async fn verify(&self, chain: &str, reference: &str) -> bool;
}

// ============================================================================
// CHAIN REGISTRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Evm,
    Solana,
}

impl FromStr for ChainKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "evm" => Ok(ChainKind::Evm),
            "solana" => Ok(ChainKind::Solana),
            other => Err(format!("unknown chain kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEndpoint {
    pub kind: ChainKind,
    pub rpc_url: String,
}

/// Chain identifier → RPC endpoint. Identifiers match case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    endpoints: HashMap<String, ChainEndpoint>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, chain: &str, endpoint: ChainEndpoint) {
        self.endpoints.insert(chain.trim().to_ascii_lowercase(), endpoint);
    }

    pub fn with(mut self, chain: &str, endpoint: ChainEndpoint) -> Self {
        self.register(chain, endpoint);
        self
    }

    pub fn get(&self, chain: &str) -> Option<&ChainEndpoint> {
        self.endpoints.get(&chain.trim().to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

// ============================================================================
// RPC-BACKED VERIFIER
// ============================================================================

/// Production verifier: one shared HTTP client, one endpoint per chain.
pub struct RpcChainVerifier {
    client: reqwest::Client,
    registry: ChainRegistry,
}

impl RpcChainVerifier {
    /// The timeout bounds every oracle call; an expired call is unverified.
    pub fn new(registry: ChainRegistry, timeout: Duration) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, registry })
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    async fn query(&self, endpoint: &ChainEndpoint, reference: &str) -> Result<bool, OracleError> {
        match endpoint.kind {
            ChainKind::Evm => evm::verify_receipt(&self.client, &endpoint.rpc_url, reference).await,
            ChainKind::Solana => solana::verify_signature(&self.client, &endpoint.rpc_url, reference).await,
        }
    }
}

#[async_trait]
impl ChainVerifier for RpcChainVerifier {
    async fn verify(&self, chain: &str, reference: &str) -> bool {
        let Some(endpoint) = self.registry.get(chain) else {
            warn!(chain = %chain, reference = %reference, "Unknown chain, treating as unverified");
            return false;
        };

        match self.query(endpoint, reference).await {
            Ok(verified) => {
                debug!(chain = %chain, reference = %reference, verified, "Oracle answered");
                verified
            }
            Err(e) => {
                warn!(chain = %chain, reference = %reference, error = %e, "⚠️ Oracle call failed, treating as unverified");
                false
            }
        }
    }
}
