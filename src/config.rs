//! Service configuration, read from the environment (optionally `.env`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::chain::{ChainEndpoint, ChainKind, ChainRegistry};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_DATA_PATH: &str = "./ledger_data";
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SEPOLIA_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";
pub const DEFAULT_SOLANA_DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid chain entry '{0}', expected Name=kind@url")]
    InvalidChainEntry(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_path: PathBuf,
    pub rpc_timeout: Duration,
    pub chains: ChainRegistry,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string());

        let bind_raw = var("LEDGER_BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue { key: "LEDGER_BIND_ADDR", value: bind_raw.clone() })?;

        let timeout_raw = var("RPC_TIMEOUT_SECS", &DEFAULT_RPC_TIMEOUT_SECS.to_string());
        let rpc_timeout = match timeout_raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => return Err(ConfigError::InvalidValue { key: "RPC_TIMEOUT_SECS", value: timeout_raw }),
        };

        let mut chains = ChainRegistry::new()
            .with(
                "Sepolia",
                ChainEndpoint { kind: ChainKind::Evm, rpc_url: var("SEPOLIA_RPC_URL", DEFAULT_SEPOLIA_RPC_URL) },
            )
            .with(
                "SolanaDevnet",
                ChainEndpoint {
                    kind: ChainKind::Solana,
                    rpc_url: var("SOLANA_DEVNET_RPC_URL", DEFAULT_SOLANA_DEVNET_RPC_URL),
                },
            );

        if let Some(extra) = lookup("LEDGER_EXTRA_CHAINS") {
            for (name, endpoint) in parse_chain_list(&extra)? {
                chains.register(&name, endpoint);
            }
        }

        Ok(Self {
            bind_addr,
            data_path: PathBuf::from(var("LEDGER_DATA_PATH", DEFAULT_DATA_PATH)),
            rpc_timeout,
            chains,
        })
    }
}

/// Parse `Name=kind@url,Other=kind@url`.
pub fn parse_chain_list(raw: &str) -> Result<Vec<(String, ChainEndpoint)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || ConfigError::InvalidChainEntry(entry.to_string());
            let (name, rest) = entry.split_once('=').ok_or_else(invalid)?;
            let (kind, url) = rest.split_once('@').ok_or_else(invalid)?;
            let kind = kind.parse::<ChainKind>().map_err(|_| invalid())?;
            if name.trim().is_empty() || url.trim().is_empty() {
                return Err(invalid());
            }
            Ok((name.trim().to_string(), ChainEndpoint { kind, rpc_url: url.trim().to_string() }))
        })
        .collect()
}
