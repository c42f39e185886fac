// ============================================================================
// POOL LEDGER - VERIFIED STAKING POOL BOOKKEEPING
// ============================================================================
//
// Records deposits and withdrawals into on-chain pools, but only after the
// chain itself confirms them.
//
// Storage: ReDB (ACID, MVCC, zero-copy reads)
// Oracle:  JSON-RPC (eth_getTransactionReceipt / getTransaction)
//
// Run:  cargo run
// Test: curl http://localhost:8080/health

use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pool_ledger::chain::{ChainVerifier, RpcChainVerifier};
use pool_ledger::config::AppConfig;
use pool_ledger::ledger::TransactionProcessor;
use pool_ledger::routes::{self, AppState, VERSION};
use pool_ledger::storage::LedgerStore;

// ============================================================================
// GRACEFUL SHUTDOWN
// ============================================================================

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("🛑 Shutdown signal received");
}

// ============================================================================
// MAIN
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();

    // 1. Logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,pool_ledger=debug")))
        .with(tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true))
        .init();

    info!("╔══════════════════════════════════════════════════════╗");
    info!("║       POOL LEDGER - VERIFIED POOL BOOKKEEPING        ║");
    info!("╠══════════════════════════════════════════════════════╣");
    info!("║  Version:   {:<41}║", VERSION);
    info!("║  Storage:   ReDB (one write txn per ledger unit)     ║");
    info!("║  Oracle:    EVM receipts + Solana signatures         ║");
    info!("╚══════════════════════════════════════════════════════╝");

    // 2. Config
    let config = AppConfig::from_env()?;
    info!(
        bind = %config.bind_addr,
        data = %config.data_path.display(),
        chains = config.chains.len(),
        rpc_timeout_secs = config.rpc_timeout.as_secs(),
        "⚙️  Configuration loaded"
    );

    // 3. Ledger (ReDB)
    info!("🗄️  Initializing ReDB at {}", config.data_path.display());
    let store = LedgerStore::open(&config.data_path)?;
    info!("✅ Ledger initialized");

    // 4. Chain oracle
    let verifier: Arc<dyn ChainVerifier> = Arc::new(RpcChainVerifier::new(config.chains.clone(), config.rpc_timeout)?);
    info!("🔗 Chain verifier ready ({} chains)", config.chains.len());

    // 5. Router
    let state = AppState::new(TransactionProcessor::new(store, verifier));
    let app = routes::router(state);

    info!("");
    info!("🚀 Listening on http://{}", config.bind_addr);
    info!("");
    info!("📡 ENDPOINTS:");
    info!("   GET  /health                              Health check");
    info!("   POST /api/transactions                    Record verified deposit/withdraw");
    info!("   GET  /api/pools/{{pool_id}}/transactions    Pool history (latest 50)");
    info!("   POST /api/pools                           Create pool");
    info!("   GET  /api/pools                           List pools");
    info!("   GET  /api/pools/{{pool_id}}                 Pool details");
    info!("   GET  /api/pools/{{pool_id}}/participants    Pool participants");
    info!("   GET  /api/dashboard/{{wallet_address}}      Wallet dashboard");
    info!("");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("✅ Server shutdown complete");
    Ok(())
}
