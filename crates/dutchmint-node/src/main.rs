//! dutchmint-node — serves one auction over JSON-RPC.
//!
//! Startup sequence:
//!   1. Open (or initialise) the state database
//!   2. Deploy the auction from `--sale-params` if the store is fresh,
//!      otherwise attach to the stored auction
//!   3. Start the JSON-RPC 2.0 server
//!   4. Run until Ctrl-C, then stop the server and flush the store

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use dutchmint_core::params::SaleParams;
use dutchmint_rpc::server::RpcServerState;
use dutchmint_rpc::RpcServer;
use dutchmint_state::{AuctionEngine, InMemoryPayouts, StateDb};

#[derive(Parser, Debug)]
#[command(
    name = "dutchmint-node",
    version,
    about = "Dutchmint node — fixed-price and Dutch auction allocation engine"
)]
struct Args {
    /// Directory for the persistent state database.
    #[arg(long, default_value = "~/.dutchmint/data")]
    data_dir: PathBuf,

    /// JSON-RPC listen address.
    #[arg(long, default_value = "127.0.0.1:8545")]
    rpc_addr: SocketAddr,

    /// Path to sale params JSON (only required on first run).
    #[arg(long)]
    sale_params: Option<PathBuf>,

    /// Allow cross-origin RPC requests from browsers.
    #[arg(long)]
    cors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,dutchmint=debug")),
        )
        .init();

    let args = Args::parse();
    info!("Dutchmint node starting");

    // ── State database ────────────────────────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let db = Arc::new(StateDb::open(&data_dir).context("opening state database")?);

    // ── Auction ───────────────────────────────────────────────────────────────
    let params = match args.sale_params.as_deref() {
        Some(p) => Some(load_sale_params(p)?),
        None => None,
    };
    let payouts = Arc::new(InMemoryPayouts::new());
    let engine = AuctionEngine::open_or_deploy(Arc::clone(&db), params, payouts)
        .context("opening auction (pass --sale-params on first run)")?;

    let info = engine.info(chrono::Utc::now().timestamp()).context("reading sale info")?;
    info!(
        name = %info.name,
        symbol = %info.symbol,
        phase = %info.phase,
        minted = info.total_supply,
        cap = info.total_cap,
        "auction ready"
    );

    // ── RPC server ────────────────────────────────────────────────────────────
    let rpc_state = Arc::new(RpcServerState {
        engine: Arc::new(engine),
        cors: args.cors,
    });
    let rpc_handle = RpcServer::new(rpc_state)
        .start(args.rpc_addr)
        .await
        .context("starting RPC server")?;

    info!("node ready");
    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;

    info!("shutting down");
    if rpc_handle.stop().is_err() {
        warn!("RPC server already stopped");
    }
    rpc_handle.stopped().await;
    db.flush().context("flushing state database")?;
    Ok(())
}

/// Load deploy parameters from a JSON file.
fn load_sale_params(path: &Path) -> anyhow::Result<SaleParams> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading sale params from {}", path.display()))?;
    let params: SaleParams = serde_json::from_str(&json).context("parsing sale params JSON")?;
    params.validate().context("validating sale params")?;
    Ok(params)
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
