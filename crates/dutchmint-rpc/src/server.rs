use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use dutchmint_core::constants::API_VERSION;
use dutchmint_core::error::MintError;
use dutchmint_core::params::DutchConfig;
use dutchmint_core::types::{Address, Balance, ProofHash, ProofSignature};
use dutchmint_state::{AdmissionProof, AuctionEngine, SaleTier};

use crate::api::DutchmintApiServer;
use crate::types::{
    RpcAdmissionProof, RpcAllocation, RpcDutchConfig, RpcPayee, RpcPricePoint, RpcRevenue,
    RpcSaleInfo, RpcVersionInfo,
};

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

/// Stable JSON-RPC error code for each engine error.
pub fn error_code(e: &MintError) -> i32 {
    match e {
        MintError::Unauthorized => -32001,
        MintError::SaleNotStarted => -32002,
        MintError::InvalidAmount { .. } => -32003,
        MintError::SoldOutReserved => -32004,
        MintError::SoldOutAllowList => -32005,
        MintError::SoldOutTotal => -32006,
        MintError::ExceedsPerAddressLimit { .. } => -32007,
        MintError::ZeroQuantity => -32008,
        MintError::InvalidSignature => -32009,
        MintError::HashMismatch => -32010,
        MintError::ReplayedProof(_) => -32011,
        MintError::NotDuePayment => -32012,
        MintError::NoShares => -32013,
        MintError::TransferFailed(_) => -32014,
        MintError::ArithmeticOverflow => -32015,
        MintError::MalformedSignature { .. } | MintError::InvalidParams(_) => -32602,
        MintError::Serialization(_)
        | MintError::Storage(_)
        | MintError::UnsupportedStateVersion(_) => -32603,
    }
}

fn mint_err(e: MintError) -> ErrorObject<'static> {
    let code = error_code(&e);
    warn!(code, error = %e, "RPC call rejected");
    rpc_err(code, e.to_string())
}

fn parse_address(s: &str) -> Result<Address, ErrorObject<'static>> {
    Address::from_hex(s).map_err(|e| rpc_err(-32602, format!("invalid address: {e}")))
}

fn parse_amount(s: &str) -> Result<Balance, ErrorObject<'static>> {
    s.trim()
        .parse::<Balance>()
        .map_err(|e| rpc_err(-32602, format!("invalid amount {s:?}: {e}")))
}

fn parse_proof(p: &RpcAdmissionProof) -> Result<AdmissionProof, ErrorObject<'static>> {
    let hash = ProofHash::from_hex(&p.hash)
        .map_err(|e| rpc_err(-32602, format!("invalid proof hash: {e}")))?;
    let signature = ProofSignature::from_hex(&p.signature)
        .map_err(|e| rpc_err(-32602, format!("invalid signature: {e}")))?;
    Ok(AdmissionProof { hash, signature, nonce: p.nonce })
}

fn parse_dutch(c: &RpcDutchConfig) -> Result<DutchConfig, ErrorObject<'static>> {
    Ok(DutchConfig {
        base_price: parse_amount(&c.base_price)?,
        floor_price: match &c.floor_price {
            Some(f) => parse_amount(f)?,
            None => 0,
        },
        decay_step: parse_amount(&c.decay_step)?,
        decay_interval_secs: c.decay_interval_secs,
        max_decrements: c.max_decrements,
    })
}

fn parse_tier(s: &str) -> Result<SaleTier, ErrorObject<'static>> {
    match s {
        "public" => Ok(SaleTier::Public),
        "allowList" => Ok(SaleTier::AllowList),
        "discounted" => Ok(SaleTier::Discounted),
        other => Err(rpc_err(-32602, format!("unknown tier {other:?}"))),
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Shared state passed to the RPC server.
pub struct RpcServerState {
    pub engine: Arc<AuctionEngine>,
    /// Answer browser preflight requests from any origin.
    pub cors: bool,
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr`. Returns a handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let handle = if self.state.cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            let middleware = tower::ServiceBuilder::new().layer(cors);
            let server = Server::builder().set_http_middleware(middleware).build(addr).await?;
            server.start(self.into_rpc())
        } else {
            let server = Server::builder().build(addr).await?;
            server.start(self.into_rpc())
        };
        info!(%addr, "RPC server started");
        Ok(handle)
    }

    fn engine(&self) -> &AuctionEngine {
        &self.state.engine
    }
}

#[async_trait]
impl DutchmintApiServer for RpcServer {
    async fn get_version(&self) -> RpcResult<RpcVersionInfo> {
        Ok(RpcVersionInfo {
            api_version: API_VERSION.to_string(),
            node_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    async fn get_sale_info(&self) -> RpcResult<RpcSaleInfo> {
        let info = self.engine().info(now()).map_err(mint_err)?;
        Ok(info.into())
    }

    async fn get_price(&self, tier: String) -> RpcResult<String> {
        let tier = parse_tier(&tier)?;
        let price = self.engine().current_price(tier, now()).map_err(mint_err)?;
        Ok(price.to_string())
    }

    async fn get_schedule_preview(&self, points: u32) -> RpcResult<Vec<RpcPricePoint>> {
        let preview = self
            .engine()
            .schedule_preview(now(), points as usize)
            .map_err(mint_err)?;
        Ok(preview
            .into_iter()
            .map(|p| RpcPricePoint { at: p.at, price: p.price.to_string() })
            .collect())
    }

    // ── Minting ───────────────────────────────────────────────────────────────

    async fn mint_reserved(&self, caller: String, quantity: u64) -> RpcResult<RpcAllocation> {
        let caller = parse_address(&caller)?;
        let alloc = self.engine().mint_reserved(&caller, quantity, now()).map_err(mint_err)?;
        Ok((&alloc).into())
    }

    async fn mint_public(&self, caller: String, quantity: u64, payment: String) -> RpcResult<RpcAllocation> {
        let caller = parse_address(&caller)?;
        let payment = parse_amount(&payment)?;
        let alloc = self
            .engine()
            .mint_public(&caller, quantity, payment, now())
            .map_err(mint_err)?;
        Ok((&alloc).into())
    }

    async fn mint_allow_list(
        &self,
        claimant: String,
        proof: RpcAdmissionProof,
        quantity: u64,
        payment: String,
    ) -> RpcResult<RpcAllocation> {
        let claimant = parse_address(&claimant)?;
        let proof = parse_proof(&proof)?;
        let payment = parse_amount(&payment)?;
        let alloc = self
            .engine()
            .mint_allow_list(&claimant, &proof, quantity, payment, now())
            .map_err(mint_err)?;
        Ok((&alloc).into())
    }

    async fn mint_allow_list_discounted(
        &self,
        claimant: String,
        proof: RpcAdmissionProof,
        quantity: u64,
        payment: String,
    ) -> RpcResult<RpcAllocation> {
        let claimant = parse_address(&claimant)?;
        let proof = parse_proof(&proof)?;
        let payment = parse_amount(&payment)?;
        let alloc = self
            .engine()
            .mint_allow_list_discounted(&claimant, &proof, quantity, payment, now())
            .map_err(mint_err)?;
        Ok((&alloc).into())
    }

    // ── Revenue ───────────────────────────────────────────────────────────────

    async fn release(&self, payee: String) -> RpcResult<String> {
        let payee = parse_address(&payee)?;
        let amount = self.engine().release(&payee).map_err(mint_err)?;
        Ok(amount.to_string())
    }

    async fn get_payees(&self) -> RpcResult<Vec<RpcPayee>> {
        let engine = self.engine();
        let payees = engine.payees().map_err(mint_err)?;
        let mut out = Vec::with_capacity(payees.len());
        for p in payees {
            out.push(RpcPayee {
                account: p.account.to_hex(),
                shares: p.shares,
                released: engine.released(&p.account).map_err(mint_err)?.to_string(),
                releasable: engine.releasable(&p.account).map_err(mint_err)?.to_string(),
            });
        }
        Ok(out)
    }

    async fn get_revenue(&self) -> RpcResult<RpcRevenue> {
        Ok(RpcRevenue {
            total_received: self.engine().total_received().map_err(mint_err)?.to_string(),
            total_released: self.engine().total_released().map_err(mint_err)?.to_string(),
        })
    }

    // ── Tokens ────────────────────────────────────────────────────────────────

    async fn token_uri(&self, token_id: u64) -> RpcResult<String> {
        self.engine().token_uri(token_id).map_err(mint_err)
    }

    async fn owner_of(&self, token_id: u64) -> RpcResult<Option<String>> {
        let owner = self.engine().owner_of(token_id).map_err(mint_err)?;
        Ok(owner.map(|a| a.to_hex()))
    }

    async fn number_minted(&self, account: String) -> RpcResult<u64> {
        let account = parse_address(&account)?;
        self.engine().number_minted(&account).map_err(mint_err)
    }

    async fn get_allocations(&self, offset: u64, limit: u64) -> RpcResult<Vec<RpcAllocation>> {
        let allocs = self
            .engine()
            .allocations(offset as usize, limit.min(1000) as usize)
            .map_err(mint_err)?;
        Ok(allocs.iter().map(RpcAllocation::from).collect())
    }

    async fn is_proof_consumed(&self, hash: String) -> RpcResult<bool> {
        let hash = ProofHash::from_hex(&hash)
            .map_err(|e| rpc_err(-32602, format!("invalid proof hash: {e}")))?;
        self.engine().is_proof_consumed(&hash).map_err(mint_err)
    }

    // ── Administration ────────────────────────────────────────────────────────

    async fn set_public_list_max_mint(&self, caller: String, limit: u64) -> RpcResult<bool> {
        let caller = parse_address(&caller)?;
        self.engine().set_public_list_max_mint(&caller, limit).map_err(mint_err)?;
        Ok(true)
    }

    async fn set_whitelist_max_mint(&self, caller: String, limit: u64) -> RpcResult<bool> {
        let caller = parse_address(&caller)?;
        self.engine().set_allow_list_max_mint(&caller, limit).map_err(mint_err)?;
        Ok(true)
    }

    async fn set_base_uri(&self, caller: String, base_uri: String) -> RpcResult<bool> {
        let caller = parse_address(&caller)?;
        self.engine().set_base_uri(&caller, base_uri).map_err(mint_err)?;
        Ok(true)
    }

    async fn set_prefix(&self, caller: String, prefix: String) -> RpcResult<bool> {
        let caller = parse_address(&caller)?;
        self.engine().set_prefix(&caller, prefix).map_err(mint_err)?;
        Ok(true)
    }

    async fn set_discounted_prefix(&self, caller: String, prefix: String) -> RpcResult<bool> {
        let caller = parse_address(&caller)?;
        self.engine().set_discounted_prefix(&caller, prefix).map_err(mint_err)?;
        Ok(true)
    }

    async fn set_auction_start_point(&self, caller: String, start: i64) -> RpcResult<bool> {
        let caller = parse_address(&caller)?;
        self.engine().set_auction_start_point(&caller, start).map_err(mint_err)?;
        Ok(true)
    }

    async fn set_dutch_config(&self, caller: String, config: RpcDutchConfig) -> RpcResult<bool> {
        let caller = parse_address(&caller)?;
        let config = parse_dutch(&config)?;
        self.engine().set_dutch_config(&caller, config).map_err(mint_err)?;
        Ok(true)
    }

    async fn set_authority(&self, caller: String, authority: String) -> RpcResult<bool> {
        let caller = parse_address(&caller)?;
        let authority = parse_address(&authority)?;
        self.engine().set_authority(&caller, authority).map_err(mint_err)?;
        Ok(true)
    }

    async fn transfer_ownership(&self, caller: String, new_owner: String) -> RpcResult<bool> {
        let caller = parse_address(&caller)?;
        let new_owner = parse_address(&new_owner)?;
        self.engine().transfer_ownership(&caller, new_owner).map_err(mint_err)?;
        Ok(true)
    }
}
