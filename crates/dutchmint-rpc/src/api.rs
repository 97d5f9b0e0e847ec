use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::{
    RpcAdmissionProof, RpcAllocation, RpcDutchConfig, RpcPayee, RpcPricePoint, RpcRevenue,
    RpcSaleInfo, RpcVersionInfo,
};

/// Dutchmint JSON-RPC 2.0 API definition.
///
/// All method names are prefixed with "dutchmint_" via `namespace = "dutchmint"`.
/// Addresses are 0x-prefixed hex; amounts are wei as decimal strings. State
/// changing calls name their `caller` explicitly: the server is a local
/// harness interface and does not authenticate transport peers.
#[rpc(server, namespace = "dutchmint")]
pub trait DutchmintApi {
    #[method(name = "getVersion")]
    async fn get_version(&self) -> RpcResult<RpcVersionInfo>;

    /// Configuration, phase and supply counters at the server's current time.
    #[method(name = "getSaleInfo")]
    async fn get_sale_info(&self) -> RpcResult<RpcSaleInfo>;

    /// Current unit price. `tier` is "public", "allowList" or "discounted".
    #[method(name = "getPrice")]
    async fn get_price(&self, tier: String) -> RpcResult<String>;

    /// Up to `points` upcoming public price points, starting now.
    #[method(name = "getSchedulePreview")]
    async fn get_schedule_preview(&self, points: u32) -> RpcResult<Vec<RpcPricePoint>>;

    // ── Minting ───────────────────────────────────────────────────────────────

    #[method(name = "mintReserved")]
    async fn mint_reserved(&self, caller: String, quantity: u64) -> RpcResult<RpcAllocation>;

    #[method(name = "mintPublic")]
    async fn mint_public(&self, caller: String, quantity: u64, payment: String) -> RpcResult<RpcAllocation>;

    #[method(name = "mintAllowList")]
    async fn mint_allow_list(
        &self,
        claimant: String,
        proof: RpcAdmissionProof,
        quantity: u64,
        payment: String,
    ) -> RpcResult<RpcAllocation>;

    #[method(name = "mintAllowListDiscounted")]
    async fn mint_allow_list_discounted(
        &self,
        claimant: String,
        proof: RpcAdmissionProof,
        quantity: u64,
        payment: String,
    ) -> RpcResult<RpcAllocation>;

    // ── Revenue ───────────────────────────────────────────────────────────────

    /// Pay out everything owed to `payee`. Returns the amount released.
    #[method(name = "release")]
    async fn release(&self, payee: String) -> RpcResult<String>;

    #[method(name = "getPayees")]
    async fn get_payees(&self) -> RpcResult<Vec<RpcPayee>>;

    #[method(name = "getRevenue")]
    async fn get_revenue(&self) -> RpcResult<RpcRevenue>;

    // ── Tokens ────────────────────────────────────────────────────────────────

    #[method(name = "tokenURI")]
    async fn token_uri(&self, token_id: u64) -> RpcResult<String>;

    #[method(name = "ownerOf")]
    async fn owner_of(&self, token_id: u64) -> RpcResult<Option<String>>;

    #[method(name = "numberMinted")]
    async fn number_minted(&self, account: String) -> RpcResult<u64>;

    /// Allocation log in mint order, paginated.
    #[method(name = "getAllocations")]
    async fn get_allocations(&self, offset: u64, limit: u64) -> RpcResult<Vec<RpcAllocation>>;

    #[method(name = "isProofConsumed")]
    async fn is_proof_consumed(&self, hash: String) -> RpcResult<bool>;

    // ── Administration (owner-gated) ──────────────────────────────────────────

    #[method(name = "setPublicListMaxMint")]
    async fn set_public_list_max_mint(&self, caller: String, limit: u64) -> RpcResult<bool>;

    #[method(name = "setWhitelistMaxMint")]
    async fn set_whitelist_max_mint(&self, caller: String, limit: u64) -> RpcResult<bool>;

    #[method(name = "setBaseURI")]
    async fn set_base_uri(&self, caller: String, base_uri: String) -> RpcResult<bool>;

    #[method(name = "setPrefix")]
    async fn set_prefix(&self, caller: String, prefix: String) -> RpcResult<bool>;

    #[method(name = "setDiscountedPrefix")]
    async fn set_discounted_prefix(&self, caller: String, prefix: String) -> RpcResult<bool>;

    #[method(name = "setAuctionStartPoint")]
    async fn set_auction_start_point(&self, caller: String, start: i64) -> RpcResult<bool>;

    #[method(name = "setDutchConfig")]
    async fn set_dutch_config(&self, caller: String, config: RpcDutchConfig) -> RpcResult<bool>;

    #[method(name = "setAuthority")]
    async fn set_authority(&self, caller: String, authority: String) -> RpcResult<bool>;

    #[method(name = "transferOwnership")]
    async fn transfer_ownership(&self, caller: String, new_owner: String) -> RpcResult<bool>;
}
