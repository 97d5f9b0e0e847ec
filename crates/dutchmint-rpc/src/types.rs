use dutchmint_core::allocation::Allocation;
use dutchmint_core::params::{DutchConfig, PricingMode};
use dutchmint_state::SaleInfo;
use serde::{Deserialize, Serialize};

/// Returned by `dutchmint_getVersion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcVersionInfo {
    pub api_version: String,
    pub node_version: String,
}

/// Admission proof as submitted by a claimant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcAdmissionProof {
    /// 0x-prefixed 32-byte hash.
    pub hash: String,
    /// 0x-prefixed 65-byte r||s||v signature.
    pub signature: String,
    #[serde(default)]
    pub nonce: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcAllocation {
    pub channel: String,
    pub recipient: String,
    pub quantity: u64,
    /// Wei per unit (u128 as string).
    pub unit_price: String,
    pub total_paid: String,
    pub discounted: bool,
    pub first_token_id: u64,
    pub minted_at: i64,
}

impl From<&Allocation> for RpcAllocation {
    fn from(a: &Allocation) -> Self {
        Self {
            channel: a.channel.to_string(),
            recipient: a.recipient.to_hex(),
            quantity: a.quantity,
            unit_price: a.unit_price.to_string(),
            total_paid: a.total_paid().to_string(),
            discounted: a.discounted,
            first_token_id: a.first_token_id,
            minted_at: a.minted_at,
        }
    }
}

/// Dutch schedule parameters. Prices are u128 as strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcDutchConfig {
    pub base_price: String,
    #[serde(default)]
    pub floor_price: Option<String>,
    pub decay_step: String,
    pub decay_interval_secs: i64,
    #[serde(default)]
    pub max_decrements: Option<u64>,
}

impl From<&DutchConfig> for RpcDutchConfig {
    fn from(c: &DutchConfig) -> Self {
        Self {
            base_price: c.base_price.to_string(),
            floor_price: Some(c.floor_price.to_string()),
            decay_step: c.decay_step.to_string(),
            decay_interval_secs: c.decay_interval_secs,
            max_decrements: c.max_decrements,
        }
    }
}

/// Pricing of one tier: `mode` is "fixed" (with `price`) or "dutch" (with `dutch`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcPricing {
    pub mode: String,
    pub price: Option<String>,
    pub dutch: Option<RpcDutchConfig>,
}

impl From<&PricingMode> for RpcPricing {
    fn from(m: &PricingMode) -> Self {
        match m {
            PricingMode::Fixed { price } => Self {
                mode: "fixed".into(),
                price: Some(price.to_string()),
                dutch: None,
            },
            PricingMode::Dutch(cfg) => Self {
                mode: "dutch".into(),
                price: None,
                dutch: Some(cfg.into()),
            },
        }
    }
}

/// Returned by `dutchmint_getSaleInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSaleInfo {
    pub name: String,
    pub symbol: String,
    pub owner: String,
    pub authority: String,
    pub phase: String,
    pub base_uri: String,
    pub auction_start: Option<i64>,
    pub allow_list_max_mint: u64,
    pub public_list_max_mint: u64,
    pub total_cap: u64,
    pub reserved_cap: u64,
    pub allow_list_cap: u64,
    pub reserved_minted: u64,
    pub allow_list_minted: u64,
    pub public_minted: u64,
    pub total_supply: u64,
    pub prefix: String,
    pub discounted_prefix: String,
    pub public_pricing: RpcPricing,
    pub allow_list_pricing: RpcPricing,
    pub discounted_pricing: RpcPricing,
}

impl From<SaleInfo> for RpcSaleInfo {
    fn from(i: SaleInfo) -> Self {
        Self {
            name: i.name,
            symbol: i.symbol,
            owner: i.owner.to_hex(),
            authority: i.authority.to_hex(),
            phase: i.phase.to_string(),
            base_uri: i.base_uri,
            auction_start: i.auction_start,
            allow_list_max_mint: i.allow_list_max_mint,
            public_list_max_mint: i.public_list_max_mint,
            total_cap: i.total_cap,
            reserved_cap: i.reserved_cap,
            allow_list_cap: i.allow_list_cap,
            reserved_minted: i.reserved_minted,
            allow_list_minted: i.allow_list_minted,
            public_minted: i.public_minted,
            total_supply: i.total_supply,
            prefix: i.prefix,
            discounted_prefix: i.discounted_prefix,
            public_pricing: (&i.public_pricing).into(),
            allow_list_pricing: (&i.allow_list_pricing).into(),
            discounted_pricing: (&i.discounted_pricing).into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcPricePoint {
    pub at: i64,
    pub price: String,
}

/// One revenue payee with its running totals (u128 as strings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcPayee {
    pub account: String,
    pub shares: u64,
    pub released: String,
    pub releasable: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRevenue {
    pub total_received: String,
    pub total_released: String,
}
