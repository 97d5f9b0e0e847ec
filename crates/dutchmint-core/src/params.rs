use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ALLOW_LIST_PREFIX, DEFAULT_DISCOUNTED_PREFIX};
use crate::error::MintError;
use crate::types::{Address, Balance, Quantity, Timestamp};

/// Linear step-decay configuration for a Dutch auction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutchConfig {
    /// Price at the start timestamp.
    pub base_price: Balance,
    /// Price never drops below this.
    #[serde(default)]
    pub floor_price: Balance,
    /// Amount subtracted at every interval boundary.
    pub decay_step: Balance,
    pub decay_interval_secs: i64,
    /// Optional cap on the number of decrements; acts as a second floor at
    /// `base_price - decay_step * max_decrements`.
    #[serde(default)]
    pub max_decrements: Option<u64>,
}

impl DutchConfig {
    pub fn validate(&self) -> Result<(), MintError> {
        if self.decay_interval_secs <= 0 {
            return Err(MintError::InvalidParams(
                "decay_interval_secs must be positive".into(),
            ));
        }
        if self.floor_price > self.base_price {
            return Err(MintError::InvalidParams(
                "floor_price exceeds base_price".into(),
            ));
        }
        Ok(())
    }
}

/// How the public channel is priced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingMode {
    Fixed { price: Balance },
    Dutch(DutchConfig),
}

fn default_allow_list_prefix() -> String {
    DEFAULT_ALLOW_LIST_PREFIX.to_string()
}

fn default_discounted_prefix() -> String {
    DEFAULT_DISCOUNTED_PREFIX.to_string()
}

/// Deploy parameters for a new auction.
///
/// Loaded from JSON by the node on a fresh data directory; in tests built with
/// [`SaleParams::new`] plus the `with_*` helpers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaleParams {
    /// Account allowed to call privileged operations.
    pub owner: Address,
    /// Identity whose signatures admit allow-list claimants. Defaults to `owner`.
    #[serde(default)]
    pub authority: Option<Address>,
    pub payees: Vec<Address>,
    pub shares: Vec<u64>,
    pub name: String,
    pub symbol: String,
    /// Per-claimant allow-list limit.
    pub allow_list_max_mint: Quantity,
    /// Per-claimant public limit (counts allow-list mints as well).
    pub public_list_max_mint: Quantity,
    pub total_sale_supply: Quantity,
    pub reserved_supply: Quantity,
    /// Standard allow-list unit price.
    pub price: Balance,
    /// Public channel pricing. Defaults to `Fixed { price }`.
    #[serde(default)]
    pub public_pricing: Option<PricingMode>,
    /// Discounted allow-list unit price. Defaults to `price`.
    #[serde(default)]
    pub discounted_price: Option<Balance>,
    /// Allow-list pool cap. Defaults to `total_sale_supply`.
    #[serde(default)]
    pub allow_list_cap: Option<Quantity>,
    #[serde(default = "default_allow_list_prefix")]
    pub allow_list_prefix: String,
    #[serde(default = "default_discounted_prefix")]
    pub discounted_prefix: String,
    #[serde(default)]
    pub base_uri: String,
    /// Sale start. `None` leaves the auction in `Configured` until the owner sets it.
    #[serde(default)]
    pub auction_start: Option<Timestamp>,
}

impl SaleParams {
    /// Positional constructor in deploy-argument order.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner: Address,
        payees: Vec<Address>,
        shares: Vec<u64>,
        name: impl Into<String>,
        symbol: impl Into<String>,
        allow_list_max_mint: Quantity,
        public_list_max_mint: Quantity,
        total_sale_supply: Quantity,
        reserved_supply: Quantity,
        price: Balance,
    ) -> Self {
        Self {
            owner,
            authority: None,
            payees,
            shares,
            name: name.into(),
            symbol: symbol.into(),
            allow_list_max_mint,
            public_list_max_mint,
            total_sale_supply,
            reserved_supply,
            price,
            public_pricing: None,
            discounted_price: None,
            allow_list_cap: None,
            allow_list_prefix: default_allow_list_prefix(),
            discounted_prefix: default_discounted_prefix(),
            base_uri: String::new(),
            auction_start: None,
        }
    }

    pub fn with_authority(mut self, authority: Address) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn with_dutch(mut self, config: DutchConfig) -> Self {
        self.public_pricing = Some(PricingMode::Dutch(config));
        self
    }

    pub fn with_public_price(mut self, price: Balance) -> Self {
        self.public_pricing = Some(PricingMode::Fixed { price });
        self
    }

    pub fn with_discounted_price(mut self, price: Balance) -> Self {
        self.discounted_price = Some(price);
        self
    }

    pub fn with_allow_list_cap(mut self, cap: Quantity) -> Self {
        self.allow_list_cap = Some(cap);
        self
    }

    pub fn with_prefixes(mut self, standard: impl Into<String>, discounted: impl Into<String>) -> Self {
        self.allow_list_prefix = standard.into();
        self.discounted_prefix = discounted.into();
        self
    }

    pub fn with_auction_start(mut self, start: Timestamp) -> Self {
        self.auction_start = Some(start);
        self
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    pub fn authority(&self) -> Address {
        self.authority.unwrap_or(self.owner)
    }

    pub fn public_pricing(&self) -> PricingMode {
        self.public_pricing
            .clone()
            .unwrap_or(PricingMode::Fixed { price: self.price })
    }

    pub fn discounted_price(&self) -> Balance {
        self.discounted_price.unwrap_or(self.price)
    }

    /// Reserved and sale supply together form the hard cap.
    pub fn total_cap(&self) -> Result<Quantity, MintError> {
        self.total_sale_supply
            .checked_add(self.reserved_supply)
            .ok_or(MintError::ArithmeticOverflow)
    }

    pub fn allow_list_cap(&self) -> Quantity {
        self.allow_list_cap.unwrap_or(self.total_sale_supply)
    }

    /// Check internal consistency before deploying.
    pub fn validate(&self) -> Result<(), MintError> {
        if self.payees.is_empty() {
            return Err(MintError::InvalidParams("no payees".into()));
        }
        if self.payees.len() != self.shares.len() {
            return Err(MintError::InvalidParams(format!(
                "payees and shares length mismatch: {} vs {}",
                self.payees.len(),
                self.shares.len()
            )));
        }
        if self.shares.iter().any(|s| *s == 0) {
            return Err(MintError::InvalidParams("shares are 0".into()));
        }
        for (i, p) in self.payees.iter().enumerate() {
            if self.payees[..i].contains(p) {
                return Err(MintError::InvalidParams(format!("payee {p} listed twice")));
            }
        }
        let total_cap = self.total_cap()?;
        if self.allow_list_cap() > total_cap {
            return Err(MintError::InvalidParams(format!(
                "allow_list_cap {} exceeds total cap {}",
                self.allow_list_cap(),
                total_cap
            )));
        }
        if let PricingMode::Dutch(cfg) = self.public_pricing() {
            cfg.validate()?;
        }
        Ok(())
    }
}
