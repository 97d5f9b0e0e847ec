use std::sync::{Arc, Mutex, MutexGuard};

use dutchmint_core::allocation::{Allocation, Channel};
use dutchmint_core::constants::STATE_VERSION;
use dutchmint_core::error::MintError;
use dutchmint_core::params::{DutchConfig, PricingMode, SaleParams};
use dutchmint_core::types::{
    Address, Balance, ProofHash, ProofSignature, Quantity, SalePhase, Timestamp, TokenId,
};
use dutchmint_schedule::{PricePoint, PriceSchedule};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::authorizer::{ProofTier, SignatureAuthorizer};
use crate::db::{SnapshotEnvelope, StateDb};
use crate::ledger::{ClaimantUsage, SupplyLedger};
use crate::payout::PayoutSink;
use crate::splitter::{Payee, RevenueSplitter};

// ── Public call types ─────────────────────────────────────────────────────────

/// An off-chain admission proof as presented by a claimant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionProof {
    pub hash: ProofHash,
    pub signature: ProofSignature,
    /// Present for single-use proofs.
    #[serde(default)]
    pub nonce: Option<u64>,
}

/// Selects one of the three price schedules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleTier {
    Public,
    AllowList,
    Discounted,
}

/// Read-only summary of the auction, as served over RPC.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaleInfo {
    pub name: String,
    pub symbol: String,
    pub owner: Address,
    pub authority: Address,
    pub phase: SalePhase,
    pub base_uri: String,
    pub auction_start: Option<Timestamp>,
    pub allow_list_max_mint: Quantity,
    pub public_list_max_mint: Quantity,
    pub total_cap: Quantity,
    pub reserved_cap: Quantity,
    pub allow_list_cap: Quantity,
    pub reserved_minted: Quantity,
    pub allow_list_minted: Quantity,
    pub public_minted: Quantity,
    pub total_supply: Quantity,
    pub prefix: String,
    pub discounted_prefix: String,
    pub public_pricing: PricingMode,
    pub allow_list_pricing: PricingMode,
    pub discounted_pricing: PricingMode,
}

// ── Engine state ──────────────────────────────────────────────────────────────

/// Owner-settable sale configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleConfig {
    pub owner: Address,
    pub name: String,
    pub symbol: String,
    pub base_uri: String,
    pub allow_list_max_mint: Quantity,
    pub public_list_max_mint: Quantity,
}

/// Everything a call may mutate. Cloned per call and swapped in on success.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub config: SaleConfig,
    pub ledger: SupplyLedger,
    pub splitter: RevenueSplitter,
    pub authorizer: SignatureAuthorizer,
    pub public_schedule: PriceSchedule,
    pub discounted_schedule: PriceSchedule,
    pub auction_start: Option<Timestamp>,
    pub next_token_id: TokenId,
}

impl EngineState {
    pub fn from_params(params: &SaleParams) -> Result<Self, MintError> {
        params.validate()?;
        let start = params.auction_start;
        Ok(Self {
            config: SaleConfig {
                owner: params.owner,
                name: params.name.clone(),
                symbol: params.symbol.clone(),
                base_uri: params.base_uri.clone(),
                allow_list_max_mint: params.allow_list_max_mint,
                public_list_max_mint: params.public_list_max_mint,
            },
            ledger: SupplyLedger::new(params.total_cap()?, params.reserved_supply, params.allow_list_cap())?,
            splitter: RevenueSplitter::new(&params.payees, &params.shares)?,
            authorizer: SignatureAuthorizer::new(
                params.authority(),
                params.allow_list_prefix.clone(),
                params.discounted_prefix.clone(),
            ),
            public_schedule: PriceSchedule { mode: params.public_pricing(), start_timestamp: start },
            discounted_schedule: PriceSchedule::fixed(params.discounted_price()).with_start(start),
            auction_start: start,
            next_token_id: 0,
        })
    }

    pub fn phase(&self, now: Timestamp) -> SalePhase {
        if self.ledger.is_sold_out() {
            return SalePhase::SoldOut;
        }
        match self.auction_start {
            None => SalePhase::Configured,
            Some(start) if now < start => SalePhase::SaleScheduled,
            Some(_) => SalePhase::SaleActive,
        }
    }

    fn schedule(&self, tier: SaleTier) -> &PriceSchedule {
        match tier {
            SaleTier::Public | SaleTier::AllowList => &self.public_schedule,
            SaleTier::Discounted => &self.discounted_schedule,
        }
    }

    fn ensure_active(&self, now: Timestamp) -> Result<(), MintError> {
        match self.phase(now) {
            SalePhase::SaleActive => Ok(()),
            SalePhase::SoldOut => Err(MintError::SoldOutTotal),
            SalePhase::Configured | SalePhase::SaleScheduled => Err(MintError::SaleNotStarted),
        }
    }

    fn only_owner(&self, caller: &Address) -> Result<(), MintError> {
        if *caller != self.config.owner {
            return Err(MintError::Unauthorized);
        }
        Ok(())
    }

    /// Assign the next contiguous token range.
    fn allocate(
        &mut self,
        channel: Channel,
        recipient: Address,
        quantity: Quantity,
        unit_price: Balance,
        discounted: bool,
        now: Timestamp,
    ) -> Result<Allocation, MintError> {
        let first_token_id = self.next_token_id;
        self.next_token_id = first_token_id
            .checked_add(quantity)
            .ok_or(MintError::ArithmeticOverflow)?;
        Ok(Allocation {
            channel,
            recipient,
            quantity,
            unit_price,
            discounted,
            first_token_id,
            minted_at: now,
        })
    }

    fn encode(&self) -> Result<SnapshotEnvelope, MintError> {
        let payload = bincode::serialize(self).map_err(|e| MintError::Serialization(e.to_string()))?;
        Ok(SnapshotEnvelope { version: STATE_VERSION, payload })
    }

    /// Decode a stored snapshot, upgrading older layouts.
    pub fn migrate(envelope: &SnapshotEnvelope) -> Result<Self, MintError> {
        match envelope.version {
            STATE_VERSION => bincode::deserialize(&envelope.payload)
                .map_err(|e| MintError::Serialization(e.to_string())),
            other => Err(MintError::UnsupportedStateVersion(other)),
        }
    }
}

// ── AuctionEngine ─────────────────────────────────────────────────────────────

struct Inner {
    state: EngineState,
    /// Append-only, ordered by `first_token_id`.
    allocations: Vec<Allocation>,
}

/// The allocation engine.
///
/// All calls are serialized through one lock. A call runs against a clone of
/// the current state; the clone is persisted (when a store is attached) and
/// swapped in only if every step succeeded, so a failed call leaves no trace.
pub struct AuctionEngine {
    inner: Mutex<Inner>,
    db: Option<Arc<StateDb>>,
    payouts: Arc<dyn PayoutSink>,
}

impl AuctionEngine {
    /// Deploy a purely in-memory auction.
    pub fn deploy(params: SaleParams, payouts: Arc<dyn PayoutSink>) -> Result<Self, MintError> {
        let state = EngineState::from_params(&params)?;
        info!(name = %state.config.name, symbol = %state.config.symbol, "auction deployed (in-memory)");
        Ok(Self {
            inner: Mutex::new(Inner { state, allocations: Vec::new() }),
            db: None,
            payouts,
        })
    }

    /// Attach to the auction stored in `db`, or deploy `params` into it when
    /// the store is empty.
    pub fn open_or_deploy(
        db: Arc<StateDb>,
        params: Option<SaleParams>,
        payouts: Arc<dyn PayoutSink>,
    ) -> Result<Self, MintError> {
        let (state, allocations) = match db.load_snapshot()? {
            Some(envelope) => {
                if params.is_some() {
                    warn!("store already holds an auction; ignoring supplied sale parameters");
                }
                let state = EngineState::migrate(&envelope)?;
                let allocations = db.load_allocations()?;
                info!(
                    name = %state.config.name,
                    version = envelope.version,
                    allocations = allocations.len(),
                    "auction loaded from store"
                );
                (state, allocations)
            }
            None => {
                let params = params.ok_or_else(|| {
                    MintError::InvalidParams("empty store and no sale parameters supplied".into())
                })?;
                let state = EngineState::from_params(&params)?;
                db.commit(&state.encode()?, 0, &[])?;
                info!(name = %state.config.name, symbol = %state.config.symbol, "auction deployed");
                (state, Vec::new())
            }
        };
        Ok(Self {
            inner: Mutex::new(Inner { state, allocations }),
            db: Some(db),
            payouts,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, MintError> {
        self.inner
            .lock()
            .map_err(|_| MintError::Storage("engine state lock poisoned".into()))
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> Result<T, MintError> {
        let inner = self.lock()?;
        Ok(f(&inner))
    }

    /// Run `f` against a staged copy and commit only on success.
    fn transact<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut EngineState, &mut Vec<Allocation>) -> Result<T, MintError>,
    ) -> Result<T, MintError> {
        let mut inner = self.lock()?;
        let mut staged = inner.state.clone();
        let mut fresh = Vec::new();

        let out = match f(&mut staged, &mut fresh) {
            Ok(out) => out,
            Err(e) => {
                debug!(op, error = %e, "call rejected");
                return Err(e);
            }
        };

        self.persist(op, inner.allocations.len() as u64, &staged, &fresh)?;
        inner.state = staged;
        inner.allocations.extend(fresh);
        Ok(out)
    }

    fn persist(
        &self,
        op: &'static str,
        first_index: u64,
        state: &EngineState,
        fresh: &[Allocation],
    ) -> Result<(), MintError> {
        if let Some(db) = &self.db {
            if let Err(e) = db.commit(&state.encode()?, first_index, fresh) {
                error!(op, error = %e, "failed to persist call");
                return Err(e);
            }
        }
        Ok(())
    }

    fn admin<T>(
        &self,
        op: &'static str,
        caller: &Address,
        f: impl FnOnce(&mut EngineState) -> Result<T, MintError>,
    ) -> Result<T, MintError> {
        self.transact(op, |s, _| {
            s.only_owner(caller)?;
            f(s)
        })
    }

    // ── Minting ───────────────────────────────────────────────────────────────

    /// Owner-only minting from the reserved pool. Allowed in any phase.
    pub fn mint_reserved(&self, caller: &Address, quantity: Quantity, now: Timestamp) -> Result<Allocation, MintError> {
        let alloc = self.transact("mint_reserved", |s, fresh| {
            s.only_owner(caller)?;
            s.ledger.reserve(caller, quantity)?;
            let alloc = s.allocate(Channel::Reserved, *caller, quantity, 0, false, now)?;
            fresh.push(alloc.clone());
            Ok(alloc)
        })?;
        info!(recipient = %caller, quantity, first_token = alloc.first_token_id, "reserved mint");
        Ok(alloc)
    }

    pub fn mint_public(
        &self,
        caller: &Address,
        quantity: Quantity,
        payment: Balance,
        now: Timestamp,
    ) -> Result<Allocation, MintError> {
        let alloc = self.transact("mint_public", |s, fresh| {
            s.ensure_active(now)?;
            if quantity == 0 {
                return Err(MintError::ZeroQuantity);
            }
            let unit_price = s.public_schedule.current_price(now)?;
            let paid = s.public_schedule.require_exact_payment(quantity, payment, now)?;
            s.ledger.admit_public(caller, quantity, s.config.public_list_max_mint)?;
            let alloc = s.allocate(Channel::Public, *caller, quantity, unit_price, false, now)?;
            s.splitter.record_receipt(paid)?;
            fresh.push(alloc.clone());
            Ok(alloc)
        })?;
        info!(
            claimant = %caller,
            quantity,
            unit_price = alloc.unit_price,
            first_token = alloc.first_token_id,
            "public mint"
        );
        Ok(alloc)
    }

    /// Allow-list mint with a standard-prefix proof for `claimant`.
    pub fn mint_allow_list(
        &self,
        claimant: &Address,
        proof: &AdmissionProof,
        quantity: Quantity,
        payment: Balance,
        now: Timestamp,
    ) -> Result<Allocation, MintError> {
        self.mint_with_proof(ProofTier::Standard, claimant, proof, quantity, payment, now)
    }

    /// Allow-list mint at the discounted price, with a discounted-prefix proof.
    pub fn mint_allow_list_discounted(
        &self,
        claimant: &Address,
        proof: &AdmissionProof,
        quantity: Quantity,
        payment: Balance,
        now: Timestamp,
    ) -> Result<Allocation, MintError> {
        self.mint_with_proof(ProofTier::Discounted, claimant, proof, quantity, payment, now)
    }

    fn mint_with_proof(
        &self,
        tier: ProofTier,
        claimant: &Address,
        proof: &AdmissionProof,
        quantity: Quantity,
        payment: Balance,
        now: Timestamp,
    ) -> Result<Allocation, MintError> {
        let (op, sale_tier) = match tier {
            ProofTier::Standard => ("mint_allow_list", SaleTier::AllowList),
            ProofTier::Discounted => ("mint_allow_list_discounted", SaleTier::Discounted),
        };
        let alloc = self.transact(op, |s, fresh| {
            s.ensure_active(now)?;
            if quantity == 0 {
                return Err(MintError::ZeroQuantity);
            }
            let expected = s.authorizer.expected_message(tier, claimant, proof.nonce);
            let verified = s.authorizer.verify(&proof.hash, &proof.signature, &expected)?;

            let schedule = s.schedule(sale_tier);
            let unit_price = schedule.current_price(now)?;
            let paid = schedule.require_exact_payment(quantity, payment, now)?;

            s.ledger.admit_allow_list(claimant, quantity, s.config.allow_list_max_mint)?;
            if verified.single_use {
                s.authorizer.register_consumed(verified.proof_hash)?;
            }
            let discounted = tier == ProofTier::Discounted;
            let alloc = s.allocate(Channel::AllowList, *claimant, quantity, unit_price, discounted, now)?;
            s.splitter.record_receipt(paid)?;
            fresh.push(alloc.clone());
            Ok(alloc)
        })?;
        info!(
            claimant = %claimant,
            quantity,
            unit_price = alloc.unit_price,
            discounted = alloc.discounted,
            first_token = alloc.first_token_id,
            "allow-list mint"
        );
        Ok(alloc)
    }

    // ── Revenue ───────────────────────────────────────────────────────────────

    /// Pay `payee` everything currently owed. Callable by anyone, in any phase.
    ///
    /// The release is persisted before funds move. A failed transfer writes
    /// the previous snapshot back, so the payee stays due.
    pub fn release(&self, payee: &Address) -> Result<Balance, MintError> {
        let mut inner = self.lock()?;
        let mut staged = inner.state.clone();
        let amount = match staged.splitter.stage_release(payee) {
            Ok(amount) => amount,
            Err(e) => {
                debug!(op = "release", error = %e, "call rejected");
                return Err(e);
            }
        };

        let first_index = inner.allocations.len() as u64;
        self.persist("release", first_index, &staged, &[])?;
        if let Err(e) = self.payouts.transfer(payee, amount) {
            warn!(payee = %payee, amount, error = %e, "payout failed, restoring snapshot");
            self.persist("release", first_index, &inner.state, &[])?;
            return Err(e);
        }
        inner.state = staged;
        info!(payee = %payee, amount, "payment released");
        Ok(amount)
    }

    pub fn releasable(&self, payee: &Address) -> Result<Balance, MintError> {
        self.read(|i| i.state.splitter.releasable(payee))?
    }

    pub fn released(&self, payee: &Address) -> Result<Balance, MintError> {
        self.read(|i| i.state.splitter.released(payee))
    }

    pub fn shares(&self, payee: &Address) -> Result<u64, MintError> {
        self.read(|i| i.state.splitter.shares(payee))
    }

    pub fn total_received(&self) -> Result<Balance, MintError> {
        self.read(|i| i.state.splitter.total_received())
    }

    pub fn total_released(&self) -> Result<Balance, MintError> {
        self.read(|i| i.state.splitter.total_released())
    }

    pub fn payees(&self) -> Result<Vec<Payee>, MintError> {
        self.read(|i| i.state.splitter.payees().to_vec())
    }

    // ── Administration ────────────────────────────────────────────────────────

    pub fn set_allow_list_max_mint(&self, caller: &Address, limit: Quantity) -> Result<(), MintError> {
        self.admin("set_allow_list_max_mint", caller, |s| {
            let previous = s.config.allow_list_max_mint;
            if limit < previous {
                warn!(previous, limit, "allow-list per-address limit lowered");
            }
            s.config.allow_list_max_mint = limit;
            info!(previous, limit, "allow-list per-address limit updated");
            Ok(())
        })
    }

    pub fn set_public_list_max_mint(&self, caller: &Address, limit: Quantity) -> Result<(), MintError> {
        self.admin("set_public_list_max_mint", caller, |s| {
            let previous = s.config.public_list_max_mint;
            if limit < previous {
                warn!(previous, limit, "public per-address limit lowered");
            }
            s.config.public_list_max_mint = limit;
            info!(previous, limit, "public per-address limit updated");
            Ok(())
        })
    }

    pub fn set_base_uri(&self, caller: &Address, base_uri: impl Into<String>) -> Result<(), MintError> {
        let base_uri = base_uri.into();
        self.admin("set_base_uri", caller, |s| {
            info!(base_uri = %base_uri, "base URI updated");
            s.config.base_uri = base_uri;
            Ok(())
        })
    }

    /// Replace the standard proof prefix. Proofs issued under the old prefix stop verifying.
    pub fn set_prefix(&self, caller: &Address, prefix: impl Into<String>) -> Result<(), MintError> {
        let prefix = prefix.into();
        self.admin("set_prefix", caller, |s| {
            info!(prefix = %prefix, "allow-list prefix updated");
            s.authorizer.set_prefix(prefix);
            Ok(())
        })
    }

    pub fn set_discounted_prefix(&self, caller: &Address, prefix: impl Into<String>) -> Result<(), MintError> {
        let prefix = prefix.into();
        self.admin("set_discounted_prefix", caller, |s| {
            info!(prefix = %prefix, "discounted prefix updated");
            s.authorizer.set_discounted_prefix(prefix);
            Ok(())
        })
    }

    /// Set the sale start for every tier.
    pub fn set_auction_start_point(&self, caller: &Address, start: Timestamp) -> Result<(), MintError> {
        self.admin("set_auction_start_point", caller, |s| {
            s.auction_start = Some(start);
            s.public_schedule.start_timestamp = Some(start);
            s.discounted_schedule.start_timestamp = Some(start);
            info!(start, "auction start point set");
            Ok(())
        })
    }

    /// Switch public pricing to (or re-parameterize) a Dutch schedule.
    pub fn set_dutch_config(&self, caller: &Address, config: DutchConfig) -> Result<(), MintError> {
        self.admin("set_dutch_config", caller, |s| {
            config.validate()?;
            info!(
                base_price = config.base_price,
                floor_price = config.floor_price,
                decay_step = config.decay_step,
                interval = config.decay_interval_secs,
                "dutch schedule updated"
            );
            s.public_schedule.mode = PricingMode::Dutch(config);
            Ok(())
        })
    }

    pub fn set_authority(&self, caller: &Address, authority: Address) -> Result<(), MintError> {
        self.admin("set_authority", caller, |s| {
            info!(authority = %authority, "proof authority updated");
            s.authorizer.set_authority(authority);
            Ok(())
        })
    }

    pub fn transfer_ownership(&self, caller: &Address, new_owner: Address) -> Result<(), MintError> {
        self.admin("transfer_ownership", caller, |s| {
            info!(from = %s.config.owner, to = %new_owner, "ownership transferred");
            s.config.owner = new_owner;
            Ok(())
        })
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn phase(&self, now: Timestamp) -> Result<SalePhase, MintError> {
        self.read(|i| i.state.phase(now))
    }

    pub fn info(&self, now: Timestamp) -> Result<SaleInfo, MintError> {
        self.read(|i| {
            let s = &i.state;
            SaleInfo {
                name: s.config.name.clone(),
                symbol: s.config.symbol.clone(),
                owner: s.config.owner,
                authority: s.authorizer.authority(),
                phase: s.phase(now),
                base_uri: s.config.base_uri.clone(),
                auction_start: s.auction_start,
                allow_list_max_mint: s.config.allow_list_max_mint,
                public_list_max_mint: s.config.public_list_max_mint,
                total_cap: s.ledger.total_cap,
                reserved_cap: s.ledger.reserved_cap,
                allow_list_cap: s.ledger.allow_list_cap,
                reserved_minted: s.ledger.reserved_minted,
                allow_list_minted: s.ledger.allow_list_minted,
                public_minted: s.ledger.public_minted,
                total_supply: s.next_token_id,
                prefix: s.authorizer.prefix().to_string(),
                discounted_prefix: s.authorizer.discounted_prefix().to_string(),
                public_pricing: s.public_schedule.mode.clone(),
                allow_list_pricing: s.public_schedule.mode.clone(),
                discounted_pricing: s.discounted_schedule.mode.clone(),
            }
        })
    }

    pub fn current_price(&self, tier: SaleTier, now: Timestamp) -> Result<Balance, MintError> {
        self.read(|i| i.state.schedule(tier).current_price(now))?
    }

    pub fn schedule_preview(&self, from: Timestamp, max_points: usize) -> Result<Vec<PricePoint>, MintError> {
        self.read(|i| i.state.public_schedule.preview(from, max_points))?
    }

    /// `base_uri + id`, or just `id` when no base URI is set.
    pub fn token_uri(&self, token_id: TokenId) -> Result<String, MintError> {
        self.read(|i| {
            let base = &i.state.config.base_uri;
            if base.is_empty() {
                token_id.to_string()
            } else {
                format!("{base}{token_id}")
            }
        })
    }

    pub fn owner_of(&self, token_id: TokenId) -> Result<Option<Address>, MintError> {
        self.read(|i| {
            let idx = i.allocations.partition_point(|a| a.first_token_id <= token_id);
            idx.checked_sub(1)
                .map(|k| &i.allocations[k])
                .filter(|a| a.contains(token_id))
                .map(|a| a.recipient)
        })
    }

    pub fn total_supply(&self) -> Result<Quantity, MintError> {
        self.read(|i| i.state.next_token_id)
    }

    /// Tokens minted to `account` across all channels.
    pub fn number_minted(&self, account: &Address) -> Result<Quantity, MintError> {
        self.read(|i| i.state.ledger.usage(account).total())
    }

    pub fn usage(&self, account: &Address) -> Result<ClaimantUsage, MintError> {
        self.read(|i| i.state.ledger.usage(account))
    }

    pub fn allocations(&self, offset: usize, limit: usize) -> Result<Vec<Allocation>, MintError> {
        self.read(|i| i.allocations.iter().skip(offset).take(limit).cloned().collect())
    }

    pub fn is_proof_consumed(&self, hash: &ProofHash) -> Result<bool, MintError> {
        self.read(|i| i.state.authorizer.is_consumed(hash))
    }

    /// Copy of the full mutable state, for inspection.
    pub fn snapshot(&self) -> Result<EngineState, MintError> {
        self.read(|i| i.state.clone())
    }
}
