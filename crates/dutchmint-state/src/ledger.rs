use std::collections::BTreeMap;

use dutchmint_core::error::MintError;
use dutchmint_core::types::{Address, Quantity};
use serde::{Deserialize, Serialize};

/// Per-claimant mint counts by sale channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimantUsage {
    pub reserved: Quantity,
    pub allow_list: Quantity,
    pub public: Quantity,
}

impl ClaimantUsage {
    /// Units that count against the public per-address limit. Allow-list
    /// mints are included: the two pools are shared.
    pub fn sale_total(&self) -> Quantity {
        self.allow_list + self.public
    }

    pub fn total(&self) -> Quantity {
        self.reserved + self.allow_list + self.public
    }
}

/// Capacity accounting across the reserved, allow-list and public channels.
///
/// Invariants held after every successful call:
///   reserved_minted   ≤ reserved_cap
///   allow_list_minted ≤ allow_list_cap
///   reserved_minted + allow_list_minted + public_minted ≤ total_cap
///
/// Counters never decrease.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyLedger {
    pub total_cap: Quantity,
    pub reserved_cap: Quantity,
    pub reserved_minted: Quantity,
    pub allow_list_cap: Quantity,
    pub allow_list_minted: Quantity,
    pub public_minted: Quantity,
    usage: BTreeMap<Address, ClaimantUsage>,
}

impl SupplyLedger {
    pub fn new(total_cap: Quantity, reserved_cap: Quantity, allow_list_cap: Quantity) -> Result<Self, MintError> {
        if reserved_cap > total_cap {
            return Err(MintError::InvalidParams(format!(
                "reserved cap {reserved_cap} exceeds total cap {total_cap}"
            )));
        }
        if allow_list_cap > total_cap {
            return Err(MintError::InvalidParams(format!(
                "allow-list cap {allow_list_cap} exceeds total cap {total_cap}"
            )));
        }
        Ok(Self {
            total_cap,
            reserved_cap,
            reserved_minted: 0,
            allow_list_cap,
            allow_list_minted: 0,
            public_minted: 0,
            usage: BTreeMap::new(),
        })
    }

    pub fn total_minted(&self) -> Quantity {
        self.reserved_minted + self.allow_list_minted + self.public_minted
    }

    pub fn remaining(&self) -> Quantity {
        self.total_cap - self.total_minted()
    }

    pub fn is_sold_out(&self) -> bool {
        self.total_minted() >= self.total_cap
    }

    pub fn usage(&self, claimant: &Address) -> ClaimantUsage {
        self.usage.get(claimant).copied().unwrap_or_default()
    }

    fn check_total(&self, quantity: Quantity) -> Result<(), MintError> {
        let after = self
            .total_minted()
            .checked_add(quantity)
            .ok_or(MintError::ArithmeticOverflow)?;
        if after > self.total_cap {
            return Err(MintError::SoldOutTotal);
        }
        Ok(())
    }

    fn check_limit(used: Quantity, quantity: Quantity, limit: Quantity) -> Result<(), MintError> {
        let after = used.checked_add(quantity).ok_or(MintError::ArithmeticOverflow)?;
        if after > limit {
            return Err(MintError::ExceedsPerAddressLimit { limit, minted: used });
        }
        Ok(())
    }

    /// Owner-side reserved minting.
    pub fn reserve(&mut self, recipient: &Address, quantity: Quantity) -> Result<(), MintError> {
        if quantity == 0 {
            return Err(MintError::ZeroQuantity);
        }
        let after = self
            .reserved_minted
            .checked_add(quantity)
            .ok_or(MintError::ArithmeticOverflow)?;
        if after > self.reserved_cap {
            return Err(MintError::SoldOutReserved);
        }
        self.check_total(quantity)?;

        self.reserved_minted = after;
        self.usage.entry(*recipient).or_default().reserved += quantity;
        Ok(())
    }

    /// Admit `quantity` allow-list units for `claimant`.
    pub fn admit_allow_list(
        &mut self,
        claimant: &Address,
        quantity: Quantity,
        per_address_max: Quantity,
    ) -> Result<(), MintError> {
        if quantity == 0 {
            return Err(MintError::ZeroQuantity);
        }
        let used = self.usage(claimant);
        Self::check_limit(used.allow_list, quantity, per_address_max)?;
        let after = self
            .allow_list_minted
            .checked_add(quantity)
            .ok_or(MintError::ArithmeticOverflow)?;
        if after > self.allow_list_cap {
            return Err(MintError::SoldOutAllowList);
        }
        self.check_total(quantity)?;

        self.allow_list_minted = after;
        self.usage.entry(*claimant).or_default().allow_list += quantity;
        Ok(())
    }

    /// Admit `quantity` public units for `claimant`. The per-address limit is
    /// checked against allow-list and public mints together.
    pub fn admit_public(
        &mut self,
        claimant: &Address,
        quantity: Quantity,
        per_address_max: Quantity,
    ) -> Result<(), MintError> {
        if quantity == 0 {
            return Err(MintError::ZeroQuantity);
        }
        let used = self.usage(claimant);
        Self::check_limit(used.sale_total(), quantity, per_address_max)?;
        self.check_total(quantity)?;

        self.public_minted += quantity;
        self.usage.entry(*claimant).or_default().public += quantity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn ledger() -> SupplyLedger {
        // 8 sale units + 2 reserved, allow-list pool of 8.
        SupplyLedger::new(10, 2, 8).unwrap()
    }

    #[test]
    fn reserve_up_to_cap() {
        let mut l = ledger();
        l.reserve(&addr(1), 2).unwrap();
        assert_eq!(l.reserved_minted, 2);
        assert_eq!(l.reserve(&addr(1), 1).unwrap_err(), MintError::SoldOutReserved);
        assert_eq!(l.usage(&addr(1)).reserved, 2);
    }

    #[test]
    fn zero_quantity_rejected_everywhere() {
        let mut l = ledger();
        assert_eq!(l.reserve(&addr(1), 0).unwrap_err(), MintError::ZeroQuantity);
        assert_eq!(l.admit_allow_list(&addr(1), 0, 3).unwrap_err(), MintError::ZeroQuantity);
        assert_eq!(l.admit_public(&addr(1), 0, 3).unwrap_err(), MintError::ZeroQuantity);
    }

    #[test]
    fn public_limit_counts_allow_list_mints() {
        let mut l = ledger();
        for _ in 0..3 {
            l.admit_allow_list(&addr(5), 1, 3).unwrap();
        }
        assert_eq!(
            l.admit_allow_list(&addr(5), 1, 3).unwrap_err(),
            MintError::ExceedsPerAddressLimit { limit: 3, minted: 3 }
        );
        assert_eq!(
            l.admit_public(&addr(5), 1, 3).unwrap_err(),
            MintError::ExceedsPerAddressLimit { limit: 3, minted: 3 }
        );
        // Raising the limit lets the same claimant continue.
        l.admit_public(&addr(5), 1, 4).unwrap();
    }

    #[test]
    fn public_limit_of_zero_closes_public_channel() {
        let mut l = ledger();
        assert!(matches!(
            l.admit_public(&addr(5), 1, 0),
            Err(MintError::ExceedsPerAddressLimit { limit: 0, .. })
        ));
    }

    #[test]
    fn total_cap_shared_across_channels() {
        let mut l = ledger();
        l.admit_public(&addr(1), 4, 11).unwrap();
        l.admit_public(&addr(1), 4, 11).unwrap();
        assert_eq!(l.admit_public(&addr(1), 3, 11).unwrap_err(), MintError::SoldOutTotal);
        l.admit_public(&addr(1), 2, 11).unwrap();
        assert!(l.is_sold_out());
        assert_eq!(l.reserve(&addr(1), 1).unwrap_err(), MintError::SoldOutTotal);
        assert_eq!(l.admit_allow_list(&addr(2), 1, 3).unwrap_err(), MintError::SoldOutTotal);
    }

    #[test]
    fn allow_list_pool_cap_enforced() {
        let mut l = SupplyLedger::new(10, 2, 2).unwrap();
        l.admit_allow_list(&addr(1), 2, 5).unwrap();
        assert_eq!(l.admit_allow_list(&addr(2), 1, 5).unwrap_err(), MintError::SoldOutAllowList);
        l.admit_public(&addr(2), 1, 5).unwrap();
    }

    #[test]
    fn failed_admission_leaves_counters_untouched() {
        let mut l = ledger();
        l.admit_public(&addr(1), 3, 3).unwrap();
        let before = l.clone();
        assert!(l.admit_public(&addr(1), 1, 3).is_err());
        assert!(l.admit_public(&addr(2), 8, 10).is_err());
        assert_eq!(l, before);
    }

    #[test]
    fn caps_hold_under_mixed_sequences() {
        let mut l = ledger();
        // Deterministic pseudo-random walk over all channels.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let who = addr((seed % 4) as u8);
            let qty = (seed >> 8) % 4;
            let _ = match (seed >> 16) % 3 {
                0 => l.reserve(&who, qty),
                1 => l.admit_allow_list(&who, qty, 3),
                _ => l.admit_public(&who, qty, 5),
            };
            assert!(l.reserved_minted <= l.reserved_cap);
            assert!(l.allow_list_minted <= l.allow_list_cap);
            assert!(l.total_minted() <= l.total_cap);
            assert!(l.usage(&who).allow_list <= 3);
        }
    }

    #[test]
    fn caps_must_fit_total() {
        assert!(SupplyLedger::new(5, 6, 0).is_err());
        assert!(SupplyLedger::new(5, 0, 6).is_err());
    }
}
