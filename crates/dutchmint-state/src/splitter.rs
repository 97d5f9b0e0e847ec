use std::collections::BTreeMap;

use dutchmint_core::error::MintError;
use dutchmint_core::types::{Address, Balance};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payee {
    pub account: Address,
    pub shares: u64,
}

/// Pull-based revenue splitter with fixed share weights.
///
/// A payee's cumulative entitlement is
/// `floor(total_received × shares / total_shares)`; what it may withdraw is
/// that minus what it has already been paid. Rounding dust stays with the
/// splitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSplitter {
    payees: Vec<Payee>,
    total_shares: u128,
    total_received: Balance,
    total_released: Balance,
    released: BTreeMap<Address, Balance>,
}

impl RevenueSplitter {
    pub fn new(accounts: &[Address], shares: &[u64]) -> Result<Self, MintError> {
        if accounts.is_empty() {
            return Err(MintError::InvalidParams("no payees".into()));
        }
        if accounts.len() != shares.len() {
            return Err(MintError::InvalidParams(format!(
                "{} payees but {} share entries",
                accounts.len(),
                shares.len()
            )));
        }
        let mut payees: Vec<Payee> = Vec::with_capacity(accounts.len());
        let mut total_shares: u128 = 0;
        for (account, &shares) in accounts.iter().zip(shares) {
            if shares == 0 {
                return Err(MintError::InvalidParams(format!("payee {account} has zero shares")));
            }
            if payees.iter().any(|p| p.account == *account) {
                return Err(MintError::InvalidParams(format!("payee {account} listed twice")));
            }
            total_shares += shares as u128;
            payees.push(Payee { account: *account, shares });
        }
        Ok(Self {
            payees,
            total_shares,
            total_received: 0,
            total_released: 0,
            released: BTreeMap::new(),
        })
    }

    /// Book sale revenue. Every admitted payment lands here.
    pub fn record_receipt(&mut self, amount: Balance) -> Result<(), MintError> {
        self.total_received = self
            .total_received
            .checked_add(amount)
            .ok_or(MintError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn payees(&self) -> &[Payee] {
        &self.payees
    }

    pub fn shares(&self, account: &Address) -> u64 {
        self.payees
            .iter()
            .find(|p| p.account == *account)
            .map(|p| p.shares)
            .unwrap_or(0)
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    pub fn total_received(&self) -> Balance {
        self.total_received
    }

    pub fn total_released(&self) -> Balance {
        self.total_released
    }

    pub fn released(&self, account: &Address) -> Balance {
        self.released.get(account).copied().unwrap_or(0)
    }

    /// Revenue held but not yet paid out.
    pub fn balance(&self) -> Balance {
        self.total_received - self.total_released
    }

    /// Cumulative entitlement of `account` from everything received so far.
    pub fn entitlement(&self, account: &Address) -> Result<Balance, MintError> {
        let shares = self.shares(account) as u128;
        let gross = self
            .total_received
            .checked_mul(shares)
            .ok_or(MintError::ArithmeticOverflow)?;
        Ok(gross / self.total_shares)
    }

    /// Amount `account` could withdraw right now.
    pub fn releasable(&self, account: &Address) -> Result<Balance, MintError> {
        let entitled = self.entitlement(account)?;
        Ok(entitled.saturating_sub(self.released(account)))
    }

    /// Book everything currently owed to `account` as released and return
    /// the amount. The caller moves the funds once the booking is durable.
    pub fn stage_release(&mut self, account: &Address) -> Result<Balance, MintError> {
        if self.shares(account) == 0 {
            return Err(MintError::NoShares);
        }
        let amount = self.releasable(account)?;
        if amount == 0 {
            return Err(MintError::NotDuePayment);
        }

        let released = self.released.entry(*account).or_insert(0);
        *released = released.checked_add(amount).ok_or(MintError::ArithmeticOverflow)?;
        self.total_released = self
            .total_released
            .checked_add(amount)
            .ok_or(MintError::ArithmeticOverflow)?;
        info!(payee = %account, amount, "payment booked");
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dutchmint_core::constants::WEI_PER_ETHER;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn three_way() -> RevenueSplitter {
        RevenueSplitter::new(&[addr(1), addr(2), addr(3)], &[75, 15, 10]).unwrap()
    }

    // ── Construction ─────────────────────────────────────────────────────────

    #[test]
    fn rejects_bad_payee_tables() {
        assert!(RevenueSplitter::new(&[], &[]).is_err());
        assert!(RevenueSplitter::new(&[addr(1)], &[1, 2]).is_err());
        assert!(RevenueSplitter::new(&[addr(1)], &[0]).is_err());
        assert!(RevenueSplitter::new(&[addr(1), addr(1)], &[1, 2]).is_err());
    }

    // ── Release ──────────────────────────────────────────────────────────────

    #[test]
    fn five_ether_split_75_15_10() {
        let mut s = three_way();
        s.record_receipt(5 * WEI_PER_ETHER).unwrap();

        assert_eq!(s.stage_release(&addr(1)).unwrap(), 3_750_000_000_000_000_000);
        assert_eq!(s.stage_release(&addr(2)).unwrap(), 750_000_000_000_000_000);
        assert_eq!(s.stage_release(&addr(3)).unwrap(), 500_000_000_000_000_000);
        assert_eq!(s.released(&addr(1)), 3_750_000_000_000_000_000);
        assert_eq!(s.total_released(), 5 * WEI_PER_ETHER);
        assert_eq!(s.balance(), 0);
    }

    #[test]
    fn second_release_without_new_revenue_is_not_due() {
        let mut s = three_way();
        s.record_receipt(5 * WEI_PER_ETHER).unwrap();
        s.stage_release(&addr(1)).unwrap();
        assert_eq!(s.stage_release(&addr(1)).unwrap_err(), MintError::NotDuePayment);

        // New revenue makes the payee due again, for the delta only.
        s.record_receipt(WEI_PER_ETHER).unwrap();
        assert_eq!(s.stage_release(&addr(1)).unwrap(), 750_000_000_000_000_000);
    }

    #[test]
    fn stranger_has_no_shares() {
        let mut s = three_way();
        s.record_receipt(WEI_PER_ETHER).unwrap();
        assert_eq!(s.stage_release(&addr(9)).unwrap_err(), MintError::NoShares);
    }

    #[test]
    fn nothing_received_is_not_due() {
        let mut s = three_way();
        assert_eq!(s.stage_release(&addr(1)).unwrap_err(), MintError::NotDuePayment);
    }

    #[test]
    fn rounding_dust_stays_in_splitter() {
        let mut s = RevenueSplitter::new(&[addr(1), addr(2), addr(3)], &[1, 1, 1]).unwrap();
        s.record_receipt(10).unwrap();
        for b in 1..=3 {
            assert_eq!(s.stage_release(&addr(b)).unwrap(), 3);
        }
        assert_eq!(s.balance(), 1);
        assert!(s.total_released() <= s.total_received());
    }
}
