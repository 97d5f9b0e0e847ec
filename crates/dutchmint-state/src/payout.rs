use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use dutchmint_core::error::MintError;
use dutchmint_core::types::{Address, Balance};

/// Destination for released revenue.
///
/// `transfer` must either move the full amount or return an error. The
/// engine persists the booked release first and restores it on error.
pub trait PayoutSink: Send + Sync {
    fn transfer(&self, to: &Address, amount: Balance) -> Result<(), MintError>;
}

/// Process-local payout sink that credits an in-memory balance map.
///
/// Used by the node and by tests. `set_failing(true)` makes every transfer
/// fail, which exercises the release rollback path.
#[derive(Default)]
pub struct InMemoryPayouts {
    balances: Mutex<BTreeMap<Address, Balance>>,
    failing: AtomicBool,
}

impl InMemoryPayouts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Address) -> Balance {
        self.balances
            .lock()
            .map(|b| b.get(account).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl PayoutSink for InMemoryPayouts {
    fn transfer(&self, to: &Address, amount: Balance) -> Result<(), MintError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MintError::TransferFailed(format!("recipient {to} rejected payout")));
        }
        let mut balances = self
            .balances
            .lock()
            .map_err(|_| MintError::TransferFailed("payout ledger lock poisoned".into()))?;
        let entry = balances.entry(*to).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(MintError::ArithmeticOverflow)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_accumulate() {
        let sink = InMemoryPayouts::new();
        let a = Address::from_bytes([3; 20]);
        sink.transfer(&a, 5).unwrap();
        sink.transfer(&a, 7).unwrap();
        assert_eq!(sink.balance_of(&a), 12);
    }

    #[test]
    fn failing_sink_moves_nothing() {
        let sink = InMemoryPayouts::new();
        let a = Address::from_bytes([3; 20]);
        sink.set_failing(true);
        assert!(matches!(sink.transfer(&a, 5), Err(MintError::TransferFailed(_))));
        assert_eq!(sink.balance_of(&a), 0);
    }
}
