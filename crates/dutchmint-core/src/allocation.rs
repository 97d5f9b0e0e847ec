use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Address, Balance, Quantity, Timestamp, TokenId};

/// Sale channel an allocation was admitted through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Owner-only minting from the reserved pool. Unit price is always 0.
    Reserved,
    /// Signature-gated allow-list minting (standard or discounted proof).
    AllowList,
    /// Open public minting.
    Public,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Channel::Reserved => "reserved",
            Channel::AllowList => "allow-list",
            Channel::Public => "public",
        };
        f.write_str(s)
    }
}

/// One successful admission. Immutable once recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub channel: Channel,
    pub recipient: Address,
    pub quantity: Quantity,
    /// Price paid per unit, in wei.
    pub unit_price: Balance,
    /// True when admitted with a discounted allow-list proof.
    pub discounted: bool,
    /// First token of the contiguous range `first_token_id..first_token_id + quantity`.
    pub first_token_id: TokenId,
    pub minted_at: Timestamp,
}

impl Allocation {
    /// Total amount paid for this allocation.
    pub fn total_paid(&self) -> Balance {
        self.unit_price * self.quantity as Balance
    }

    pub fn contains(&self, token_id: TokenId) -> bool {
        token_id >= self.first_token_id && token_id < self.first_token_id + self.quantity
    }
}
