use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount in the smallest currency unit (wei). u128 covers any realistic
/// receipt total with room to spare.
pub type Balance = u128;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Sequential token identifier, assigned from 0 in mint order.
pub type TokenId = u64;

/// Number of units requested or minted.
pub type Quantity = u64;

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], String> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped).map_err(|e| e.to_string())?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("expected {N} bytes, got {}", b.len()))
}

// ── Address ──────────────────────────────────────────────────────────────────

/// 20-byte claimant / payee identifier: the last 20 bytes of
/// keccak256(uncompressed secp256k1 public key).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn from_bytes(b: [u8; 20]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse hex with or without the `0x` prefix. Checksum casing is ignored.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        decode_fixed::<20>(s).map(Self)
    }
}

impl TryFrom<String> for Address {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.to_hex()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}…)", &self.to_hex()[..10])
    }
}

// ── ProofHash ────────────────────────────────────────────────────────────────

/// 32-byte keccak256 digest an issuer signs to admit a claimant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProofHash(pub [u8; 32]);

impl ProofHash {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, String> {
        decode_fixed::<32>(s).map(Self)
    }
}

impl TryFrom<String> for ProofHash {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<ProofHash> for String {
    fn from(h: ProofHash) -> Self {
        h.to_hex()
    }
}

impl fmt::Display for ProofHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ProofHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofHash({}…)", &self.to_hex()[..18])
    }
}

// ── ProofSignature ───────────────────────────────────────────────────────────

/// Recoverable secp256k1 signature, r || s || v (65 bytes when well formed).
/// Length is validated at verification time, not at parse time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProofSignature(pub Vec<u8>);

impl ProofSignature {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, String> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(stripped).map(Self).map_err(|e| e.to_string())
    }
}

impl TryFrom<String> for ProofSignature {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<ProofSignature> for String {
    fn from(s: ProofSignature) -> Self {
        s.to_hex()
    }
}

impl fmt::Debug for ProofSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofSignature({}b)", self.0.len())
    }
}

// ── SalePhase ────────────────────────────────────────────────────────────────

/// Lifecycle of an auction. `SaleScheduled → SaleActive` happens implicitly
/// whenever an entry point observes `now >= start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalePhase {
    /// Deployed, no start point set.
    Configured,
    /// Start point set but not yet reached.
    SaleScheduled,
    SaleActive,
    /// Every unit of the total cap is allocated. Revenue operations remain available.
    SoldOut,
}

impl fmt::Display for SalePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SalePhase::Configured => "Configured",
            SalePhase::SaleScheduled => "SaleScheduled",
            SalePhase::SaleActive => "SaleActive",
            SalePhase::SoldOut => "SoldOut",
        };
        f.write_str(s)
    }
}
