/// ─── Dutchmint Engine Constants ─────────────────────────────────────────────
///
/// Amounts are denominated in the smallest currency unit (wei).

// ── Currency ─────────────────────────────────────────────────────────────────

/// 1 ether expressed in wei.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

// ── Admission proofs ─────────────────────────────────────────────────────────

/// Default prefix for standard allow-list admission proofs.
pub const DEFAULT_ALLOW_LIST_PREFIX: &str = "Base Verification:";

/// Default prefix for discounted allow-list admission proofs.
pub const DEFAULT_DISCOUNTED_PREFIX: &str = "Discounted Verification:";

/// Length of an Ethereum-style recoverable signature: r (32) || s (32) || v (1).
pub const SIGNATURE_LEN: usize = 65;

// ── Persistence ──────────────────────────────────────────────────────────────

/// Current on-disk engine snapshot version.
pub const STATE_VERSION: u16 = 1;

/// Engine API version reported over RPC.
pub const API_VERSION: &str = "1.0";
