use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MintError {
    // ── Authorization ────────────────────────────────────────────────────────
    #[error("Ownable: caller is not the owner")]
    Unauthorized,

    // ── Sale window / pricing ────────────────────────────────────────────────
    #[error("sale has not started")]
    SaleNotStarted,

    #[error("Invalid amount. expected {expected} wei, got {supplied}")]
    InvalidAmount { expected: u128, supplied: u128 },

    // ── Supply ───────────────────────────────────────────────────────────────
    #[error("Reserved sold out.")]
    SoldOutReserved,

    #[error("Allow-list sold out.")]
    SoldOutAllowList,

    #[error("Sold out.")]
    SoldOutTotal,

    #[error("You cannot mint this many. (limit {limit}, already minted {minted})")]
    ExceedsPerAddressLimit { limit: u64, minted: u64 },

    #[error("quantity must be greater than zero")]
    ZeroQuantity,

    // ── Admission proofs ─────────────────────────────────────────────────────
    #[error("Signature invalid.")]
    InvalidSignature,

    #[error("Hash invalid.")]
    HashMismatch,

    #[error("proof already consumed: {0}")]
    ReplayedProof(String),

    #[error("signature must be {expected} bytes, got {got}")]
    MalformedSignature { expected: usize, got: usize },

    // ── Revenue splitting ────────────────────────────────────────────────────
    #[error("PaymentSplitter: account is not due payment.")]
    NotDuePayment,

    #[error("PaymentSplitter: account has no shares")]
    NoShares,

    #[error("payout transfer failed: {0}")]
    TransferFailed(String),

    // ── Configuration ────────────────────────────────────────────────────────
    #[error("invalid sale parameters: {0}")]
    InvalidParams(String),

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("unsupported state snapshot version {0}")]
    UnsupportedStateVersion(u16),
}
