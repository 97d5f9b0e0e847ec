//! dutchmint-rpc
//!
//! JSON-RPC 2.0 server for a Dutchmint auction node.
//!
//! Namespace: "dutchmint"
//! Methods:
//!   dutchmint_getVersion            — API and crate version
//!   dutchmint_getSaleInfo           — configuration, phase and supply counters
//!   dutchmint_getPrice              — current unit price for a tier
//!   dutchmint_getSchedulePreview    — upcoming public price points
//!   dutchmint_mintReserved          — owner-only reserved mint
//!   dutchmint_mintPublic            — public mint with exact payment
//!   dutchmint_mintAllowList         — allow-list mint with an admission proof
//!   dutchmint_mintAllowListDiscounted
//!   dutchmint_release               — pay out a payee's releasable revenue
//!   dutchmint_getPayees / getRevenue
//!   dutchmint_tokenURI / ownerOf / numberMinted / getAllocations / isProofConsumed
//!   dutchmint_set* / transferOwnership — owner-gated administration
//!
//! Amounts travel as decimal strings (u128 does not fit a JSON number).

pub mod api;
pub mod server;
pub mod types;

pub use server::RpcServer;
pub use server::RpcServerState;
pub use types::{
    RpcAdmissionProof, RpcAllocation, RpcDutchConfig, RpcPayee, RpcPricePoint, RpcPricing,
    RpcRevenue, RpcSaleInfo, RpcVersionInfo,
};
