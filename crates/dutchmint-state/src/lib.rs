pub mod authorizer;
pub mod db;
pub mod engine;
pub mod ledger;
pub mod payout;
pub mod splitter;

pub use authorizer::{ProofTier, SignatureAuthorizer, UsedHashRegistry, VerifiedProof};
pub use db::{SnapshotEnvelope, StateDb};
pub use engine::{AdmissionProof, AuctionEngine, EngineState, SaleInfo, SaleTier};
pub use ledger::{ClaimantUsage, SupplyLedger};
pub use payout::{InMemoryPayouts, PayoutSink};
pub use splitter::{Payee, RevenueSplitter};
