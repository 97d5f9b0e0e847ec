pub mod hash;
pub mod recover;
pub mod signer;

pub use hash::{eth_signed_message_hash, keccak256, AdmissionMessage};
pub use recover::{address_from_verifying_key, recover_signer};
pub use signer::Signer;
