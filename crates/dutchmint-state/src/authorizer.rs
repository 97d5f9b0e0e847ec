use std::collections::BTreeSet;

use dutchmint_core::error::MintError;
use dutchmint_core::types::{Address, ProofHash, ProofSignature};
use dutchmint_crypto::{recover_signer, AdmissionMessage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which allow-list tier a proof admits to. Each tier signs under its own prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofTier {
    Standard,
    Discounted,
}

/// Set of nonce-scoped proof hashes that have already admitted a mint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedHashRegistry {
    used: BTreeSet<ProofHash>,
}

impl UsedHashRegistry {
    pub fn contains(&self, hash: &ProofHash) -> bool {
        self.used.contains(hash)
    }

    /// Mark `hash` consumed. Fails if it already was.
    pub fn insert(&mut self, hash: ProofHash) -> Result<(), MintError> {
        if !self.used.insert(hash) {
            return Err(MintError::ReplayedProof(hash.to_hex()));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

/// Outcome of a successful proof check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifiedProof {
    pub signer: Address,
    pub proof_hash: ProofHash,
    /// Nonce-scoped proofs admit exactly one mint and must be registered.
    pub single_use: bool,
}

/// Verifies off-chain admission proofs against the configured authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureAuthorizer {
    authority: Address,
    prefix: String,
    discounted_prefix: String,
    registry: UsedHashRegistry,
}

impl SignatureAuthorizer {
    pub fn new(authority: Address, prefix: impl Into<String>, discounted_prefix: impl Into<String>) -> Self {
        Self {
            authority,
            prefix: prefix.into(),
            discounted_prefix: discounted_prefix.into(),
            registry: UsedHashRegistry::default(),
        }
    }

    pub fn authority(&self) -> Address {
        self.authority
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn discounted_prefix(&self) -> &str {
        &self.discounted_prefix
    }

    pub fn registry(&self) -> &UsedHashRegistry {
        &self.registry
    }

    /// The message a valid proof for `claimant` in `tier` must commit to.
    pub fn expected_message(&self, tier: ProofTier, claimant: &Address, nonce: Option<u64>) -> AdmissionMessage {
        let prefix = match tier {
            ProofTier::Standard => &self.prefix,
            ProofTier::Discounted => &self.discounted_prefix,
        };
        AdmissionMessage::new(prefix.clone(), *claimant, nonce)
    }

    /// Check a proof.
    ///
    /// The signature is checked first: it must recover to the authority over
    /// `proof_hash`. Only then is `proof_hash` compared against the digest of
    /// `expected`, and finally nonce-scoped proofs are checked for replay.
    /// Read-only; call [`register_consumed`](Self::register_consumed) once
    /// the mint it admits has gone through.
    pub fn verify(
        &self,
        proof_hash: &ProofHash,
        signature: &ProofSignature,
        expected: &AdmissionMessage,
    ) -> Result<VerifiedProof, MintError> {
        let signer = recover_signer(proof_hash, signature)?;
        if signer != self.authority {
            debug!(recovered = %signer, authority = %self.authority, "proof signed by wrong key");
            return Err(MintError::InvalidSignature);
        }
        if expected.digest() != *proof_hash {
            debug!(claimant = %expected.claimant, "proof hash does not match claimant message");
            return Err(MintError::HashMismatch);
        }
        let single_use = expected.nonce.is_some();
        if single_use && self.registry.contains(proof_hash) {
            return Err(MintError::ReplayedProof(proof_hash.to_hex()));
        }
        Ok(VerifiedProof { signer, proof_hash: *proof_hash, single_use })
    }

    pub fn register_consumed(&mut self, hash: ProofHash) -> Result<(), MintError> {
        self.registry.insert(hash)
    }

    pub fn is_consumed(&self, hash: &ProofHash) -> bool {
        self.registry.contains(hash)
    }

    /// Outstanding proofs under the old prefix stop verifying.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn set_discounted_prefix(&mut self, prefix: impl Into<String>) {
        self.discounted_prefix = prefix.into();
    }

    pub fn set_authority(&mut self, authority: Address) {
        self.authority = authority;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dutchmint_crypto::Signer;

    fn setup() -> (Signer, SignatureAuthorizer) {
        let signer = Signer::generate();
        let auth = SignatureAuthorizer::new(signer.address(), "Base Verification:", "Discounted Verification:");
        (signer, auth)
    }

    fn claimant() -> Address {
        Address::from_bytes([0x42; 20])
    }

    #[test]
    fn accepts_authority_proof_for_claimant() {
        let (signer, auth) = setup();
        let expected = auth.expected_message(ProofTier::Standard, &claimant(), None);
        let (hash, sig) = signer.issue(&expected).unwrap();
        let ok = auth.verify(&hash, &sig, &expected).unwrap();
        assert_eq!(ok.signer, signer.address());
        assert!(!ok.single_use);
    }

    #[test]
    fn foreign_key_is_invalid_signature() {
        let (_, auth) = setup();
        let rogue = Signer::generate();
        let expected = auth.expected_message(ProofTier::Standard, &claimant(), None);
        let (hash, sig) = rogue.issue(&expected).unwrap();
        assert_eq!(auth.verify(&hash, &sig, &expected).unwrap_err(), MintError::InvalidSignature);
    }

    #[test]
    fn proof_for_other_claimant_is_hash_mismatch() {
        let (signer, auth) = setup();
        let other = Address::from_bytes([0x43; 20]);
        let (hash, sig) = signer
            .issue(&auth.expected_message(ProofTier::Standard, &other, None))
            .unwrap();
        let expected = auth.expected_message(ProofTier::Standard, &claimant(), None);
        assert_eq!(auth.verify(&hash, &sig, &expected).unwrap_err(), MintError::HashMismatch);
    }

    #[test]
    fn signature_checked_before_hash() {
        // Wrong signer *and* wrong hash reports the signature failure.
        let (_, auth) = setup();
        let rogue = Signer::generate();
        let other = Address::from_bytes([0x43; 20]);
        let (hash, sig) = rogue
            .issue(&auth.expected_message(ProofTier::Standard, &other, None))
            .unwrap();
        let expected = auth.expected_message(ProofTier::Standard, &claimant(), None);
        assert_eq!(auth.verify(&hash, &sig, &expected).unwrap_err(), MintError::InvalidSignature);
    }

    #[test]
    fn prefix_change_invalidates_outstanding_proofs() {
        let (signer, mut auth) = setup();
        let expected = auth.expected_message(ProofTier::Standard, &claimant(), None);
        let (hash, sig) = signer.issue(&expected).unwrap();
        auth.set_prefix("Rotated:");
        let now_expected = auth.expected_message(ProofTier::Standard, &claimant(), None);
        assert_eq!(auth.verify(&hash, &sig, &now_expected).unwrap_err(), MintError::HashMismatch);
    }

    #[test]
    fn standard_proof_does_not_admit_discounted_tier() {
        let (signer, auth) = setup();
        let (hash, sig) = signer
            .issue(&auth.expected_message(ProofTier::Standard, &claimant(), None))
            .unwrap();
        let discounted = auth.expected_message(ProofTier::Discounted, &claimant(), None);
        assert_eq!(auth.verify(&hash, &sig, &discounted).unwrap_err(), MintError::HashMismatch);
    }

    #[test]
    fn nonce_scoped_proof_is_single_use() {
        let (signer, mut auth) = setup();
        let expected = auth.expected_message(ProofTier::Standard, &claimant(), Some(7));
        let (hash, sig) = signer.issue(&expected).unwrap();

        let ok = auth.verify(&hash, &sig, &expected).unwrap();
        assert!(ok.single_use);
        auth.register_consumed(hash).unwrap();
        assert!(auth.is_consumed(&hash));
        assert!(matches!(auth.verify(&hash, &sig, &expected), Err(MintError::ReplayedProof(_))));
        assert!(matches!(auth.register_consumed(hash), Err(MintError::ReplayedProof(_))));
    }

    #[test]
    fn truncated_signature_is_malformed() {
        let (signer, auth) = setup();
        let expected = auth.expected_message(ProofTier::Standard, &claimant(), None);
        let (hash, sig) = signer.issue(&expected).unwrap();
        let short = ProofSignature(sig.0[..64].to_vec());
        assert_eq!(
            auth.verify(&hash, &short, &expected).unwrap_err(),
            MintError::MalformedSignature { expected: 65, got: 64 }
        );
    }
}
