use dutchmint_core::error::MintError;
use dutchmint_core::types::{Address, ProofHash, ProofSignature};
use k256::ecdsa::SigningKey;
use zeroize::Zeroizing;

use crate::hash::{eth_signed_message_hash, AdmissionMessage};
use crate::recover::address_from_verifying_key;

/// A secp256k1 signing key with its derived address.
///
/// Used off-engine by the sale authority to issue admission proofs; the engine
/// itself only ever recovers and compares.
pub struct Signer {
    key: SigningKey,
    address: Address,
}

impl Signer {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self::from_key(SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Restore from a hex-encoded 32-byte secret (with or without `0x`).
    pub fn from_secret_hex(s: &str) -> Result<Self, MintError> {
        let stripped = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        let bytes = Zeroizing::new(
            hex::decode(stripped).map_err(|e| MintError::InvalidParams(format!("secret key: {e}")))?,
        );
        let key = SigningKey::from_slice(&bytes)
            .map_err(|_| MintError::InvalidParams("secret key is not a valid scalar".into()))?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address_from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Hex-encoded secret, wiped from memory on drop.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.key.to_bytes())))
    }

    /// Sign a digest under the `personal_sign` envelope. `v` is emitted as 27/28.
    pub fn sign_digest(&self, digest: &ProofHash) -> Result<ProofSignature, MintError> {
        let prehash = eth_signed_message_hash(digest);
        let (sig, recovery_id) = self
            .key
            .sign_prehash_recoverable(&prehash)
            .map_err(|_| MintError::InvalidSignature)?;
        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&sig.to_bytes());
        out.push(27 + recovery_id.to_byte());
        Ok(ProofSignature(out))
    }

    /// Hash and sign an admission message in one step.
    pub fn issue(&self, message: &AdmissionMessage) -> Result<(ProofHash, ProofSignature), MintError> {
        let digest = message.digest();
        let sig = self.sign_digest(&digest)?;
        Ok((digest, sig))
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signer {{ address: {} }}", self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_round_trip_preserves_address() {
        let signer = Signer::generate();
        let restored = Signer::from_secret_hex(&signer.secret_hex()).unwrap();
        assert_eq!(restored.address(), signer.address());
    }

    #[test]
    fn known_key_derives_known_address() {
        // Secret key 1 maps to the well-known generator-point address.
        let signer = Signer::from_secret_hex(
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(
            signer.address().to_hex(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn zero_secret_rejected() {
        let zero = format!("0x{}", "00".repeat(32));
        assert!(Signer::from_secret_hex(&zero).is_err());
    }
}
