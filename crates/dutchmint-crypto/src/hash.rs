use dutchmint_core::types::{Address, ProofHash};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// Compute keccak256 of arbitrary bytes → 32-byte array.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Wrap a 32-byte digest in the standard `personal_sign` envelope:
/// keccak256("\x19Ethereum Signed Message:\n32" || digest).
pub fn eth_signed_message_hash(digest: &ProofHash) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n32");
    hasher.update(digest.as_bytes());
    hasher.finalize().into()
}

/// The structured tuple an admission proof commits to.
///
/// Encoded with tight packing: UTF-8 prefix bytes, the raw 20 address bytes,
/// and (when present) the nonce as a 32-byte big-endian integer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionMessage {
    pub prefix: String,
    pub claimant: Address,
    pub nonce: Option<u64>,
}

impl AdmissionMessage {
    pub fn new(prefix: impl Into<String>, claimant: Address, nonce: Option<u64>) -> Self {
        Self { prefix: prefix.into(), claimant, nonce }
    }

    pub fn packed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.prefix.len() + 20 + 32);
        out.extend_from_slice(self.prefix.as_bytes());
        out.extend_from_slice(self.claimant.as_bytes());
        if let Some(nonce) = self.nonce {
            let mut word = [0u8; 32];
            word[24..].copy_from_slice(&nonce.to_be_bytes());
            out.extend_from_slice(&word);
        }
        out
    }

    pub fn digest(&self) -> ProofHash {
        ProofHash::from_bytes(keccak256(&self.packed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_empty_input_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn nonce_is_left_padded_to_a_full_word() {
        let claimant = Address::from_bytes([0x11; 20]);
        let msg = AdmissionMessage::new("P:", claimant, Some(0x0102));
        let packed = msg.packed();
        assert_eq!(packed.len(), 2 + 20 + 32);
        assert_eq!(&packed[..2], b"P:");
        assert_eq!(&packed[2..22], claimant.as_bytes());
        assert!(packed[22..52].iter().all(|b| *b == 0));
        assert_eq!(&packed[52..], &[0x01, 0x02]);
    }

    #[test]
    fn digest_depends_on_every_field() {
        let a = Address::from_bytes([1; 20]);
        let b = Address::from_bytes([2; 20]);
        let base = AdmissionMessage::new("Base Verification:", a, None).digest();
        assert_ne!(base, AdmissionMessage::new("Other:", a, None).digest());
        assert_ne!(base, AdmissionMessage::new("Base Verification:", b, None).digest());
        assert_ne!(base, AdmissionMessage::new("Base Verification:", a, Some(0)).digest());
    }
}
