use dutchmint_core::constants::SIGNATURE_LEN;
use dutchmint_core::error::MintError;
use dutchmint_core::types::{Address, ProofHash, ProofSignature};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::hash::{eth_signed_message_hash, keccak256};

/// Derive the 20-byte address of a secp256k1 public key.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 SEC1 tag.
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address::from_bytes(out)
}

/// Recover the identity that signed `digest` under the `personal_sign` scheme.
///
/// Accepts `v` as either 0/1 or 27/28.
pub fn recover_signer(digest: &ProofHash, signature: &ProofSignature) -> Result<Address, MintError> {
    let raw = &signature.0;
    if raw.len() != SIGNATURE_LEN {
        return Err(MintError::MalformedSignature { expected: SIGNATURE_LEN, got: raw.len() });
    }
    let v = match raw[64] {
        0 | 1 => raw[64],
        27 | 28 => raw[64] - 27,
        _ => return Err(MintError::InvalidSignature),
    };
    let sig = Signature::from_slice(&raw[..64]).map_err(|_| MintError::InvalidSignature)?;
    let recovery_id = RecoveryId::from_byte(v).ok_or(MintError::InvalidSignature)?;
    let prehash = eth_signed_message_hash(digest);
    let key = VerifyingKey::recover_from_prehash(&prehash, &sig, recovery_id)
        .map_err(|_| MintError::InvalidSignature)?;
    Ok(address_from_verifying_key(&key))
}
