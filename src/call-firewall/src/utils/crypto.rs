//! Signature recovery for signed call approvals.

use alloy_primitives::{keccak256, Address, B256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::errors::HostError;

/// Recover an EOA address from a 32-byte digest and a 65-byte `r || s || v` signature.
///
/// Accepts v in {0,1,27,28}. If v is not recognised, both parities are tried.
pub fn ecrecover_address(digest: B256, sig: &[u8]) -> Result<Address, HostError> {
    if sig.len() != 65 {
        return Err(HostError::InvalidSignature);
    }
    let signature = Signature::from_slice(&sig[0..64]).map_err(|_| HostError::InvalidSignature)?;
    let v_raw = sig[64];

    let candidates: &[u8] = match v_raw {
        27 | 28 => &[v_raw - 27],
        0 | 1 => &[v_raw],
        _ => &[0, 1],
    };
    for &parity in candidates {
        let Some(recid) = RecoveryId::from_byte(parity) else {
            continue;
        };
        if let Ok(key) = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recid) {
            return Ok(address_of(&key));
        }
    }

    Err(HostError::InvalidSignature)
}

/// Ethereum address of a secp256k1 public key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}
