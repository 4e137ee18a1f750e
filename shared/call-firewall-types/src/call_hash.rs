//! Call identifiers, vector hashes and the signature-approval message.
//!
//! All recipes are `keccak256(abi.encodePacked(..))`: addresses are 20 bytes, `uint256` is a
//! 32-byte big-endian word, `bytes` are appended raw and `bytes32[]` is a run of 32-byte words.
//! Approvals are computed off-chain with these exact layouts, so field order is part of the format.

use alloc::vec::Vec;

use alloy_primitives::{keccak256, Address, Selector, B256, U256};

/// `keccak256(consumer || sender || origin || data || value)`.
///
/// Used by the signature, admin-call and vectors-or-calls policies.
pub fn call_hash(
    consumer: Address,
    sender: Address,
    origin: Address,
    data: &[u8],
    value: U256,
) -> B256 {
    keccak256(packed_call(consumer, sender, origin, data, value, None))
}

/// `keccak256(consumer || sender || origin || data || value || discriminator)`.
///
/// The discriminator is the per-(consumer, sender) nonce for `ApprovedCallsPolicy` and the
/// execution block number for `ApprovedCallsBundlePolicy`.
pub fn call_hash_with_discriminator(
    consumer: Address,
    sender: Address,
    origin: Address,
    data: &[u8],
    value: U256,
    discriminator: U256,
) -> B256 {
    keccak256(packed_call(consumer, sender, origin, data, value, Some(discriminator)))
}

fn packed_call(
    consumer: Address,
    sender: Address,
    origin: Address,
    data: &[u8],
    value: U256,
    discriminator: Option<U256>,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(20 * 3 + data.len() + 32 * 2);
    buf.extend_from_slice(consumer.as_slice());
    buf.extend_from_slice(sender.as_slice());
    buf.extend_from_slice(origin.as_slice());
    buf.extend_from_slice(data);
    buf.extend_from_slice(&value.to_be_bytes::<32>());
    if let Some(d) = discriminator {
        buf.extend_from_slice(&d.to_be_bytes::<32>());
    }
    buf
}

/// `keccak256(selector_1 || selector_2 || .. || selector_n)`.
pub fn vector_hash(selectors: &[Selector]) -> B256 {
    let mut buf = Vec::with_capacity(selectors.len() * 4);
    for s in selectors {
        buf.extend_from_slice(s.as_slice());
    }
    keccak256(buf)
}

/// Packed message a signer authorises for `approveCallsViaSignature`.
///
/// Layout: `bytes32[] call_hashes || uint256 expiration || address origin || address sender || uint256 nonce`.
pub fn signature_approval_message(
    call_hashes: &[B256],
    expiration: U256,
    origin: Address,
    sender: Address,
    nonce: U256,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(call_hashes.len() * 32 + 32 + 20 + 20 + 32);
    for h in call_hashes {
        buf.extend_from_slice(h.as_slice());
    }
    buf.extend_from_slice(&expiration.to_be_bytes::<32>());
    buf.extend_from_slice(origin.as_slice());
    buf.extend_from_slice(sender.as_slice());
    buf.extend_from_slice(&nonce.to_be_bytes::<32>());
    buf
}

/// EIP-191 personal-message digest over a 32-byte message hash.
pub fn eth_signed_message_digest(message_hash: B256) -> B256 {
    let mut buf = Vec::with_capacity(28 + 32);
    buf.extend_from_slice(b"\x19Ethereum Signed Message:\n32");
    buf.extend_from_slice(message_hash.as_slice());
    keccak256(buf)
}

/// Entry-point selector of a payload: the first four bytes, zero padded (Solidity `bytes4(data)`).
pub fn selector_of(data: &[u8]) -> Selector {
    let mut sel = [0u8; 4];
    let n = data.len().min(4);
    sel[..n].copy_from_slice(&data[..n]);
    Selector::from(sel)
}

/// Selector of a canonical function signature, eg `"withdraw(uint256)"`.
pub fn selector(signature: &str) -> Selector {
    let h = keccak256(signature.as_bytes());
    Selector::from([h[0], h[1], h[2], h[3]])
}
