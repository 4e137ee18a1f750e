use alloy_primitives::{Address, FixedBytes, Selector, U256};
use call_firewall_types::{CompOp, InvariantCheck, Opcode};
use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};

use crate::types::SignatureApproval;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("tag {tag:?} is {len} bytes, at most 255 fit the length prefix")]
    TagTooLong { tag: String, len: usize },
}

/// Encode an invariant program from a list of checks.
pub fn encode_program(checks: &[InvariantCheck]) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    for check in checks {
        match check {
            InvariantCheck::After { slot, op, rhs, tag } => {
                buf.push(Opcode::CheckAfter as u8);
                buf.push(*slot);
                buf.push(comp_op_to_u8(*op));
                buf.extend_from_slice(&rhs.to_be_bytes::<32>());
                push_tag(&mut buf, tag)?;
            }
            InvariantCheck::Unchanged { slot, tag } => {
                buf.push(Opcode::CheckUnchanged as u8);
                buf.push(*slot);
                push_tag(&mut buf, tag)?;
            }
            InvariantCheck::DeltaLte { slot, max, tag } => {
                buf.push(Opcode::CheckDeltaLte as u8);
                buf.push(*slot);
                buf.extend_from_slice(&max.to_be_bytes::<32>());
                push_tag(&mut buf, tag)?;
            }
            InvariantCheck::AfterSum { a, b, op, rhs, tag } => {
                buf.push(Opcode::CheckAfterSum as u8);
                buf.push(*a);
                buf.push(*b);
                buf.push(comp_op_to_u8(*op));
                buf.extend_from_slice(&rhs.to_be_bytes::<32>());
                push_tag(&mut buf, tag)?;
            }
        }
    }
    Ok(buf)
}

fn push_tag(buf: &mut Vec<u8>, tag: &str) -> Result<(), EncodeError> {
    let len = u8::try_from(tag.len()).map_err(|_| EncodeError::TagTooLong {
        tag: tag.to_owned(),
        len: tag.len(),
    })?;
    buf.push(len);
    buf.extend_from_slice(tag.as_bytes());
    Ok(())
}

pub fn comp_op_to_u8(op: CompOp) -> u8 {
    match op {
        CompOp::Lt => 0,
        CompOp::Lte => 1,
        CompOp::Gt => 2,
        CompOp::Gte => 3,
        CompOp::Eq => 4,
        CompOp::Neq => 5,
    }
}

fn keccak256_bytes(bytes: &[u8]) -> FixedBytes<32> {
    let mut h = Keccak256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut b = [0u8; 32];
    b.copy_from_slice(out.as_slice());
    FixedBytes(b)
}

fn packed_call(consumer: Address, sender: Address, origin: Address, data: &[u8], value: U256) -> Vec<u8> {
    let mut buf = Vec::with_capacity(20 * 3 + data.len() + 32 * 2);
    buf.extend_from_slice(consumer.as_slice());
    buf.extend_from_slice(sender.as_slice());
    buf.extend_from_slice(origin.as_slice());
    buf.extend_from_slice(data);
    buf.extend_from_slice(&value.to_be_bytes::<32>());
    buf
}

/// Call id checked by the signature, admin-call and vectors-or-calls policies.
pub fn call_hash(
    consumer: Address,
    sender: Address,
    origin: Address,
    data: &[u8],
    value: U256,
) -> FixedBytes<32> {
    keccak256_bytes(&packed_call(consumer, sender, origin, data, value))
}

/// Bundle call id: bound to the block the call executes in.
pub fn bundle_call_hash(
    consumer: Address,
    sender: Address,
    origin: Address,
    data: &[u8],
    value: U256,
    block_number: u64,
) -> FixedBytes<32> {
    let mut buf = packed_call(consumer, sender, origin, data, value);
    buf.extend_from_slice(&U256::from(block_number).to_be_bytes::<32>());
    keccak256_bytes(&buf)
}

/// Single-call id: bound to the per-(consumer, sender) nonce.
pub fn nonce_call_hash(
    consumer: Address,
    sender: Address,
    origin: Address,
    data: &[u8],
    value: U256,
    nonce: U256,
) -> FixedBytes<32> {
    let mut buf = packed_call(consumer, sender, origin, data, value);
    buf.extend_from_slice(&nonce.to_be_bytes::<32>());
    keccak256_bytes(&buf)
}

pub fn vector_hash(selectors: &[Selector]) -> FixedBytes<32> {
    let packed: Vec<u8> = selectors.iter().flat_map(|s| s.0).collect();
    keccak256_bytes(&packed)
}

/// Compute the digest a signer signs (must match the engine's `SignedApproval::digest`).
pub fn approval_digest(approval: &SignatureApproval) -> FixedBytes<32> {
    let mut msg = Vec::with_capacity(approval.call_hashes.len() * 32 + 32 * 2 + 20 * 2);
    for h in &approval.call_hashes {
        msg.extend_from_slice(h.as_slice());
    }
    msg.extend_from_slice(&approval.expiration.to_be_bytes::<32>());
    msg.extend_from_slice(approval.origin.as_slice());
    msg.extend_from_slice(approval.sender.as_slice());
    msg.extend_from_slice(&approval.nonce.to_be_bytes::<32>());
    let message_hash = keccak256_bytes(&msg);

    let mut prefixed = Vec::with_capacity(28 + 32);
    prefixed.extend_from_slice(b"\x19Ethereum Signed Message:\n32");
    prefixed.extend_from_slice(message_hash.as_slice());
    keccak256_bytes(&prefixed)
}

/// Sign the approval digest and write the 65-byte signature into `approval.signature`.
pub fn sign_approval(approval: &mut SignatureApproval, signing_key: &SigningKey) -> Result<(), k256::ecdsa::Error> {
    let digest = approval_digest(approval);
    let (signature, recovery_id) = signing_key.sign_prehash_recoverable(digest.as_slice())?;
    let (r, s) = signature.split_bytes();

    let mut sig_bytes = Vec::with_capacity(65);
    sig_bytes.extend_from_slice(r.as_slice());
    sig_bytes.extend_from_slice(s.as_slice());
    sig_bytes.push(recovery_id.to_byte() + 27);
    approval.signature = sig_bytes;
    Ok(())
}
