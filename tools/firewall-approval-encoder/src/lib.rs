//! Off-chain counterpart of the firewall engine: computes the call ids, vector hashes and
//! invariant programs administrators submit, and signs approvals for relaying.

pub mod encoder;
pub mod types;

#[cfg(test)]
mod tests;

pub use call_firewall_types::{CompOp, InvariantCheck, Opcode};
pub use encoder::{
    approval_digest, bundle_call_hash, call_hash, encode_program, nonce_call_hash, sign_approval,
    vector_hash, EncodeError,
};
pub use types::SignatureApproval;
