//! Shared wire formats for the call firewall.
//!
//! Everything in this crate is hashed or decoded by both the engine and the off-chain tooling,
//! so the byte layouts here are the compatibility contract between the two.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod call_hash;
pub mod opcodes;

pub use call_hash::{
    call_hash, call_hash_with_discriminator, eth_signed_message_digest, selector, selector_of,
    signature_approval_message, vector_hash,
};
pub use opcodes::{CompOp, InvariantCheck, Opcode};
