//! Approval bookkeeping shared by the stack-based approval policies.

use std::collections::HashMap;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use call_firewall_types::{eth_signed_message_digest, signature_approval_message};
use tracing::debug;

use crate::{
    access::AccessControl, constants::signer_role, errors::PolicyError,
    utils::crypto::ecrecover_address,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingCall {
    hash: B256,
    expires_at: U256,
}

/// Per-consumer LIFO stack of approved call hashes. The tail is the next call expected.
#[derive(Clone, Debug, Default)]
pub struct CallHashStack {
    stacks: HashMap<Address, Vec<PendingCall>>,
}

impl CallHashStack {
    /// Push `hashes` in order onto the stack of `consumer`; the last one is consumed first.
    pub fn push(&mut self, consumer: Address, hashes: &[B256], expires_at: U256) {
        self.stacks
            .entry(consumer)
            .or_default()
            .extend(hashes.iter().map(|&hash| PendingCall { hash, expires_at }));
    }

    pub fn pending(&self, consumer: Address) -> Vec<B256> {
        self.stacks
            .get(&consumer)
            .map(|s| s.iter().map(|p| p.hash).collect())
            .unwrap_or_default()
    }

    pub fn peek(&self, consumer: Address) -> Option<B256> {
        self.stacks.get(&consumer).and_then(|s| s.last()).map(|p| p.hash)
    }

    /// Pop the tail if it equals `expected` and has not expired at `now`.
    /// State is untouched on failure.
    pub fn consume(
        &mut self,
        policy: &'static str,
        consumer: Address,
        expected: B256,
        now: U256,
    ) -> Result<(), PolicyError> {
        let stack = self.stacks.entry(consumer).or_default();
        let Some(next) = stack.last().copied() else {
            return Err(PolicyError::CallHashesEmpty { policy });
        };
        if next.hash != expected {
            return Err(PolicyError::InvalidCallHash { policy });
        }
        if now > next.expires_at {
            return Err(PolicyError::ApprovalExpired { policy });
        }
        stack.pop();
        debug!(policy, %consumer, hash = %expected, remaining = stack.len(), "call approval consumed");
        Ok(())
    }
}

/// An off-chain signed batch of call approvals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedApproval {
    pub call_hashes: Vec<B256>,
    pub expiration: U256,
    pub origin: Address,
    pub sender: Address,
    pub nonce: U256,
    /// 65-byte `r || s || v` over the EIP-191 digest of the approval message.
    pub signature: Bytes,
}

impl SignedApproval {
    /// Digest the signer signs.
    pub fn digest(&self) -> B256 {
        let message = signature_approval_message(
            &self.call_hashes,
            self.expiration,
            self.origin,
            self.sender,
            self.nonce,
        );
        eth_signed_message_digest(keccak256(message))
    }
}

/// Per-consumer signature nonces.
#[derive(Clone, Debug, Default)]
pub struct SignatureNonces {
    nonces: HashMap<Address, U256>,
}

impl SignatureNonces {
    pub fn nonce(&self, consumer: Address) -> U256 {
        self.nonces.get(&consumer).copied().unwrap_or_default()
    }

    /// Check expiry, nonce and signer role of `approval`, then advance the consumer nonce.
    pub fn verify(
        &mut self,
        policy: &'static str,
        access: &AccessControl,
        consumer: Address,
        approval: &SignedApproval,
        now: U256,
    ) -> Result<(), PolicyError> {
        if now > approval.expiration {
            return Err(PolicyError::SignatureExpired { policy });
        }
        let expected = self.nonce(consumer);
        if approval.nonce != expected {
            return Err(PolicyError::InvalidNonce {
                policy,
                expected,
                got: approval.nonce,
            });
        }
        let signer = ecrecover_address(approval.digest(), &approval.signature)?;
        if !access.has_role(signer_role(), signer) {
            return Err(PolicyError::InvalidSigner { policy, signer });
        }
        self.nonces.insert(consumer, expected + U256::from(1));
        debug!(policy, %consumer, %signer, nonce = %expected, "signed approval accepted");
        Ok(())
    }
}
