use alloy_primitives::{Address, FixedBytes, U256};

/// Batch of call ids authorised by an off-chain signer.
#[derive(Clone, Debug, Default)]
pub struct SignatureApproval {
    /// Call ids in push order; the last one is consumed first.
    pub call_hashes: Vec<FixedBytes<32>>,
    /// Unix timestamp after which neither the signature nor the pushed ids are accepted.
    pub expiration: U256,
    pub origin: Address,
    pub sender: Address,
    /// Must equal the policy's next nonce for the consumer.
    pub nonce: U256,

    /// ECDSA signature (r||s||v) over the EIP-191 digest of the packed approval.
    pub signature: Vec<u8>,
}
