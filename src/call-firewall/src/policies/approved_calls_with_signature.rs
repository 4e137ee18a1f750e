use alloy_primitives::{Address, B256, U256};
use call_firewall_types::call_hash;
use tracing::info;

use super::{
    approvals::{CallHashStack, SignatureNonces, SignedApproval},
    Policy, PolicyEnv,
};
use crate::{
    access::AccessControl, constants::signer_role, context::CallContext, errors::PolicyError,
    host::Host,
};

const NAME: &str = "ApprovedCallsWithSignaturePolicy";

/// Call approvals submitted either by a signer-role holder or as an off-chain signed message
/// relayed by anyone. Approved ids are pushed onto a per-consumer stack and consumed LIFO.
#[derive(Clone, Debug)]
pub struct ApprovedCallsWithSignaturePolicy {
    access: AccessControl,
    approvals: CallHashStack,
    nonces: SignatureNonces,
}

impl ApprovedCallsWithSignaturePolicy {
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            approvals: CallHashStack::default(),
            nonces: SignatureNonces::default(),
        }
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    /// Direct submission by a signer-role holder.
    ///
    /// `origin` and `sender` are the parties the approval was issued for; they are already bound
    /// into each call id, so they are only logged here.
    pub fn approve_calls(
        &mut self,
        caller: Address,
        consumer: Address,
        call_hashes: &[B256],
        expiration: U256,
        origin: Address,
        sender: Address,
    ) -> Result<(), PolicyError> {
        self.access.check_role(signer_role(), caller)?;
        self.approvals.push(consumer, call_hashes, expiration);
        info!(policy = NAME, %consumer, %origin, %sender, count = call_hashes.len(), "calls approved");
        Ok(())
    }

    /// Relay a signed approval: verifies expiry, nonce and signer, then pushes the ids.
    pub fn approve_calls_via_signature(
        &mut self,
        host: &dyn Host,
        consumer: Address,
        approval: &SignedApproval,
    ) -> Result<(), PolicyError> {
        let now = U256::from(host.block_timestamp());
        self.nonces.verify(NAME, &self.access, consumer, approval, now)?;
        self.approvals.push(consumer, &approval.call_hashes, approval.expiration);
        info!(policy = NAME, %consumer, count = approval.call_hashes.len(), "signed calls approved");
        Ok(())
    }

    pub fn nonce(&self, consumer: Address) -> U256 {
        self.nonces.nonce(consumer)
    }

    pub fn pending(&self, consumer: Address) -> Vec<B256> {
        self.approvals.pending(consumer)
    }
}

impl Policy for ApprovedCallsWithSignaturePolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pre_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        let expected = call_hash(call.consumer, call.sender, call.origin, &call.data, call.value);
        self.approvals.consume(
            NAME,
            call.consumer,
            expected,
            U256::from(env.host.block_timestamp()),
        )
    }
}
