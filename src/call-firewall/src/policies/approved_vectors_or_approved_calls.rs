use std::collections::HashSet;

use alloy_primitives::{Address, B256, U256};
use call_firewall_types::call_hash;
use tracing::{debug, info};

use super::{
    approvals::{CallHashStack, SignatureNonces, SignedApproval},
    approved_vectors::VectorSet,
    Policy, PolicyEnv,
};
use crate::{
    access::AccessControl,
    constants::{approver_role, DEFAULT_ADMIN_ROLE},
    context::CallContext,
    errors::PolicyError,
    host::Host,
};

const NAME: &str = "ApprovedVectorsOrApprovedCallsPolicy";

/// Hybrid gate: a transaction either follows an approved execution vector, or its outermost
/// call was individually approved (directly by an approver or via a signed message).
///
/// An approved outermost call authorizes the whole guarded-call tree under it.
#[derive(Clone, Debug)]
pub struct ApprovedVectorsOrApprovedCallsPolicy {
    access: AccessControl,
    vectors: VectorSet,
    approvals: CallHashStack,
    nonces: SignatureNonces,
    authorized: HashSet<Address>,
}

impl ApprovedVectorsOrApprovedCallsPolicy {
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            vectors: VectorSet::default(),
            approvals: CallHashStack::default(),
            nonces: SignatureNonces::default(),
            authorized: HashSet::new(),
        }
    }

    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    pub fn set_vector_hash_status(
        &mut self,
        caller: Address,
        consumer: Address,
        vector_hash: B256,
        status: bool,
    ) -> Result<(), PolicyError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        self.vectors.set(consumer, vector_hash, status);
        info!(policy = NAME, %consumer, %vector_hash, status, "vector status set");
        Ok(())
    }

    pub fn is_vector_approved(&self, consumer: Address, vector_hash: B256) -> bool {
        self.vectors.is_approved(consumer, vector_hash)
    }

    pub fn approve_calls(
        &mut self,
        caller: Address,
        consumer: Address,
        call_hashes: &[B256],
        expiration: U256,
    ) -> Result<(), PolicyError> {
        self.access.check_role(approver_role(), caller)?;
        self.approvals.push(consumer, call_hashes, expiration);
        info!(policy = NAME, %consumer, count = call_hashes.len(), "calls approved");
        Ok(())
    }

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

impl Policy for ApprovedVectorsOrApprovedCallsPolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pre_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        if !env.ctx.is_outermost(call.consumer) {
            return Ok(());
        }
        let id = call_hash(call.consumer, call.sender, call.origin, &call.data, call.value);
        if self.approvals.peek(call.consumer) != Some(id) {
            return Ok(());
        }
        // An expired approval is a hard rejection rather than a fallback to the vector check.
        self.approvals.consume(
            NAME,
            call.consumer,
            id,
            U256::from(env.host.block_timestamp()),
        )?;
        self.authorized.insert(call.consumer);
        debug!(policy = NAME, consumer = %call.consumer, "call tree authorized by approval");
        Ok(())
    }

    fn post_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        if !env.ctx.is_outermost(call.consumer) {
            return Ok(());
        }
        if self.authorized.remove(&call.consumer) {
            return Ok(());
        }
        self.vectors.check(NAME, env.ctx, call.consumer)
    }
}
