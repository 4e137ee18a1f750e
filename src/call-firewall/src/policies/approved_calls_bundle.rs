use alloy_primitives::{Address, B256, U256};
use call_firewall_types::call_hash_with_discriminator;
use tracing::info;

use super::{approvals::CallHashStack, Policy, PolicyEnv};
use crate::{
    access::AccessControl, constants::DEFAULT_ADMIN_ROLE, context::CallContext,
    errors::PolicyError,
};

const NAME: &str = "ApprovedCallsBundlePolicy";

/// Bundle pre-approval: call ids bound to the execution block number, consumed from the tail.
///
/// Approvers push the bundle in reverse execution order.
#[derive(Clone, Debug)]
pub struct ApprovedCallsBundlePolicy {
    access: AccessControl,
    approvals: CallHashStack,
}

impl ApprovedCallsBundlePolicy {
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            approvals: CallHashStack::default(),
        }
    }

    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    pub fn approve_calls(
        &mut self,
        caller: Address,
        consumer: Address,
        call_hashes: &[B256],
    ) -> Result<(), PolicyError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        self.approvals.push(consumer, call_hashes, U256::MAX);
        info!(policy = NAME, %consumer, count = call_hashes.len(), "bundle approved");
        Ok(())
    }

    pub fn pending(&self, consumer: Address) -> Vec<B256> {
        self.approvals.pending(consumer)
    }
}

impl Policy for ApprovedCallsBundlePolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pre_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        let expected = call_hash_with_discriminator(
            call.consumer,
            call.sender,
            call.origin,
            &call.data,
            call.value,
            U256::from(env.host.block_number()),
        );
        self.approvals.consume(
            NAME,
            call.consumer,
            expected,
            U256::from(env.host.block_timestamp()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::{Host, MockHost},
        policies::testing::{call, entered, ADMIN, CONSUMER},
    };

    fn id(host: &MockHost, call: &CallContext) -> B256 {
        call_hash_with_discriminator(
            call.consumer,
            call.sender,
            call.origin,
            &call.data,
            call.value,
            U256::from(host.block_number()),
        )
    }

    #[test]
    fn bundle_is_consumed_last_pushed_first() {
        let host = MockHost::new();
        let mut policy = ApprovedCallsBundlePolicy::new(ADMIN);
        let x = call(ADMIN, &[0xaa, 0, 0, 1], 0);
        let y = call(ADMIN, &[0xbb, 0, 0, 2], 0);
        policy.approve_calls(ADMIN, CONSUMER, &[id(&host, &x), id(&host, &y)]).unwrap();

        let err = policy.pre_execution(PolicyEnv::new(&host, &entered(&x)), &x).unwrap_err();
        assert_eq!(err.to_string(), "ApprovedCallsBundlePolicy: invalid call hash");

        policy.pre_execution(PolicyEnv::new(&host, &entered(&y)), &y).unwrap();
        policy.pre_execution(PolicyEnv::new(&host, &entered(&x)), &x).unwrap();

        let err = policy.pre_execution(PolicyEnv::new(&host, &entered(&x)), &x).unwrap_err();
        assert_eq!(err.to_string(), "ApprovedCallsBundlePolicy: call hashes empty");
    }

    #[test]
    fn approval_is_bound_to_block() {
        let mut host = MockHost::new();
        let mut policy = ApprovedCallsBundlePolicy::new(ADMIN);
        let x = call(ADMIN, &[0xaa, 0, 0, 1], 0);
        policy.approve_calls(ADMIN, CONSUMER, &[id(&host, &x)]).unwrap();

        host.mine();
        assert_eq!(
            policy.pre_execution(PolicyEnv::new(&host, &entered(&x)), &x),
            Err(PolicyError::InvalidCallHash { policy: NAME })
        );
    }
}
