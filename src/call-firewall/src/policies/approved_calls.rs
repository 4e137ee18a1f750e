use std::collections::{HashMap, VecDeque};

use alloy_primitives::{Address, B256, U256};
use call_firewall_types::call_hash_with_discriminator;
use tracing::{debug, info};

use super::{Policy, PolicyEnv};
use crate::{
    access::AccessControl, constants::DEFAULT_ADMIN_ROLE, context::CallContext,
    errors::PolicyError,
};

const NAME: &str = "ApprovedCallsPolicy";

/// Single-call pre-approval: a FIFO queue of call ids per consumer, each bound to the
/// per-(consumer, sender) nonce so an approved call cannot be replayed.
#[derive(Clone, Debug)]
pub struct ApprovedCallsPolicy {
    access: AccessControl,
    approved: HashMap<Address, VecDeque<B256>>,
    nonces: HashMap<(Address, Address), U256>,
}

impl ApprovedCallsPolicy {
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            approved: HashMap::new(),
            nonces: HashMap::new(),
        }
    }

    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    /// Append call ids to the queue of `consumer`; the first one is consumed first.
    pub fn approve_calls(
        &mut self,
        caller: Address,
        consumer: Address,
        call_hashes: &[B256],
    ) -> Result<(), PolicyError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        self.approved
            .entry(consumer)
            .or_default()
            .extend(call_hashes.iter().copied());
        info!(policy = NAME, %consumer, count = call_hashes.len(), "calls approved");
        Ok(())
    }

    pub fn pending(&self, consumer: Address) -> Vec<B256> {
        self.approved
            .get(&consumer)
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Nonce the next approved call from `sender` into `consumer` must be bound to.
    pub fn nonce(&self, consumer: Address, sender: Address) -> U256 {
        self.nonces.get(&(consumer, sender)).copied().unwrap_or_default()
    }
}

impl Policy for ApprovedCallsPolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pre_execution(&mut self, _env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        let nonce = self.nonce(call.consumer, call.sender);
        let queue = self.approved.entry(call.consumer).or_default();
        let Some(&head) = queue.front() else {
            return Err(PolicyError::CallHashesEmpty { policy: NAME });
        };
        let expected = call_hash_with_discriminator(
            call.consumer,
            call.sender,
            call.origin,
            &call.data,
            call.value,
            nonce,
        );
        if head != expected {
            return Err(PolicyError::InvalidCallHash { policy: NAME });
        }
        queue.pop_front();
        self.nonces.insert((call.consumer, call.sender), nonce + U256::from(1));
        debug!(policy = NAME, consumer = %call.consumer, sender = %call.sender, %nonce, "call approval consumed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::MockHost,
        policies::testing::{call, entered, ADMIN, CONSUMER, OTHER, USER},
    };

    fn id(call: &CallContext, nonce: u64) -> B256 {
        call_hash_with_discriminator(
            call.consumer,
            call.sender,
            call.origin,
            &call.data,
            call.value,
            U256::from(nonce),
        )
    }

    #[test]
    fn empty_queue_rejects() {
        let host = MockHost::new();
        let mut policy = ApprovedCallsPolicy::new(ADMIN);
        let c = call(USER, &[1, 2, 3, 4], 0);
        let err = policy.pre_execution(PolicyEnv::new(&host, &entered(&c)), &c).unwrap_err();
        assert_eq!(err.to_string(), "ApprovedCallsPolicy: call hashes empty");
    }

    #[test]
    fn approved_call_is_consumed_once() {
        let host = MockHost::new();
        let mut policy = ApprovedCallsPolicy::new(ADMIN);
        let c = call(USER, &[1, 2, 3, 4], 0);
        policy.approve_calls(ADMIN, CONSUMER, &[id(&c, 0)]).unwrap();

        let ctx = entered(&c);
        policy.pre_execution(PolicyEnv::new(&host, &ctx), &c).unwrap();
        assert_eq!(policy.nonce(CONSUMER, USER), U256::from(1));

        // Re-approving the same id does not help: the nonce moved on.
        policy.approve_calls(ADMIN, CONSUMER, &[id(&c, 0)]).unwrap();
        let err = policy.pre_execution(PolicyEnv::new(&host, &ctx), &c).unwrap_err();
        assert_eq!(err.to_string(), "ApprovedCallsPolicy: invalid call hash");
    }

    #[test]
    fn queue_is_first_in_first_out() {
        let host = MockHost::new();
        let mut policy = ApprovedCallsPolicy::new(ADMIN);
        let first = call(USER, &[1, 0, 0, 0], 0);
        let second = call(USER, &[2, 0, 0, 0], 0);
        policy
            .approve_calls(ADMIN, CONSUMER, &[id(&first, 0), id(&second, 1)])
            .unwrap();

        assert!(policy
            .pre_execution(PolicyEnv::new(&host, &entered(&second)), &second)
            .is_err());
        policy.pre_execution(PolicyEnv::new(&host, &entered(&first)), &first).unwrap();
        policy.pre_execution(PolicyEnv::new(&host, &entered(&second)), &second).unwrap();
        assert!(policy.pending(CONSUMER).is_empty());
    }

    #[test]
    fn only_admin_approves() {
        let mut policy = ApprovedCallsPolicy::new(ADMIN);
        assert!(matches!(
            policy.approve_calls(OTHER, CONSUMER, &[B256::ZERO]),
            Err(PolicyError::Access(_))
        ));
    }
}
