use std::collections::{HashMap, HashSet};

use alloy_primitives::Address;
use tracing::info;

use super::{Policy, PolicyEnv};
use crate::{
    access::AccessControl, constants::DEFAULT_ADMIN_ROLE, context::CallContext,
    errors::PolicyError,
};

const NAME: &str = "AllowlistPolicy";

/// Only allowlisted senders may call the consumer.
#[derive(Clone, Debug)]
pub struct AllowlistPolicy {
    access: AccessControl,
    allowed: HashMap<Address, HashSet<Address>>,
}

impl AllowlistPolicy {
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            allowed: HashMap::new(),
        }
    }

    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    pub fn set_consumer_allowlist(
        &mut self,
        caller: Address,
        consumer: Address,
        account: Address,
        status: bool,
    ) -> Result<(), PolicyError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        let set = self.allowed.entry(consumer).or_default();
        if status {
            set.insert(account);
        } else {
            set.remove(&account);
        }
        info!(policy = NAME, %consumer, %account, status, "allowlist updated");
        Ok(())
    }

    pub fn is_allowed(&self, consumer: Address, account: Address) -> bool {
        self.allowed
            .get(&consumer)
            .is_some_and(|set| set.contains(&account))
    }
}

impl Policy for AllowlistPolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pre_execution(&mut self, _env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        if self.is_allowed(call.consumer, call.sender) {
            Ok(())
        } else {
            Err(PolicyError::SenderNotAllowed { sender: call.sender })
        }
    }
}
