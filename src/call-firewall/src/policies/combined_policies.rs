use alloy_primitives::Address;
use tracing::info;

use super::{Policy, PolicyEnv};
use crate::{
    access::AccessControl, constants::DEFAULT_ADMIN_ROLE, context::CallContext,
    errors::PolicyError,
};

const NAME: &str = "CombinedPoliciesPolicy";

/// Conjunction of owned sub-policies, run in order. The first rejection wins.
#[derive(Clone, Debug)]
pub struct CombinedPoliciesPolicy {
    access: AccessControl,
    policies: Vec<Box<dyn Policy>>,
}

impl CombinedPoliciesPolicy {
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            policies: Vec::new(),
        }
    }

    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    pub fn set_policies(&mut self, caller: Address, policies: Vec<Box<dyn Policy>>) -> Result<(), PolicyError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        info!(policy = NAME, count = policies.len(), "sub-policies set");
        self.policies = policies;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn policy<T: Policy + 'static>(&self, index: usize) -> Option<&T> {
        self.policies.get(index)?.downcast_ref::<T>()
    }

    pub fn policy_mut<T: Policy + 'static>(&mut self, index: usize) -> Option<&mut T> {
        self.policies.get_mut(index)?.downcast_mut::<T>()
    }
}

impl Policy for CombinedPoliciesPolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pre_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        for policy in &mut self.policies {
            policy.pre_execution(env, call)?;
        }
        Ok(())
    }

    fn post_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        for policy in &mut self.policies {
            policy.post_execution(env, call)?;
        }
        Ok(())
    }
}
