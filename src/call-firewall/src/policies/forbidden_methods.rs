use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, Selector};
use tracing::info;

use super::{Policy, PolicyEnv};
use crate::{
    access::AccessControl, constants::DEFAULT_ADMIN_ROLE, context::CallContext,
    errors::PolicyError,
};

const NAME: &str = "ForbiddenMethodsPolicy";

#[derive(Clone, Debug)]
pub struct ForbiddenMethodsPolicy {
    access: AccessControl,
    forbidden: HashMap<Address, HashSet<Selector>>,
}

impl ForbiddenMethodsPolicy {
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            forbidden: HashMap::new(),
        }
    }

    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    pub fn set_consumer_forbidden_method(
        &mut self,
        caller: Address,
        consumer: Address,
        selector: Selector,
        status: bool,
    ) -> Result<(), PolicyError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        let set = self.forbidden.entry(consumer).or_default();
        if status {
            set.insert(selector);
        } else {
            set.remove(&selector);
        }
        info!(policy = NAME, %consumer, %selector, status, "forbidden method updated");
        Ok(())
    }

    pub fn is_forbidden(&self, consumer: Address, selector: Selector) -> bool {
        self.forbidden
            .get(&consumer)
            .is_some_and(|set| set.contains(&selector))
    }
}

impl Policy for ForbiddenMethodsPolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pre_execution(&mut self, _env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        let selector = call.selector();
        if self.is_forbidden(call.consumer, selector) {
            return Err(PolicyError::ForbiddenMethod { selector });
        }
        Ok(())
    }
}
