use std::collections::HashMap;

use alloy_primitives::{Address, B256};
use call_firewall_types::call_hash;
use tracing::{info, warn};

use super::{Policy, PolicyEnv};
use crate::{
    access::AccessControl,
    constants::{DEFAULT_ADMIN_CALL_EXPIRATION, DEFAULT_ADMIN_ROLE},
    context::CallContext,
    errors::PolicyError,
    host::Host,
};

const NAME: &str = "AdminCallPolicy";

/// Time-boxed one-shot approvals for privileged calls.
#[derive(Clone, Debug)]
pub struct AdminCallPolicy {
    access: AccessControl,
    /// Call id => approval timestamp.
    approvals: HashMap<B256, u64>,
    expiration_time: u64,
}

impl AdminCallPolicy {
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            approvals: HashMap::new(),
            expiration_time: DEFAULT_ADMIN_CALL_EXPIRATION,
        }
    }

    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    pub fn approve_call(&mut self, caller: Address, host: &dyn Host, call_hash: B256) -> Result<(), PolicyError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        let now = host.block_timestamp();
        self.approvals.insert(call_hash, now);
        info!(policy = NAME, %call_hash, approved_at = now, "admin call approved");
        Ok(())
    }

    pub fn set_expiration_time(&mut self, caller: Address, seconds: u64) -> Result<(), PolicyError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        self.expiration_time = seconds;
        info!(policy = NAME, seconds, "expiration time set");
        Ok(())
    }

    pub fn expiration_time(&self) -> u64 {
        self.expiration_time
    }

    pub fn approved_at(&self, call_hash: B256) -> Option<u64> {
        self.approvals.get(&call_hash).copied()
    }
}

impl Policy for AdminCallPolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pre_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        let id = call_hash(call.consumer, call.sender, call.origin, &call.data, call.value);
        let now = env.host.block_timestamp();
        match self.approved_at(id) {
            Some(at) if at.saturating_add(self.expiration_time) >= now => {
                self.approvals.remove(&id);
                Ok(())
            }
            approved_at => {
                warn!(policy = NAME, consumer = %call.consumer, call_id = %id, ?approved_at, now, "admin call not approved");
                Err(PolicyError::CallNotApproved)
            }
        }
    }
}
