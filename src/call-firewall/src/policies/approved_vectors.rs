use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, B256};
use tracing::{info, warn};

use super::{Policy, PolicyEnv};
use crate::{
    access::AccessControl, constants::DEFAULT_ADMIN_ROLE, context::CallContext,
    context::ExecutionContext, errors::PolicyError,
};

const NAME: &str = "ApprovedVectorsPolicy";

/// Approved execution vectors (hashes of ordered selector sequences) per consumer.
#[derive(Clone, Debug, Default)]
pub struct VectorSet {
    approved: HashMap<Address, HashSet<B256>>,
}

impl VectorSet {
    pub fn set(&mut self, consumer: Address, vector_hash: B256, status: bool) {
        let set = self.approved.entry(consumer).or_default();
        if status {
            set.insert(vector_hash);
        } else {
            set.remove(&vector_hash);
        }
    }

    pub fn is_approved(&self, consumer: Address, vector_hash: B256) -> bool {
        self.approved
            .get(&consumer)
            .is_some_and(|set| set.contains(&vector_hash))
    }

    /// Check the vector accumulated so far in this transaction. Single-selector vectors pass.
    pub fn check(
        &self,
        policy: &'static str,
        ctx: &ExecutionContext,
        consumer: Address,
    ) -> Result<(), PolicyError> {
        let vector = ctx.vector(consumer);
        if vector.len() <= 1 {
            return Ok(());
        }
        let hash = ctx.vector_hash(consumer);
        if self.is_approved(consumer, hash) {
            return Ok(());
        }
        warn!(policy, %consumer, vector_hash = %hash, len = vector.len(), "unapproved execution vector");
        Err(PolicyError::UnapprovedVector { policy })
    }
}

/// Rejects any transaction whose ordered sequence of guarded selectors on a consumer has not
/// been approved. The check runs when the outermost guarded call returns.
#[derive(Clone, Debug)]
pub struct ApprovedVectorsPolicy {
    access: AccessControl,
    vectors: VectorSet,
}

impl ApprovedVectorsPolicy {
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            vectors: VectorSet::default(),
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
}

impl Policy for ApprovedVectorsPolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pre_execution(&mut self, _env: PolicyEnv<'_>, _call: &CallContext) -> Result<(), PolicyError> {
        Ok(())
    }

    fn post_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        if !env.ctx.is_outermost(call.consumer) {
            return Ok(());
        }
        self.vectors.check(NAME, env.ctx, call.consumer)
    }
}
