//! Per-call balance-delta limits on the assets a consumer holds.
//!
//! `pre_execution` snapshots every tracked asset balance of the consumer and `post_execution`
//! compares against it. Snapshots are kept on a per-consumer stack so nested guarded calls
//! each see their own "before".

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use tracing::{debug, info, warn};

use super::{Policy, PolicyEnv};
use crate::{
    access::AccessControl,
    constants::{DEFAULT_ADMIN_ROLE, NATIVE_ASSET},
    context::CallContext,
    errors::PolicyError,
    host::Host,
};

const NAME: &str = "BalanceChangePolicy";

#[derive(Clone, Debug)]
pub struct BalanceChangePolicy {
    access: AccessControl,
    limits: HashMap<(Address, Address), U256>,
    tokens: HashMap<Address, Vec<Address>>,
    token_index: HashMap<(Address, Address), usize>,
    snapshots: HashMap<Address, Vec<Vec<(Address, U256)>>>,
}

impl BalanceChangePolicy {
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            limits: HashMap::new(),
            tokens: HashMap::new(),
            token_index: HashMap::new(),
            snapshots: HashMap::new(),
        }
    }

    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    /// Track `asset` for `consumer` (if new) and set its limit. A zero limit forbids any change.
    pub fn set_consumer_max_balance_change(
        &mut self,
        caller: Address,
        consumer: Address,
        asset: Address,
        limit: U256,
    ) -> Result<(), PolicyError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        if !self.token_index.contains_key(&(consumer, asset)) {
            let list = self.tokens.entry(consumer).or_default();
            self.token_index.insert((consumer, asset), list.len());
            list.push(asset);
        }
        self.limits.insert((consumer, asset), limit);
        info!(policy = NAME, %consumer, %asset, %limit, "max balance change set");
        Ok(())
    }

    /// Stop tracking `asset`. Order of the remaining assets is not preserved.
    pub fn remove_token(
        &mut self,
        caller: Address,
        consumer: Address,
        asset: Address,
    ) -> Result<(), PolicyError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        let index = self
            .token_index
            .remove(&(consumer, asset))
            .ok_or(PolicyError::UntrackedAsset { asset })?;
        let list = self.tokens.entry(consumer).or_default();
        list.swap_remove(index);
        if let Some(&moved) = list.get(index) {
            self.token_index.insert((consumer, moved), index);
        }
        self.limits.remove(&(consumer, asset));
        info!(policy = NAME, %consumer, %asset, "token removed");
        Ok(())
    }

    pub fn consumer_tokens(&self, consumer: Address) -> &[Address] {
        self.tokens.get(&consumer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Limit for a tracked asset; `None` means untracked.
    pub fn max_balance_change(&self, consumer: Address, asset: Address) -> Option<U256> {
        self.limits.get(&(consumer, asset)).copied()
    }

    fn balance_of(host: &dyn Host, consumer: Address, asset: Address) -> Result<U256, PolicyError> {
        if asset == NATIVE_ASSET {
            Ok(host.native_balance(consumer))
        } else {
            Ok(host.token_balance(asset, consumer)?)
        }
    }
}

impl Policy for BalanceChangePolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pre_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        let mut snapshot = Vec::with_capacity(self.consumer_tokens(call.consumer).len());
        for &asset in self.consumer_tokens(call.consumer) {
            let mut balance = Self::balance_of(env.host, call.consumer, asset)?;
            // Attached value is already credited when the hook runs.
            if asset == NATIVE_ASSET {
                balance = balance.saturating_sub(call.value);
            }
            snapshot.push((asset, balance));
        }
        debug!(policy = NAME, consumer = %call.consumer, assets = snapshot.len(), "balances snapshotted");
        self.snapshots.entry(call.consumer).or_default().push(snapshot);
        Ok(())
    }

    fn post_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        let snapshot = self
            .snapshots
            .get_mut(&call.consumer)
            .and_then(Vec::pop)
            .ok_or(PolicyError::MissingSnapshot { policy: NAME })?;
        for (asset, before) in snapshot {
            // Removed mid-call: no longer constrained.
            let Some(limit) = self.max_balance_change(call.consumer, asset) else {
                continue;
            };
            let after = Self::balance_of(env.host, call.consumer, asset)?;
            let delta = if after >= before { after - before } else { before - after };
            if delta > limit {
                warn!(policy = NAME, consumer = %call.consumer, %asset, %before, %after, %limit, "balance change exceeds limit");
                return Err(PolicyError::BalanceChangeExceedsLimit { asset });
            }
        }
        Ok(())
    }
}
