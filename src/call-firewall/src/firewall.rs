//! Central dispatcher: policy registry, per-consumer policy lists and the hook fan-out.
//!
//! Protected consumers call [`Firewall::pre_execution`] before and
//! [`Firewall::post_execution`] after every guarded function. Hooks run over the consumer's
//! global list, then the list for the called selector, then the private-invariants policy.

use std::collections::HashMap;

use alloy_primitives::{Address, Selector};
use tracing::{debug, info, warn};

use crate::{
    access::AccessControl,
    constants::DEFAULT_ADMIN_ROLE,
    context::{CallContext, ExecutionContext},
    errors::{AccessError, FirewallError},
    host::Host,
    policies::{Policy, PolicyEnv},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Hook {
    Pre,
    Post,
}

#[derive(Clone, Debug)]
pub struct Firewall {
    access: AccessControl,
    policies: HashMap<Address, Box<dyn Policy>>,
    approved_policies: HashMap<Address, bool>,
    subject_policies: HashMap<(Address, Selector), Vec<Address>>,
    global_policies: HashMap<Address, Vec<Address>>,
    private_invariants_policy: HashMap<(Address, Selector), Address>,
    firewall_admins: HashMap<Address, Address>,
    pending_firewall_admins: HashMap<Address, Address>,
}

impl Firewall {
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            policies: HashMap::new(),
            approved_policies: HashMap::new(),
            subject_policies: HashMap::new(),
            global_policies: HashMap::new(),
            private_invariants_policy: HashMap::new(),
            firewall_admins: HashMap::new(),
            pending_firewall_admins: HashMap::new(),
        }
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    /// Install a policy instance at `address`. New policies start disabled.
    pub fn deploy_policy(&mut self, address: Address, policy: Box<dyn Policy>) -> Result<(), FirewallError> {
        if self.policies.contains_key(&address) {
            return Err(FirewallError::PolicyAddressInUse { policy: address });
        }
        info!(policy = %address, name = policy.name(), "policy deployed");
        self.policies.insert(address, policy);
        Ok(())
    }

    pub fn set_policy_status(&mut self, caller: Address, policy: Address, enabled: bool) -> Result<(), FirewallError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        self.approved_policies.insert(policy, enabled);
        info!(%policy, enabled, "policy status set");
        Ok(())
    }

    pub fn policy_status(&self, policy: Address) -> bool {
        self.approved_policies.get(&policy).copied().unwrap_or(false)
    }

    pub fn policy<T: Policy + 'static>(&self, address: Address) -> Option<&T> {
        self.policies.get(&address)?.downcast_ref::<T>()
    }

    /// Typed handle for administering a deployed policy.
    pub fn policy_mut<T: Policy + 'static>(&mut self, address: Address) -> Option<&mut T> {
        self.policies.get_mut(&address)?.downcast_mut::<T>()
    }

    /// Called by `consumer` itself to record its initial firewall admin.
    pub fn register_consumer(
        &mut self,
        caller: Address,
        consumer: Address,
        firewall_admin: Address,
    ) -> Result<(), FirewallError> {
        if caller != consumer {
            return Err(AccessError::SenderNotAllowed.into());
        }
        if firewall_admin.is_zero() {
            return Err(FirewallError::ZeroAddress);
        }
        if self.firewall_admins.contains_key(&consumer) {
            return Err(FirewallError::AdminAlreadySet { consumer });
        }
        self.firewall_admins.insert(consumer, firewall_admin);
        info!(%consumer, %firewall_admin, "consumer registered");
        Ok(())
    }

    pub fn firewall_admin(&self, consumer: Address) -> Option<Address> {
        self.firewall_admins.get(&consumer).copied()
    }

    pub fn propose_firewall_admin(
        &mut self,
        caller: Address,
        consumer: Address,
        new_admin: Address,
    ) -> Result<(), FirewallError> {
        self.only_firewall_admin(caller, consumer)?;
        if new_admin.is_zero() {
            return Err(FirewallError::ZeroAddress);
        }
        self.pending_firewall_admins.insert(consumer, new_admin);
        info!(%consumer, %new_admin, "firewall admin proposed");
        Ok(())
    }

    pub fn accept_firewall_admin(&mut self, caller: Address, consumer: Address) -> Result<(), FirewallError> {
        if self.pending_firewall_admins.get(&consumer) != Some(&caller) {
            return Err(AccessError::SenderNotAllowed.into());
        }
        self.pending_firewall_admins.remove(&consumer);
        self.firewall_admins.insert(consumer, caller);
        info!(%consumer, new_admin = %caller, "firewall admin accepted");
        Ok(())
    }

    fn only_firewall_admin(&self, caller: Address, consumer: Address) -> Result<(), AccessError> {
        if self.firewall_admin(consumer) == Some(caller) {
            Ok(())
        } else {
            Err(AccessError::NotFirewallAdmin { consumer, caller })
        }
    }

    pub fn add_policy(
        &mut self,
        caller: Address,
        consumer: Address,
        selector: Selector,
        policy: Address,
    ) -> Result<(), FirewallError> {
        self.only_firewall_admin(caller, consumer)?;
        self.ensure_enabled(policy)?;
        let list = self.subject_policies.entry((consumer, selector)).or_default();
        push_unique(list, policy)?;
        info!(%consumer, %selector, %policy, "policy added");
        Ok(())
    }

    pub fn remove_policy(
        &mut self,
        caller: Address,
        consumer: Address,
        selector: Selector,
        policy: Address,
    ) -> Result<(), FirewallError> {
        self.only_firewall_admin(caller, consumer)?;
        let list = self.subject_policies.entry((consumer, selector)).or_default();
        remove_ordered(list, policy)?;
        info!(%consumer, %selector, %policy, "policy removed");
        Ok(())
    }

    pub fn add_global_policy(&mut self, caller: Address, consumer: Address, policy: Address) -> Result<(), FirewallError> {
        self.only_firewall_admin(caller, consumer)?;
        self.ensure_enabled(policy)?;
        push_unique(self.global_policies.entry(consumer).or_default(), policy)?;
        info!(%consumer, %policy, "global policy added");
        Ok(())
    }

    pub fn remove_global_policy(&mut self, caller: Address, consumer: Address, policy: Address) -> Result<(), FirewallError> {
        self.only_firewall_admin(caller, consumer)?;
        remove_ordered(self.global_policies.entry(consumer).or_default(), policy)?;
        info!(%consumer, %policy, "global policy removed");
        Ok(())
    }

    /// Bind one private-invariants policy per (consumer, selector). Zero address unbinds.
    pub fn set_private_invariants_policy(
        &mut self,
        caller: Address,
        consumer: Address,
        selectors: &[Selector],
        policies: &[Address],
    ) -> Result<(), FirewallError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        if selectors.len() != policies.len() {
            return Err(FirewallError::LengthMismatch);
        }
        for (&selector, &policy) in selectors.iter().zip(policies) {
            if policy.is_zero() {
                self.private_invariants_policy.remove(&(consumer, selector));
            } else {
                self.private_invariants_policy.insert((consumer, selector), policy);
            }
            info!(%consumer, %selector, %policy, "private invariants policy set");
        }
        Ok(())
    }

    pub fn policies(&self, consumer: Address, selector: Selector) -> &[Address] {
        self.subject_policies
            .get(&(consumer, selector))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn global_policies(&self, consumer: Address) -> &[Address] {
        self.global_policies
            .get(&consumer)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn private_invariants_policy(&self, consumer: Address, selector: Selector) -> Option<Address> {
        self.private_invariants_policy.get(&(consumer, selector)).copied()
    }

    fn ensure_enabled(&self, policy: Address) -> Result<(), FirewallError> {
        if self.policy_status(policy) {
            Ok(())
        } else {
            Err(FirewallError::PolicyNotApproved { policy })
        }
    }

    pub fn pre_execution(
        &mut self,
        ctx: &mut ExecutionContext,
        host: &dyn Host,
        call: &CallContext,
    ) -> Result<(), FirewallError> {
        ctx.enter(call.consumer, call.selector());
        debug!(consumer = %call.consumer, selector = %call.selector(), depth = ctx.depth(call.consumer), "pre execution");
        self.run_hooks(Hook::Pre, ctx, host, call)
    }

    pub fn post_execution(
        &mut self,
        ctx: &mut ExecutionContext,
        host: &dyn Host,
        call: &CallContext,
    ) -> Result<(), FirewallError> {
        self.run_hooks(Hook::Post, ctx, host, call)?;
        ctx.exit(call.consumer);
        debug!(consumer = %call.consumer, selector = %call.selector(), "post execution");
        Ok(())
    }

    fn run_hooks(
        &mut self,
        hook: Hook,
        ctx: &ExecutionContext,
        host: &dyn Host,
        call: &CallContext,
    ) -> Result<(), FirewallError> {
        let selector = call.selector();
        let mut chain: Vec<Address> = self.global_policies(call.consumer).to_vec();
        chain.extend_from_slice(self.policies(call.consumer, selector));
        chain.extend(self.private_invariants_policy(call.consumer, selector));

        let env = PolicyEnv::new(host, ctx);
        for address in chain {
            if !self.policy_status(address) {
                warn!(consumer = %call.consumer, %selector, policy = %address, "listed policy is not approved");
                return Err(FirewallError::PolicyNotApproved { policy: address });
            }
            let policy = self
                .policies
                .get_mut(&address)
                .ok_or(FirewallError::UnknownPolicy { policy: address })?;
            let outcome = match hook {
                Hook::Pre => policy.pre_execution(env, call),
                Hook::Post => policy.post_execution(env, call),
            };
            if let Err(err) = outcome {
                warn!(consumer = %call.consumer, %selector, policy = policy.name(), ?hook, error = %err, "call rejected");
                return Err(err.into());
            }
        }
        Ok(())
    }
}

fn push_unique(list: &mut Vec<Address>, policy: Address) -> Result<(), FirewallError> {
    if list.contains(&policy) {
        return Err(FirewallError::PolicyAlreadyExists { policy });
    }
    list.push(policy);
    Ok(())
}

fn remove_ordered(list: &mut Vec<Address>, policy: Address) -> Result<(), FirewallError> {
    let index = list
        .iter()
        .position(|p| *p == policy)
        .ok_or(FirewallError::PolicyNotFound { policy })?;
    list.remove(index);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::MockHost,
        policies::{testing::*, AllowlistPolicy, ForbiddenMethodsPolicy, OnlyEoaPolicy},
    };
    use alloy_primitives::address;

    const P1: Address = address!("0000000000000000000000000000000000000a01");
    const P2: Address = address!("0000000000000000000000000000000000000a02");
    const P3: Address = address!("0000000000000000000000000000000000000a03");
    const SEL: Selector = Selector::new([1, 2, 3, 4]);

    fn firewall() -> Firewall {
        let mut fw = Firewall::new(ADMIN);
        fw.register_consumer(CONSUMER, CONSUMER, ADMIN).unwrap();
        fw.deploy_policy(P1, Box::new(OnlyEoaPolicy)).unwrap();
        fw.deploy_policy(P2, Box::new(AllowlistPolicy::new(ADMIN))).unwrap();
        fw.deploy_policy(P3, Box::new(ForbiddenMethodsPolicy::new(ADMIN))).unwrap();
        for p in [P1, P2, P3] {
            fw.set_policy_status(ADMIN, p, true).unwrap();
        }
        fw
    }

    #[test]
    fn add_requires_enabled_and_unique() {
        let mut fw = firewall();
        fw.add_policy(ADMIN, CONSUMER, SEL, P1).unwrap();
        assert_eq!(
            fw.add_policy(ADMIN, CONSUMER, SEL, P1),
            Err(FirewallError::PolicyAlreadyExists { policy: P1 })
        );
        fw.set_policy_status(ADMIN, P2, false).unwrap();
        assert_eq!(
            fw.add_policy(ADMIN, CONSUMER, SEL, P2),
            Err(FirewallError::PolicyNotApproved { policy: P2 })
        );
    }

    #[test]
    fn removal_preserves_order() {
        let mut fw = firewall();
        for p in [P1, P2, P3] {
            fw.add_global_policy(ADMIN, CONSUMER, p).unwrap();
        }
        fw.remove_global_policy(ADMIN, CONSUMER, P1).unwrap();
        assert_eq!(fw.global_policies(CONSUMER), &[P2, P3]);
        assert_eq!(
            fw.remove_global_policy(ADMIN, CONSUMER, P1),
            Err(FirewallError::PolicyNotFound { policy: P1 })
        );
    }

    #[test]
    fn only_consumer_admin_edits_lists() {
        let mut fw = firewall();
        assert!(matches!(
            fw.add_policy(USER, CONSUMER, SEL, P1),
            Err(FirewallError::Access(AccessError::NotFirewallAdmin { .. }))
        ));
    }

    #[test]
    fn firewall_admin_two_step_transfer() {
        let mut fw = firewall();
        fw.propose_firewall_admin(ADMIN, CONSUMER, USER).unwrap();
        assert_eq!(
            fw.accept_firewall_admin(OTHER, CONSUMER).unwrap_err().to_string(),
            "FirewallConsumer: sender is not allowed"
        );
        fw.accept_firewall_admin(USER, CONSUMER).unwrap();
        assert_eq!(fw.firewall_admin(CONSUMER), Some(USER));
        assert!(fw.add_global_policy(ADMIN, CONSUMER, P1).is_err());
    }

    #[test]
    fn registration_guards() {
        let mut fw = Firewall::new(ADMIN);
        assert_eq!(
            fw.register_consumer(CONSUMER, CONSUMER, Address::ZERO),
            Err(FirewallError::ZeroAddress)
        );
        fw.register_consumer(CONSUMER, CONSUMER, ADMIN).unwrap();
        assert_eq!(
            fw.register_consumer(CONSUMER, CONSUMER, USER).unwrap_err().to_string(),
            "FirewallConsumer: admin already set"
        );
    }

    #[test]
    fn only_the_consumer_can_register_itself() {
        let mut fw = Firewall::new(ADMIN);
        assert_eq!(
            fw.register_consumer(OTHER, CONSUMER, OTHER),
            Err(FirewallError::Access(AccessError::SenderNotAllowed))
        );
        assert_eq!(fw.firewall_admin(CONSUMER), None);
        fw.register_consumer(CONSUMER, CONSUMER, ADMIN).unwrap();
        assert_eq!(fw.firewall_admin(CONSUMER), Some(ADMIN));
    }

    #[test]
    fn disabled_listed_policy_fails_closed() {
        let host = MockHost::new();
        let mut fw = firewall();
        fw.add_global_policy(ADMIN, CONSUMER, P1).unwrap();
        fw.set_policy_status(ADMIN, P1, false).unwrap();

        let c = call(USER, SEL.as_slice(), 0);
        let mut ctx = ExecutionContext::new(USER);
        let err = fw.pre_execution(&mut ctx, &host, &c).unwrap_err();
        assert_eq!(err.to_string(), "Firewall: policy not approved");
    }

    #[test]
    fn global_runs_before_selector_list() {
        let host = MockHost::new();
        let mut fw = firewall();
        fw.add_global_policy(ADMIN, CONSUMER, P2).unwrap();
        fw.add_policy(ADMIN, CONSUMER, SEL, P3).unwrap();
        fw.policy_mut::<ForbiddenMethodsPolicy>(P3)
            .unwrap()
            .set_consumer_forbidden_method(ADMIN, CONSUMER, SEL, true)
            .unwrap();

        let c = call(USER, SEL.as_slice(), 0);
        let err = fw.pre_execution(&mut ExecutionContext::new(USER), &host, &c).unwrap_err();
        assert_eq!(err.to_string(), "AllowlistPolicy: Sender not allowed");

        fw.policy_mut::<AllowlistPolicy>(P2)
            .unwrap()
            .set_consumer_allowlist(ADMIN, CONSUMER, USER, true)
            .unwrap();
        let err = fw.pre_execution(&mut ExecutionContext::new(USER), &host, &c).unwrap_err();
        assert_eq!(err.to_string(), "ForbiddenMethodsPolicy: method forbidden");
    }

    #[test]
    fn private_invariants_binding_requires_admin_and_matching_lengths() {
        let mut fw = firewall();
        assert!(fw.set_private_invariants_policy(USER, CONSUMER, &[SEL], &[P1]).is_err());
        assert_eq!(
            fw.set_private_invariants_policy(ADMIN, CONSUMER, &[SEL], &[]),
            Err(FirewallError::LengthMismatch)
        );
        fw.set_private_invariants_policy(ADMIN, CONSUMER, &[SEL], &[P1]).unwrap();
        assert_eq!(fw.private_invariants_policy(CONSUMER, SEL), Some(P1));
    }

    #[test]
    fn deploy_rejects_address_collision() {
        let mut fw = firewall();
        assert_eq!(
            fw.deploy_policy(P1, Box::new(OnlyEoaPolicy)),
            Err(FirewallError::PolicyAddressInUse { policy: P1 })
        );
    }
}
