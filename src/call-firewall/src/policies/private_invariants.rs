use std::collections::HashMap;

use alloy_primitives::{Address, Selector, B256};
use tracing::{debug, info};

use super::{Policy, PolicyEnv};
use crate::{
    access::AccessControl, constants::DEFAULT_ADMIN_ROLE, context::CallContext,
    errors::PolicyError, invariants::InvariantLogic,
};

const NAME: &str = "PrivateInvariantsPolicy";

/// Snapshots configured storage slots of the consumer around a call and asserts invariants
/// over the before/after values through a pluggable [`InvariantLogic`].
#[derive(Clone, Debug)]
pub struct PrivateInvariantsPolicy {
    access: AccessControl,
    logic: Option<Box<dyn InvariantLogic>>,
    slots: HashMap<(Address, Selector), Vec<B256>>,
    snapshots: HashMap<Address, Vec<Vec<(B256, B256)>>>,
}

impl PrivateInvariantsPolicy {
    pub fn new(admin: Address) -> Self {
        Self {
            access: AccessControl::new(admin),
            logic: None,
            slots: HashMap::new(),
            snapshots: HashMap::new(),
        }
    }

    pub fn access_mut(&mut self) -> &mut AccessControl {
        &mut self.access
    }

    pub fn set_invariant_logic(
        &mut self,
        caller: Address,
        logic: Box<dyn InvariantLogic>,
    ) -> Result<(), PolicyError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        self.logic = Some(logic);
        info!(policy = NAME, "invariant logic set");
        Ok(())
    }

    pub fn set_sighash_invariant_storage_slots(
        &mut self,
        caller: Address,
        consumer: Address,
        selector: Selector,
        slots: Vec<B256>,
    ) -> Result<(), PolicyError> {
        self.access.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        info!(policy = NAME, %consumer, %selector, slots = slots.len(), "invariant storage slots set");
        self.slots.insert((consumer, selector), slots);
        Ok(())
    }

    pub fn invariant_storage_slots(&self, consumer: Address, selector: Selector) -> &[B256] {
        self.slots
            .get(&(consumer, selector))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Policy for PrivateInvariantsPolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pre_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        let snapshot: Vec<(B256, B256)> = self
            .invariant_storage_slots(call.consumer, call.selector())
            .iter()
            .map(|&slot| (slot, env.host.storage_at(call.consumer, slot)))
            .collect();
        self.snapshots.entry(call.consumer).or_default().push(snapshot);
        Ok(())
    }

    fn post_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        let snapshot = self
            .snapshots
            .get_mut(&call.consumer)
            .and_then(Vec::pop)
            .ok_or(PolicyError::MissingSnapshot { policy: NAME })?;
        if snapshot.is_empty() {
            return Ok(());
        }
        let logic = self.logic.as_ref().ok_or(PolicyError::InvariantLogicNotSet)?;

        let (before, after): (Vec<B256>, Vec<B256>) = snapshot
            .iter()
            .map(|&(slot, before)| (before, env.host.storage_at(call.consumer, slot)))
            .unzip();
        logic
            .assert_invariants(call.consumer, call.selector(), &before, &after)
            .map_err(|violation| PolicyError::InvariantViolation(violation.tag))?;
        debug!(policy = NAME, consumer = %call.consumer, slots = before.len(), "invariants hold");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::MockHost,
        invariants::ProgramInvariantLogic,
        policies::testing::{call, entered, ADMIN, CONSUMER, USER},
    };
    use alloy_primitives::U256;

    fn slot(n: u64) -> B256 {
        B256::from(U256::from(n).to_be_bytes::<32>())
    }

    #[test]
    fn configured_slots_without_logic_fail_closed() {
        let host = MockHost::new();
        let mut policy = PrivateInvariantsPolicy::new(ADMIN);
        let c = call(USER, &[1, 2, 3, 4], 0);
        policy
            .set_sighash_invariant_storage_slots(ADMIN, CONSUMER, c.selector(), vec![slot(2)])
            .unwrap();

        let ctx = entered(&c);
        policy.pre_execution(PolicyEnv::new(&host, &ctx), &c).unwrap();
        assert_eq!(
            policy.post_execution(PolicyEnv::new(&host, &ctx), &c),
            Err(PolicyError::InvariantLogicNotSet)
        );
    }

    #[test]
    fn unconfigured_selector_passes_without_logic() {
        let host = MockHost::new();
        let mut policy = PrivateInvariantsPolicy::new(ADMIN);
        let c = call(USER, &[1, 2, 3, 4], 0);
        let ctx = entered(&c);
        policy.pre_execution(PolicyEnv::new(&host, &ctx), &c).unwrap();
        policy.post_execution(PolicyEnv::new(&host, &ctx), &c).unwrap();
    }

    #[test]
    fn violation_tag_is_the_reason() {
        let mut host = MockHost::new();
        let mut policy = PrivateInvariantsPolicy::new(ADMIN);
        let c = call(USER, &[1, 2, 3, 4], 0);
        policy
            .set_sighash_invariant_storage_slots(ADMIN, CONSUMER, c.selector(), vec![slot(7)])
            .unwrap();
        let program = [call_firewall_types::Opcode::CheckUnchanged as u8, 0, 3, b'I', b'N', b'V'];
        let logic = ProgramInvariantLogic::new()
            .with_program(CONSUMER, c.selector(), &program)
            .unwrap();
        policy.set_invariant_logic(ADMIN, Box::new(logic)).unwrap();

        let ctx = entered(&c);
        policy.pre_execution(PolicyEnv::new(&host, &ctx), &c).unwrap();
        host.set_storage(CONSUMER, slot(7), slot(1));
        let err = policy.post_execution(PolicyEnv::new(&host, &ctx), &c).unwrap_err();
        assert_eq!(err.to_string(), "INV");
    }
}
