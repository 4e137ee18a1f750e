use std::collections::HashMap;

use alloy_primitives::{Address, Selector, B256};
use call_firewall_types::InvariantCheck;
use tracing::{debug, warn};

use super::{decode_program, evaluate_program, InvariantLogic, InvariantViolation};
use crate::errors::DecodeError;

/// Invariant logic driven by decoded check programs, one per (consumer, selector).
///
/// A pair without a program asserts nothing.
#[derive(Clone, Debug, Default)]
pub struct ProgramInvariantLogic {
    programs: HashMap<(Address, Selector), Vec<InvariantCheck>>,
}

impl ProgramInvariantLogic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and install `program` for `(consumer, selector)`, replacing any previous one.
    pub fn set_program(
        &mut self,
        consumer: Address,
        selector: Selector,
        program: &[u8],
    ) -> Result<(), DecodeError> {
        let checks = decode_program(program)?;
        debug!(%consumer, %selector, checks = checks.len(), "invariant program installed");
        self.programs.insert((consumer, selector), checks);
        Ok(())
    }

    pub fn with_program(
        mut self,
        consumer: Address,
        selector: Selector,
        program: &[u8],
    ) -> Result<Self, DecodeError> {
        self.set_program(consumer, selector, program)?;
        Ok(self)
    }

    pub fn program(&self, consumer: Address, selector: Selector) -> Option<&[InvariantCheck]> {
        self.programs.get(&(consumer, selector)).map(Vec::as_slice)
    }
}

impl InvariantLogic for ProgramInvariantLogic {
    fn assert_invariants(
        &self,
        consumer: Address,
        selector: Selector,
        before: &[B256],
        after: &[B256],
    ) -> Result<(), InvariantViolation> {
        let Some(checks) = self.program(consumer, selector) else {
            return Ok(());
        };
        evaluate_program(checks, before, after).inspect_err(|violation| {
            warn!(%consumer, %selector, tag = %violation.tag, "invariant violated");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, U256};
    use call_firewall_types::Opcode;

    const CONSUMER: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

    #[test]
    fn runs_program_for_matching_selector_only() {
        let selector = Selector::new([1, 2, 3, 4]);
        let program = [Opcode::CheckUnchanged as u8, 0, 4, b'F', b'R', b'O', b'Z'];
        let logic = ProgramInvariantLogic::new()
            .with_program(CONSUMER, selector, &program)
            .unwrap();

        let one = B256::from(U256::from(1).to_be_bytes::<32>());
        assert_eq!(
            logic.assert_invariants(CONSUMER, selector, &[B256::ZERO], &[one]),
            Err(InvariantViolation::new("FROZ"))
        );
        logic
            .assert_invariants(CONSUMER, Selector::ZERO, &[B256::ZERO], &[one])
            .unwrap();
    }

    #[test]
    fn bad_program_is_not_installed() {
        let mut logic = ProgramInvariantLogic::new();
        assert_eq!(
            logic.set_program(CONSUMER, Selector::ZERO, &[0x01, 0]),
            Err(DecodeError::Truncated)
        );
        assert!(logic.program(CONSUMER, Selector::ZERO).is_none());
    }
}
