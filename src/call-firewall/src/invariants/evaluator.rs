use alloy_primitives::{B256, U256};
use call_firewall_types::{CompOp, InvariantCheck};

use super::InvariantViolation;

/// Evaluate checks against the before/after storage snapshots. Stops at the first failure.
///
/// A slot index outside the snapshot fails the check it belongs to.
pub fn evaluate_program(
    checks: &[InvariantCheck],
    before: &[B256],
    after: &[B256],
) -> Result<(), InvariantViolation> {
    for check in checks {
        let fail = || InvariantViolation::new(check.tag());
        let word = |snapshot: &[B256], slot: u8| {
            snapshot
                .get(slot as usize)
                .map(|w| U256::from_be_slice(w.as_slice()))
                .ok_or_else(fail)
        };

        match check {
            InvariantCheck::After { slot, op, rhs, .. } => {
                if !compare(word(after, *slot)?, *op, *rhs) {
                    return Err(fail());
                }
            }
            InvariantCheck::Unchanged { slot, .. } => {
                if word(before, *slot)? != word(after, *slot)? {
                    return Err(fail());
                }
            }
            InvariantCheck::DeltaLte { slot, max, .. } => {
                let (b, a) = (word(before, *slot)?, word(after, *slot)?);
                let delta = if a >= b { a - b } else { b - a };
                if delta > *max {
                    return Err(fail());
                }
            }
            InvariantCheck::AfterSum { a, b, op, rhs, .. } => {
                let sum = word(after, *a)?
                    .checked_add(word(after, *b)?)
                    .ok_or_else(fail)?;
                if !compare(sum, *op, *rhs) {
                    return Err(fail());
                }
            }
        }
    }
    Ok(())
}

fn compare(lhs: U256, op: CompOp, rhs: U256) -> bool {
    match op {
        CompOp::Lt => lhs < rhs,
        CompOp::Lte => lhs <= rhs,
        CompOp::Gt => lhs > rhs,
        CompOp::Gte => lhs >= rhs,
        CompOp::Eq => lhs == rhs,
        CompOp::Neq => lhs != rhs,
    }
}
