//! Post-condition logic over consumer storage slots.
//!
//! The private-invariants policy snapshots configured storage words before a call and hands
//! both snapshots to an [`InvariantLogic`] afterwards. [`ProgramInvariantLogic`] is the
//! data-driven implementation: per (consumer, selector) bytecode programs.

pub mod decoder;
pub mod evaluator;
pub mod program;

use std::fmt;

use alloy_primitives::{Address, Selector, B256};
use thiserror::Error;

pub use decoder::{decode_program, decode_program_with_limit};
pub use evaluator::evaluate_program;
pub use program::ProgramInvariantLogic;

/// A failed invariant. `tag` becomes the revert reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{tag}")]
pub struct InvariantViolation {
    pub tag: String,
}

impl InvariantViolation {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

pub trait InvariantLogic: InvariantLogicObject + fmt::Debug {
    /// `before` and `after` hold the configured slots of `(consumer, selector)` in order.
    fn assert_invariants(
        &self,
        consumer: Address,
        selector: Selector,
        before: &[B256],
        after: &[B256],
    ) -> Result<(), InvariantViolation>;
}

pub trait InvariantLogicObject {
    fn clone_box(&self) -> Box<dyn InvariantLogic>;
}

impl<T> InvariantLogicObject for T
where
    T: InvariantLogic + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn InvariantLogic> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn InvariantLogic> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
