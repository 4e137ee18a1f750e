use alloc::string::String;

use alloy_primitives::U256;

/// Comparison operators for numeric checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
}

/// Opcodes supported by the v1 invariant program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    CheckAfter = 0x01,
    CheckUnchanged = 0x02,
    CheckDeltaLte = 0x03,
    CheckAfterSum = 0x04,
}

/// Decoded representation of a single invariant check.
///
/// Slot operands index into the configured storage-slot list of the (consumer, selector) pair,
/// not into raw storage. `tag` is the revert reason reported when the check fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheck {
    After {
        slot: u8,
        op: CompOp,
        rhs: U256,
        tag: String,
    },
    Unchanged {
        slot: u8,
        tag: String,
    },
    DeltaLte {
        slot: u8,
        max: U256,
        tag: String,
    },
    AfterSum {
        a: u8,
        b: u8,
        op: CompOp,
        rhs: U256,
        tag: String,
    },
}

impl InvariantCheck {
    pub fn tag(&self) -> &str {
        match self {
            InvariantCheck::After { tag, .. }
            | InvariantCheck::Unchanged { tag, .. }
            | InvariantCheck::DeltaLte { tag, .. }
            | InvariantCheck::AfterSum { tag, .. } => tag,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Opcode::*;
        let op = match value {
            0x01 => CheckAfter,
            0x02 => CheckUnchanged,
            0x03 => CheckDeltaLte,
            0x04 => CheckAfterSum,
            _ => return Err(()),
        };
        Ok(op)
    }
}
