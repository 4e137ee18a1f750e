use alloy_primitives::U256;
use call_firewall_types::{CompOp, InvariantCheck, Opcode};

use crate::{constants::MAX_INVARIANT_CHECKS, errors::DecodeError};

/// Decode program bytes into bounded checks.
pub fn decode_program(bytes: &[u8]) -> Result<Vec<InvariantCheck>, DecodeError> {
    decode_program_with_limit(bytes, MAX_INVARIANT_CHECKS)
}

pub fn decode_program_with_limit(
    bytes: &[u8],
    max_checks: usize,
) -> Result<Vec<InvariantCheck>, DecodeError> {
    let mut checks = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        if checks.len() >= max_checks {
            return Err(DecodeError::TooManyChecks);
        }
        let opcode = Opcode::try_from(bytes[i]).map_err(|_| DecodeError::UnknownOpcode(bytes[i]))?;
        i += 1;

        let check = match opcode {
            Opcode::CheckAfter => {
                let slot = read_u8(bytes, &mut i)?;
                let op = read_comp_op(bytes, &mut i)?;
                let rhs = read_u256(bytes, &mut i)?;
                let tag = read_tag(bytes, &mut i)?;
                InvariantCheck::After { slot, op, rhs, tag }
            }
            Opcode::CheckUnchanged => {
                let slot = read_u8(bytes, &mut i)?;
                let tag = read_tag(bytes, &mut i)?;
                InvariantCheck::Unchanged { slot, tag }
            }
            Opcode::CheckDeltaLte => {
                let slot = read_u8(bytes, &mut i)?;
                let max = read_u256(bytes, &mut i)?;
                let tag = read_tag(bytes, &mut i)?;
                InvariantCheck::DeltaLte { slot, max, tag }
            }
            Opcode::CheckAfterSum => {
                let a = read_u8(bytes, &mut i)?;
                let b = read_u8(bytes, &mut i)?;
                let op = read_comp_op(bytes, &mut i)?;
                let rhs = read_u256(bytes, &mut i)?;
                let tag = read_tag(bytes, &mut i)?;
                InvariantCheck::AfterSum { a, b, op, rhs, tag }
            }
        };

        checks.push(check);
    }

    Ok(checks)
}

fn read_u8(bytes: &[u8], i: &mut usize) -> Result<u8, DecodeError> {
    let b = *bytes.get(*i).ok_or(DecodeError::Truncated)?;
    *i += 1;
    Ok(b)
}

fn read_u256(bytes: &[u8], i: &mut usize) -> Result<U256, DecodeError> {
    if bytes.len() < *i + 32 {
        return Err(DecodeError::Truncated);
    }
    let word = &bytes[*i..*i + 32];
    *i += 32;
    Ok(U256::from_be_slice(word))
}

fn read_tag(bytes: &[u8], i: &mut usize) -> Result<String, DecodeError> {
    let len = read_u8(bytes, i)? as usize;
    if bytes.len() < *i + len {
        return Err(DecodeError::Truncated);
    }
    let tag = core::str::from_utf8(&bytes[*i..*i + len]).map_err(|_| DecodeError::InvalidTag)?;
    *i += len;
    Ok(tag.to_owned())
}

fn read_comp_op(bytes: &[u8], i: &mut usize) -> Result<CompOp, DecodeError> {
    let b = read_u8(bytes, i)?;
    let op = match b {
        0 => CompOp::Lt,
        1 => CompOp::Lte,
        2 => CompOp::Gt,
        3 => CompOp::Gte,
        4 => CompOp::Eq,
        5 => CompOp::Neq,
        _ => return Err(DecodeError::UnknownOpcode(b)),
    };
    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn after_gt_zero(tag: &str) -> Vec<u8> {
        let mut out = vec![Opcode::CheckAfter as u8, 0, 2];
        out.extend_from_slice(&[0u8; 32]);
        out.push(tag.len() as u8);
        out.extend_from_slice(tag.as_bytes());
        out
    }

    #[test]
    fn decodes_after_check() {
        let checks = decode_program(&after_gt_zero("INVARIANT1")).unwrap();
        assert_eq!(
            checks,
            vec![InvariantCheck::After {
                slot: 0,
                op: CompOp::Gt,
                rhs: U256::ZERO,
                tag: "INVARIANT1".into(),
            }]
        );
    }

    #[test]
    fn truncated_tag_is_an_error() {
        let mut program = after_gt_zero("INVARIANT1");
        program.pop();
        assert_eq!(decode_program(&program), Err(DecodeError::Truncated));
    }

    #[test]
    fn unknown_opcode_and_limit() {
        assert_eq!(decode_program(&[0x7f]), Err(DecodeError::UnknownOpcode(0x7f)));

        let one = [Opcode::CheckUnchanged as u8, 0, 1, b'x'];
        let program: Vec<u8> = one.iter().copied().cycle().take(one.len() * 3).collect();
        assert_eq!(decode_program_with_limit(&program, 3).unwrap().len(), 3);
        assert_eq!(
            decode_program_with_limit(&program, 2),
            Err(DecodeError::TooManyChecks)
        );
    }

    #[test]
    fn non_utf8_tag_is_rejected() {
        let program = [Opcode::CheckUnchanged as u8, 0, 1, 0xff];
        assert_eq!(decode_program(&program), Err(DecodeError::InvalidTag));
    }
}
