use alloy_primitives::{address, keccak256, Address, B256};

/// Sentinel address standing in for the chain's native asset in balance tracking.
pub const NATIVE_ASSET: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

pub const DEFAULT_ADMIN_ROLE: B256 = B256::ZERO;

/// Window during which an admin-call approval can be consumed.
pub const DEFAULT_ADMIN_CALL_EXPIRATION: u64 = 86_400;

/// Upper bound on checks in a single invariant program.
pub const MAX_INVARIANT_CHECKS: usize = 64;

/// Role allowed to sign (or directly submit) call approvals.
pub fn signer_role() -> B256 {
    keccak256("SIGNER_ROLE")
}

/// Role allowed to approve calls on the vectors-or-calls policy.
pub fn approver_role() -> B256 {
    keccak256("APPROVER_ROLE")
}
