//! Execution environment the policies read from.
//!
//! Policies never hold state about the outside world: balances, block data and storage words
//! are fetched through [`Host`] at hook time.

pub mod mock;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;

use crate::{errors::HostError, interfaces::IERC20};

pub use mock::MockHost;

pub trait Host {
    fn block_number(&self) -> u64;
    fn block_timestamp(&self) -> u64;
    fn native_balance(&self, account: Address) -> U256;
    /// Read-only call; returns raw return data.
    fn static_call(&self, target: Address, calldata: &[u8]) -> Result<Vec<u8>, HostError>;
    fn storage_at(&self, account: Address, slot: B256) -> B256;

    /// ERC-20 `balanceOf(account)` on `token`.
    fn token_balance(&self, token: Address, account: Address) -> Result<U256, HostError> {
        let calldata = IERC20::balanceOfCall { account }.abi_encode();
        let out = self.static_call(token, &calldata)?;
        if out.len() < 32 {
            return Err(HostError::MalformedReturn { target: token });
        }
        Ok(U256::from_be_slice(&out[0..32]))
    }
}

/// Hosts that can move native value, needed to attach `value` to a guarded call.
pub trait HostMut: Host {
    fn transfer_native(&mut self, from: Address, to: Address, amount: U256) -> Result<(), HostError>;
}
