use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use tracing::trace;

use super::{Host, HostMut};
use crate::{errors::HostError, interfaces::IERC20};

const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
const BLOCK_TIME: u64 = 12;

/// In-memory chain state: native balances, ERC-20 ledgers, raw storage words and block data.
///
/// Cloneable so a transaction can snapshot and restore it on revert.
#[derive(Clone, Debug)]
pub struct MockHost {
    block_number: u64,
    block_timestamp: u64,
    native: HashMap<Address, U256>,
    tokens: HashSet<Address>,
    token_balances: HashMap<(Address, Address), U256>,
    storage: HashMap<(Address, B256), B256>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            block_number: 1,
            block_timestamp: GENESIS_TIMESTAMP,
            native: HashMap::new(),
            tokens: HashSet::new(),
            token_balances: HashMap::new(),
            storage: HashMap::new(),
        }
    }

    pub fn set_block(&mut self, number: u64, timestamp: u64) {
        self.block_number = number;
        self.block_timestamp = timestamp;
    }

    /// Advance one block.
    pub fn mine(&mut self) {
        self.block_number += 1;
        self.block_timestamp += BLOCK_TIME;
    }

    pub fn advance_time(&mut self, seconds: u64) {
        self.block_timestamp += seconds;
    }

    pub fn set_native_balance(&mut self, account: Address, amount: U256) {
        self.native.insert(account, amount);
    }

    /// Register an ERC-20 ledger at `token`. Unregistered addresses fail static calls.
    pub fn deploy_token(&mut self, token: Address) {
        self.tokens.insert(token);
    }

    pub fn mint_token(&mut self, token: Address, to: Address, amount: U256) {
        self.tokens.insert(token);
        *self.token_balances.entry((token, to)).or_default() += amount;
    }

    pub fn transfer_token(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        if !self.tokens.contains(&token) {
            return Err(HostError::CallFailed { target: token });
        }
        let balance = self.token_balances.get(&(token, from)).copied().unwrap_or_default();
        let remaining = balance
            .checked_sub(amount)
            .ok_or(HostError::InsufficientBalance { account: from })?;
        self.token_balances.insert((token, from), remaining);
        *self.token_balances.entry((token, to)).or_default() += amount;
        trace!(%token, %from, %to, %amount, "token transfer");
        Ok(())
    }

    pub fn set_storage(&mut self, account: Address, slot: B256, value: B256) {
        self.storage.insert((account, slot), value);
    }
}

impl Host for MockHost {
    fn block_number(&self) -> u64 {
        self.block_number
    }

    fn block_timestamp(&self) -> u64 {
        self.block_timestamp
    }

    fn native_balance(&self, account: Address) -> U256 {
        self.native.get(&account).copied().unwrap_or_default()
    }

    fn static_call(&self, target: Address, calldata: &[u8]) -> Result<Vec<u8>, HostError> {
        if !self.tokens.contains(&target) {
            return Err(HostError::CallFailed { target });
        }
        // balanceOf(address): selector || 12 zero bytes || address
        if calldata.len() < 36 || calldata[0..4] != IERC20::balanceOfCall::SELECTOR {
            return Err(HostError::CallFailed { target });
        }
        let account = Address::from_slice(&calldata[16..36]);
        let balance = self
            .token_balances
            .get(&(target, account))
            .copied()
            .unwrap_or_default();
        Ok(balance.to_be_bytes::<32>().to_vec())
    }

    fn storage_at(&self, account: Address, slot: B256) -> B256 {
        self.storage.get(&(account, slot)).copied().unwrap_or_default()
    }
}

impl HostMut for MockHost {
    fn transfer_native(&mut self, from: Address, to: Address, amount: U256) -> Result<(), HostError> {
        let balance = self.native_balance(from);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(HostError::InsufficientBalance { account: from })?;
        self.native.insert(from, remaining);
        *self.native.entry(to).or_default() += amount;
        trace!(%from, %to, %amount, "native transfer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const TOKEN: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
    const ALICE: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
    const BOB: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

    #[test]
    fn token_balance_goes_through_static_call() {
        let mut host = MockHost::new();
        host.mint_token(TOKEN, ALICE, U256::from(100));
        host.transfer_token(TOKEN, ALICE, BOB, U256::from(40)).unwrap();

        assert_eq!(host.token_balance(TOKEN, ALICE).unwrap(), U256::from(60));
        assert_eq!(host.token_balance(TOKEN, BOB).unwrap(), U256::from(40));
    }

    #[test]
    fn static_call_to_unknown_target_fails() {
        let host = MockHost::new();
        assert_eq!(
            host.token_balance(TOKEN, ALICE),
            Err(HostError::CallFailed { target: TOKEN })
        );
    }

    #[test]
    fn overdrawn_native_transfer_is_rejected() {
        let mut host = MockHost::new();
        host.set_native_balance(ALICE, U256::from(5));
        assert_eq!(
            host.transfer_native(ALICE, BOB, U256::from(6)),
            Err(HostError::InsufficientBalance { account: ALICE })
        );
        host.transfer_native(ALICE, BOB, U256::from(5)).unwrap();
        assert_eq!(host.native_balance(BOB), U256::from(5));
    }

    #[test]
    fn mine_advances_number_and_time() {
        let mut host = MockHost::new();
        let (n, t) = (host.block_number(), host.block_timestamp());
        host.mine();
        assert_eq!(host.block_number(), n + 1);
        assert_eq!(host.block_timestamp(), t + BLOCK_TIME);
    }
}
