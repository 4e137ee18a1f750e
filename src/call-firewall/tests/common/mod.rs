#![allow(dead_code)]

use alloy_primitives::{address, keccak256, Address, B256, U256};
use alloy_sol_types::{sol, SolCall};
use call_firewall::{
    host::{Host, HostMut},
    policies::Policy,
    Call, Firewall, FirewallError, MockHost, Transaction,
};

sol! {
    interface ISampleConsumer {
        function deposit() external payable;
        function withdraw(uint256 amount) external;
        function setValue(uint256 value) external;
        function setMultiple(uint256 a, uint256 b) external;
        function ping() external;
    }
}

pub const ADMIN: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const USER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
pub const ATTACKER: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
pub const VAULT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10).pow(U256::from(18))
}

/// `n` millionths of an ether.
pub fn micro_ether(n: u64) -> U256 {
    U256::from(n) * U256::from(1_000_000_000_000u64)
}

pub fn word(n: u64) -> B256 {
    B256::from(U256::from(n).to_be_bytes::<32>())
}

/// Firewall with `VAULT` registered (firewall admin `ADMIN`) and a host where `USER` and
/// `ATTACKER` hold 100 ether each.
pub fn setup() -> (Firewall, MockHost) {
    let mut firewall = Firewall::new(ADMIN);
    firewall.register_consumer(VAULT, VAULT, ADMIN).unwrap();
    let mut host = MockHost::new();
    host.set_native_balance(USER, ether(100));
    host.set_native_balance(ATTACKER, ether(100));
    (firewall, host)
}

/// Deploy and enable a policy.
pub fn install(firewall: &mut Firewall, at: Address, policy: Box<dyn Policy>) {
    firewall.deploy_policy(at, policy).unwrap();
    firewall.set_policy_status(ADMIN, at, true).unwrap();
}

pub fn deposit_data() -> Vec<u8> {
    ISampleConsumer::depositCall {}.abi_encode()
}

pub fn withdraw_data(amount: U256) -> Vec<u8> {
    ISampleConsumer::withdrawCall { amount }.abi_encode()
}

pub fn set_value_data(value: U256) -> Vec<u8> {
    ISampleConsumer::setValueCall { value }.abi_encode()
}

pub fn set_multiple_data(a: U256, b: U256) -> Vec<u8> {
    ISampleConsumer::setMultipleCall { a, b }.abi_encode()
}

pub fn ping_data() -> Vec<u8> {
    ISampleConsumer::pingCall {}.abi_encode()
}

fn deposit_slot(account: Address) -> B256 {
    keccak256(account.into_word())
}

/// Guarded vault functions, the way a protected contract would wire its modifier.
pub struct SampleConsumer;

impl SampleConsumer {
    pub fn deposit(tx: &mut Transaction<'_, MockHost>, sender: Address, value: U256) -> Result<(), FirewallError> {
        tx.guarded_call(Call::new(VAULT, sender, deposit_data()).with_value(value), |tx| {
            let slot = deposit_slot(sender);
            let current = U256::from_be_bytes(tx.host().storage_at(VAULT, slot).0);
            tx.host_mut().set_storage(VAULT, slot, B256::from((current + value).to_be_bytes::<32>()));
            Ok(())
        })
    }

    pub fn withdraw(tx: &mut Transaction<'_, MockHost>, sender: Address, amount: U256) -> Result<(), FirewallError> {
        tx.guarded_call(Call::new(VAULT, sender, withdraw_data(amount)), |tx| {
            let slot = deposit_slot(sender);
            let current = U256::from_be_bytes(tx.host().storage_at(VAULT, slot).0);
            let remaining = current
                .checked_sub(amount)
                .ok_or_else(|| FirewallError::Reverted("SampleConsumer: insufficient deposit".into()))?;
            tx.host_mut().set_storage(VAULT, slot, B256::from(remaining.to_be_bytes::<32>()));
            tx.host_mut().transfer_native(VAULT, sender, amount)?;
            Ok(())
        })
    }

    /// Writes storage slot 2.
    pub fn set_value(tx: &mut Transaction<'_, MockHost>, sender: Address, value: U256) -> Result<(), FirewallError> {
        tx.guarded_call(Call::new(VAULT, sender, set_value_data(value)), |tx| {
            tx.host_mut().set_storage(VAULT, word(2), B256::from(value.to_be_bytes::<32>()));
            Ok(())
        })
    }

    /// Writes storage slots 3 and 4.
    pub fn set_multiple(tx: &mut Transaction<'_, MockHost>, sender: Address, a: U256, b: U256) -> Result<(), FirewallError> {
        tx.guarded_call(Call::new(VAULT, sender, set_multiple_data(a, b)), |tx| {
            tx.host_mut().set_storage(VAULT, word(3), B256::from(a.to_be_bytes::<32>()));
            tx.host_mut().set_storage(VAULT, word(4), B256::from(b.to_be_bytes::<32>()));
            Ok(())
        })
    }

    /// Guarded no-op that re-enters `deposit` with no value when `reenter` is set.
    pub fn ping(tx: &mut Transaction<'_, MockHost>, sender: Address, reenter: bool) -> Result<(), FirewallError> {
        tx.guarded_call(Call::new(VAULT, sender, ping_data()), |tx| {
            if reenter {
                Self::deposit(tx, VAULT, U256::ZERO)?;
            }
            Ok(())
        })
    }
}

pub fn deposited(host: &MockHost, account: Address) -> U256 {
    U256::from_be_bytes(host.storage_at(VAULT, deposit_slot(account)).0)
}

pub fn native(host: &MockHost, account: Address) -> U256 {
    host.native_balance(account)
}

pub fn exec<T>(
    firewall: &mut Firewall,
    host: &mut MockHost,
    origin: Address,
    f: impl FnOnce(&mut Transaction<'_, MockHost>) -> Result<T, FirewallError>,
) -> Result<T, FirewallError> {
    Transaction::execute(firewall, host, origin, f)
}
