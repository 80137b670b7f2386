//! In-memory state backend for tests.

use crate::state::{ActivationState, StateDB, StateError};
use alloy_primitives::{Address, Bytes, Log, B256, U256};
use std::collections::{BTreeMap, BTreeSet};

/// Account record held by [`MemoryState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryAccount {
    /// Balance.
    pub balance: U256,
    /// Nonce.
    pub nonce: u64,
    /// Code.
    pub code: Bytes,
    /// Non-zero storage slots.
    pub storage: BTreeMap<B256, B256>,
}

/// A [`StateDB`] and [`ActivationState`] backed by ordered maps.
///
/// Counts storage writes so tests can assert that a rejected call touched
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    accounts: BTreeMap<Address, MemoryAccount>,
    destructed: BTreeSet<Address>,
    logs: Vec<Log>,
    storage_writes: usize,
}

impl MemoryState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the account at `address`, if it exists.
    pub fn account(&self, address: Address) -> Option<&MemoryAccount> {
        self.accounts.get(&address)
    }

    /// Balance of `address`, zero if absent.
    pub fn balance(&self, address: Address) -> U256 {
        self.account(address).map(|account| account.balance).unwrap_or_default()
    }

    /// Reads a slot without going through the fallible trait.
    pub fn storage(&self, address: Address, key: B256) -> B256 {
        self.account(address)
            .and_then(|account| account.storage.get(&key).copied())
            .unwrap_or_default()
    }

    /// Logs emitted so far, in order.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Number of `set_state` calls observed.
    pub const fn storage_writes(&self) -> usize {
        self.storage_writes
    }

    fn account_mut(&mut self, address: Address) -> &mut MemoryAccount {
        self.accounts.entry(address).or_default()
    }
}

impl StateDB for MemoryState {
    fn get_state(&mut self, address: Address, key: B256) -> Result<B256, StateError> {
        Ok(self.storage(address, key))
    }

    fn set_state(&mut self, address: Address, key: B256, value: B256) -> Result<(), StateError> {
        self.storage_writes += 1;
        let storage = &mut self.account_mut(address).storage;
        if value.is_zero() {
            storage.remove(&key);
        } else {
            storage.insert(key, value);
        }
        Ok(())
    }

    fn get_balance(&mut self, address: Address) -> Result<U256, StateError> {
        Ok(self.balance(address))
    }

    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        let account = self.account_mut(address);
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(StateError::BalanceOverflow { address })?;
        Ok(())
    }

    fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        let account = self.account_mut(address);
        account.balance =
            account.balance.checked_sub(amount).ok_or(StateError::InsufficientBalance {
                address,
                balance: account.balance,
                amount,
            })?;
        Ok(())
    }

    fn create_account(&mut self, address: Address) -> Result<(), StateError> {
        self.account_mut(address);
        Ok(())
    }

    fn exist(&mut self, address: Address) -> Result<bool, StateError> {
        Ok(self.accounts.contains_key(&address))
    }

    fn get_nonce(&mut self, address: Address) -> Result<u64, StateError> {
        Ok(self.account(address).map(|account| account.nonce).unwrap_or_default())
    }

    fn add_log(&mut self, log: Log) -> Result<(), StateError> {
        self.logs.push(log);
        Ok(())
    }
}

impl ActivationState for MemoryState {
    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError> {
        self.account_mut(address).code = code;
        Ok(())
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), StateError> {
        self.account_mut(address).nonce = nonce;
        Ok(())
    }

    fn self_destruct(&mut self, address: Address) -> Result<(), StateError> {
        self.destructed.insert(address);
        Ok(())
    }

    fn finalise(&mut self) -> Result<(), StateError> {
        for address in std::mem::take(&mut self.destructed) {
            self.accounts.remove(&address);
        }
        Ok(())
    }
}
