//! [`StateDB`] over the journal handed to an `alloy-evm` precompile.

use alloy_evm::{EvmInternals, EvmInternalsError};
use alloy_primitives::{Address, Log, B256, U256};
use core::fmt;
use subnet_precompiles::{BlockContext, StateDB, StateError};

/// Borrowed view of the EVM journal as precompile state.
///
/// Storage, balances and logs go through the journal so they are reverted with
/// the surrounding call frame.
pub struct JournalState<'a, 'b> {
    internals: &'a mut EvmInternals<'b>,
}

impl<'a, 'b> JournalState<'a, 'b> {
    /// Wraps the internals of a precompile call.
    pub const fn new(internals: &'a mut EvmInternals<'b>) -> Self {
        Self { internals }
    }
}

impl fmt::Debug for JournalState<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JournalState").finish_non_exhaustive()
    }
}

/// Block number and timestamp from the EVM block environment.
///
/// Values beyond `u64` saturate.
pub fn block_context(internals: &EvmInternals<'_>) -> BlockContext {
    BlockContext::new(
        internals.block_number().saturating_to(),
        internals.block_timestamp().saturating_to(),
    )
}

fn backend(err: EvmInternalsError) -> StateError {
    StateError::Backend(err.to_string())
}

impl StateDB for JournalState<'_, '_> {
    fn get_state(&mut self, address: Address, key: B256) -> Result<B256, StateError> {
        // journal storage access expects a loaded account
        self.internals.load_account(address).map_err(backend)?;
        let value = self.internals.sload(address, U256::from_be_bytes(key.0)).map_err(backend)?;
        Ok(B256::from(value.data))
    }

    fn set_state(&mut self, address: Address, key: B256, value: B256) -> Result<(), StateError> {
        self.internals.load_account(address).map_err(backend)?;
        self.internals
            .sstore(address, U256::from_be_bytes(key.0), U256::from_be_bytes(value.0))
            .map_err(backend)?;
        Ok(())
    }

    fn get_balance(&mut self, address: Address) -> Result<U256, StateError> {
        let account = self.internals.load_account(address).map_err(backend)?;
        Ok(account.info.balance)
    }

    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        self.internals.touch_account(address);
        let mut account = self.internals.load_account(address).map_err(backend)?;
        let balance = account
            .info
            .balance
            .checked_add(amount)
            .ok_or(StateError::BalanceOverflow { address })?;
        account.info.set_balance(balance);
        Ok(())
    }

    fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        self.internals.touch_account(address);
        let mut account = self.internals.load_account(address).map_err(backend)?;
        let current = account.info.balance;
        let balance = current.checked_sub(amount).ok_or(StateError::InsufficientBalance {
            address,
            balance: current,
            amount,
        })?;
        account.info.set_balance(balance);
        Ok(())
    }

    fn create_account(&mut self, address: Address) -> Result<(), StateError> {
        let mut account = self.internals.load_account(address).map_err(backend)?;
        if account.is_loaded_as_not_existing() {
            account.mark_created();
            self.internals.touch_account(address);
        }
        Ok(())
    }

    fn exist(&mut self, address: Address) -> Result<bool, StateError> {
        let account = self.internals.load_account(address).map_err(backend)?;
        Ok(account.is_created() || !account.is_loaded_as_not_existing())
    }

    fn get_nonce(&mut self, address: Address) -> Result<u64, StateError> {
        let account = self.internals.load_account(address).map_err(backend)?;
        Ok(account.info.nonce)
    }

    fn add_log(&mut self, log: Log) -> Result<(), StateError> {
        self.internals.log(log);
        Ok(())
    }
}
