//! State, block and chain capabilities consumed by precompiles.
//!
//! The execution engine owns the state database; precompiles only see it through
//! [`StateDB`] during a call and through [`ActivationState`] while the block is
//! being prepared. Every operation is fallible so a backend can surface storage
//! errors instead of panicking.

use crate::fee_manager::FeeConfig;
use alloy_primitives::{Address, Bytes, Log, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a state backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Debiting more than the account holds.
    #[error("insufficient balance for {address}: have {balance}, need {amount}")]
    InsufficientBalance {
        /// Debited account.
        address: Address,
        /// Current balance.
        balance: U256,
        /// Requested amount.
        amount: U256,
    },
    /// Crediting would overflow the balance.
    #[error("balance overflow for {address}")]
    BalanceOverflow {
        /// Credited account.
        address: Address,
    },
    /// Backend-specific failure, e.g. a database read error.
    #[error("state backend error: {0}")]
    Backend(String),
}

/// Call-time access to account state.
pub trait StateDB {
    /// Reads a storage slot; unset slots read as zero.
    fn get_state(&mut self, address: Address, key: B256) -> Result<B256, StateError>;

    /// Writes a storage slot.
    fn set_state(&mut self, address: Address, key: B256, value: B256) -> Result<(), StateError>;

    /// Returns the balance of `address`.
    fn get_balance(&mut self, address: Address) -> Result<U256, StateError>;

    /// Credits `amount` to `address`.
    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError>;

    /// Debits `amount` from `address`.
    fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError>;

    /// Creates an empty account at `address`.
    fn create_account(&mut self, address: Address) -> Result<(), StateError>;

    /// Whether an account exists at `address`.
    fn exist(&mut self, address: Address) -> Result<bool, StateError>;

    /// Returns the nonce of `address`.
    fn get_nonce(&mut self, address: Address) -> Result<u64, StateError>;

    /// Appends a log to the current transaction.
    fn add_log(&mut self, log: Log) -> Result<(), StateError>;
}

/// Block-level access used when precompiles are activated or deactivated.
pub trait ActivationState: StateDB {
    /// Replaces the code of `address`.
    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), StateError>;

    /// Sets the nonce of `address`.
    fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), StateError>;

    /// Marks `address` for removal, including its storage.
    fn self_destruct(&mut self, address: Address) -> Result<(), StateError>;

    /// Applies pending removals.
    fn finalise(&mut self) -> Result<(), StateError>;
}

/// The block a call or activation runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockContext {
    /// Block number.
    pub number: u64,
    /// Block timestamp in seconds.
    pub timestamp: u64,
}

impl BlockContext {
    /// Creates a block context.
    pub const fn new(number: u64, timestamp: u64) -> Self {
        Self { number, timestamp }
    }
}

/// Chain-level parameters read by precompile configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Fee parameters in effect when no fee manager overrides them.
    #[serde(default)]
    pub fee_config: FeeConfig,
    /// Whether block producers may choose their own fee recipient.
    #[serde(default)]
    pub allow_fee_recipients: bool,
}

impl ChainConfig {
    /// The chain's genesis fee configuration.
    pub const fn get_fee_config(&self) -> &FeeConfig {
        &self.fee_config
    }

    /// Whether custom fee recipients are allowed by default.
    pub const fn allowed_fee_recipients(&self) -> bool {
        self.allow_fee_recipients
    }
}
