//! # Stateful Precompiles
//!
//! Selector dispatch, allow-list access control and timestamp-based activation
//! for natively implemented contracts.
//!
//! ## Precompiles
//!
//! | Address | Config key | Module |
//! |---------|------------|--------|
//! | `0x0200…0000` | `contractDeployerAllowListConfig` | [`deployer_allow_list`] |
//! | `0x0200…0001` | `contractNativeMinterConfig` | [`native_minter`] |
//! | `0x0200…0002` | `txAllowListConfig` | [`tx_allow_list`] |
//! | `0x0200…0003` | `feeManagerConfig` | [`fee_manager`] |
//! | `0x0200…0004` | `rewardManagerConfig` | [`reward_manager`] |
//!
//! Every one of them serves the [`allowlist`] interface next to its own
//! functions.
//!
//! ## Lifecycle
//!
//! 1. Build a [`ModuleRegistry`] once at start up.
//! 2. Load the chain's [`PrecompileUpgrades`] and [`verify`](PrecompileUpgrades::verify) them.
//! 3. Before executing each block, call [`PrecompileUpgrades::check_configure`].
//! 4. Route calls to [`PrecompileUpgrades::enabled_at`] addresses through
//!    [`run_precompile`].

pub mod allowlist;
pub mod config;
pub mod contract;
pub mod deployer_allow_list;
pub mod error;
pub mod fee_manager;
pub mod gas;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod modules;
pub mod native_minter;
pub mod reward_manager;
pub mod state;
pub mod tx_allow_list;
pub mod upgrade;

pub use allowlist::{AllowListConfig, Role};
pub use config::{PrecompileConfig, Upgrade};
pub use contract::{
    run_precompile, CallContext, CallFailure, CallOutput, FunctionEntry, RunFn, StatefulContract,
    StatefulPrecompile,
};
pub use error::{ActivationError, ConfigCompatError, ConfigError, PrecompileError};
pub use fee_manager::FeeConfig;
pub use modules::{Module, ModuleRegistry};
pub use reward_manager::RewardMode;
pub use state::{ActivationState, BlockContext, ChainConfig, StateDB, StateError};
pub use upgrade::{PrecompileUpgrades, UpgradeSource};
