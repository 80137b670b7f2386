//! Transaction Allow List
//!
//! Gates which senders may submit transactions. The precompile only exposes the
//! allow-list interface; enforcement happens in transaction validation through
//! [`tx_allow_list_status`].

use crate::{
    allowlist::{allow_list_functions, get_role, AllowListConfig, Role},
    config::{config_eq, parse_config, PrecompileConfig, Upgrade},
    contract::StatefulContract,
    error::{ActivationError, ConfigError, PrecompileError},
    modules::Module,
    state::{BlockContext, ChainConfig, StateDB},
};
use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::{any::Any, sync::Arc};

/// Address of the transaction allow list.
pub const TX_ALLOW_LIST_ADDRESS: Address = address!("0x0200000000000000000000000000000000000002");

/// Config key of the transaction allow list.
pub const CONFIG_KEY: &str = "txAllowListConfig";

/// Role of `address` in the transaction allow list.
pub fn tx_allow_list_status(
    state: &mut dyn StateDB,
    address: Address,
) -> Result<Role, PrecompileError> {
    get_role(state, TX_ALLOW_LIST_ADDRESS, address)
}

/// Transaction allow list configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxAllowListConfig {
    /// Activation fields.
    #[serde(flatten)]
    pub upgrade: Upgrade,
    /// Initial roles.
    #[serde(flatten)]
    pub allow_list: AllowListConfig,
}

impl TxAllowListConfig {
    /// An enabling config at `timestamp`.
    pub const fn new(timestamp: u64, allow_list: AllowListConfig) -> Self {
        Self { upgrade: Upgrade::at(timestamp), allow_list }
    }

    /// A disabling config at `timestamp`.
    pub fn disable(timestamp: u64) -> Self {
        Self { upgrade: Upgrade::disabled_at(timestamp), allow_list: AllowListConfig::default() }
    }
}

impl PrecompileConfig for TxAllowListConfig {
    fn key(&self) -> &'static str {
        CONFIG_KEY
    }

    fn address(&self) -> Address {
        TX_ALLOW_LIST_ADDRESS
    }

    fn upgrade(&self) -> &Upgrade {
        &self.upgrade
    }

    fn equal(&self, other: &dyn PrecompileConfig) -> bool {
        config_eq(self, other)
    }

    fn verify(&self, _chain: &ChainConfig) -> Result<(), ConfigError> {
        self.allow_list.verify()
    }

    fn configure(
        &self,
        _chain: &ChainConfig,
        state: &mut dyn StateDB,
        _block: &BlockContext,
    ) -> Result<(), ActivationError> {
        Ok(self.allow_list.configure(state, TX_ALLOW_LIST_ADDRESS)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn parse(value: serde_json::Value) -> Result<Arc<dyn PrecompileConfig>, ConfigError> {
    Ok(Arc::new(parse_config::<TxAllowListConfig>(CONFIG_KEY, value)?))
}

/// The transaction allow list module.
pub fn module() -> Result<Module, ConfigError> {
    Ok(Module {
        key: CONFIG_KEY,
        address: TX_ALLOW_LIST_ADDRESS,
        contract: Arc::new(StatefulContract::new(allow_list_functions()?, None)?),
        parse_config: parse,
    })
}
