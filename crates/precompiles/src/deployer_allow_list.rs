//! Contract Deployer Allow List
//!
//! Gates which addresses may deploy contracts. Contract creation consults
//! [`contract_deployer_allow_list_status`]; the precompile itself only serves the
//! allow-list interface.

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

/// Address of the deployer allow list.
pub const CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS: Address =
    address!("0x0200000000000000000000000000000000000000");

/// Config key of the deployer allow list.
pub const CONFIG_KEY: &str = "contractDeployerAllowListConfig";

/// Role of `address` in the deployer allow list.
pub fn contract_deployer_allow_list_status(
    state: &mut dyn StateDB,
    address: Address,
) -> Result<Role, PrecompileError> {
    get_role(state, CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS, address)
}

/// Deployer allow list configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDeployerAllowListConfig {
    /// Activation fields.
    #[serde(flatten)]
    pub upgrade: Upgrade,
    /// Initial roles.
    #[serde(flatten)]
    pub allow_list: AllowListConfig,
}

impl ContractDeployerAllowListConfig {
    /// An enabling config at `timestamp`.
    pub const fn new(timestamp: u64, allow_list: AllowListConfig) -> Self {
        Self { upgrade: Upgrade::at(timestamp), allow_list }
    }

    /// A disabling config at `timestamp`.
    pub fn disable(timestamp: u64) -> Self {
        Self { upgrade: Upgrade::disabled_at(timestamp), allow_list: AllowListConfig::default() }
    }
}

impl PrecompileConfig for ContractDeployerAllowListConfig {
    fn key(&self) -> &'static str {
        CONFIG_KEY
    }

    fn address(&self) -> Address {
        CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS
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
        Ok(self.allow_list.configure(state, CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn parse(value: serde_json::Value) -> Result<Arc<dyn PrecompileConfig>, ConfigError> {
    Ok(Arc::new(parse_config::<ContractDeployerAllowListConfig>(CONFIG_KEY, value)?))
}

/// The deployer allow list module.
pub fn module() -> Result<Module, ConfigError> {
    Ok(Module {
        key: CONFIG_KEY,
        address: CONTRACT_DEPLOYER_ALLOW_LIST_ADDRESS,
        contract: Arc::new(StatefulContract::new(allow_list_functions()?, None)?),
        parse_config: parse,
    })
}
