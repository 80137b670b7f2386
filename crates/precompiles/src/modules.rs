//! Registry of precompile modules.
//!
//! A module binds a config key to a reserved address, the dispatch table served
//! there and a parser for its JSON config. The registry is built once at start
//! up and handed by reference to everything that needs it.

use crate::{
    config::PrecompileConfig,
    contract::StatefulContract,
    deployer_allow_list,
    error::ConfigError,
    fee_manager, native_minter, reward_manager, tx_allow_list,
};
use alloy_primitives::{address, Address};
use std::{fmt, sync::Arc};

/// Parses a module's config object.
pub type ConfigParser = fn(serde_json::Value) -> Result<Arc<dyn PrecompileConfig>, ConfigError>;

/// Address ranges precompile modules may occupy, inclusive.
///
/// Core-reserved, standard-optional and fork-custom tiers in that order.
pub const RESERVED_RANGES: [(Address, Address); 3] = [
    (
        address!("0x0100000000000000000000000000000000000000"),
        address!("0x01000000000000000000000000000000000000ff"),
    ),
    (
        address!("0x0200000000000000000000000000000000000000"),
        address!("0x02000000000000000000000000000000000000ff"),
    ),
    (
        address!("0x0300000000000000000000000000000000000000"),
        address!("0x03000000000000000000000000000000000000ff"),
    ),
];

/// Whether `address` lies in one of [`RESERVED_RANGES`].
pub fn is_reserved_address(address: Address) -> bool {
    RESERVED_RANGES.iter().any(|(start, end)| (*start..=*end).contains(&address))
}

/// A registered precompile.
#[derive(Clone)]
pub struct Module {
    /// Config key, unique across the registry.
    pub key: &'static str,
    /// Address the precompile is served at.
    pub address: Address,
    /// Dispatch table.
    pub contract: Arc<StatefulContract>,
    /// Parser for the module's JSON config.
    pub parse_config: ConfigParser,
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("key", &self.key)
            .field("address", &self.address)
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

/// Modules sorted by address.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
}

impl ModuleRegistry {
    /// An empty registry.
    pub const fn new() -> Self {
        Self { modules: Vec::new() }
    }

    /// A registry holding every built-in module.
    pub fn with_default_modules() -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        registry.register(deployer_allow_list::module()?)?;
        registry.register(native_minter::module()?)?;
        registry.register(tx_allow_list::module()?)?;
        registry.register(fee_manager::module()?)?;
        registry.register(reward_manager::module()?)?;
        Ok(registry)
    }

    /// Adds `module`, keeping the list sorted by address.
    pub fn register(&mut self, module: Module) -> Result<(), ConfigError> {
        if !is_reserved_address(module.address) {
            return Err(ConfigError::AddressNotReserved(module.address));
        }
        if self.modules.iter().any(|existing| existing.key == module.key) {
            return Err(ConfigError::DuplicateKey(module.key.to_string()));
        }
        let index = match self.modules.binary_search_by_key(&module.address, |m| m.address) {
            Ok(_) => return Err(ConfigError::DuplicateAddress(module.address)),
            Err(index) => index,
        };
        tracing::debug!(
            target: "precompile::registry",
            key = module.key,
            address = ?module.address,
            "registered module"
        );
        self.modules.insert(index, module);
        Ok(())
    }

    /// The module served at `address`.
    pub fn get_by_address(&self, address: Address) -> Option<&Module> {
        self.modules
            .binary_search_by_key(&address, |m| m.address)
            .ok()
            .map(|index| &self.modules[index])
    }

    /// The module registered under `key`.
    pub fn get_by_key(&self, key: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.key == key)
    }

    /// All modules in address order.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
