//! Precompile configuration shared by every module.

use crate::{
    error::{ActivationError, ConfigError},
    state::{BlockContext, ChainConfig, StateDB},
};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::{any::Any, fmt::Debug};

/// Activation fields embedded in every precompile config.
///
/// `block_timestamp` of `None` means the entry never activates; `Some(0)`
/// activates at genesis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    /// Activation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_timestamp: Option<u64>,
    /// Whether this entry turns the precompile off.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable: bool,
}

impl Upgrade {
    /// An enabling upgrade at `timestamp`.
    pub const fn at(timestamp: u64) -> Self {
        Self { block_timestamp: Some(timestamp), disable: false }
    }

    /// A disabling upgrade at `timestamp`.
    pub const fn disabled_at(timestamp: u64) -> Self {
        Self { block_timestamp: Some(timestamp), disable: true }
    }
}

/// Behavior every precompile config provides to the upgrade registry.
pub trait PrecompileConfig: Debug + Send + Sync {
    /// Module key, e.g. `txAllowListConfig`.
    fn key(&self) -> &'static str;

    /// Address of the precompile.
    fn address(&self) -> Address;

    /// Activation fields.
    fn upgrade(&self) -> &Upgrade;

    /// Activation timestamp, if any.
    fn timestamp(&self) -> Option<u64> {
        self.upgrade().block_timestamp
    }

    /// Whether this entry disables the precompile.
    fn is_disabled(&self) -> bool {
        self.upgrade().disable
    }

    /// Whether `other` is the same kind of config with identical contents.
    fn equal(&self, other: &dyn PrecompileConfig) -> bool;

    /// Validates precompile-specific fields.
    fn verify(&self, chain: &ChainConfig) -> Result<(), ConfigError>;

    /// Initializes the precompile's state when it activates.
    fn configure(
        &self,
        chain: &ChainConfig,
        state: &mut dyn StateDB,
        block: &BlockContext,
    ) -> Result<(), ActivationError>;

    /// Upcast used by [`PrecompileConfig::equal`] implementations.
    fn as_any(&self) -> &dyn Any;
}

/// Compares `this` against `other` by downcasting to `T`.
pub fn config_eq<T: PrecompileConfig + PartialEq + 'static>(
    this: &T,
    other: &dyn PrecompileConfig,
) -> bool {
    other.as_any().downcast_ref::<T>().is_some_and(|other| other == this)
}

/// Deserializes a module config from its JSON object.
pub fn parse_config<T>(key: &'static str, value: serde_json::Value) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(value)
        .map_err(|err| ConfigError::Invalid { key, reason: err.to_string() })
}
