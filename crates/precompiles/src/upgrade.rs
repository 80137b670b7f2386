//! Precompile upgrades and block-boundary activation.
//!
//! A chain carries one ordered list of precompile configs. Each entry turns a
//! precompile on (with its initial config) or off at a timestamp. At every block
//! boundary [`PrecompileUpgrades::check_configure`] applies the entries whose
//! timestamp falls between the parent block and the new block, so each entry
//! takes effect exactly once.

use crate::{
    config::PrecompileConfig,
    error::{ActivationError, ConfigCompatError, ConfigError},
    modules::ModuleRegistry,
    state::{ActivationState, BlockContext, ChainConfig},
};
use alloy_primitives::{Address, Bytes};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

/// Code installed at an active precompile so the account is never empty.
pub const PRECOMPILE_MARKER_CODE: Bytes = Bytes::from_static(&[0xfe]);

/// The two accepted shapes of a chain's upgrade document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UpgradeSource {
    /// `[{"txAllowListConfig": {...}}, {"feeManagerConfig": {...}}]`, applied in
    /// list order.
    List(Vec<Map<String, Value>>),
    /// `{"txAllowListConfig": {...}, "feeManagerConfig": {...}}`, one entry per
    /// key, ordered by timestamp then address.
    LegacyTopLevel(Map<String, Value>),
}

impl UpgradeSource {
    /// Parses every entry through the module registered under its key.
    pub fn normalize(self, registry: &ModuleRegistry) -> Result<PrecompileUpgrades, ConfigError> {
        match self {
            Self::List(items) => {
                let mut entries = Vec::with_capacity(items.len());
                for item in items {
                    let mut fields = item.into_iter();
                    let (Some((key, value)), None) = (fields.next(), fields.next()) else {
                        return Err(ConfigError::Malformed(
                            "each upgrade entry must hold exactly one config key".into(),
                        ));
                    };
                    entries.push(parse_entry(registry, &key, value)?);
                }
                Ok(PrecompileUpgrades::new(entries))
            }
            Self::LegacyTopLevel(map) => {
                let mut entries = map
                    .into_iter()
                    .map(|(key, value)| parse_entry(registry, &key, value))
                    .collect::<Result<Vec<_>, _>>()?;
                entries.sort_by_key(|entry| (entry.timestamp(), entry.address()));
                Ok(PrecompileUpgrades::new(entries))
            }
        }
    }
}

fn parse_entry(
    registry: &ModuleRegistry,
    key: &str,
    value: Value,
) -> Result<Arc<dyn PrecompileConfig>, ConfigError> {
    let module = registry.get_by_key(key).ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    (module.parse_config)(value)
}

/// An ordered list of precompile configs.
#[derive(Debug, Clone, Default)]
pub struct PrecompileUpgrades {
    entries: Vec<Arc<dyn PrecompileConfig>>,
}

impl PrecompileUpgrades {
    /// Wraps `entries` in list order.
    pub fn new(entries: Vec<Arc<dyn PrecompileConfig>>) -> Self {
        Self { entries }
    }

    /// Parses a JSON document in either [`UpgradeSource`] shape.
    pub fn from_json(json: &str, registry: &ModuleRegistry) -> Result<Self, ConfigError> {
        let source: UpgradeSource =
            serde_json::from_str(json).map_err(|err| ConfigError::Malformed(err.to_string()))?;
        source.normalize(registry)
    }

    /// Entries in list order.
    pub fn entries(&self) -> &[Arc<dyn PrecompileConfig>] {
        &self.entries
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: Arc<dyn PrecompileConfig>) {
        self.entries.push(entry);
    }

    fn entries_for<'a>(
        &'a self,
        key: &'a str,
    ) -> impl Iterator<Item = &'a Arc<dyn PrecompileConfig>> + 'a {
        self.entries.iter().filter(move |entry| entry.key() == key)
    }

    /// Entries of `key` that have activated by `timestamp`, in list order.
    fn activated<'a>(
        &'a self,
        key: &'a str,
        timestamp: u64,
    ) -> impl Iterator<Item = &'a Arc<dyn PrecompileConfig>> + 'a {
        self.entries_for(key).filter(move |entry| is_activated(entry.as_ref(), timestamp))
    }

    /// Checks ordering rules and every enabling entry's own config.
    pub fn verify(&self, registry: &ModuleRegistry, chain: &ChainConfig) -> Result<(), ConfigError> {
        let mut previous: Option<u64> = None;
        let mut last_by_key: HashMap<&str, (u64, bool)> = HashMap::new();

        for entry in &self.entries {
            let key = entry.key();
            if registry.get_by_key(key).is_none() {
                return Err(ConfigError::UnknownKey(key.to_string()));
            }
            let timestamp = entry
                .timestamp()
                .ok_or_else(|| ConfigError::MissingTimestamp { key: key.to_string() })?;
            if let Some(previous) = previous.filter(|previous| timestamp < *previous) {
                return Err(ConfigError::NonMonotonicTimestamp {
                    key: key.to_string(),
                    previous,
                    timestamp,
                });
            }
            previous = Some(timestamp);

            let disabled = entry.is_disabled();
            match last_by_key.get(key) {
                None if disabled => {
                    return Err(ConfigError::UnexpectedDisable { key: key.to_string(), timestamp })
                }
                None => {}
                Some(&(last, _)) if timestamp <= last => {
                    return Err(ConfigError::NonMonotonicTimestamp {
                        key: key.to_string(),
                        previous: last,
                        timestamp,
                    })
                }
                Some(&(_, was_disabled)) if was_disabled == disabled => {
                    return Err(if disabled {
                        ConfigError::UnexpectedDisable { key: key.to_string(), timestamp }
                    } else {
                        ConfigError::UnexpectedEnable { key: key.to_string(), timestamp }
                    })
                }
                Some(_) => {}
            }
            if !disabled {
                entry.verify(chain)?;
            }
            last_by_key.insert(key, (timestamp, disabled));
        }
        Ok(())
    }

    /// The latest entry of `key` that has activated by `timestamp`, disabling
    /// entries included.
    pub fn active_config(&self, key: &str, timestamp: u64) -> Option<&Arc<dyn PrecompileConfig>> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.key() == key && is_activated(entry.as_ref(), timestamp))
    }

    /// Configs in effect at `timestamp`, in module address order.
    pub fn enabled_at(
        &self,
        registry: &ModuleRegistry,
        timestamp: u64,
    ) -> Vec<Arc<dyn PrecompileConfig>> {
        registry
            .modules()
            .iter()
            .filter_map(|module| self.active_config(module.key, timestamp))
            .filter(|config| !config.is_disabled())
            .cloned()
            .collect()
    }

    /// Applies every entry whose timestamp is crossed by moving from
    /// `parent_timestamp` to `block.timestamp`. `None` stands for the genesis
    /// block, where every entry at or before the block timestamp applies.
    ///
    /// An enabling entry marks the precompile account as live and runs the
    /// config's `configure`; a disabling entry removes the account and its
    /// storage.
    pub fn check_configure<S: ActivationState>(
        &self,
        registry: &ModuleRegistry,
        chain: &ChainConfig,
        parent_timestamp: Option<u64>,
        block: &BlockContext,
        state: &mut S,
    ) -> Result<(), ActivationError> {
        for module in registry.modules() {
            for entry in self.entries_for(module.key) {
                let Some(timestamp) = entry.timestamp() else { continue };
                if !is_fork_transition(timestamp, parent_timestamp, block.timestamp) {
                    continue;
                }
                if entry.is_disabled() {
                    deconfigure(module.address, state)?;
                    tracing::info!(
                        target: "precompile::activation",
                        key = module.key,
                        address = ?module.address,
                        block = block.number,
                        timestamp,
                        "deactivated precompile"
                    );
                } else {
                    state.set_nonce(module.address, 1)?;
                    state.set_code(module.address, PRECOMPILE_MARKER_CODE)?;
                    entry.configure(chain, state, block)?;
                    tracing::info!(
                        target: "precompile::activation",
                        key = module.key,
                        address = ?module.address,
                        block = block.number,
                        timestamp,
                        "activated precompile"
                    );
                }
            }
        }
        Ok(())
    }

    /// Fails if an entry that has activated by `head_timestamp` differs
    /// between `self` (stored) and `new`.
    pub fn check_compatible(
        &self,
        new: &Self,
        head_timestamp: u64,
    ) -> Result<(), ConfigCompatError> {
        let keys: BTreeSet<&str> =
            self.entries.iter().chain(&new.entries).map(|entry| entry.key()).collect();
        for key in keys {
            let stored: Vec<_> = self.activated(key, head_timestamp).collect();
            let updated: Vec<_> = new.activated(key, head_timestamp).collect();
            for index in 0..stored.len().max(updated.len()) {
                match (stored.get(index), updated.get(index)) {
                    (Some(a), Some(b)) if same_upgrade(a.as_ref(), b.as_ref()) => {}
                    (a, b) => {
                        let err = ConfigCompatError::new(
                            key,
                            a.and_then(|entry| entry.timestamp()),
                            b.and_then(|entry| entry.timestamp()),
                        );
                        tracing::warn!(
                            target: "precompile::activation",
                            %err,
                            "incompatible upgrade"
                        );
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }
}

fn is_activated(entry: &dyn PrecompileConfig, timestamp: u64) -> bool {
    entry.timestamp().is_some_and(|activation| activation <= timestamp)
}

/// Whether moving from `parent` to `current` crosses `activation`.
pub fn is_fork_transition(activation: u64, parent: Option<u64>, current: u64) -> bool {
    match parent {
        None => activation <= current,
        Some(parent) => parent < activation && activation <= current,
    }
}

fn same_upgrade(a: &dyn PrecompileConfig, b: &dyn PrecompileConfig) -> bool {
    a.timestamp() == b.timestamp() && a.is_disabled() == b.is_disabled() && a.equal(b)
}

fn deconfigure<S: ActivationState>(address: Address, state: &mut S) -> Result<(), ActivationError> {
    state.self_destruct(address)?;
    state.finalise()?;
    Ok(())
}
