use super::{set_role, Role};
use crate::{
    error::ConfigError,
    state::{StateDB, StateError},
};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Initial roles applied when an allow-list-gated precompile activates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowListConfig {
    /// Addresses granted [`Role::Admin`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admin_addresses: Vec<Address>,
    /// Addresses granted [`Role::Enabled`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_addresses: Vec<Address>,
}

impl AllowListConfig {
    /// Writes the configured roles into `precompile`'s storage. Enabled entries
    /// are written before admin entries.
    pub fn configure(
        &self,
        state: &mut dyn StateDB,
        precompile: Address,
    ) -> Result<(), StateError> {
        for address in &self.enabled_addresses {
            set_role(state, precompile, *address, Role::Enabled)?;
        }
        for address in &self.admin_addresses {
            set_role(state, precompile, *address, Role::Admin)?;
        }
        Ok(())
    }

    /// Rejects duplicates within a list and addresses present in both.
    pub fn verify(&self) -> Result<(), ConfigError> {
        let mut admins = HashSet::with_capacity(self.admin_addresses.len());
        for address in &self.admin_addresses {
            if !admins.insert(address) {
                return Err(ConfigError::DuplicateAllowListEntry(*address));
            }
        }
        let mut enabled = HashSet::with_capacity(self.enabled_addresses.len());
        for address in &self.enabled_addresses {
            if !enabled.insert(address) {
                return Err(ConfigError::DuplicateAllowListEntry(*address));
            }
            if admins.contains(address) {
                return Err(ConfigError::AllowListOverlap(*address));
            }
        }
        Ok(())
    }

    /// Whether no roles are configured.
    pub fn is_empty(&self) -> bool {
        self.admin_addresses.is_empty() && self.enabled_addresses.is_empty()
    }
}
