use crate::error::PrecompileError;
use alloy_primitives::{B256, U256};
use std::fmt;

/// Allow-list role of an address. `None < Enabled < Admin`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    /// No privileges; the state of an unset slot.
    #[default]
    None,
    /// May use the precompile's gated functions.
    Enabled,
    /// May also change other addresses' roles.
    Admin,
}

impl Role {
    /// Numeric value stored on chain and returned by `readAllowList`.
    pub const fn as_u64(self) -> u64 {
        match self {
            Self::None => 0,
            Self::Enabled => 1,
            Self::Admin => 2,
        }
    }

    /// The storage word for this role.
    pub fn to_word(self) -> B256 {
        B256::from(U256::from(self.as_u64()))
    }

    /// Parses a storage word; anything but 0, 1 or 2 is an error.
    pub fn from_word(word: B256) -> Result<Self, PrecompileError> {
        match U256::from_be_bytes(word.0) {
            value if value == U256::ZERO => Ok(Self::None),
            value if value == U256::from(1u64) => Ok(Self::Enabled),
            value if value == U256::from(2u64) => Ok(Self::Admin),
            _ => Err(PrecompileError::InvalidRole(word)),
        }
    }

    /// Whether the role grants use of gated functions.
    pub fn is_enabled(self) -> bool {
        self >= Self::Enabled
    }

    /// Whether the role may change other roles.
    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "None",
            Self::Enabled => "Enabled",
            Self::Admin => "Admin",
        })
    }
}
