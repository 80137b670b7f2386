//! Error types for precompile calls, configuration and activation.

use crate::{allowlist::Role, state::StateError};
use alloy_primitives::{Address, B256};
use subnet_abi::{
    encode, event::REVERT_SELECTOR, AbiError, AbiType, AbiValue, DecodingError, EncodingError,
};
use thiserror::Error;

/// A precompile call was rejected.
///
/// Every variant is recoverable: the call reverts and the interpreter carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrecompileError {
    /// Non-empty input shorter than a selector.
    #[error("missing function selector: input is {len} bytes")]
    MissingSelector {
        /// Input length.
        len: usize,
    },
    /// No handler is registered for the selector.
    #[error("unknown function selector {selector:02x?}")]
    UnknownSelector {
        /// The unmatched selector.
        selector: [u8; 4],
    },
    /// The gas budget does not cover the charge.
    #[error("out of gas: need {required}, have {remaining}")]
    OutOfGas {
        /// Gas requested.
        required: u64,
        /// Gas that was left.
        remaining: u64,
    },
    /// The caller's allow-list role is too low.
    #[error("{caller} is {actual}, requires {required}")]
    Unauthorized {
        /// Calling address.
        caller: Address,
        /// Role required by the operation.
        required: Role,
        /// Role the caller holds.
        actual: Role,
    },
    /// A state-changing function was called in a static context.
    #[error("write protection: cannot modify state in a read-only call")]
    WriteProtection,
    /// Call data did not decode against the function inputs.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] DecodingError),
    /// Return values or log data could not be encoded.
    #[error("output encoding failed: {0}")]
    Encoding(#[from] EncodingError),
    /// An ABI descriptor could not be built.
    #[error("descriptor error: {0}")]
    Abi(#[from] AbiError),
    /// A storage slot holds a word that is not a valid role.
    #[error("invalid role word {0}")]
    InvalidRole(B256),
    /// Arguments decoded but violate the function's rules.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The state backend failed.
    #[error(transparent)]
    State(#[from] StateError),
}

impl PrecompileError {
    /// Revert data for the failure: the standard `Error(string)` payload
    /// carrying the error's message.
    pub fn revert_data(&self) -> Vec<u8> {
        let reason = encode(&[AbiValue::String(self.to_string())], &[AbiType::String])
            .unwrap_or_default();
        let mut out = Vec::with_capacity(4 + reason.len());
        out.extend_from_slice(&REVERT_SELECTOR);
        out.extend_from_slice(&reason);
        out
    }
}

/// Configuration is invalid. Fatal: surfaced before any block is processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Two handlers share a selector.
    #[error("duplicate function selector {0:02x?}")]
    DuplicateSelector([u8; 4]),
    /// A module address is outside every reserved range.
    #[error("address {0} is not in a reserved precompile range")]
    AddressNotReserved(Address),
    /// A module address is already registered.
    #[error("duplicate module address {0}")]
    DuplicateAddress(Address),
    /// A module key is already registered.
    #[error("duplicate module key `{0}`")]
    DuplicateKey(String),
    /// An upgrade refers to a key no module is registered under.
    #[error("unknown precompile config key `{0}`")]
    UnknownKey(String),
    /// An address is both admin and enabled.
    #[error("address {0} is both admin and enabled")]
    AllowListOverlap(Address),
    /// An address appears twice in the same role list.
    #[error("duplicate address {0} in allow list")]
    DuplicateAllowListEntry(Address),
    /// An upgrade has no activation timestamp.
    #[error("upgrade for `{key}` is missing blockTimestamp")]
    MissingTimestamp {
        /// Config key.
        key: String,
    },
    /// Timestamps go backwards.
    #[error("upgrade for `{key}` at {timestamp} does not follow {previous}")]
    NonMonotonicTimestamp {
        /// Config key.
        key: String,
        /// Timestamp of the preceding upgrade.
        previous: u64,
        /// Offending timestamp.
        timestamp: u64,
    },
    /// A disable with no preceding enable, or two disables in a row.
    #[error("upgrade for `{key}` at {timestamp} disables a precompile that is not enabled")]
    UnexpectedDisable {
        /// Config key.
        key: String,
        /// Offending timestamp.
        timestamp: u64,
    },
    /// Two enables in a row.
    #[error("upgrade for `{key}` at {timestamp} enables a precompile that is already enabled")]
    UnexpectedEnable {
        /// Config key.
        key: String,
        /// Offending timestamp.
        timestamp: u64,
    },
    /// Precompile-specific validation failed.
    #[error("invalid `{key}` config: {reason}")]
    Invalid {
        /// Config key.
        key: &'static str,
        /// What is wrong.
        reason: String,
    },
    /// The upgrade document is malformed.
    #[error("malformed upgrade config: {0}")]
    Malformed(String),
    /// An ABI descriptor could not be built.
    #[error("descriptor error: {0}")]
    Abi(#[from] AbiError),
}

/// Applying a precompile activation failed. The block must be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    /// The state backend failed.
    #[error(transparent)]
    State(#[from] StateError),
    /// A config's `configure` step failed.
    #[error("configuring `{key}` failed: {reason}")]
    Configure {
        /// Config key.
        key: &'static str,
        /// What went wrong.
        reason: String,
    },
    /// An upgrade refers to a key no module is registered under.
    #[error("unknown precompile config key `{0}`")]
    UnknownKey(String),
}

/// An already-activated upgrade differs between the stored and new configs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "incompatible `{key}` upgrade: stored {stored:?}, new {new:?}, rewind to {rewind_to}"
)]
pub struct ConfigCompatError {
    /// Config key of the diverging upgrade.
    pub key: String,
    /// Activation timestamp in the stored config, if present.
    pub stored: Option<u64>,
    /// Activation timestamp in the new config, if present.
    pub new: Option<u64>,
    /// Latest timestamp at which both configs still agree.
    pub rewind_to: u64,
}

impl ConfigCompatError {
    pub(crate) fn new(key: impl Into<String>, stored: Option<u64>, new: Option<u64>) -> Self {
        let earliest = match (stored, new) {
            (Some(a), Some(b)) => a.min(b),
            (Some(t), None) | (None, Some(t)) => t,
            (None, None) => 0,
        };
        Self { key: key.into(), stored, new, rewind_to: earliest.saturating_sub(1) }
    }
}

impl ConfigError {
    /// Lifts a descriptor failure raised while building a selector table.
    pub(crate) fn from_descriptor(err: PrecompileError) -> Self {
        match err {
            PrecompileError::Abi(err) => Self::Abi(err),
            other => Self::Malformed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subnet_abi::decode_revert_reason;

    #[test]
    fn revert_data_carries_the_message() {
        let err = PrecompileError::UnknownSelector { selector: [0xde, 0xad, 0xbe, 0xef] };
        let data = err.revert_data();
        assert_eq!(data[..4], REVERT_SELECTOR);
        assert_eq!(decode_revert_reason(&data), Some(err.to_string()));
    }
}
