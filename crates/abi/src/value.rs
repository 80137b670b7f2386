//! Dynamically typed ABI values.

use alloy_primitives::{Address, B256, I256, U256};

/// A value paired with an [`AbiType`](crate::AbiType) at encode time, or produced by
/// the decoder.
///
/// Integer variants are interchangeable on input: an `Int` may be encoded into an
/// unsigned type when it is non-negative and a `Uint` into a signed type when it
/// fits. The decoder always returns `Uint` for unsigned types and `Int` for signed
/// ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiValue {
    /// Unsigned integer.
    Uint(U256),
    /// Signed integer.
    Int(I256),
    /// Boolean.
    Bool(bool),
    /// Account address.
    Address(Address),
    /// Fixed-size byte string; shorter inputs are right-padded when encoded.
    FixedBytes(Vec<u8>),
    /// Variable-length byte string.
    Bytes(Vec<u8>),
    /// UTF-8 string.
    String(String),
    /// Elements of a fixed or dynamic array.
    Array(Vec<AbiValue>),
    /// Fields of a tuple.
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    /// Variant name, used in error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Uint(_) => "uint",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Address(_) => "address",
            Self::FixedBytes(_) => "fixed bytes",
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Tuple(_) => "tuple",
        }
    }

    /// Returns the unsigned integer, if this is one.
    pub const fn as_uint(&self) -> Option<U256> {
        match self {
            Self::Uint(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the signed integer, if this is one.
    pub const fn as_int(&self) -> Option<I256> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the boolean, if this is one.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the address, if this is one.
    pub const fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the raw bytes of a `bytes` or `bytesN` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(value) | Self::FixedBytes(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the elements of an array or the fields of a tuple.
    pub fn as_slice(&self) -> Option<&[Self]> {
        match self {
            Self::Array(values) | Self::Tuple(values) => Some(values),
            _ => None,
        }
    }
}

impl From<U256> for AbiValue {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<u64> for AbiValue {
    fn from(value: u64) -> Self {
        Self::Uint(U256::from(value))
    }
}

impl From<I256> for AbiValue {
    fn from(value: I256) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for AbiValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Address> for AbiValue {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<B256> for AbiValue {
    fn from(value: B256) -> Self {
        Self::FixedBytes(value.to_vec())
    }
}

impl From<String> for AbiValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for AbiValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}
