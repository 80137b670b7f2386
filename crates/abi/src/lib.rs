//! # Contract ABI
//!
//! Type system, head/tail codec and interface descriptors for the contract call
//! boundary.
//!
//! ## Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`ty`] | [`AbiType`]: wire shapes, static/dynamic classification, type-string parsing |
//! | [`encode`] / [`decode`] | the head/tail codec, with a strict decoder for precompile input |
//! | [`topics`] | packing indexed event arguments into log topics |
//! | [`function`] | [`Function`] descriptors and selector derivation |
//! | [`event`] | [`Event`] and [`CustomError`] descriptors, revert reasons |
//! | [`json`] | [`ContractAbi`] loaded from standard JSON ABI |
//!
//! ## Example
//!
//! ```
//! use subnet_abi::{parse_signature, AbiValue};
//! use alloy_primitives::{address, U256};
//!
//! let transfer = parse_signature("transfer(address,uint256)").unwrap();
//! assert_eq!(transfer.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
//!
//! let to = address!("0x00000000000000000000000000000000000000aa");
//! let data = transfer.encode_input(&[to.into(), AbiValue::Uint(U256::from(1u64))]).unwrap();
//! assert_eq!(transfer.decode_input_strict(&data).unwrap()[0], AbiValue::Address(to));
//! ```

pub mod decode;
pub mod encode;
pub mod error;
pub mod event;
pub mod function;
pub mod json;
pub mod topics;
pub mod ty;
pub mod value;

pub use decode::{decode, decode_strict, Decoder};
pub use encode::{encode, encode_single};
pub use error::{AbiError, DecodingError, EncodingError};
pub use event::{decode_revert_reason, CustomError, Event};
pub use function::{parse_signature, selector, Argument, Function, FunctionKind, StateMutability};
pub use json::ContractAbi;
pub use topics::{encode_topic, make_topics};
pub use ty::{AbiType, WORD};
pub use value::AbiValue;
