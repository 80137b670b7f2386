//! Indexed event arguments.
//!
//! A value-type argument becomes its own 32-byte word. `bytes` and `string` are
//! replaced by the keccak hash of their raw contents, and arrays and tuples by
//! the hash of their in-place encoding: every element padded to a word, no
//! length prefixes and no offsets.

use crate::{
    encode::{encode_single, extend_padded},
    error::EncodingError,
    ty::AbiType,
    value::AbiValue,
};
use alloy_primitives::{keccak256, B256};

/// Packs indexed values into log topics, one per value.
pub fn make_topics(values: &[AbiValue], types: &[AbiType]) -> Result<Vec<B256>, EncodingError> {
    if values.len() != types.len() {
        return Err(EncodingError::ArgumentCount {
            expected: types.len(),
            actual: values.len(),
        });
    }
    values
        .iter()
        .zip(types)
        .map(|(value, ty)| encode_topic(value, ty))
        .collect()
}

/// Computes the topic of a single indexed value.
pub fn encode_topic(value: &AbiValue, ty: &AbiType) -> Result<B256, EncodingError> {
    match ty {
        AbiType::Bytes | AbiType::String => Ok(keccak256(raw_payload(value, ty)?)),
        AbiType::Array(..) | AbiType::Tuple(_) => {
            let mut preimage = Vec::new();
            in_place(value, ty, &mut preimage)?;
            Ok(keccak256(preimage))
        }
        _ => Ok(B256::from_slice(&encode_single(value, ty)?)),
    }
}

/// Returns `true` when an indexed argument of this type is stored as a hash and
/// cannot be recovered from the log.
pub fn is_hashed_topic(ty: &AbiType) -> bool {
    matches!(
        ty,
        AbiType::Bytes | AbiType::String | AbiType::Array(..) | AbiType::Tuple(_)
    )
}

fn raw_payload<'a>(value: &'a AbiValue, ty: &AbiType) -> Result<&'a [u8], EncodingError> {
    match (ty, value) {
        (AbiType::Bytes, AbiValue::Bytes(bytes)) => Ok(bytes),
        (AbiType::String, AbiValue::String(text)) => Ok(text.as_bytes()),
        _ => Err(EncodingError::TypeMismatch {
            ty: ty.canonical(),
            value: value.kind(),
        }),
    }
}

fn in_place(value: &AbiValue, ty: &AbiType, out: &mut Vec<u8>) -> Result<(), EncodingError> {
    match (ty, value) {
        (AbiType::Bytes | AbiType::String, _) => extend_padded(out, raw_payload(value, ty)?),
        (AbiType::Array(elem, len), AbiValue::Array(items)) => {
            if let Some(expected) = len.filter(|expected| *expected != items.len()) {
                return Err(EncodingError::ArrayLength {
                    ty: ty.canonical(),
                    expected,
                    actual: items.len(),
                });
            }
            for item in items {
                in_place(item, elem, out)?;
            }
        }
        (AbiType::Tuple(fields), AbiValue::Tuple(items)) => {
            if fields.len() != items.len() {
                return Err(EncodingError::ArgumentCount {
                    expected: fields.len(),
                    actual: items.len(),
                });
            }
            for ((_, field), item) in fields.iter().zip(items) {
                in_place(item, field, out)?;
            }
        }
        (AbiType::Array(..) | AbiType::Tuple(_), _) => {
            return Err(EncodingError::TypeMismatch {
                ty: ty.canonical(),
                value: value.kind(),
            })
        }
        _ => out.extend_from_slice(&encode_single(value, ty)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, U256};

    #[test]
    fn value_types_are_their_word() {
        let addr = address!("0x1111111111111111111111111111111111111111");
        let topics = make_topics(
            &[addr.into(), 5u64.into()],
            &[AbiType::Address, AbiType::Uint(256)],
        )
        .unwrap();
        assert_eq!(topics[0], addr.into_word());
        assert_eq!(topics[1], B256::from(U256::from(5u64)));
    }

    #[test]
    fn dynamic_values_are_hashed() {
        let topic = encode_topic(&"hello".into(), &AbiType::String).unwrap();
        assert_eq!(topic, keccak256("hello"));

        let bytes = encode_topic(&AbiValue::Bytes(vec![1, 2]), &AbiType::Bytes).unwrap();
        assert_eq!(bytes, keccak256([1u8, 2]));
    }

    #[test]
    fn arrays_hash_padded_elements_without_length() {
        let ty = AbiType::array(AbiType::Uint(8));
        let topic =
            encode_topic(&AbiValue::Array(vec![1u64.into(), 2u64.into()]), &ty).unwrap();
        let mut preimage = [0u8; 64];
        preimage[31] = 1;
        preimage[63] = 2;
        assert_eq!(topic, keccak256(preimage));
    }

    #[test]
    fn tuple_strings_are_padded_in_preimage() {
        let ty = AbiType::tuple([AbiType::String, AbiType::Bool]);
        let topic =
            encode_topic(&AbiValue::Tuple(vec!["ab".into(), true.into()]), &ty).unwrap();
        let mut preimage = [0u8; 64];
        preimage[..2].copy_from_slice(b"ab");
        preimage[63] = 1;
        assert_eq!(topic, keccak256(preimage));
    }

    #[test]
    fn count_and_type_mismatches_fail() {
        assert!(make_topics(&[], &[AbiType::Bool]).is_err());
        assert!(encode_topic(&AbiValue::Bool(true), &AbiType::String).is_err());
        assert!(encode_topic(&AbiValue::Bool(true), &AbiType::tuple([AbiType::Bool])).is_err());
    }
}
