//! Head/tail encoder.
//!
//! A sequence of values is laid out as a head of fixed-size slots followed by a
//! tail. Static values sit in the head directly; each dynamic value leaves a
//! 32-byte offset in the head, measured from the start of the sequence, and
//! appends its payload to the tail. Tuples and arrays recurse with offsets
//! relative to their own start.

use crate::{
    error::EncodingError,
    ty::{AbiType, WORD},
    value::AbiValue,
};
use alloy_primitives::{I256, U256};

/// Encodes `values` against `types` into the standard head/tail layout.
pub fn encode(values: &[AbiValue], types: &[AbiType]) -> Result<Vec<u8>, EncodingError> {
    if values.len() != types.len() {
        return Err(EncodingError::ArgumentCount {
            expected: types.len(),
            actual: values.len(),
        });
    }
    let pairs: Vec<_> = values.iter().zip(types).collect();
    encode_sequence(&pairs)
}

/// Encodes a single value as if it were the only argument.
pub fn encode_single(value: &AbiValue, ty: &AbiType) -> Result<Vec<u8>, EncodingError> {
    encode_sequence(&[(value, ty)])
}

fn encode_sequence(pairs: &[(&AbiValue, &AbiType)]) -> Result<Vec<u8>, EncodingError> {
    let head_size: usize = pairs.iter().map(|(_, ty)| ty.head_size()).sum();
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (value, ty) in pairs {
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_size + tail.len()));
            encode_value(value, ty, &mut tail)?;
        } else {
            encode_value(value, ty, &mut head)?;
        }
    }

    head.extend_from_slice(&tail);
    Ok(head)
}

/// Writes the in-place encoding of one value: a word for elementary types, the
/// length-prefixed payload for `bytes`/`string`/`T[]`, the nested sequence for
/// tuples and fixed arrays.
fn encode_value(value: &AbiValue, ty: &AbiType, out: &mut Vec<u8>) -> Result<(), EncodingError> {
    match (ty, value) {
        (AbiType::Uint(bits), _) => out.extend_from_slice(&uint_word(value, *bits, ty)?),
        (AbiType::Int(bits), _) => out.extend_from_slice(&int_word(value, *bits, ty)?),
        (AbiType::Bool, AbiValue::Bool(flag)) => {
            out.extend_from_slice(&usize_word(usize::from(*flag)));
        }
        (AbiType::Address, AbiValue::Address(address)) => {
            out.extend_from_slice(address.into_word().as_slice());
        }
        (AbiType::FixedBytes(size), AbiValue::FixedBytes(bytes) | AbiValue::Bytes(bytes)) => {
            if bytes.len() > *size {
                return Err(EncodingError::FixedBytesTooLong {
                    ty: ty.canonical(),
                    len: bytes.len(),
                });
            }
            extend_padded(out, bytes);
        }
        (AbiType::Bytes, AbiValue::Bytes(bytes)) => {
            out.extend_from_slice(&usize_word(bytes.len()));
            extend_padded(out, bytes);
        }
        (AbiType::String, AbiValue::String(text)) => {
            out.extend_from_slice(&usize_word(text.len()));
            extend_padded(out, text.as_bytes());
        }
        (AbiType::Array(elem, len), AbiValue::Array(items)) => {
            match len {
                Some(expected) if *expected != items.len() => {
                    return Err(EncodingError::ArrayLength {
                        ty: ty.canonical(),
                        expected: *expected,
                        actual: items.len(),
                    });
                }
                Some(_) => {}
                None => out.extend_from_slice(&usize_word(items.len())),
            }
            let pairs: Vec<_> = items.iter().map(|item| (item, elem.as_ref())).collect();
            out.extend_from_slice(&encode_sequence(&pairs)?);
        }
        (AbiType::Tuple(fields), AbiValue::Tuple(items)) => {
            if fields.len() != items.len() {
                return Err(EncodingError::ArgumentCount {
                    expected: fields.len(),
                    actual: items.len(),
                });
            }
            let pairs: Vec<_> = items.iter().zip(fields.iter().map(|(_, ty)| ty)).collect();
            out.extend_from_slice(&encode_sequence(&pairs)?);
        }
        _ => {
            return Err(EncodingError::TypeMismatch {
                ty: ty.canonical(),
                value: value.kind(),
            })
        }
    }
    Ok(())
}

fn uint_word(value: &AbiValue, bits: usize, ty: &AbiType) -> Result<[u8; 32], EncodingError> {
    let magnitude = match value {
        AbiValue::Uint(value) => *value,
        AbiValue::Int(value) if value.is_negative() => {
            return Err(EncodingError::NegativeUnsigned { ty: ty.canonical() })
        }
        AbiValue::Int(value) => value.into_raw(),
        other => {
            return Err(EncodingError::TypeMismatch {
                ty: ty.canonical(),
                value: other.kind(),
            })
        }
    };
    if magnitude.bit_len() > bits {
        return Err(EncodingError::IntegerOverflow { ty: ty.canonical() });
    }
    Ok(magnitude.to_be_bytes())
}

fn int_word(value: &AbiValue, bits: usize, ty: &AbiType) -> Result<[u8; 32], EncodingError> {
    let signed = match value {
        AbiValue::Int(value) => *value,
        AbiValue::Uint(value) => {
            if value.bit_len() >= bits {
                return Err(EncodingError::IntegerOverflow { ty: ty.canonical() });
            }
            I256::from_raw(*value)
        }
        other => {
            return Err(EncodingError::TypeMismatch {
                ty: ty.canonical(),
                value: other.kind(),
            })
        }
    };
    if !int_fits(signed, bits) {
        return Err(EncodingError::IntegerOverflow { ty: ty.canonical() });
    }
    Ok(signed.into_raw().to_be_bytes())
}

/// Returns `true` when `value` lies within `[-2^(bits-1), 2^(bits-1) - 1]`.
pub(crate) fn int_fits(value: I256, bits: usize) -> bool {
    if bits >= 256 {
        return true;
    }
    let limit = U256::from(1u8) << (bits - 1);
    let magnitude = value.unsigned_abs();
    if value.is_negative() {
        magnitude <= limit
    } else {
        magnitude < limit
    }
}

/// Big-endian word holding `value`.
pub(crate) fn usize_word(value: usize) -> [u8; 32] {
    U256::from(value).to_be_bytes()
}

/// Appends `data` followed by zero bytes up to the next word boundary.
pub(crate) fn extend_padded(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(data);
    let rem = data.len() % WORD;
    if rem != 0 {
        out.resize(out.len() + WORD - rem, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, hex};

    fn word(last: u8) -> Vec<u8> {
        let mut w = vec![0u8; 32];
        w[31] = last;
        w
    }

    #[test]
    fn encodes_single_uint() {
        let out = encode(&[AbiValue::from(1u64)], &[AbiType::Uint(256)]).unwrap();
        assert_eq!(out, word(1));
    }

    #[test]
    fn encodes_single_string() {
        let out = encode(&["hi".into()], &[AbiType::String]).unwrap();
        assert_eq!(out.len(), 96);
        assert_eq!(&out[..32], word(0x20).as_slice());
        assert_eq!(&out[32..64], word(2).as_slice());
        assert_eq!(&out[64..66], b"hi");
        assert!(out[66..].iter().all(|b| *b == 0));
    }

    #[test]
    fn mixed_static_and_dynamic_offsets_point_past_head() {
        let types = [AbiType::Uint(256), AbiType::Bytes, AbiType::Bool, AbiType::String];
        let values = [
            AbiValue::from(7u64),
            AbiValue::Bytes(vec![0xaa; 33]),
            AbiValue::Bool(true),
            AbiValue::from("x"),
        ];
        let out = encode(&values, &types).unwrap();
        // head: 4 words; bytes payload: length + 2 words; string payload: length + 1 word
        assert_eq!(out.len(), 32 * (4 + 3 + 2));
        assert_eq!(&out[32..64], usize_word(128).as_slice());
        assert_eq!(&out[96..128], usize_word(224).as_slice());
    }

    #[test]
    fn negative_int_is_sign_extended() {
        let out = encode(&[AbiValue::Int(I256::MINUS_ONE)], &[AbiType::Int(8)]).unwrap();
        assert_eq!(out, vec![0xff; 32]);
    }

    #[test]
    fn rejects_out_of_range_integers() {
        let too_big = AbiValue::Uint(U256::from(256u64));
        assert!(matches!(
            encode(&[too_big], &[AbiType::Uint(8)]),
            Err(EncodingError::IntegerOverflow { .. })
        ));

        let negative = AbiValue::Int(I256::MINUS_ONE);
        assert!(matches!(
            encode(&[negative], &[AbiType::Uint(256)]),
            Err(EncodingError::NegativeUnsigned { .. })
        ));

        let max_i8 = AbiValue::Int(I256::try_from(127i64).unwrap());
        assert!(encode(&[max_i8], &[AbiType::Int(8)]).is_ok());
        let over_i8 = AbiValue::Int(I256::try_from(128i64).unwrap());
        assert!(encode(&[over_i8], &[AbiType::Int(8)]).is_err());
        let min_i8 = AbiValue::Int(I256::try_from(-128i64).unwrap());
        assert!(encode(&[min_i8], &[AbiType::Int(8)]).is_ok());
        let under_i8 = AbiValue::Int(I256::try_from(-129i64).unwrap());
        assert!(encode(&[under_i8], &[AbiType::Int(8)]).is_err());
    }

    #[test]
    fn fixed_bytes_are_right_padded() {
        let out = encode(&[AbiValue::FixedBytes(vec![0x12, 0x34])], &[AbiType::FixedBytes(4)])
            .unwrap();
        assert_eq!(&out[..2], &[0x12, 0x34]);
        assert!(out[2..].iter().all(|b| *b == 0));

        let err = encode(&[AbiValue::FixedBytes(vec![0; 5])], &[AbiType::FixedBytes(4)]);
        assert!(matches!(err, Err(EncodingError::FixedBytesTooLong { len: 5, .. })));
    }

    #[test]
    fn address_is_left_padded() {
        let addr = address!("0x00000000000000000000000000000000000000aa");
        let out = encode(&[addr.into()], &[AbiType::Address]).unwrap();
        assert_eq!(out, word(0xaa));
    }

    #[test]
    fn static_tuple_is_inlined_and_dynamic_tuple_goes_to_tail() {
        let static_tuple = AbiType::tuple([AbiType::Uint(256), AbiType::Bool]);
        let out = encode(
            &[AbiValue::Tuple(vec![1u64.into(), true.into()])],
            &[static_tuple],
        )
        .unwrap();
        assert_eq!(out, [word(1), word(1)].concat());

        let dynamic_tuple = AbiType::tuple([AbiType::Uint(256), AbiType::String]);
        let out = encode(
            &[AbiValue::Tuple(vec![1u64.into(), "a".into()])],
            &[dynamic_tuple],
        )
        .unwrap();
        let expected = hex!(
            "0000000000000000000000000000000000000000000000000000000000000020"
            "0000000000000000000000000000000000000000000000000000000000000001"
            "0000000000000000000000000000000000000000000000000000000000000040"
            "0000000000000000000000000000000000000000000000000000000000000001"
            "6100000000000000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn argument_and_array_length_mismatches_fail() {
        assert!(matches!(
            encode(&[], &[AbiType::Bool]),
            Err(EncodingError::ArgumentCount { expected: 1, actual: 0 })
        ));
        let arr = AbiType::fixed_array(AbiType::Bool, 2);
        assert!(matches!(
            encode(&[AbiValue::Array(vec![true.into()])], &[arr]),
            Err(EncodingError::ArrayLength { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            encode(&[AbiValue::Bool(true)], &[AbiType::Address]),
            Err(EncodingError::TypeMismatch { .. })
        ));
    }
}
