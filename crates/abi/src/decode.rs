//! Head/tail decoder.
//!
//! Every offset and length taken from the wire is bounds-checked against the
//! region it is relative to before it is followed, and an offset may never point
//! back into the static head of its own sequence. Decoding either yields every
//! value or an error, never a partial result.

use crate::{
    encode::int_fits,
    error::DecodingError,
    ty::{AbiType, WORD},
    value::AbiValue,
};
use alloy_primitives::{Address, I256, U256};

/// Decodes `data` against `types`, tolerating trailing bytes that are not a
/// whole word.
pub fn decode(data: &[u8], types: &[AbiType]) -> Result<Vec<AbiValue>, DecodingError> {
    Decoder::lenient().decode(data, types)
}

/// Decodes `data` against `types`, requiring a whole number of words and zeroed
/// padding in `address` and `bytesN` words.
pub fn decode_strict(data: &[u8], types: &[AbiType]) -> Result<Vec<AbiValue>, DecodingError> {
    Decoder::strict().decode(data, types)
}

/// Configurable decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decoder {
    strict: bool,
}

impl Decoder {
    /// Decoder used for precompile input.
    pub const fn strict() -> Self {
        Self { strict: true }
    }

    /// Decoder used by tooling that must accept legacy encoders.
    pub const fn lenient() -> Self {
        Self { strict: false }
    }

    /// Whether this decoder runs in strict mode.
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// Decodes a full argument sequence.
    pub fn decode(&self, data: &[u8], types: &[AbiType]) -> Result<Vec<AbiValue>, DecodingError> {
        if self.strict && data.len() % WORD != 0 {
            return Err(DecodingError::NotWordAligned { len: data.len() });
        }
        let types: Vec<&AbiType> = types.iter().collect();
        self.decode_sequence(data, &types)
    }

    fn decode_sequence(
        &self,
        buf: &[u8],
        types: &[&AbiType],
    ) -> Result<Vec<AbiValue>, DecodingError> {
        let head_size = types
            .iter()
            .try_fold(0usize, |acc, ty| acc.checked_add(ty.head_size()))
            .unwrap_or(usize::MAX);
        if head_size > buf.len() {
            return Err(DecodingError::BufferTooShort {
                offset: 0,
                needed: head_size,
                available: buf.len(),
            });
        }

        let mut cursor = 0;
        let mut values = Vec::with_capacity(types.len());
        for ty in types {
            let value = if ty.is_dynamic() {
                let offset = read_usize(buf, cursor, "offset")?;
                if offset < head_size {
                    return Err(DecodingError::OffsetIntoHead { offset, head: head_size });
                }
                if offset > buf.len() {
                    return Err(DecodingError::OutOfBounds {
                        what: "offset",
                        value: offset as u64,
                        len: buf.len(),
                    });
                }
                self.decode_value(&buf[offset..], ty)?
            } else {
                self.decode_value(&buf[cursor..], ty)?
            };
            cursor += ty.head_size();
            values.push(value);
        }
        Ok(values)
    }

    fn decode_value(&self, buf: &[u8], ty: &AbiType) -> Result<AbiValue, DecodingError> {
        match ty {
            AbiType::Uint(bits) => {
                let value = U256::from_be_bytes(*read_word(buf, 0)?);
                if value.bit_len() > *bits {
                    return Err(DecodingError::IntegerOverflow { ty: ty.canonical() });
                }
                Ok(AbiValue::Uint(value))
            }
            AbiType::Int(bits) => {
                let value = I256::from_raw(U256::from_be_bytes(*read_word(buf, 0)?));
                if !int_fits(value, *bits) {
                    return Err(DecodingError::IntegerOverflow { ty: ty.canonical() });
                }
                Ok(AbiValue::Int(value))
            }
            AbiType::Bool => {
                let word = read_word(buf, 0)?;
                if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
                    return Err(DecodingError::InvalidBool);
                }
                Ok(AbiValue::Bool(word[31] == 1))
            }
            AbiType::Address => {
                let word = read_word(buf, 0)?;
                if self.strict && word[..12].iter().any(|b| *b != 0) {
                    return Err(DecodingError::DirtyPadding { ty: ty.canonical() });
                }
                Ok(AbiValue::Address(Address::from_slice(&word[12..])))
            }
            AbiType::FixedBytes(size) => {
                let word = read_word(buf, 0)?;
                if self.strict && word[*size..].iter().any(|b| *b != 0) {
                    return Err(DecodingError::DirtyPadding { ty: ty.canonical() });
                }
                Ok(AbiValue::FixedBytes(word[..*size].to_vec()))
            }
            AbiType::Bytes => Ok(AbiValue::Bytes(read_payload(buf)?.to_vec())),
            AbiType::String => {
                let payload = read_payload(buf)?.to_vec();
                String::from_utf8(payload)
                    .map(AbiValue::String)
                    .map_err(|_| DecodingError::InvalidUtf8)
            }
            AbiType::Array(elem, None) => {
                let len = read_usize(buf, 0, "length")?;
                let rest = &buf[WORD..];
                let items = self.decode_repeated(rest, elem, len, "length")?;
                Ok(AbiValue::Array(items))
            }
            AbiType::Array(elem, Some(len)) => {
                Ok(AbiValue::Array(self.decode_repeated(buf, elem, *len, "array")?))
            }
            AbiType::Tuple(fields) => {
                let types: Vec<&AbiType> = fields.iter().map(|(_, ty)| ty).collect();
                Ok(AbiValue::Tuple(self.decode_sequence(buf, &types)?))
            }
        }
    }

    /// Decodes `len` consecutive elements, rejecting lengths whose heads alone
    /// could not fit in `buf` before allocating anything.
    fn decode_repeated(
        &self,
        buf: &[u8],
        elem: &AbiType,
        len: usize,
        what: &'static str,
    ) -> Result<Vec<AbiValue>, DecodingError> {
        let fits = len
            .checked_mul(elem.head_size().max(1))
            .is_some_and(|needed| needed <= buf.len());
        if !fits {
            return Err(DecodingError::OutOfBounds {
                what,
                value: len as u64,
                len: buf.len(),
            });
        }
        let types = vec![elem; len];
        self.decode_sequence(buf, &types)
    }
}

fn read_word(buf: &[u8], at: usize) -> Result<&[u8; 32], DecodingError> {
    buf.get(at..at.saturating_add(WORD))
        .and_then(|word| word.try_into().ok())
        .ok_or(DecodingError::BufferTooShort {
            offset: at,
            needed: WORD,
            available: buf.len().saturating_sub(at),
        })
}

/// Reads a word that must hold an offset or length small enough to index memory.
fn read_usize(buf: &[u8], at: usize, what: &'static str) -> Result<usize, DecodingError> {
    let word = read_word(buf, at)?;
    let too_large = DecodingError::OutOfBounds {
        what,
        value: u64::MAX,
        len: buf.len(),
    };
    if word[..24].iter().any(|b| *b != 0) {
        return Err(too_large);
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(low)).map_err(|_| too_large)
}

/// Reads a length-prefixed byte payload.
fn read_payload(buf: &[u8]) -> Result<&[u8], DecodingError> {
    let len = read_usize(buf, 0, "length")?;
    let available = buf.len() - WORD;
    if len > available {
        return Err(DecodingError::OutOfBounds {
            what: "length",
            value: len as u64,
            len: available,
        });
    }
    Ok(&buf[WORD..WORD + len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode, usize_word};

    fn round_trip(values: Vec<AbiValue>, types: &[AbiType]) {
        let encoded = encode(&values, types).unwrap();
        assert_eq!(decode_strict(&encoded, types).unwrap(), values);
    }

    #[test]
    fn round_trips_nested_values() {
        let types = [
            AbiType::parse("(uint64,string[])").unwrap(),
            AbiType::parse("bytes").unwrap(),
            AbiType::parse("int16[2]").unwrap(),
            AbiType::parse("bytes3").unwrap(),
        ];
        round_trip(
            vec![
                AbiValue::Tuple(vec![
                    9u64.into(),
                    AbiValue::Array(vec!["one".into(), "".into(), "three".into()]),
                ]),
                AbiValue::Bytes(vec![1, 2, 3]),
                AbiValue::Array(vec![
                    AbiValue::Int(I256::try_from(-300i64).unwrap()),
                    AbiValue::Int(I256::try_from(300i64).unwrap()),
                ]),
                AbiValue::FixedBytes(vec![0xde, 0xad, 0xbe]),
            ],
            &types,
        );
    }

    #[test]
    fn round_trips_empty_dynamic_values() {
        round_trip(
            vec![AbiValue::Array(vec![]), AbiValue::Bytes(vec![])],
            &[AbiType::array(AbiType::Address), AbiType::Bytes],
        );
    }

    #[test]
    fn empty_tail_may_end_the_buffer() {
        let ty = AbiType::Array(Box::new(AbiType::String), Some(0));
        let types = [ty];
        let encoded = encode(&[AbiValue::Array(vec![])], &types).unwrap();
        assert_eq!(encoded, usize_word(32).to_vec());
        assert_eq!(decode(&encoded, &types).unwrap(), vec![AbiValue::Array(vec![])]);
        round_trip(vec![AbiValue::Array(vec![])], &types);

        let data = usize_word(32).to_vec();
        assert!(matches!(
            decode(&data, &[AbiType::String]),
            Err(DecodingError::BufferTooShort { .. })
        ));
    }

    #[test]
    fn strict_mode_requires_whole_words() {
        let mut encoded = encode(&[1u64.into()], &[AbiType::Uint(256)]).unwrap();
        encoded.push(0);
        assert_eq!(
            decode_strict(&encoded, &[AbiType::Uint(256)]),
            Err(DecodingError::NotWordAligned { len: 33 })
        );
        assert_eq!(
            decode(&encoded, &[AbiType::Uint(256)]).unwrap(),
            vec![AbiValue::from(1u64)]
        );
    }

    #[test]
    fn rejects_offset_into_head() {
        let mut data = usize_word(0).to_vec();
        data.extend_from_slice(&usize_word(0));
        assert_eq!(
            decode(&data, &[AbiType::Bytes]),
            Err(DecodingError::OffsetIntoHead { offset: 0, head: 32 })
        );
    }

    #[test]
    fn rejects_offset_past_end() {
        let data = usize_word(64).to_vec();
        assert!(matches!(
            decode(&data, &[AbiType::String]),
            Err(DecodingError::OutOfBounds { what: "offset", .. })
        ));

        let mut huge = [0xffu8; 32].to_vec();
        huge.extend_from_slice(&usize_word(0));
        assert!(matches!(
            decode(&huge, &[AbiType::String]),
            Err(DecodingError::OutOfBounds { what: "offset", value: u64::MAX, .. })
        ));
    }

    #[test]
    fn rejects_length_overflowing_buffer() {
        let mut data = usize_word(32).to_vec();
        data.extend_from_slice(&usize_word(1000));
        data.extend_from_slice(&[0u8; 32]);
        assert_eq!(
            decode(&data, &[AbiType::Bytes]),
            Err(DecodingError::OutOfBounds { what: "length", value: 1000, len: 32 })
        );
    }

    #[test]
    fn rejects_huge_array_length_without_allocating() {
        let mut data = usize_word(32).to_vec();
        data.extend_from_slice(&usize_word(usize::MAX / 2));
        assert!(matches!(
            decode(&data, &[AbiType::array(AbiType::Uint(256))]),
            Err(DecodingError::OutOfBounds { what: "length", .. })
        ));
    }

    #[test]
    fn rejects_short_head() {
        assert_eq!(
            decode(&[0u8; 32], &[AbiType::Bool, AbiType::Bool]),
            Err(DecodingError::BufferTooShort { offset: 0, needed: 64, available: 32 })
        );
    }

    #[test]
    fn validates_integer_and_bool_words() {
        assert_eq!(
            decode(&usize_word(256), &[AbiType::Uint(8)]),
            Err(DecodingError::IntegerOverflow { ty: "uint8".into() })
        );
        assert_eq!(decode(&usize_word(2), &[AbiType::Bool]), Err(DecodingError::InvalidBool));
        // 0x80 without sign extension is not a valid int8
        assert!(decode(&usize_word(0x80), &[AbiType::Int(8)]).is_err());
        assert_eq!(
            decode(&[0xffu8; 32], &[AbiType::Int(8)]).unwrap(),
            vec![AbiValue::Int(I256::MINUS_ONE)]
        );
    }

    #[test]
    fn strict_mode_checks_padding() {
        let dirty = [0x11u8; 32];
        assert!(decode(&dirty, &[AbiType::Address]).is_ok());
        assert!(matches!(
            decode_strict(&dirty, &[AbiType::Address]),
            Err(DecodingError::DirtyPadding { .. })
        ));
        assert!(matches!(
            decode_strict(&dirty, &[AbiType::FixedBytes(4)]),
            Err(DecodingError::DirtyPadding { .. })
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let encoded = encode(&[AbiValue::Bytes(vec![0xff, 0xfe])], &[AbiType::Bytes]).unwrap();
        assert_eq!(decode(&encoded, &[AbiType::String]), Err(DecodingError::InvalidUtf8));
    }
}
