//! The ABI type system.
//!
//! An [`AbiType`] describes the wire shape of a single value and answers the two
//! questions the codec needs: whether the value is *dynamic* (encoded in the tail
//! behind an offset word) and, if not, how many bytes it occupies in the head.

use crate::error::{AbiError, Result};
use std::fmt;

/// Size in bytes of one ABI word.
pub const WORD: usize = 32;

/// Wire shape of a single ABI value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// Unsigned integer of the given bit width (8..=256, step 8).
    Uint(usize),
    /// Two's complement signed integer of the given bit width (8..=256, step 8).
    Int(usize),
    /// Boolean, encoded as a 0/1 word.
    Bool,
    /// 20-byte account address.
    Address,
    /// Fixed-size byte string of 1..=32 bytes.
    FixedBytes(usize),
    /// Variable-length byte string.
    Bytes,
    /// Variable-length UTF-8 string.
    String,
    /// Array of `elem`; `None` is dynamic-length, `Some(n)` has exactly `n` elements.
    Array(Box<AbiType>, Option<usize>),
    /// Ordered, optionally named, fields.
    Tuple(Vec<(String, AbiType)>),
}

impl AbiType {
    /// Unsigned integer type, validating the width.
    pub fn uint(bits: usize) -> Result<Self> {
        check_bits(bits, "uint")?;
        Ok(Self::Uint(bits))
    }

    /// Signed integer type, validating the width.
    pub fn int(bits: usize) -> Result<Self> {
        check_bits(bits, "int")?;
        Ok(Self::Int(bits))
    }

    /// Fixed-size byte string type, validating the size.
    pub fn fixed_bytes(size: usize) -> Result<Self> {
        if !(1..=32).contains(&size) {
            return Err(AbiError::InvalidType {
                ty: format!("bytes{size}"),
                reason: "fixed bytes size must be within 1..=32",
            });
        }
        Ok(Self::FixedBytes(size))
    }

    /// Dynamic-length array of `elem`.
    pub fn array(elem: Self) -> Self {
        Self::Array(Box::new(elem), None)
    }

    /// Fixed-length array of `len` elements.
    pub fn fixed_array(elem: Self, len: usize) -> Self {
        Self::Array(Box::new(elem), Some(len))
    }

    /// Tuple of unnamed fields.
    pub fn tuple(fields: impl IntoIterator<Item = Self>) -> Self {
        Self::Tuple(fields.into_iter().map(|ty| (String::new(), ty)).collect())
    }

    /// Returns `true` when the encoding lives in the tail behind an offset word.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Bytes | Self::String | Self::Array(_, None) => true,
            Self::Array(elem, Some(_)) => elem.is_dynamic(),
            Self::Tuple(fields) => fields.iter().any(|(_, ty)| ty.is_dynamic()),
            _ => false,
        }
    }

    /// Encoded size of a static type, `None` for dynamic types.
    pub fn static_size(&self) -> Option<usize> {
        if self.is_dynamic() {
            return None;
        }
        Some(match self {
            Self::Array(elem, Some(len)) => elem.static_size()?.saturating_mul(*len),
            Self::Tuple(fields) => fields
                .iter()
                .map(|(_, ty)| ty.static_size())
                .sum::<Option<usize>>()?,
            _ => WORD,
        })
    }

    /// Bytes this type occupies in the head of an enclosing sequence.
    pub fn head_size(&self) -> usize {
        self.static_size().unwrap_or(WORD)
    }

    /// Canonical type string as used in signatures, e.g. `(uint256,bytes)[]`.
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// Parses a canonical type string.
    ///
    /// Accepts the elementary names, the `uint`/`int` aliases for 256 bits,
    /// array suffixes (`T[]`, `T[k]`, nested) and parenthesized tuples.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(invalid(text, "empty type"));
        }

        if text.ends_with(']') {
            let open = text.rfind('[').ok_or_else(|| invalid(text, "unbalanced brackets"))?;
            let elem = Self::parse(&text[..open])?;
            let len = &text[open + 1..text.len() - 1];
            if len.is_empty() {
                return Ok(Self::array(elem));
            }
            let len = len
                .parse::<usize>()
                .map_err(|_| invalid(text, "array length is not a number"))?;
            return Ok(Self::fixed_array(elem, len));
        }

        if let Some(inner) = text.strip_prefix('(') {
            let inner = inner
                .strip_suffix(')')
                .ok_or_else(|| invalid(text, "unbalanced parentheses"))?;
            let fields = split_top_level(inner)
                .ok_or_else(|| invalid(text, "unbalanced parentheses"))?
                .into_iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self::tuple(fields));
        }

        match text {
            "bool" => return Ok(Self::Bool),
            "address" => return Ok(Self::Address),
            "string" => return Ok(Self::String),
            "bytes" => return Ok(Self::Bytes),
            "uint" => return Ok(Self::Uint(256)),
            "int" => return Ok(Self::Int(256)),
            _ => {}
        }

        if let Some(bits) = text.strip_prefix("uint") {
            return Self::uint(parse_size(text, bits)?);
        }
        if let Some(bits) = text.strip_prefix("int") {
            return Self::int(parse_size(text, bits)?);
        }
        if let Some(size) = text.strip_prefix("bytes") {
            return Self::fixed_bytes(parse_size(text, size)?);
        }

        Err(invalid(text, "unknown elementary type"))
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::Bool => f.write_str("bool"),
            Self::Address => f.write_str("address"),
            Self::FixedBytes(size) => write!(f, "bytes{size}"),
            Self::Bytes => f.write_str("bytes"),
            Self::String => f.write_str("string"),
            Self::Array(elem, None) => write!(f, "{elem}[]"),
            Self::Array(elem, Some(len)) => write!(f, "{elem}[{len}]"),
            Self::Tuple(fields) => {
                f.write_str("(")?;
                for (i, (_, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl std::str::FromStr for AbiType {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn check_bits(bits: usize, prefix: &str) -> Result<()> {
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(AbiError::InvalidType {
            ty: format!("{prefix}{bits}"),
            reason: "integer width must be a multiple of 8 within 8..=256",
        });
    }
    Ok(())
}

fn parse_size(text: &str, digits: &str) -> Result<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || digits.starts_with('0')
    {
        return Err(invalid(text, "malformed size suffix"));
    }
    digits.parse().map_err(|_| invalid(text, "malformed size suffix"))
}

fn invalid(text: &str, reason: &'static str) -> AbiError {
    AbiError::InvalidType { ty: text.to_string(), reason }
}

/// Splits a comma-separated list at parenthesis depth zero.
///
/// Returns `None` when the parentheses are unbalanced. An empty input yields an
/// empty list.
pub(crate) fn split_top_level(text: &str) -> Option<Vec<&str>> {
    let text = text.trim();
    if text.is_empty() {
        return Some(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(text[start..].trim());
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_elementary_types() {
        assert_eq!(AbiType::parse("uint256").unwrap(), AbiType::Uint(256));
        assert_eq!(AbiType::parse("uint").unwrap(), AbiType::Uint(256));
        assert_eq!(AbiType::parse("int8").unwrap(), AbiType::Int(8));
        assert_eq!(AbiType::parse("bytes4").unwrap(), AbiType::FixedBytes(4));
        assert_eq!(AbiType::parse("bytes").unwrap(), AbiType::Bytes);
        assert_eq!(AbiType::parse(" address ").unwrap(), AbiType::Address);
    }

    #[test]
    fn rejects_invalid_widths() {
        assert!(AbiType::parse("uint7").is_err());
        assert!(AbiType::parse("uint264").is_err());
        assert!(AbiType::parse("uint0").is_err());
        assert!(AbiType::parse("uint08").is_err());
        assert!(AbiType::parse("bytes33").is_err());
        assert!(AbiType::parse("bytes0").is_err());
        assert!(AbiType::parse("fixed128x18").is_err());
    }

    #[test]
    fn nested_array_suffixes_bind_outermost_last() {
        let ty = AbiType::parse("uint8[3][]").unwrap();
        assert_eq!(ty, AbiType::array(AbiType::fixed_array(AbiType::Uint(8), 3)));
        assert!(ty.is_dynamic());
        assert_eq!(ty.canonical(), "uint8[3][]");
    }

    #[test]
    fn tuple_round_trips_through_canonical_form() {
        let text = "(uint256,(bool,string)[],bytes32[2])";
        let ty = AbiType::parse(text).unwrap();
        assert_eq!(ty.canonical(), text);
        assert!(ty.is_dynamic());
        assert_eq!(AbiType::parse("()").unwrap(), AbiType::Tuple(vec![]));
    }

    #[test]
    fn static_sizes() {
        assert_eq!(AbiType::Bool.static_size(), Some(32));
        assert_eq!(
            AbiType::parse("(uint256,address[3])").unwrap().static_size(),
            Some(128)
        );
        assert_eq!(AbiType::parse("string[2]").unwrap().static_size(), None);
        assert_eq!(AbiType::parse("string[2]").unwrap().head_size(), 32);
    }

    #[test]
    fn dynamic_classification() {
        for dynamic in ["bytes", "string", "uint256[]", "string[2]", "(bool,bytes)"] {
            assert!(AbiType::parse(dynamic).unwrap().is_dynamic(), "{dynamic}");
        }
        for fixed in ["uint256", "bytes32", "address[4]", "(bool,int8)"] {
            assert!(!AbiType::parse(fixed).unwrap().is_dynamic(), "{fixed}");
        }
    }
}
