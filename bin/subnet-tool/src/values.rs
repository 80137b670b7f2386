//! Command-line text to and from ABI values.

use alloy_primitives::{hex, Address, I256, U256};
use eyre::{bail, eyre, Result, WrapErr};
use serde_json::Value;
use subnet_abi::{AbiType, AbiValue};

/// Parses one command-line argument as a value of `ty`.
///
/// Scalars are written plainly (`42`, `0x2a`, `true`, `0x00…aa`). Arrays and
/// tuples are JSON arrays whose items are scalars in the same notation.
pub(crate) fn parse_arg(ty: &AbiType, text: &str) -> Result<AbiValue> {
    match ty {
        AbiType::Array(..) | AbiType::Tuple(_) => {
            let json: Value = serde_json::from_str(text)
                .wrap_err_with(|| format!("`{text}` is not a JSON array for {ty}"))?;
            from_json(ty, &json)
        }
        _ => parse_scalar(ty, text),
    }
}

fn from_json(ty: &AbiType, json: &Value) -> Result<AbiValue> {
    match (ty, json) {
        (AbiType::Array(elem, len), Value::Array(items)) => {
            if len.is_some_and(|len| len != items.len()) {
                bail!("{ty} takes {} items, got {}", len.unwrap_or_default(), items.len());
            }
            let items = items.iter().map(|item| from_json(elem, item)).collect::<Result<_>>()?;
            Ok(AbiValue::Array(items))
        }
        (AbiType::Tuple(fields), Value::Array(items)) => {
            if fields.len() != items.len() {
                bail!("{ty} has {} fields, got {}", fields.len(), items.len());
            }
            let items = fields
                .iter()
                .zip(items)
                .map(|((_, field), item)| from_json(field, item))
                .collect::<Result<_>>()?;
            Ok(AbiValue::Tuple(items))
        }
        (AbiType::Array(..) | AbiType::Tuple(_), other) => {
            bail!("expected a JSON array for {ty}, got {other}")
        }
        (_, Value::String(text)) => parse_scalar(ty, text),
        (_, Value::Bool(_) | Value::Number(_)) => parse_scalar(ty, &json.to_string()),
        (_, other) => bail!("cannot read {other} as {ty}"),
    }
}

fn parse_scalar(ty: &AbiType, text: &str) -> Result<AbiValue> {
    let invalid = |err: &dyn std::fmt::Display| eyre!("invalid {ty} `{text}`: {err}");
    let value = match ty {
        AbiType::Uint(_) => AbiValue::Uint(text.parse::<U256>().map_err(|err| invalid(&err))?),
        AbiType::Int(_) => AbiValue::Int(I256::from_dec_str(text).map_err(|err| invalid(&err))?),
        AbiType::Bool => match text {
            "true" => AbiValue::Bool(true),
            "false" => AbiValue::Bool(false),
            _ => return Err(invalid(&"expected true or false")),
        },
        AbiType::Address => {
            AbiValue::Address(text.parse::<Address>().map_err(|err| invalid(&err))?)
        }
        AbiType::FixedBytes(_) => AbiValue::FixedBytes(parse_hex(text)?),
        AbiType::Bytes => AbiValue::Bytes(parse_hex(text)?),
        AbiType::String => AbiValue::String(text.to_owned()),
        AbiType::Array(..) | AbiType::Tuple(_) => return parse_arg(ty, text),
    };
    Ok(value)
}

/// Decodes hex with or without a `0x` prefix.
pub(crate) fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).wrap_err_with(|| format!("`{text}` is not hex"))
}

/// Human-readable rendering of a decoded value.
pub(crate) fn render(value: &AbiValue) -> String {
    match value {
        AbiValue::Uint(value) => value.to_string(),
        AbiValue::Int(value) => value.to_string(),
        AbiValue::Bool(value) => value.to_string(),
        AbiValue::Address(address) => address.to_checksum(None),
        AbiValue::FixedBytes(bytes) | AbiValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        AbiValue::String(text) => format!("{text:?}"),
        AbiValue::Array(items) => format!("[{}]", join(items)),
        AbiValue::Tuple(items) => format!("({})", join(items)),
    }
}

fn join(items: &[AbiValue]) -> String {
    items.iter().map(render).collect::<Vec<_>>().join(", ")
}
