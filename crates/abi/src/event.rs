//! Event and custom error descriptors.

use crate::{
    decode::{decode, Decoder},
    encode::encode,
    error::{AbiError, DecodingError, EncodingError, Result},
    function::{selector, signature_of, Argument},
    topics::{encode_topic, is_hashed_topic},
    ty::AbiType,
    value::AbiValue,
};
use alloy_primitives::{keccak256, Bytes, LogData, B256, U256};

/// Maximum number of topics in a log.
const MAX_TOPICS: usize = 4;

/// An event descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Declared name.
    pub name: String,
    /// Arguments in declaration order; `indexed` ones go to topics.
    pub inputs: Vec<Argument>,
    /// Anonymous events do not emit their signature hash as the first topic.
    pub anonymous: bool,
    topic: B256,
}

impl Event {
    /// Creates an event, rejecting more indexed arguments than a log can carry.
    pub fn new(name: impl Into<String>, inputs: Vec<Argument>, anonymous: bool) -> Result<Self> {
        let name = name.into();
        let max = MAX_TOPICS - usize::from(!anonymous);
        let count = inputs.iter().filter(|arg| arg.indexed).count();
        if count > max {
            return Err(AbiError::TooManyIndexed { event: name, count, max });
        }
        let topic = keccak256(signature_of(&name, &inputs));
        Ok(Self { name, inputs, anonymous, topic })
    }

    /// Canonical signature, e.g. `RoleSet(uint256,address,address,uint256)`.
    pub fn signature(&self) -> String {
        signature_of(&self.name, &self.inputs)
    }

    /// Keccak hash of the signature, emitted as the first topic unless anonymous.
    pub const fn topic(&self) -> B256 {
        self.topic
    }

    /// Encodes `values` (one per input, in declaration order) into topics and data.
    pub fn encode_log(&self, values: &[AbiValue]) -> Result<(Vec<B256>, Vec<u8>), EncodingError> {
        if values.len() != self.inputs.len() {
            return Err(EncodingError::ArgumentCount {
                expected: self.inputs.len(),
                actual: values.len(),
            });
        }
        let mut topics = Vec::with_capacity(MAX_TOPICS);
        if !self.anonymous {
            topics.push(self.topic);
        }
        let mut data_values = Vec::new();
        let mut data_types = Vec::new();
        for (arg, value) in self.inputs.iter().zip(values) {
            if arg.indexed {
                topics.push(encode_topic(value, &arg.ty)?);
            } else {
                data_values.push(value.clone());
                data_types.push(arg.ty.clone());
            }
        }
        Ok((topics, encode(&data_values, &data_types)?))
    }

    /// Encodes `values` into log data ready to attach to an address.
    pub fn encode_log_data(&self, values: &[AbiValue]) -> Result<LogData, EncodingError> {
        let (topics, data) = self.encode_log(values)?;
        Ok(LogData::new_unchecked(topics, Bytes::from(data)))
    }

    /// Decodes a log back into one value per input.
    ///
    /// Indexed arguments stored as hashes come back as 32-byte
    /// [`AbiValue::FixedBytes`] holding the hash.
    pub fn decode_log(&self, topics: &[B256], data: &[u8]) -> Result<Vec<AbiValue>, DecodingError> {
        let indexed = self.inputs.iter().filter(|arg| arg.indexed).count();
        let expected = indexed + usize::from(!self.anonymous);
        if topics.len() != expected {
            return Err(DecodingError::TopicCount { expected, actual: topics.len() });
        }
        let mut topics = topics.iter();
        if !self.anonymous {
            let first = topics.next().copied().unwrap_or_default();
            if first != self.topic {
                return Err(DecodingError::EventSignatureMismatch {
                    expected: self.topic,
                    actual: first,
                });
            }
        }

        let data_types: Vec<AbiType> = self
            .inputs
            .iter()
            .filter(|arg| !arg.indexed)
            .map(|arg| arg.ty.clone())
            .collect();
        let mut data_values = decode(data, &data_types)?.into_iter();

        let mut values = Vec::with_capacity(self.inputs.len());
        for arg in &self.inputs {
            let value = if arg.indexed {
                let topic = topics.next().copied().unwrap_or_default();
                if is_hashed_topic(&arg.ty) {
                    AbiValue::FixedBytes(topic.to_vec())
                } else {
                    decode(topic.as_slice(), std::slice::from_ref(&arg.ty))?
                        .pop()
                        .unwrap_or(AbiValue::FixedBytes(topic.to_vec()))
                }
            } else {
                data_values.next().ok_or(DecodingError::TopicCount {
                    expected,
                    actual: topics.len(),
                })?
            };
            values.push(value);
        }
        Ok(values)
    }
}

/// A custom error descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomError {
    /// Declared name.
    pub name: String,
    /// Arguments in declaration order.
    pub inputs: Vec<Argument>,
    selector: [u8; 4],
}

impl CustomError {
    /// Creates an error descriptor and derives its selector.
    pub fn new(name: impl Into<String>, inputs: Vec<Argument>) -> Self {
        let name = name.into();
        let selector = selector(&signature_of(&name, &inputs));
        Self { name, inputs, selector }
    }

    /// Canonical signature, e.g. `Error(string)`.
    pub fn signature(&self) -> String {
        signature_of(&self.name, &self.inputs)
    }

    /// The 4-byte selector that prefixes revert data.
    pub const fn selector(&self) -> [u8; 4] {
        self.selector
    }

    fn types(&self) -> Vec<AbiType> {
        self.inputs.iter().map(|arg| arg.ty.clone()).collect()
    }

    /// Encodes revert data.
    pub fn encode(&self, values: &[AbiValue]) -> Result<Vec<u8>, EncodingError> {
        let args = encode(values, &self.types())?;
        let mut out = Vec::with_capacity(4 + args.len());
        out.extend_from_slice(&self.selector);
        out.extend_from_slice(&args);
        Ok(out)
    }

    /// Decodes revert data, checking the selector.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<AbiValue>, DecodingError> {
        match data.split_first_chunk::<4>() {
            Some((head, rest)) if *head == self.selector => {
                Decoder::lenient().decode(rest, &self.types())
            }
            _ => Err(DecodingError::SelectorMismatch {
                expected: self.selector,
                actual: data.iter().take(4).copied().collect(),
            }),
        }
    }
}

/// Selector of `Error(string)`.
pub const REVERT_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Selector of `Panic(uint256)`.
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Extracts a human-readable reason from revert data carrying the standard
/// `Error(string)` or `Panic(uint256)` payload.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let (head, rest) = data.split_first_chunk::<4>()?;
    match *head {
        REVERT_SELECTOR => decode(rest, &[AbiType::String])
            .ok()?
            .pop()?
            .as_str()
            .map(str::to_string),
        PANIC_SELECTOR => {
            let code: U256 = decode(rest, &[AbiType::Uint(256)]).ok()?.pop()?.as_uint()?;
            Some(format!("panic code 0x{code:x}"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, hex};

    fn role_set() -> Event {
        Event::new(
            "RoleSet",
            vec![
                Argument::indexed("role", AbiType::Uint(256)),
                Argument::indexed("account", AbiType::Address),
                Argument::indexed("sender", AbiType::Address),
                Argument::new("oldRole", AbiType::Uint(256)),
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn log_round_trip() {
        let event = role_set();
        assert_eq!(event.topic(), keccak256("RoleSet(uint256,address,address,uint256)"));
        let values = vec![
            2u64.into(),
            address!("0x00000000000000000000000000000000000000aa").into(),
            address!("0x00000000000000000000000000000000000000bb").into(),
            0u64.into(),
        ];
        let (topics, data) = event.encode_log(&values).unwrap();
        assert_eq!(topics.len(), 4);
        assert_eq!(topics[0], event.topic());
        assert_eq!(data.len(), 32);
        assert_eq!(event.decode_log(&topics, &data).unwrap(), values);
    }

    #[test]
    fn decode_log_checks_topics() {
        let event = role_set();
        let values = vec![
            1u64.into(),
            address!("0x00000000000000000000000000000000000000aa").into(),
            address!("0x00000000000000000000000000000000000000bb").into(),
            0u64.into(),
        ];
        let (mut topics, data) = event.encode_log(&values).unwrap();
        assert!(matches!(
            event.decode_log(&topics[1..], &data),
            Err(DecodingError::TopicCount { expected: 4, actual: 3 })
        ));
        topics[0] = B256::ZERO;
        assert!(matches!(
            event.decode_log(&topics, &data),
            Err(DecodingError::EventSignatureMismatch { .. })
        ));
    }

    #[test]
    fn indexed_strings_decode_to_hash() {
        let event =
            Event::new("Named", vec![Argument::indexed("name", AbiType::String)], false).unwrap();
        let (topics, data) = event.encode_log(&["alice".into()]).unwrap();
        assert!(data.is_empty());
        let decoded = event.decode_log(&topics, &data).unwrap();
        assert_eq!(decoded, vec![AbiValue::FixedBytes(keccak256("alice").to_vec())]);
    }

    #[test]
    fn anonymous_events_allow_four_indexed() {
        let four = || -> Vec<Argument> {
            (0..4).map(|i| Argument::indexed(format!("a{i}"), AbiType::Bool)).collect()
        };
        assert!(Event::new("Anon", four(), true).is_ok());
        assert!(matches!(
            Event::new("Named", four(), false),
            Err(AbiError::TooManyIndexed { count: 4, max: 3, .. })
        ));

        let event = Event::new("Anon", four(), true).unwrap();
        let (topics, _) = event
            .encode_log(&[true.into(), false.into(), true.into(), false.into()])
            .unwrap();
        assert_eq!(topics.len(), 4);
    }

    #[test]
    fn custom_error_round_trip() {
        let err = CustomError::new(
            "InsufficientBalance",
            vec![
                Argument::new("available", AbiType::Uint(256)),
                Argument::new("required", AbiType::Uint(256)),
            ],
        );
        assert_eq!(err.signature(), "InsufficientBalance(uint256,uint256)");
        let data = err.encode(&[1u64.into(), 2u64.into()]).unwrap();
        assert_eq!(err.decode(&data).unwrap(), vec![1u64.into(), 2u64.into()]);
        assert!(err.decode(&data[1..]).is_err());
    }

    #[test]
    fn revert_reasons() {
        let error = CustomError::new("Error", vec![Argument::new("", AbiType::String)]);
        assert_eq!(error.selector(), REVERT_SELECTOR);
        let data = error.encode(&["not allowed".into()]).unwrap();
        assert_eq!(decode_revert_reason(&data).as_deref(), Some("not allowed"));

        let panic = CustomError::new("Panic", vec![Argument::new("", AbiType::Uint(256))]);
        assert_eq!(panic.selector(), PANIC_SELECTOR);
        let data = panic.encode(&[0x11u64.into()]).unwrap();
        assert_eq!(decode_revert_reason(&data).as_deref(), Some("panic code 0x11"));

        assert_eq!(decode_revert_reason(&hex!("deadbeef")), None);
        assert_eq!(decode_revert_reason(&[]), None);
    }
}
