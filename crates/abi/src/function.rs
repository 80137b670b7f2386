//! Function descriptors and selector derivation.

use crate::{
    decode::Decoder,
    encode::encode,
    error::{AbiError, DecodingError, EncodingError, Result},
    ty::{split_top_level, AbiType},
    value::AbiValue,
};
use alloy_primitives::keccak256;
use serde::Deserialize;
use std::fmt;

/// Computes the 4-byte selector of a canonical signature such as
/// `transfer(address,uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// A named, typed argument of a function, event or error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    /// Declared name, possibly empty.
    pub name: String,
    /// Wire type.
    pub ty: AbiType,
    /// Whether the argument is an indexed event topic. Ignored for calls.
    pub indexed: bool,
}

impl Argument {
    /// Creates a non-indexed argument.
    pub fn new(name: impl Into<String>, ty: AbiType) -> Self {
        Self { name: name.into(), ty, indexed: false }
    }

    /// Creates an indexed event argument.
    pub fn indexed(name: impl Into<String>, ty: AbiType) -> Self {
        Self { name: name.into(), ty, indexed: true }
    }
}

/// What a [`Function`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Deployment-time initializer; no selector on the wire.
    Constructor,
    /// Named method dispatched by selector.
    Function,
    /// Invoked on unmatched selectors.
    Fallback,
    /// Invoked on plain value transfers with empty call data.
    Receive,
}

/// Declared state mutability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    /// Reads nothing from state.
    Pure,
    /// Reads but does not modify state.
    View,
    /// May modify state, rejects value.
    #[default]
    NonPayable,
    /// May modify state and accept value.
    Payable,
}

/// A function, constructor, fallback or receive descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Declared name; empty for constructor, fallback and receive.
    pub name: String,
    /// Descriptor kind.
    pub kind: FunctionKind,
    /// Input arguments.
    pub inputs: Vec<Argument>,
    /// Return values.
    pub outputs: Vec<Argument>,
    /// Declared mutability.
    pub state_mutability: StateMutability,
    selector: [u8; 4],
}

impl Function {
    /// Creates a named method and derives its selector.
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<Argument>,
        outputs: Vec<Argument>,
        state_mutability: StateMutability,
    ) -> Self {
        let name = name.into();
        let selector = selector(&signature_of(&name, &inputs));
        Self { name, kind: FunctionKind::Function, inputs, outputs, state_mutability, selector }
    }

    /// Creates a constructor descriptor.
    pub fn constructor(inputs: Vec<Argument>, state_mutability: StateMutability) -> Self {
        Self::special(FunctionKind::Constructor, inputs, state_mutability)
    }

    /// Creates a fallback descriptor.
    pub fn fallback(state_mutability: StateMutability) -> Self {
        Self::special(FunctionKind::Fallback, Vec::new(), state_mutability)
    }

    /// Creates a receive descriptor; receive is always payable.
    pub fn receive() -> Self {
        Self::special(FunctionKind::Receive, Vec::new(), StateMutability::Payable)
    }

    fn special(kind: FunctionKind, inputs: Vec<Argument>, state_mutability: StateMutability) -> Self {
        Self {
            name: String::new(),
            kind,
            inputs,
            outputs: Vec::new(),
            state_mutability,
            selector: [0; 4],
        }
    }

    /// Canonical signature, e.g. `setAdmin(address)`.
    pub fn signature(&self) -> String {
        signature_of(&self.name, &self.inputs)
    }

    /// The 4-byte selector. All zero for kinds that carry none on the wire.
    pub const fn selector(&self) -> [u8; 4] {
        self.selector
    }

    /// Whether call data for this descriptor starts with the selector.
    pub fn has_selector(&self) -> bool {
        self.kind == FunctionKind::Function
    }

    /// Returns `true` for view and pure functions.
    pub fn is_read_only(&self) -> bool {
        matches!(self.state_mutability, StateMutability::View | StateMutability::Pure)
    }

    /// Input types in declaration order.
    pub fn input_types(&self) -> Vec<AbiType> {
        self.inputs.iter().map(|arg| arg.ty.clone()).collect()
    }

    /// Output types in declaration order.
    pub fn output_types(&self) -> Vec<AbiType> {
        self.outputs.iter().map(|arg| arg.ty.clone()).collect()
    }

    /// Encodes call data: the selector followed by the arguments.
    pub fn encode_input(&self, values: &[AbiValue]) -> Result<Vec<u8>, EncodingError> {
        let args = encode(values, &self.input_types())?;
        if !self.has_selector() {
            return Ok(args);
        }
        let mut out = Vec::with_capacity(4 + args.len());
        out.extend_from_slice(&self.selector);
        out.extend_from_slice(&args);
        Ok(out)
    }

    /// Decodes call data, checking the selector and tolerating trailing slack.
    pub fn decode_input(&self, data: &[u8]) -> Result<Vec<AbiValue>, DecodingError> {
        self.decode_args(self.strip_selector(data)?, Decoder::lenient())
    }

    /// Decodes call data in strict mode.
    pub fn decode_input_strict(&self, data: &[u8]) -> Result<Vec<AbiValue>, DecodingError> {
        self.decode_args(self.strip_selector(data)?, Decoder::strict())
    }

    /// Decodes arguments that follow an already-stripped selector.
    pub fn decode_args(
        &self,
        args: &[u8],
        decoder: Decoder,
    ) -> Result<Vec<AbiValue>, DecodingError> {
        decoder.decode(args, &self.input_types())
    }

    /// Encodes return values.
    pub fn encode_output(&self, values: &[AbiValue]) -> Result<Vec<u8>, EncodingError> {
        encode(values, &self.output_types())
    }

    /// Decodes return data.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<AbiValue>, DecodingError> {
        Decoder::lenient().decode(data, &self.output_types())
    }

    fn strip_selector<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], DecodingError> {
        if !self.has_selector() {
            return Ok(data);
        }
        match data.split_first_chunk::<4>() {
            Some((head, rest)) if *head == self.selector => Ok(rest),
            _ => Err(DecodingError::SelectorMismatch {
                expected: self.selector,
                actual: data.iter().take(4).copied().collect(),
            }),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// Parses `name(T1,T2,...)` into a non-payable function with unnamed inputs.
///
/// An optional ` returns (R1,R2)` suffix fills the outputs.
pub fn parse_signature(text: &str) -> Result<Function> {
    let text = text.trim();
    let invalid = || AbiError::InvalidSignature(text.to_string());

    let (call, returns) = match text.find(" returns") {
        Some(at) => (text[..at].trim(), Some(text[at + " returns".len()..].trim())),
        None => (text, None),
    };

    let open = call.find('(').ok_or_else(invalid)?;
    let name = &call[..open];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(invalid());
    }
    let inputs = parse_arguments(&call[open..]).ok_or_else(invalid)??;
    let outputs = match returns {
        Some(list) => parse_arguments(list).ok_or_else(invalid)??,
        None => Vec::new(),
    };
    Ok(Function::new(name, inputs, outputs, StateMutability::NonPayable))
}

/// Parses a parenthesized type list. `None` means the text is not a list.
fn parse_arguments(text: &str) -> Option<Result<Vec<Argument>>> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let parts = split_top_level(inner)?;
    Some(
        parts
            .into_iter()
            .map(|part| AbiType::parse(part).map(|ty| Argument::new("", ty)))
            .collect(),
    )
}

pub(crate) fn signature_of(name: &str, inputs: &[Argument]) -> String {
    let types: Vec<String> = inputs.iter().map(|arg| arg.ty.canonical()).collect();
    format!("{name}({})", types.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, hex, U256};

    #[test]
    fn transfer_selector_is_stable() {
        assert_eq!(selector("transfer(address,uint256)"), hex!("a9059cbb"));
        let f = parse_signature("transfer(address,uint256)").unwrap();
        assert_eq!(f.selector(), hex!("a9059cbb"));
        assert_eq!(f.signature(), "transfer(address,uint256)");
    }

    #[test]
    fn parses_tuple_and_array_arguments() {
        let f = parse_signature("submit((uint256,bytes)[],bool) returns (uint8)").unwrap();
        assert_eq!(f.inputs.len(), 2);
        assert_eq!(f.signature(), "submit((uint256,bytes)[],bool)");
        assert_eq!(f.output_types(), vec![AbiType::Uint(8)]);
        assert_eq!(parse_signature("noop()").unwrap().inputs, vec![]);
    }

    #[test]
    fn rejects_malformed_signatures() {
        for bad in ["", "transfer", "(uint256)", "bad name(uint256)", "f(uint7)", "f((uint256)"] {
            assert!(parse_signature(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn input_round_trip_checks_selector() {
        let f = parse_signature("transfer(address,uint256)").unwrap();
        let to = address!("0x00000000000000000000000000000000000000aa");
        let values = vec![to.into(), AbiValue::Uint(U256::from(10u64))];
        let data = f.encode_input(&values).unwrap();
        assert_eq!(&data[..4], &hex!("a9059cbb"));
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(f.decode_input_strict(&data).unwrap(), values);

        let mut wrong = data.clone();
        wrong[0] ^= 1;
        assert!(matches!(
            f.decode_input(&wrong),
            Err(DecodingError::SelectorMismatch { .. })
        ));
        assert!(matches!(
            f.decode_input(&data[..2]),
            Err(DecodingError::SelectorMismatch { .. })
        ));
    }

    #[test]
    fn constructor_has_no_selector() {
        let ctor = Function::constructor(
            vec![Argument::new("owner", AbiType::Address)],
            StateMutability::NonPayable,
        );
        let owner = address!("0x0000000000000000000000000000000000000001");
        let data = ctor.encode_input(&[owner.into()]).unwrap();
        assert_eq!(data.len(), 32);
        assert_eq!(ctor.decode_input(&data).unwrap().len(), 1);
    }

    #[test]
    fn output_round_trip() {
        let f = Function::new(
            "name",
            vec![],
            vec![Argument::new("", AbiType::String)],
            StateMutability::View,
        );
        assert!(f.is_read_only());
        let out = f.encode_output(&["token".into()]).unwrap();
        assert_eq!(f.decode_output(&out).unwrap(), vec![AbiValue::from("token")]);
    }
}
