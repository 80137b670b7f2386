//! Contract interfaces loaded from standard JSON ABI.

use crate::{
    error::{AbiError, DecodingError, Result},
    event::{CustomError, Event},
    function::{Argument, Function, FunctionKind, StateMutability},
    ty::AbiType,
    value::AbiValue,
};
use alloy_primitives::B256;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// A parsed contract interface.
///
/// Overloaded names are made unique on load: the first declaration keeps its
/// name and later ones are keyed `name0`, `name1`, ... in declaration order. The
/// descriptors themselves keep the declared name so signatures are unaffected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractAbi {
    /// Constructor, if declared.
    pub constructor: Option<Function>,
    /// Methods keyed by unique name.
    pub methods: BTreeMap<String, Function>,
    /// Events keyed by unique name.
    pub events: BTreeMap<String, Event>,
    /// Custom errors keyed by unique name.
    pub errors: BTreeMap<String, CustomError>,
    /// Fallback function, if declared.
    pub fallback: Option<Function>,
    /// Receive function, if declared.
    pub receive: Option<Function>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<JsonParam>,
    #[serde(default)]
    outputs: Vec<JsonParam>,
    state_mutability: Option<StateMutability>,
    payable: Option<bool>,
    constant: Option<bool>,
    #[serde(default)]
    anonymous: bool,
}

#[derive(Debug, Deserialize)]
struct JsonParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    components: Vec<JsonParam>,
    #[serde(default)]
    indexed: bool,
}

fn default_entry_type() -> String {
    "function".to_string()
}

impl JsonEntry {
    fn mutability(&self) -> StateMutability {
        if let Some(mutability) = self.state_mutability {
            return mutability;
        }
        match (self.payable, self.constant) {
            (Some(true), _) => StateMutability::Payable,
            (_, Some(true)) => StateMutability::View,
            _ => StateMutability::NonPayable,
        }
    }
}

impl JsonParam {
    fn into_argument(self) -> Result<Argument> {
        let indexed = self.indexed;
        let name = self.name.clone();
        Ok(Argument { name, ty: self.into_type()?, indexed })
    }

    fn into_type(self) -> Result<AbiType> {
        let Some(suffix) = self.ty.strip_prefix("tuple") else {
            return AbiType::parse(&self.ty);
        };
        let suffix = suffix.to_string();
        let fields = self
            .components
            .into_iter()
            .map(|component| {
                let name = component.name.clone();
                component.into_type().map(|ty| (name, ty))
            })
            .collect::<Result<Vec<_>>>()?;
        apply_array_suffix(AbiType::Tuple(fields), &suffix)
    }
}

/// Wraps `base` in the array dimensions of a suffix like `[2][]`, innermost first.
fn apply_array_suffix(base: AbiType, suffix: &str) -> Result<AbiType> {
    let invalid = || AbiError::InvalidType {
        ty: format!("tuple{suffix}"),
        reason: "malformed array suffix",
    };
    let mut ty = base;
    let mut rest = suffix;
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[').ok_or_else(invalid)?;
        let close = inner.find(']').ok_or_else(invalid)?;
        let len = &inner[..close];
        ty = if len.is_empty() {
            AbiType::array(ty)
        } else {
            AbiType::fixed_array(ty, len.parse().map_err(|_| invalid())?)
        };
        rest = &inner[close + 1..];
    }
    Ok(ty)
}

fn arguments(params: Vec<JsonParam>) -> Result<Vec<Argument>> {
    params.into_iter().map(JsonParam::into_argument).collect()
}

/// Inserts under `name`, or the first free `name{i}` when taken.
fn insert_unique<T>(map: &mut BTreeMap<String, T>, name: &str, item: T) {
    let mut key = name.to_string();
    let mut index = 0usize;
    while map.contains_key(&key) {
        key = format!("{name}{index}");
        index += 1;
    }
    if key != name {
        debug!(target: "abi", original = %name, renamed = %key, "disambiguated overloaded name");
    }
    map.insert(key, item);
}

impl ContractAbi {
    /// Parses a JSON ABI array.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<JsonEntry> =
            serde_json::from_str(json).map_err(|err| AbiError::Json(err.to_string()))?;

        let mut abi = Self::default();
        for entry in entries {
            let mutability = entry.mutability();
            match entry.kind.as_str() {
                "function" => {
                    let function = Function::new(
                        entry.name.clone(),
                        arguments(entry.inputs)?,
                        arguments(entry.outputs)?,
                        mutability,
                    );
                    insert_unique(&mut abi.methods, &entry.name, function);
                }
                "constructor" => {
                    if abi.constructor.is_some() {
                        return Err(AbiError::Json("multiple constructors".to_string()));
                    }
                    abi.constructor =
                        Some(Function::constructor(arguments(entry.inputs)?, mutability));
                }
                "fallback" => {
                    if abi.fallback.is_some() {
                        return Err(AbiError::Json("multiple fallback functions".to_string()));
                    }
                    abi.fallback = Some(Function::fallback(mutability));
                }
                "receive" => {
                    if abi.receive.is_some() {
                        return Err(AbiError::Json("multiple receive functions".to_string()));
                    }
                    if mutability != StateMutability::Payable {
                        return Err(AbiError::Json("receive function must be payable".to_string()));
                    }
                    abi.receive = Some(Function::receive());
                }
                "event" => {
                    let event =
                        Event::new(entry.name.clone(), arguments(entry.inputs)?, entry.anonymous)?;
                    insert_unique(&mut abi.events, &entry.name, event);
                }
                "error" => {
                    let error = CustomError::new(entry.name.clone(), arguments(entry.inputs)?);
                    insert_unique(&mut abi.errors, &entry.name, error);
                }
                other => return Err(AbiError::Json(format!("unknown entry type `{other}`"))),
            }
        }
        Ok(abi)
    }

    /// Looks up a method by its unique key.
    pub fn method(&self, name: &str) -> Result<&Function> {
        self.methods.get(name).ok_or_else(|| not_found("method", name))
    }

    /// Looks up a method by selector.
    pub fn method_by_selector(&self, selector: [u8; 4]) -> Option<&Function> {
        self.methods.values().find(|method| method.selector() == selector)
    }

    /// Looks up an event by its unique key.
    pub fn event(&self, name: &str) -> Result<&Event> {
        self.events.get(name).ok_or_else(|| not_found("event", name))
    }

    /// Looks up a non-anonymous event by its topic hash.
    pub fn event_by_topic(&self, topic: B256) -> Option<&Event> {
        self.events.values().find(|event| !event.anonymous && event.topic() == topic)
    }

    /// Looks up a custom error by its unique key.
    pub fn error(&self, name: &str) -> Result<&CustomError> {
        self.errors.get(name).ok_or_else(|| not_found("error", name))
    }

    /// Looks up a custom error by selector.
    pub fn error_by_selector(&self, selector: [u8; 4]) -> Option<&CustomError> {
        self.errors.values().find(|error| error.selector() == selector)
    }

    /// Encodes a call to the method keyed `name`.
    pub fn encode_call(&self, name: &str, values: &[AbiValue]) -> Result<Vec<u8>> {
        Ok(self.method(name)?.encode_input(values)?)
    }

    /// Resolves the method targeted by `data` and decodes its arguments strictly.
    pub fn decode_call(&self, data: &[u8]) -> Result<(&Function, Vec<AbiValue>)> {
        let selector = data.first_chunk::<4>().copied().ok_or_else(|| {
            DecodingError::BufferTooShort { offset: 0, needed: 4, available: data.len() }
        })?;
        let method = self
            .method_by_selector(selector)
            .ok_or_else(|| not_found("method", &alloy_primitives::hex::encode_prefixed(selector)))?;
        let values = method.decode_input_strict(data)?;
        Ok((method, values))
    }

    /// Whether the interface declares a fallback or receive entry point for
    /// call data that matches no method.
    pub fn has_default_entry(&self) -> bool {
        self.fallback.is_some() || self.receive.is_some()
    }

    /// All callable entry points including constructor, fallback and receive.
    pub fn entry_points(&self) -> impl Iterator<Item = &Function> {
        self.constructor
            .iter()
            .chain(self.methods.values())
            .chain(self.fallback.iter())
            .chain(self.receive.iter())
    }

    /// Number of methods of kind [`FunctionKind::Function`].
    pub fn method_count(&self) -> usize {
        self.entry_points().filter(|f| f.kind == FunctionKind::Function).count()
    }
}

fn not_found(kind: &'static str, name: &str) -> AbiError {
    AbiError::NotFound { kind, name: name.to_string() }
}
