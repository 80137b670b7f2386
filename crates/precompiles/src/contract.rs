//! Selector dispatch for stateful precompiles.
//!
//! A [`StatefulContract`] owns a selector table built once at construction. A
//! call strips the selector, charges the handler's fixed cost and hands the
//! remaining input to the handler together with a [`CallContext`]. Handlers
//! enforce read-only mode and authorization themselves.

use crate::{
    error::{ConfigError, PrecompileError},
    gas::log_gas,
    state::{BlockContext, StateDB},
};
use alloy_primitives::{Address, Bytes, Log, LogData};
use std::{collections::HashMap, fmt};
use subnet_abi::{AbiValue, Decoder, Event, Function};
use thiserror::Error;

/// A precompile function handler. Receives the input with the selector stripped.
pub type RunFn = fn(&mut CallContext<'_>, &[u8]) -> Result<Bytes, PrecompileError>;

/// Everything a handler may observe or mutate during one call.
pub struct CallContext<'a> {
    /// Mutable state for the duration of the call.
    pub state: &'a mut dyn StateDB,
    /// Enclosing block.
    pub block: BlockContext,
    /// Immediate caller.
    pub caller: Address,
    /// Address of the precompile being called.
    pub address: Address,
    /// Whether the call is static.
    pub read_only: bool,
    gas: u64,
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("block", &self.block)
            .field("caller", &self.caller)
            .field("address", &self.address)
            .field("read_only", &self.read_only)
            .field("gas", &self.gas)
            .finish_non_exhaustive()
    }
}

impl<'a> CallContext<'a> {
    /// Creates a context with the full gas budget.
    pub fn new(
        state: &'a mut dyn StateDB,
        block: BlockContext,
        caller: Address,
        address: Address,
        gas: u64,
        read_only: bool,
    ) -> Self {
        Self { state, block, caller, address, read_only, gas }
    }

    /// Gas still available.
    pub const fn remaining_gas(&self) -> u64 {
        self.gas
    }

    /// Charges `cost`. On failure the whole budget is forfeited.
    pub fn deduct_gas(&mut self, cost: u64) -> Result<(), PrecompileError> {
        match self.gas.checked_sub(cost) {
            Some(left) => {
                self.gas = left;
                Ok(())
            }
            None => {
                let remaining = std::mem::take(&mut self.gas);
                Err(PrecompileError::OutOfGas { required: cost, remaining })
            }
        }
    }

    /// Fails with [`PrecompileError::WriteProtection`] in a static call.
    pub const fn ensure_writable(&self) -> Result<(), PrecompileError> {
        if self.read_only {
            return Err(PrecompileError::WriteProtection);
        }
        Ok(())
    }

    /// Builds the log for `event`, charges its gas and returns it unsent.
    ///
    /// Handlers charge before mutating state and call [`CallContext::emit`] after.
    pub fn prepare_log(
        &mut self,
        event: &Event,
        values: &[AbiValue],
    ) -> Result<LogData, PrecompileError> {
        let data = event.encode_log_data(values)?;
        self.deduct_gas(log_gas(data.topics().len(), data.data.len()))?;
        Ok(data)
    }

    /// Appends a prepared log under the precompile's address.
    pub fn emit(&mut self, data: LogData) -> Result<(), PrecompileError> {
        self.state.add_log(Log { address: self.address, data })?;
        Ok(())
    }
}

/// A selector-table entry.
#[derive(Clone, Copy)]
pub struct FunctionEntry {
    /// Selector routed to this handler.
    pub selector: [u8; 4],
    /// Fixed gas charged before the handler runs.
    pub gas_cost: u64,
    /// The handler.
    pub handler: RunFn,
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("selector", &alloy_primitives::hex::encode(self.selector))
            .field("gas_cost", &self.gas_cost)
            .finish_non_exhaustive()
    }
}

impl FunctionEntry {
    /// Routes `function`'s selector to `handler`.
    pub const fn new(function: &Function, gas_cost: u64, handler: RunFn) -> Self {
        Self { selector: function.selector(), gas_cost, handler }
    }
}

/// Interface the dispatch engine exposes to the execution environment.
pub trait StatefulPrecompile: Send + Sync {
    /// Runs a call. `ctx` carries the gas budget and is left holding the
    /// remaining gas whether the call succeeds or fails.
    fn run(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError>;
}

/// Selector-dispatched precompile.
#[derive(Clone, Default)]
pub struct StatefulContract {
    functions: HashMap<[u8; 4], FunctionEntry>,
    fallback: Option<RunFn>,
}

impl fmt::Debug for StatefulContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatefulContract")
            .field("functions", &self.functions.len())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl StatefulContract {
    /// Builds the selector table, rejecting duplicate selectors.
    pub fn new(functions: Vec<FunctionEntry>, fallback: Option<RunFn>) -> Result<Self, ConfigError> {
        let mut table = HashMap::with_capacity(functions.len());
        for entry in functions {
            if table.insert(entry.selector, entry).is_some() {
                return Err(ConfigError::DuplicateSelector(entry.selector));
            }
        }
        Ok(Self { functions: table, fallback })
    }

    /// Looks up the entry for `selector`.
    pub fn function(&self, selector: [u8; 4]) -> Option<&FunctionEntry> {
        self.functions.get(&selector)
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether no functions are registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl StatefulPrecompile for StatefulContract {
    fn run(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        if input.is_empty() {
            if let Some(fallback) = self.fallback {
                return fallback(ctx, input);
            }
        }
        let Some((selector, args)) = input.split_first_chunk::<4>() else {
            return Err(PrecompileError::MissingSelector { len: input.len() });
        };
        let Some(entry) = self.functions.get(selector) else {
            tracing::debug!(target: "precompile", address = ?ctx.address, ?selector, "unknown selector");
            return Err(PrecompileError::UnknownSelector { selector: *selector });
        };
        ctx.deduct_gas(entry.gas_cost)?;
        (entry.handler)(ctx, args)
    }
}

/// Successful call result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutput {
    /// Return data.
    pub output: Bytes,
    /// Gas left after the call.
    pub remaining_gas: u64,
}

/// Failed call result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct CallFailure {
    /// Why the call failed.
    #[source]
    pub error: PrecompileError,
    /// Gas left after the call; zero after running out of gas.
    pub remaining_gas: u64,
}

/// Executes one call against `precompile` with a fresh gas budget.
#[allow(clippy::too_many_arguments)]
pub fn run_precompile(
    precompile: &dyn StatefulPrecompile,
    state: &mut dyn StateDB,
    block: BlockContext,
    caller: Address,
    address: Address,
    input: &[u8],
    gas: u64,
    read_only: bool,
) -> Result<CallOutput, CallFailure> {
    let mut ctx = CallContext::new(state, block, caller, address, gas, read_only);
    match precompile.run(&mut ctx, input) {
        Ok(output) => Ok(CallOutput { output, remaining_gas: ctx.remaining_gas() }),
        Err(error) => {
            let remaining_gas = match error {
                PrecompileError::OutOfGas { .. } => 0,
                _ => ctx.remaining_gas(),
            };
            Err(CallFailure { error, remaining_gas })
        }
    }
}

/// Decodes handler arguments in strict mode.
pub fn decode_args(function: &Function, args: &[u8]) -> Result<Vec<AbiValue>, PrecompileError> {
    Ok(function.decode_args(args, Decoder::strict())?)
}

/// Encodes handler return values.
pub fn encode_output(function: &Function, values: &[AbiValue]) -> Result<Bytes, PrecompileError> {
    Ok(function.encode_output(values)?.into())
}

/// Typed accessors over decoded argument lists.
pub mod args {
    use super::PrecompileError;
    use alloy_primitives::{Address, U256};
    use subnet_abi::AbiValue;

    fn missing(index: usize, kind: &str) -> PrecompileError {
        PrecompileError::InvalidArgument(format!("argument {index} is not {kind}"))
    }

    /// The address at `index`.
    pub fn address(values: &[AbiValue], index: usize) -> Result<Address, PrecompileError> {
        values.get(index).and_then(AbiValue::as_address).ok_or_else(|| missing(index, "an address"))
    }

    /// The unsigned integer at `index`.
    pub fn uint(values: &[AbiValue], index: usize) -> Result<U256, PrecompileError> {
        values.get(index).and_then(AbiValue::as_uint).ok_or_else(|| missing(index, "a uint"))
    }
}
