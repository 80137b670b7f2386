//! A registered module bound to its address, callable against the revm journal.

use crate::state::{block_context, JournalState};
use alloy_evm::{
    revm::precompile::{PrecompileError, PrecompileResult},
    EvmInternals,
};
use alloy_primitives::Address;
use revm::precompile::PrecompileOutput;
use std::sync::Arc;
use subnet_precompiles::{
    run_precompile, CallFailure, CallOutput, Module, PrecompileError as CallError, StateError,
    StatefulContract,
};

/// A registered module bound to its address.
#[derive(Debug, Clone)]
pub struct SubnetPrecompile {
    key: &'static str,
    address: Address,
    contract: Arc<StatefulContract>,
}

impl SubnetPrecompile {
    /// Wraps the contract of `module`.
    pub fn new(module: &Module) -> Self {
        Self { key: module.key, address: module.address, contract: Arc::clone(&module.contract) }
    }

    /// Config key of the module.
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// Address the precompile is served at.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Runs one call with `gas` as its budget.
    ///
    /// `is_static` comes from the frame that made the call; state-changing
    /// functions revert under it.
    pub fn call(
        &self,
        mut internals: EvmInternals<'_>,
        caller: Address,
        data: &[u8],
        gas: u64,
        is_static: bool,
    ) -> PrecompileResult {
        let block = block_context(&internals);
        let mut state = JournalState::new(&mut internals);
        let result = run_precompile(
            self.contract.as_ref(),
            &mut state,
            block,
            caller,
            self.address,
            data,
            gas,
            is_static,
        );
        self.finish(gas, caller, result)
    }

    /// Out of gas and backend failures halt the frame. Every other failure
    /// reverts, charging only the gas spent before it.
    fn finish(
        &self,
        gas: u64,
        caller: Address,
        result: Result<CallOutput, CallFailure>,
    ) -> PrecompileResult {
        let failure = match result {
            Ok(out) => {
                return Ok(PrecompileOutput::new(gas.saturating_sub(out.remaining_gas), out.output))
            }
            Err(failure) => failure,
        };
        tracing::debug!(
            target: "precompile",
            address = %self.address,
            ?caller,
            error = %failure.error,
            "precompile call failed"
        );
        match failure.error {
            CallError::OutOfGas { .. } => Err(PrecompileError::OutOfGas),
            CallError::State(StateError::Backend(reason)) => Err(PrecompileError::Fatal(reason)),
            error => Ok(PrecompileOutput::new_reverted(
                gas.saturating_sub(failure.remaining_gas),
                error.revert_data().into(),
            )),
        }
    }
}
