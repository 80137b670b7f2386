//! Precompile provider serving subnet precompiles next to a base set.

use crate::precompile::SubnetPrecompile;
use alloy_evm::{precompiles::PrecompilesMap, Database, EvmInternals};
use alloy_primitives::{Address, Bytes};
use revm::{
    context::{Block, Cfg, LocalContextTr, Transaction},
    handler::PrecompileProvider,
    interpreter::{CallInput, CallInputs, Gas, InstructionResult, InterpreterResult},
    precompile::PrecompileError,
    Context, Journal,
};
use std::collections::BTreeMap;
use subnet_precompiles::{ModuleRegistry, PrecompileUpgrades};

/// Subnet precompiles layered over a base [`PrecompilesMap`].
///
/// Calls to an installed subnet precompile run with the calling frame's static
/// flag; every other address falls through to the base map.
#[derive(Debug, Clone)]
pub struct SubnetPrecompiles {
    base: PrecompilesMap,
    installed: BTreeMap<Address, SubnetPrecompile>,
}

impl SubnetPrecompiles {
    /// Serves `base` with no subnet precompile installed.
    pub const fn new(base: PrecompilesMap) -> Self {
        Self { base, installed: BTreeMap::new() }
    }

    /// Replaces the installed set with every precompile enabled at `timestamp`.
    ///
    /// Returns the number of installed precompiles.
    pub fn install(
        &mut self,
        registry: &ModuleRegistry,
        upgrades: &PrecompileUpgrades,
        timestamp: u64,
    ) -> usize {
        self.installed.clear();
        for config in upgrades.enabled_at(registry, timestamp) {
            let Some(module) = registry.get_by_key(config.key()) else { continue };
            self.installed.insert(module.address, SubnetPrecompile::new(module));
            tracing::debug!(
                target: "precompile::registry",
                key = module.key,
                address = %module.address,
                timestamp,
                "installed precompile"
            );
        }
        self.installed.len()
    }

    /// The subnet precompile installed at `address`.
    pub fn get(&self, address: &Address) -> Option<&SubnetPrecompile> {
        self.installed.get(address)
    }

    /// Addresses of the installed subnet precompiles, ascending.
    pub fn installed(&self) -> impl Iterator<Item = Address> + '_ {
        self.installed.keys().copied()
    }

    /// The base precompiles.
    pub const fn base(&self) -> &PrecompilesMap {
        &self.base
    }
}

impl<BLOCK, TX, CFG, DB, CHAIN> PrecompileProvider<Context<BLOCK, TX, CFG, DB, Journal<DB>, CHAIN>>
    for SubnetPrecompiles
where
    BLOCK: Block,
    TX: Transaction,
    CFG: Cfg,
    DB: Database,
{
    type Output = InterpreterResult;

    fn set_spec(&mut self, _spec: CFG::Spec) -> bool {
        false
    }

    fn run(
        &mut self,
        context: &mut Context<BLOCK, TX, CFG, DB, Journal<DB>, CHAIN>,
        inputs: &CallInputs,
    ) -> Result<Option<InterpreterResult>, String> {
        let Some(precompile) = self.installed.get(&inputs.bytecode_address) else {
            return self.base.run(context, inputs);
        };

        let mut result = InterpreterResult {
            result: InstructionResult::Return,
            gas: Gas::new(inputs.gas_limit),
            output: Bytes::new(),
        };

        let (local, journal) = (&context.local, &mut context.journaled_state);
        let buffer;
        let data: &[u8] = match &inputs.input {
            CallInput::SharedBuffer(range) => {
                match local.shared_memory_buffer_slice(range.clone()) {
                    Some(slice) => {
                        buffer = slice;
                        &buffer
                    }
                    None => &[],
                }
            }
            CallInput::Bytes(bytes) => bytes.as_ref(),
        };

        let internals = EvmInternals::new(journal, &context.block, &context.cfg, &context.tx);
        match precompile.call(internals, inputs.caller, data, inputs.gas_limit, inputs.is_static) {
            Ok(output) => {
                if !result.gas.record_cost(output.gas_used) {
                    result.result = InstructionResult::PrecompileOOG;
                    return Ok(Some(result));
                }
                result.result =
                    if output.reverted { InstructionResult::Revert } else { InstructionResult::Return };
                result.output = output.bytes;
            }
            Err(PrecompileError::Fatal(reason)) => return Err(reason),
            Err(err) => {
                result.result = if err.is_oog() {
                    InstructionResult::PrecompileOOG
                } else {
                    InstructionResult::PrecompileError
                };
            }
        }
        Ok(Some(result))
    }

    fn warm_addresses(&self) -> Box<impl Iterator<Item = Address>> {
        Box::new(self.installed.keys().copied().chain(self.base.addresses().copied()))
    }

    fn contains(&self, address: &Address) -> bool {
        self.installed.contains_key(address) || self.base.get(address).is_some()
    }
}
