//! Fee Manager
//!
//! Stores the chain's dynamic fee parameters in precompile storage so that
//! allow-listed callers can change them without a network upgrade.
//!
//! ```text
//! interface IFeeManager is IAllowList {
//!     struct FeeConfig {
//!         uint256 gasLimit;
//!         uint256 targetBlockRate;
//!         uint256 minBaseFee;
//!         uint256 targetGas;
//!         uint256 baseFeeChangeDenominator;
//!         uint256 minBlockGasCost;
//!         uint256 maxBlockGasCost;
//!         uint256 blockGasCostStep;
//!     }
//!     event FeeConfigChanged(address indexed sender, FeeConfig oldFeeConfig, FeeConfig newFeeConfig);
//!     function setFeeConfig(...8 x uint256) external;
//!     function getFeeConfig() external view returns (...8 x uint256);
//!     function getFeeConfigLastChangedAt() external view returns (uint256 blockNumber);
//! }
//! ```

use crate::{
    allowlist::{allow_list_functions, ensure_role, AllowListConfig, Role},
    config::{config_eq, parse_config, PrecompileConfig, Upgrade},
    contract::{args, decode_args, encode_output, CallContext, FunctionEntry, StatefulContract},
    error::{ActivationError, ConfigError, PrecompileError},
    gas::{READ_GAS_COST_PER_SLOT, WRITE_GAS_COST_PER_SLOT},
    modules::Module,
    state::{BlockContext, ChainConfig, StateDB, StateError},
};
use alloy_primitives::{address, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    sync::{Arc, OnceLock},
};
use subnet_abi::{AbiError, AbiType, AbiValue, Argument, Event, Function, StateMutability};

/// Address of the fee manager.
pub const FEE_MANAGER_ADDRESS: Address = address!("0x0200000000000000000000000000000000000003");

/// Config key of the fee manager.
pub const CONFIG_KEY: &str = "feeManagerConfig";

/// Number of fields in a [`FeeConfig`].
pub const FEE_CONFIG_FIELDS: usize = 8;

/// Gas charged by `setFeeConfig`: every field plus the last-changed slot.
pub const SET_FEE_CONFIG_GAS_COST: u64 = WRITE_GAS_COST_PER_SLOT * (FEE_CONFIG_FIELDS as u64 + 1);

/// Gas charged by `getFeeConfig`.
pub const GET_FEE_CONFIG_GAS_COST: u64 = READ_GAS_COST_PER_SLOT * FEE_CONFIG_FIELDS as u64;

/// Gas charged by `getFeeConfigLastChangedAt`.
pub const GET_LAST_CHANGED_AT_GAS_COST: u64 = READ_GAS_COST_PER_SLOT;

const FIELD_NAMES: [&str; FEE_CONFIG_FIELDS] = [
    "gasLimit",
    "targetBlockRate",
    "minBaseFee",
    "targetGas",
    "baseFeeChangeDenominator",
    "minBlockGasCost",
    "maxBlockGasCost",
    "blockGasCostStep",
];

/// Dynamic fee parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeConfig {
    /// Block gas limit.
    pub gas_limit: U256,
    /// Target seconds between blocks.
    pub target_block_rate: U256,
    /// Floor of the base fee, in wei.
    pub min_base_fee: U256,
    /// Gas targeted per rolling window.
    pub target_gas: U256,
    /// Dampens base fee movements.
    pub base_fee_change_denominator: U256,
    /// Lower bound of the block gas cost.
    pub min_block_gas_cost: U256,
    /// Upper bound of the block gas cost.
    pub max_block_gas_cost: U256,
    /// Block gas cost change per second off target.
    pub block_gas_cost_step: U256,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            gas_limit: U256::from(8_000_000u64),
            target_block_rate: U256::from(2u64),
            min_base_fee: U256::from(25_000_000_000u64),
            target_gas: U256::from(15_000_000u64),
            base_fee_change_denominator: U256::from(36u64),
            min_block_gas_cost: U256::ZERO,
            max_block_gas_cost: U256::from(1_000_000u64),
            block_gas_cost_step: U256::from(200_000u64),
        }
    }
}

impl FeeConfig {
    /// Fields in storage and ABI order.
    pub const fn fields(&self) -> [U256; FEE_CONFIG_FIELDS] {
        [
            self.gas_limit,
            self.target_block_rate,
            self.min_base_fee,
            self.target_gas,
            self.base_fee_change_denominator,
            self.min_block_gas_cost,
            self.max_block_gas_cost,
            self.block_gas_cost_step,
        ]
    }

    /// Inverse of [`FeeConfig::fields`].
    pub const fn from_fields(fields: [U256; FEE_CONFIG_FIELDS]) -> Self {
        let [
            gas_limit,
            target_block_rate,
            min_base_fee,
            target_gas,
            base_fee_change_denominator,
            min_block_gas_cost,
            max_block_gas_cost,
            block_gas_cost_step,
        ] = fields;
        Self {
            gas_limit,
            target_block_rate,
            min_base_fee,
            target_gas,
            base_fee_change_denominator,
            min_block_gas_cost,
            max_block_gas_cost,
            block_gas_cost_step,
        }
    }

    /// Checks that the parameters describe a working fee market.
    pub fn verify(&self) -> Result<(), ConfigError> {
        let positive = [
            ("gasLimit", self.gas_limit),
            ("targetBlockRate", self.target_block_rate),
            ("targetGas", self.target_gas),
            ("baseFeeChangeDenominator", self.base_fee_change_denominator),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| value.is_zero()) {
            return Err(invalid(format!("{field} must be positive")));
        }
        if self.min_block_gas_cost > self.max_block_gas_cost {
            return Err(invalid(format!(
                "minBlockGasCost {} exceeds maxBlockGasCost {}",
                self.min_block_gas_cost, self.max_block_gas_cost
            )));
        }
        Ok(())
    }

    fn to_values(self) -> Vec<AbiValue> {
        self.fields().into_iter().map(AbiValue::from).collect()
    }

    fn from_values(values: &[AbiValue]) -> Result<Self, PrecompileError> {
        let mut fields = [U256::ZERO; FEE_CONFIG_FIELDS];
        for (index, field) in fields.iter_mut().enumerate() {
            *field = args::uint(values, index)?;
        }
        Ok(Self::from_fields(fields))
    }
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid { key: CONFIG_KEY, reason }
}

fn field_slot(index: usize) -> B256 {
    let mut slot = B256::ZERO;
    slot[0] = index as u8 + 1;
    slot
}

fn last_changed_slot() -> B256 {
    B256::right_padding_from(b"lca")
}

/// Reads the fee config stored in the fee manager.
pub fn get_stored_fee_config(state: &mut dyn StateDB) -> Result<FeeConfig, StateError> {
    let mut fields = [U256::ZERO; FEE_CONFIG_FIELDS];
    for (index, field) in fields.iter_mut().enumerate() {
        *field = state.get_state(FEE_MANAGER_ADDRESS, field_slot(index))?.into();
    }
    Ok(FeeConfig::from_fields(fields))
}

/// Block number of the last fee config change.
pub fn get_fee_config_last_changed_at(state: &mut dyn StateDB) -> Result<U256, StateError> {
    Ok(state.get_state(FEE_MANAGER_ADDRESS, last_changed_slot())?.into())
}

/// Stores `config` and records `block_number` as the change height.
pub fn store_fee_config(
    state: &mut dyn StateDB,
    config: &FeeConfig,
    block_number: u64,
) -> Result<(), StateError> {
    for (index, value) in config.fields().into_iter().enumerate() {
        state.set_state(FEE_MANAGER_ADDRESS, field_slot(index), value.into())?;
    }
    state.set_state(FEE_MANAGER_ADDRESS, last_changed_slot(), U256::from(block_number).into())
}

#[derive(Debug)]
struct FeeManagerAbi {
    set_fee_config: Function,
    get_fee_config: Function,
    get_fee_config_last_changed_at: Function,
    fee_config_changed: Event,
}

fn fee_config_arguments() -> Vec<Argument> {
    FIELD_NAMES.iter().map(|name| Argument::new(*name, AbiType::Uint(256))).collect()
}

fn fee_config_tuple() -> AbiType {
    AbiType::Tuple(FIELD_NAMES.iter().map(|name| (name.to_string(), AbiType::Uint(256))).collect())
}

fn fee_manager_abi() -> Result<&'static FeeManagerAbi, PrecompileError> {
    static ABI: OnceLock<Result<FeeManagerAbi, AbiError>> = OnceLock::new();
    ABI.get_or_init(|| {
        Ok(FeeManagerAbi {
            set_fee_config: Function::new(
                "setFeeConfig",
                fee_config_arguments(),
                vec![],
                StateMutability::NonPayable,
            ),
            get_fee_config: Function::new(
                "getFeeConfig",
                vec![],
                fee_config_arguments(),
                StateMutability::View,
            ),
            get_fee_config_last_changed_at: Function::new(
                "getFeeConfigLastChangedAt",
                vec![],
                vec![Argument::new("blockNumber", AbiType::Uint(256))],
                StateMutability::View,
            ),
            fee_config_changed: Event::new(
                "FeeConfigChanged",
                vec![
                    Argument::indexed("sender", AbiType::Address),
                    Argument::new("oldFeeConfig", fee_config_tuple()),
                    Argument::new("newFeeConfig", fee_config_tuple()),
                ],
                false,
            )?,
        })
    })
    .as_ref()
    .map_err(|err| PrecompileError::Abi(err.clone()))
}

fn set_fee_config(ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
    ctx.ensure_writable()?;
    let abi = fee_manager_abi()?;
    let values = decode_args(&abi.set_fee_config, input)?;
    let config = FeeConfig::from_values(&values)?;
    config.verify().map_err(|err| PrecompileError::InvalidArgument(err.to_string()))?;

    ensure_role(ctx, Role::Enabled)?;

    let old = get_stored_fee_config(ctx.state)?;
    let log = ctx.prepare_log(
        &abi.fee_config_changed,
        &[
            ctx.caller.into(),
            AbiValue::Tuple(old.to_values()),
            AbiValue::Tuple(config.to_values()),
        ],
    )?;
    store_fee_config(ctx.state, &config, ctx.block.number)?;
    ctx.emit(log)?;

    tracing::info!(
        target: "fee_manager",
        caller = ?ctx.caller,
        block = ctx.block.number,
        ?config,
        "fee config changed"
    );
    Ok(Bytes::new())
}

fn get_fee_config(ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
    let abi = fee_manager_abi()?;
    decode_args(&abi.get_fee_config, input)?;
    let config = get_stored_fee_config(ctx.state)?;
    encode_output(&abi.get_fee_config, &config.to_values())
}

fn last_changed_at(ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
    let abi = fee_manager_abi()?;
    decode_args(&abi.get_fee_config_last_changed_at, input)?;
    let block = get_fee_config_last_changed_at(ctx.state)?;
    encode_output(&abi.get_fee_config_last_changed_at, &[block.into()])
}

/// Call data for `setFeeConfig`.
pub fn pack_set_fee_config(config: &FeeConfig) -> Result<Bytes, PrecompileError> {
    Ok(fee_manager_abi()?.set_fee_config.encode_input(&config.to_values())?.into())
}

/// Call data for `getFeeConfig`.
pub fn pack_get_fee_config() -> Result<Bytes, PrecompileError> {
    Ok(fee_manager_abi()?.get_fee_config.encode_input(&[])?.into())
}

/// Decodes the output of `getFeeConfig`.
pub fn unpack_get_fee_config(output: &[u8]) -> Result<FeeConfig, PrecompileError> {
    let values = fee_manager_abi()?.get_fee_config.decode_output(output)?;
    FeeConfig::from_values(&values)
}

/// Fee manager configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeManagerConfig {
    /// Activation fields.
    #[serde(flatten)]
    pub upgrade: Upgrade,
    /// Initial roles.
    #[serde(flatten)]
    pub allow_list: AllowListConfig,
    /// Fee config stored on activation instead of the chain's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_fee_config: Option<FeeConfig>,
}

impl FeeManagerConfig {
    /// An enabling config at `timestamp`.
    pub fn new(
        timestamp: u64,
        allow_list: AllowListConfig,
        initial_fee_config: Option<FeeConfig>,
    ) -> Self {
        Self { upgrade: Upgrade::at(timestamp), allow_list, initial_fee_config }
    }

    /// A disabling config at `timestamp`.
    pub fn disable(timestamp: u64) -> Self {
        Self { upgrade: Upgrade::disabled_at(timestamp), ..Default::default() }
    }
}

impl PrecompileConfig for FeeManagerConfig {
    fn key(&self) -> &'static str {
        CONFIG_KEY
    }

    fn address(&self) -> Address {
        FEE_MANAGER_ADDRESS
    }

    fn upgrade(&self) -> &Upgrade {
        &self.upgrade
    }

    fn equal(&self, other: &dyn PrecompileConfig) -> bool {
        config_eq(self, other)
    }

    fn verify(&self, _chain: &ChainConfig) -> Result<(), ConfigError> {
        self.allow_list.verify()?;
        if let Some(config) = &self.initial_fee_config {
            config.verify()?;
        }
        Ok(())
    }

    fn configure(
        &self,
        chain: &ChainConfig,
        state: &mut dyn StateDB,
        block: &BlockContext,
    ) -> Result<(), ActivationError> {
        let config = self.initial_fee_config.as_ref().unwrap_or_else(|| chain.get_fee_config());
        store_fee_config(state, config, block.number)?;
        self.allow_list.configure(state, FEE_MANAGER_ADDRESS)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn parse(value: serde_json::Value) -> Result<Arc<dyn PrecompileConfig>, ConfigError> {
    Ok(Arc::new(parse_config::<FeeManagerConfig>(CONFIG_KEY, value)?))
}

/// The fee manager module.
pub fn module() -> Result<Module, ConfigError> {
    let abi = fee_manager_abi().map_err(ConfigError::from_descriptor)?;
    let mut functions = allow_list_functions()?;
    functions.extend([
        FunctionEntry::new(&abi.set_fee_config, SET_FEE_CONFIG_GAS_COST, set_fee_config),
        FunctionEntry::new(&abi.get_fee_config, GET_FEE_CONFIG_GAS_COST, get_fee_config),
        FunctionEntry::new(
            &abi.get_fee_config_last_changed_at,
            GET_LAST_CHANGED_AT_GAS_COST,
            last_changed_at,
        ),
    ]);
    Ok(Module {
        key: CONFIG_KEY,
        address: FEE_MANAGER_ADDRESS,
        contract: Arc::new(StatefulContract::new(functions, None)?),
        parse_config: parse,
    })
}
