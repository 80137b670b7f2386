//! Reward Manager
//!
//! Decides where block fees go. The choice is a single [`RewardMode`] kept in one
//! storage slot, so the three outcomes are mutually exclusive at every point of
//! execution.
//!
//! ```text
//! interface IRewardManager is IAllowList {
//!     event RewardAddressChanged(address indexed sender, address indexed oldRewardAddress, address indexed newRewardAddress);
//!     event FeeRecipientsAllowed(address indexed sender);
//!     event RewardsDisabled(address indexed sender);
//!     function setRewardAddress(address addr) external;
//!     function allowFeeRecipients() external;
//!     function disableRewards() external;
//!     function currentRewardAddress() external view returns (address rewardAddress);
//!     function areFeeRecipientsAllowed() external view returns (bool isAllowed);
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
use alloy_primitives::{address, Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    sync::{Arc, OnceLock},
};
use subnet_abi::{AbiError, AbiType, AbiValue, Argument, Event, Function, StateMutability};

/// Address of the reward manager.
pub const REWARD_MANAGER_ADDRESS: Address = address!("0x0200000000000000000000000000000000000004");

/// Config key of the reward manager.
pub const CONFIG_KEY: &str = "rewardManagerConfig";

/// Fees sent here are burned.
pub const BLACKHOLE_ADDRESS: Address = address!("0x0100000000000000000000000000000000000000");

/// Gas charged by the mode setters, excluding the event.
pub const SET_REWARD_MODE_GAS_COST: u64 = WRITE_GAS_COST_PER_SLOT + READ_GAS_COST_PER_SLOT;

/// Gas charged by the getters.
pub const GET_REWARD_MODE_GAS_COST: u64 = READ_GAS_COST_PER_SLOT;

const FEE_RECIPIENTS_MAGIC: &[u8] = b"afrav";

fn reward_mode_slot() -> B256 {
    B256::right_padding_from(b"rask")
}

/// Where block fees are paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RewardMode {
    /// Each block producer picks its own recipient.
    FeeRecipients,
    /// Every block pays the same address.
    Fixed(Address),
    /// Fees are burned.
    #[default]
    Disabled,
}

impl RewardMode {
    /// Storage encoding. An unset slot reads back as [`RewardMode::Disabled`].
    pub fn to_word(self) -> B256 {
        match self {
            Self::FeeRecipients => B256::right_padding_from(FEE_RECIPIENTS_MAGIC),
            Self::Fixed(address) => address.into_word(),
            Self::Disabled => BLACKHOLE_ADDRESS.into_word(),
        }
    }

    /// Inverse of [`RewardMode::to_word`].
    pub fn from_word(word: B256) -> Self {
        if word == B256::right_padding_from(FEE_RECIPIENTS_MAGIC) {
            return Self::FeeRecipients;
        }
        match Address::from_word(word) {
            address if address.is_zero() || address == BLACKHOLE_ADDRESS => Self::Disabled,
            address => Self::Fixed(address),
        }
    }

    /// The address reported by `currentRewardAddress`: zero while producers
    /// choose, the blackhole while disabled.
    pub const fn reward_address(self) -> Address {
        match self {
            Self::FeeRecipients => Address::ZERO,
            Self::Fixed(address) => address,
            Self::Disabled => BLACKHOLE_ADDRESS,
        }
    }
}

/// Reads the current reward mode.
pub fn reward_mode(state: &mut dyn StateDB) -> Result<RewardMode, StateError> {
    Ok(RewardMode::from_word(state.get_state(REWARD_MANAGER_ADDRESS, reward_mode_slot())?))
}

/// Stores `mode`.
pub fn store_reward_mode(state: &mut dyn StateDB, mode: RewardMode) -> Result<(), StateError> {
    state.set_state(REWARD_MANAGER_ADDRESS, reward_mode_slot(), mode.to_word())
}

#[derive(Debug)]
struct RewardManagerAbi {
    set_reward_address: Function,
    allow_fee_recipients: Function,
    disable_rewards: Function,
    current_reward_address: Function,
    are_fee_recipients_allowed: Function,
    reward_address_changed: Event,
    fee_recipients_allowed: Event,
    rewards_disabled: Event,
}

fn reward_manager_abi() -> Result<&'static RewardManagerAbi, PrecompileError> {
    static ABI: OnceLock<Result<RewardManagerAbi, AbiError>> = OnceLock::new();
    ABI.get_or_init(|| {
        let setter = |name: &str, inputs| {
            Function::new(name, inputs, vec![], StateMutability::NonPayable)
        };
        let sender_event = |name: &str| {
            Event::new(name, vec![Argument::indexed("sender", AbiType::Address)], false)
        };
        Ok(RewardManagerAbi {
            set_reward_address: setter(
                "setRewardAddress",
                vec![Argument::new("addr", AbiType::Address)],
            ),
            allow_fee_recipients: setter("allowFeeRecipients", vec![]),
            disable_rewards: setter("disableRewards", vec![]),
            current_reward_address: Function::new(
                "currentRewardAddress",
                vec![],
                vec![Argument::new("rewardAddress", AbiType::Address)],
                StateMutability::View,
            ),
            are_fee_recipients_allowed: Function::new(
                "areFeeRecipientsAllowed",
                vec![],
                vec![Argument::new("isAllowed", AbiType::Bool)],
                StateMutability::View,
            ),
            reward_address_changed: Event::new(
                "RewardAddressChanged",
                vec![
                    Argument::indexed("sender", AbiType::Address),
                    Argument::indexed("oldRewardAddress", AbiType::Address),
                    Argument::indexed("newRewardAddress", AbiType::Address),
                ],
                false,
            )?,
            fee_recipients_allowed: sender_event("FeeRecipientsAllowed")?,
            rewards_disabled: sender_event("RewardsDisabled")?,
        })
    })
    .as_ref()
    .map_err(|err| PrecompileError::Abi(err.clone()))
}

/// Shared body of the three mode setters.
fn switch_mode(
    ctx: &mut CallContext<'_>,
    mode: RewardMode,
    event: &Event,
    values: &[AbiValue],
) -> Result<Bytes, PrecompileError> {
    ensure_role(ctx, Role::Enabled)?;
    let old = reward_mode(ctx.state)?;
    let log = ctx.prepare_log(event, values)?;
    store_reward_mode(ctx.state, mode)?;
    ctx.emit(log)?;
    tracing::info!(
        target: "reward_manager",
        caller = ?ctx.caller,
        ?old,
        new = ?mode,
        "reward mode changed"
    );
    Ok(Bytes::new())
}

fn set_reward_address(ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
    ctx.ensure_writable()?;
    let abi = reward_manager_abi()?;
    let values = decode_args(&abi.set_reward_address, input)?;
    let address = args::address(&values, 0)?;
    if address.is_zero() || address == BLACKHOLE_ADDRESS {
        return Err(PrecompileError::InvalidArgument(format!(
            "{address} cannot be a reward address"
        )));
    }
    let old = reward_mode(ctx.state)?.reward_address();
    let values: [AbiValue; 3] = [ctx.caller.into(), old.into(), address.into()];
    switch_mode(ctx, RewardMode::Fixed(address), &abi.reward_address_changed, &values)
}

fn allow_fee_recipients(ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
    ctx.ensure_writable()?;
    let abi = reward_manager_abi()?;
    decode_args(&abi.allow_fee_recipients, input)?;
    let values = [AbiValue::from(ctx.caller)];
    switch_mode(ctx, RewardMode::FeeRecipients, &abi.fee_recipients_allowed, &values)
}

fn disable_rewards(ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
    ctx.ensure_writable()?;
    let abi = reward_manager_abi()?;
    decode_args(&abi.disable_rewards, input)?;
    let values = [AbiValue::from(ctx.caller)];
    switch_mode(ctx, RewardMode::Disabled, &abi.rewards_disabled, &values)
}

fn current_reward_address(
    ctx: &mut CallContext<'_>,
    input: &[u8],
) -> Result<Bytes, PrecompileError> {
    let abi = reward_manager_abi()?;
    decode_args(&abi.current_reward_address, input)?;
    let mode = reward_mode(ctx.state)?;
    encode_output(&abi.current_reward_address, &[mode.reward_address().into()])
}

fn are_fee_recipients_allowed(
    ctx: &mut CallContext<'_>,
    input: &[u8],
) -> Result<Bytes, PrecompileError> {
    let abi = reward_manager_abi()?;
    decode_args(&abi.are_fee_recipients_allowed, input)?;
    let allowed = reward_mode(ctx.state)? == RewardMode::FeeRecipients;
    encode_output(&abi.are_fee_recipients_allowed, &[allowed.into()])
}

/// Call data for `setRewardAddress(addr)`.
pub fn pack_set_reward_address(address: Address) -> Result<Bytes, PrecompileError> {
    Ok(reward_manager_abi()?.set_reward_address.encode_input(&[address.into()])?.into())
}

/// Call data for `allowFeeRecipients()`.
pub fn pack_allow_fee_recipients() -> Result<Bytes, PrecompileError> {
    Ok(reward_manager_abi()?.allow_fee_recipients.encode_input(&[])?.into())
}

/// Call data for `disableRewards()`.
pub fn pack_disable_rewards() -> Result<Bytes, PrecompileError> {
    Ok(reward_manager_abi()?.disable_rewards.encode_input(&[])?.into())
}

/// Call data for `currentRewardAddress()`.
pub fn pack_current_reward_address() -> Result<Bytes, PrecompileError> {
    Ok(reward_manager_abi()?.current_reward_address.encode_input(&[])?.into())
}

/// Reward configuration applied on activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialRewardConfig {
    /// Let block producers choose their recipient.
    #[serde(default)]
    pub allow_fee_recipients: bool,
    /// Fixed reward address; zero means rewards are disabled.
    #[serde(default)]
    pub reward_address: Address,
}

impl InitialRewardConfig {
    /// The mode this config selects.
    pub fn mode(&self) -> RewardMode {
        if self.allow_fee_recipients {
            RewardMode::FeeRecipients
        } else if self.reward_address.is_zero() {
            RewardMode::Disabled
        } else {
            RewardMode::Fixed(self.reward_address)
        }
    }
}

/// Reward manager configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardManagerConfig {
    /// Activation fields.
    #[serde(flatten)]
    pub upgrade: Upgrade,
    /// Initial roles.
    #[serde(flatten)]
    pub allow_list: AllowListConfig,
    /// Mode stored on activation; otherwise derived from the chain config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_reward_config: Option<InitialRewardConfig>,
}

impl RewardManagerConfig {
    /// An enabling config at `timestamp`.
    pub fn new(
        timestamp: u64,
        allow_list: AllowListConfig,
        initial_reward_config: Option<InitialRewardConfig>,
    ) -> Self {
        Self { upgrade: Upgrade::at(timestamp), allow_list, initial_reward_config }
    }

    /// A disabling config at `timestamp`.
    pub fn disable(timestamp: u64) -> Self {
        Self { upgrade: Upgrade::disabled_at(timestamp), ..Default::default() }
    }
}

impl PrecompileConfig for RewardManagerConfig {
    fn key(&self) -> &'static str {
        CONFIG_KEY
    }

    fn address(&self) -> Address {
        REWARD_MANAGER_ADDRESS
    }

    fn upgrade(&self) -> &Upgrade {
        &self.upgrade
    }

    fn equal(&self, other: &dyn PrecompileConfig) -> bool {
        config_eq(self, other)
    }

    fn verify(&self, _chain: &ChainConfig) -> Result<(), ConfigError> {
        self.allow_list.verify()?;
        if let Some(initial) = &self.initial_reward_config {
            if initial.allow_fee_recipients && !initial.reward_address.is_zero() {
                return Err(ConfigError::Invalid {
                    key: CONFIG_KEY,
                    reason: "allowFeeRecipients and rewardAddress are mutually exclusive".into(),
                });
            }
            if initial.reward_address == BLACKHOLE_ADDRESS {
                return Err(ConfigError::Invalid {
                    key: CONFIG_KEY,
                    reason: "rewardAddress cannot be the blackhole address".into(),
                });
            }
        }
        Ok(())
    }

    fn configure(
        &self,
        chain: &ChainConfig,
        state: &mut dyn StateDB,
        _block: &BlockContext,
    ) -> Result<(), ActivationError> {
        let mode = match &self.initial_reward_config {
            Some(initial) => initial.mode(),
            None if chain.allowed_fee_recipients() => RewardMode::FeeRecipients,
            None => RewardMode::Disabled,
        };
        store_reward_mode(state, mode)?;
        self.allow_list.configure(state, REWARD_MANAGER_ADDRESS)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn parse(value: serde_json::Value) -> Result<Arc<dyn PrecompileConfig>, ConfigError> {
    Ok(Arc::new(parse_config::<RewardManagerConfig>(CONFIG_KEY, value)?))
}

/// The reward manager module.
pub fn module() -> Result<Module, ConfigError> {
    let abi = reward_manager_abi().map_err(ConfigError::from_descriptor)?;
    let mut functions = allow_list_functions()?;
    functions.extend([
        FunctionEntry::new(&abi.set_reward_address, SET_REWARD_MODE_GAS_COST, set_reward_address),
        FunctionEntry::new(
            &abi.allow_fee_recipients,
            SET_REWARD_MODE_GAS_COST,
            allow_fee_recipients,
        ),
        FunctionEntry::new(&abi.disable_rewards, SET_REWARD_MODE_GAS_COST, disable_rewards),
        FunctionEntry::new(
            &abi.current_reward_address,
            GET_REWARD_MODE_GAS_COST,
            current_reward_address,
        ),
        FunctionEntry::new(
            &abi.are_fee_recipients_allowed,
            GET_REWARD_MODE_GAS_COST,
            are_fee_recipients_allowed,
        ),
    ]);
    Ok(Module {
        key: CONFIG_KEY,
        address: REWARD_MANAGER_ADDRESS,
        contract: Arc::new(StatefulContract::new(functions, None)?),
        parse_config: parse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{allowlist::set_role, contract::run_precompile, memory::MemoryState};
    use alloy_sol_types::{sol, SolCall};

    sol! {
        interface IRewardManager {
            function setRewardAddress(address addr) external;
            function allowFeeRecipients() external;
            function disableRewards() external;
            function currentRewardAddress() external view returns (address rewardAddress);
            function areFeeRecipientsAllowed() external view returns (bool isAllowed);
        }
    }

    const OPERATOR: Address = address!("0x00000000000000000000000000000000000000e1");
    const PAYEE: Address = address!("0x0000000000000000000000000000000000000fee");

    fn call(
        state: &mut MemoryState,
        caller: Address,
        input: &[u8],
        read_only: bool,
    ) -> Result<Bytes, PrecompileError> {
        let module = module().unwrap();
        run_precompile(
            module.contract.as_ref(),
            state,
            BlockContext::new(1, 1),
            caller,
            REWARD_MANAGER_ADDRESS,
            input,
            100_000,
            read_only,
        )
        .map(|out| out.output)
        .map_err(|failure| failure.error)
    }

    fn current_address(state: &mut MemoryState) -> Address {
        let out = call(state, PAYEE, &pack_current_reward_address().unwrap(), true).unwrap();
        Address::from_word(B256::from_slice(&out))
    }

    #[test]
    fn selectors_match_interface() {
        let abi = reward_manager_abi().unwrap();
        assert_eq!(
            abi.set_reward_address.selector(),
            IRewardManager::setRewardAddressCall::SELECTOR
        );
        assert_eq!(
            abi.allow_fee_recipients.selector(),
            IRewardManager::allowFeeRecipientsCall::SELECTOR
        );
        assert_eq!(abi.disable_rewards.selector(), IRewardManager::disableRewardsCall::SELECTOR);
        assert_eq!(
            abi.current_reward_address.selector(),
            IRewardManager::currentRewardAddressCall::SELECTOR
        );
        assert_eq!(
            abi.are_fee_recipients_allowed.selector(),
            IRewardManager::areFeeRecipientsAllowedCall::SELECTOR
        );
    }

    #[test]
    fn mode_words_are_distinct() {
        for mode in [RewardMode::FeeRecipients, RewardMode::Fixed(PAYEE), RewardMode::Disabled] {
            assert_eq!(RewardMode::from_word(mode.to_word()), mode);
        }
        assert_eq!(RewardMode::from_word(B256::ZERO), RewardMode::Disabled);
    }

    #[test]
    fn modes_are_mutually_exclusive() {
        let mut state = MemoryState::new();
        set_role(&mut state, REWARD_MANAGER_ADDRESS, OPERATOR, Role::Enabled).unwrap();

        call(&mut state, OPERATOR, &pack_set_reward_address(PAYEE).unwrap(), false).unwrap();
        assert_eq!(reward_mode(&mut state).unwrap(), RewardMode::Fixed(PAYEE));
        assert_eq!(current_address(&mut state), PAYEE);

        call(&mut state, OPERATOR, &pack_allow_fee_recipients().unwrap(), false).unwrap();
        assert_eq!(reward_mode(&mut state).unwrap(), RewardMode::FeeRecipients);
        assert_eq!(current_address(&mut state), Address::ZERO);

        call(&mut state, OPERATOR, &pack_disable_rewards().unwrap(), false).unwrap();
        assert_eq!(reward_mode(&mut state).unwrap(), RewardMode::Disabled);
        assert_eq!(current_address(&mut state), BLACKHOLE_ADDRESS);

        assert_eq!(state.logs().len(), 3);
        let changed = &state.logs()[0];
        let values = reward_manager_abi()
            .unwrap()
            .reward_address_changed
            .decode_log(changed.data.topics(), &changed.data.data)
            .unwrap();
        assert_eq!(values, vec![OPERATOR.into(), BLACKHOLE_ADDRESS.into(), PAYEE.into()]);
    }

    #[test]
    fn setters_require_enabled_and_writable() {
        let mut state = MemoryState::new();
        let err = call(&mut state, PAYEE, &pack_disable_rewards().unwrap(), false).unwrap_err();
        assert!(matches!(err, PrecompileError::Unauthorized { .. }));

        set_role(&mut state, REWARD_MANAGER_ADDRESS, OPERATOR, Role::Enabled).unwrap();
        let input = pack_allow_fee_recipients().unwrap();
        let err = call(&mut state, OPERATOR, &input, true).unwrap_err();
        assert_eq!(err, PrecompileError::WriteProtection);

        let input = pack_set_reward_address(BLACKHOLE_ADDRESS).unwrap();
        let err = call(&mut state, OPERATOR, &input, false).unwrap_err();
        assert!(matches!(err, PrecompileError::InvalidArgument(_)));
        assert_eq!(reward_mode(&mut state).unwrap(), RewardMode::Disabled);
    }

    #[test]
    fn configure_prefers_initial_config() {
        let chain = ChainConfig { allow_fee_recipients: true, ..ChainConfig::default() };
        let block = BlockContext::default();

        let mut state = MemoryState::new();
        RewardManagerConfig::new(0, AllowListConfig::default(), None)
            .configure(&chain, &mut state, &block)
            .unwrap();
        assert_eq!(reward_mode(&mut state).unwrap(), RewardMode::FeeRecipients);

        let mut state = MemoryState::new();
        let initial = InitialRewardConfig { allow_fee_recipients: false, reward_address: PAYEE };
        RewardManagerConfig::new(0, AllowListConfig::default(), Some(initial))
            .configure(&chain, &mut state, &block)
            .unwrap();
        assert_eq!(reward_mode(&mut state).unwrap(), RewardMode::Fixed(PAYEE));
    }

    #[test]
    fn verify_rejects_conflicting_initial_config() {
        let initial = InitialRewardConfig { allow_fee_recipients: true, reward_address: PAYEE };
        let config = RewardManagerConfig::new(0, AllowListConfig::default(), Some(initial));
        assert!(matches!(
            config.verify(&ChainConfig::default()),
            Err(ConfigError::Invalid { key: CONFIG_KEY, .. })
        ));
    }
}
