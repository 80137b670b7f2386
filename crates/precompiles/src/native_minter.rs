//! Native Minter
//!
//! Lets allow-listed callers credit native coin to any account.
//!
//! ```text
//! interface INativeMinter is IAllowList {
//!     event NativeCoinMinted(address indexed sender, address indexed recipient, uint256 amount);
//!     function mintNativeCoin(address addr, uint256 amount) external;
//! }
//! ```

use crate::{
    allowlist::{allow_list_functions, ensure_role, AllowListConfig, Role},
    config::{config_eq, parse_config, PrecompileConfig, Upgrade},
    contract::{args, decode_args, CallContext, FunctionEntry, StatefulContract},
    error::{ActivationError, ConfigError, PrecompileError},
    modules::Module,
    state::{BlockContext, ChainConfig, StateDB},
};
use alloy_primitives::{address, Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    collections::BTreeMap,
    sync::{Arc, OnceLock},
};
use subnet_abi::{AbiError, AbiType, Argument, Event, Function, StateMutability};

/// Address of the native minter.
pub const NATIVE_MINTER_ADDRESS: Address = address!("0x0200000000000000000000000000000000000001");

/// Config key of the native minter.
pub const CONFIG_KEY: &str = "contractNativeMinterConfig";

/// Gas charged by `mintNativeCoin`, excluding the event.
pub const MINT_GAS_COST: u64 = 30_000;

#[derive(Debug)]
struct MinterAbi {
    mint_native_coin: Function,
    native_coin_minted: Event,
}

fn minter_abi() -> Result<&'static MinterAbi, PrecompileError> {
    static ABI: OnceLock<Result<MinterAbi, AbiError>> = OnceLock::new();
    ABI.get_or_init(|| {
        Ok(MinterAbi {
            mint_native_coin: Function::new(
                "mintNativeCoin",
                vec![
                    Argument::new("addr", AbiType::Address),
                    Argument::new("amount", AbiType::Uint(256)),
                ],
                vec![],
                StateMutability::NonPayable,
            ),
            native_coin_minted: Event::new(
                "NativeCoinMinted",
                vec![
                    Argument::indexed("sender", AbiType::Address),
                    Argument::indexed("recipient", AbiType::Address),
                    Argument::new("amount", AbiType::Uint(256)),
                ],
                false,
            )?,
        })
    })
    .as_ref()
    .map_err(|err| PrecompileError::Abi(err.clone()))
}

/// Credits `amount` to `to`, creating the account first if needed.
fn mint(state: &mut dyn StateDB, to: Address, amount: U256) -> Result<(), PrecompileError> {
    if !state.exist(to)? {
        state.create_account(to)?;
    }
    state.add_balance(to, amount)?;
    Ok(())
}

fn mint_native_coin(ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
    ctx.ensure_writable()?;
    let abi = minter_abi()?;
    let values = decode_args(&abi.mint_native_coin, input)?;
    let to = args::address(&values, 0)?;
    let amount = args::uint(&values, 1)?;

    ensure_role(ctx, Role::Enabled)?;

    let log =
        ctx.prepare_log(&abi.native_coin_minted, &[ctx.caller.into(), to.into(), amount.into()])?;
    mint(ctx.state, to, amount)?;
    ctx.emit(log)?;

    tracing::info!(target: "native_minter", caller = ?ctx.caller, ?to, %amount, "minted native coin");
    Ok(Bytes::new())
}

/// Call data for `mintNativeCoin(to, amount)`.
pub fn pack_mint_native_coin(to: Address, amount: U256) -> Result<Bytes, PrecompileError> {
    Ok(minter_abi()?.mint_native_coin.encode_input(&[to.into(), amount.into()])?.into())
}

/// Native minter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeMinterConfig {
    /// Activation fields.
    #[serde(flatten)]
    pub upgrade: Upgrade,
    /// Initial roles.
    #[serde(flatten)]
    pub allow_list: AllowListConfig,
    /// Balances credited on activation.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub initial_mint: BTreeMap<Address, U256>,
}

impl NativeMinterConfig {
    /// An enabling config at `timestamp`.
    pub fn new(
        timestamp: u64,
        allow_list: AllowListConfig,
        initial_mint: BTreeMap<Address, U256>,
    ) -> Self {
        Self { upgrade: Upgrade::at(timestamp), allow_list, initial_mint }
    }

    /// A disabling config at `timestamp`.
    pub fn disable(timestamp: u64) -> Self {
        Self { upgrade: Upgrade::disabled_at(timestamp), ..Default::default() }
    }
}

impl PrecompileConfig for NativeMinterConfig {
    fn key(&self) -> &'static str {
        CONFIG_KEY
    }

    fn address(&self) -> Address {
        NATIVE_MINTER_ADDRESS
    }

    fn upgrade(&self) -> &Upgrade {
        &self.upgrade
    }

    fn equal(&self, other: &dyn PrecompileConfig) -> bool {
        config_eq(self, other)
    }

    fn verify(&self, _chain: &ChainConfig) -> Result<(), ConfigError> {
        self.allow_list.verify()?;
        if let Some((address, _)) = self.initial_mint.iter().find(|(_, amount)| amount.is_zero()) {
            return Err(ConfigError::Invalid {
                key: CONFIG_KEY,
                reason: format!("initial mint to {address} must be positive"),
            });
        }
        Ok(())
    }

    fn configure(
        &self,
        _chain: &ChainConfig,
        state: &mut dyn StateDB,
        _block: &BlockContext,
    ) -> Result<(), ActivationError> {
        for (to, amount) in &self.initial_mint {
            mint(state, *to, *amount).map_err(|err| ActivationError::Configure {
                key: CONFIG_KEY,
                reason: err.to_string(),
            })?;
        }
        self.allow_list.configure(state, NATIVE_MINTER_ADDRESS)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn parse(value: serde_json::Value) -> Result<Arc<dyn PrecompileConfig>, ConfigError> {
    Ok(Arc::new(parse_config::<NativeMinterConfig>(CONFIG_KEY, value)?))
}

/// The native minter module.
pub fn module() -> Result<Module, ConfigError> {
    let abi = minter_abi().map_err(ConfigError::from_descriptor)?;
    let mut functions = allow_list_functions()?;
    functions.push(FunctionEntry::new(&abi.mint_native_coin, MINT_GAS_COST, mint_native_coin));
    Ok(Module {
        key: CONFIG_KEY,
        address: NATIVE_MINTER_ADDRESS,
        contract: Arc::new(StatefulContract::new(functions, None)?),
        parse_config: parse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        allowlist::set_role,
        contract::run_precompile,
        gas::log_gas,
        memory::MemoryState,
    };
    use alloy_primitives::hex;

    const ENABLED: Address = address!("0x00000000000000000000000000000000000000e1");
    const RECIPIENT: Address = address!("0x00000000000000000000000000000000000000f0");

    fn call(
        state: &mut MemoryState,
        caller: Address,
        input: &[u8],
        gas: u64,
    ) -> Result<u64, PrecompileError> {
        let module = module().unwrap();
        run_precompile(
            module.contract.as_ref(),
            state,
            BlockContext::new(1, 1),
            caller,
            NATIVE_MINTER_ADDRESS,
            input,
            gas,
            false,
        )
        .map(|out| out.remaining_gas)
        .map_err(|failure| failure.error)
    }

    #[test]
    fn selector_matches_interface() {
        assert_eq!(minter_abi().unwrap().mint_native_coin.selector(), hex!("4f5aaaba"));
    }

    #[test]
    fn enabled_caller_mints_and_pays_for_event() {
        let mut state = MemoryState::new();
        set_role(&mut state, NATIVE_MINTER_ADDRESS, ENABLED, Role::Enabled).unwrap();
        let input = pack_mint_native_coin(RECIPIENT, U256::from(500u64)).unwrap();
        let remaining = call(&mut state, ENABLED, &input, 100_000).unwrap();

        assert_eq!(state.balance(RECIPIENT), U256::from(500u64));
        assert_eq!(remaining, 100_000 - MINT_GAS_COST - log_gas(3, 32));
        let log = &state.logs()[0];
        let values = minter_abi()
            .unwrap()
            .native_coin_minted
            .decode_log(log.data.topics(), &log.data.data)
            .unwrap();
        assert_eq!(values, vec![ENABLED.into(), RECIPIENT.into(), U256::from(500u64).into()]);
    }

    #[test]
    fn unlisted_caller_cannot_mint() {
        let mut state = MemoryState::new();
        let input = pack_mint_native_coin(RECIPIENT, U256::from(1u64)).unwrap();
        let err = call(&mut state, RECIPIENT, &input, 100_000).unwrap_err();
        assert!(matches!(err, PrecompileError::Unauthorized { required: Role::Enabled, .. }));
        assert!(state.account(RECIPIENT).is_none());
        assert!(state.logs().is_empty());
    }

    #[test]
    fn config_verifies_and_configures() {
        let mut config = NativeMinterConfig::new(
            0,
            AllowListConfig { admin_addresses: vec![ENABLED], enabled_addresses: vec![] },
            BTreeMap::from([(RECIPIENT, U256::from(7u64))]),
        );
        config.verify(&ChainConfig::default()).unwrap();

        let mut state = MemoryState::new();
        config.configure(&ChainConfig::default(), &mut state, &BlockContext::default()).unwrap();
        assert_eq!(state.balance(RECIPIENT), U256::from(7u64));

        config.initial_mint.insert(ENABLED, U256::ZERO);
        assert!(matches!(
            config.verify(&ChainConfig::default()),
            Err(ConfigError::Invalid { key: CONFIG_KEY, .. })
        ));
    }

    #[test]
    fn parses_flattened_json() {
        let config = parse(serde_json::json!({
            "blockTimestamp": 5,
            "adminAddresses": ["0x00000000000000000000000000000000000000e1"],
            "initialMint": { "0x00000000000000000000000000000000000000f0": "0x64" }
        }))
        .unwrap();
        let expected = NativeMinterConfig::new(
            5,
            AllowListConfig { admin_addresses: vec![ENABLED], enabled_addresses: vec![] },
            BTreeMap::from([(RECIPIENT, U256::from(100u64))]),
        );
        assert!(config.equal(&expected));
        assert!(!config.equal(&NativeMinterConfig::disable(5)));
    }
}
