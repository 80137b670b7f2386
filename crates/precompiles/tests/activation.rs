//! Upgrade verification, activation and compatibility across modules.

use alloy_primitives::{address, Address, U256};
use std::{collections::BTreeMap, sync::Arc};
use subnet_precompiles::{
    fee_manager::{get_stored_fee_config, FeeManagerConfig, FEE_MANAGER_ADDRESS},
    memory::MemoryState,
    native_minter::{NativeMinterConfig, NATIVE_MINTER_ADDRESS},
    reward_manager::{reward_mode, RewardManagerConfig},
    tx_allow_list::{tx_allow_list_status, TxAllowListConfig},
    upgrade::PRECOMPILE_MARKER_CODE,
    AllowListConfig, BlockContext, ChainConfig, ConfigError, FeeConfig, ModuleRegistry,
    PrecompileConfig, PrecompileUpgrades, RewardMode, Role,
};

const ADMIN: Address = address!("0x00000000000000000000000000000000000000aa");
const RICH: Address = address!("0x00000000000000000000000000000000000000dd");

fn admins() -> AllowListConfig {
    AllowListConfig { admin_addresses: vec![ADMIN], enabled_addresses: vec![] }
}

fn minter(timestamp: u64) -> Arc<dyn PrecompileConfig> {
    Arc::new(NativeMinterConfig::new(
        timestamp,
        admins(),
        BTreeMap::from([(RICH, U256::from(1_000u64))]),
    ))
}

#[test]
fn later_entry_with_earlier_timestamp_fails_verify() {
    let registry = ModuleRegistry::with_default_modules().unwrap();
    let upgrades = PrecompileUpgrades::new(vec![
        Arc::new(TxAllowListConfig::new(100, admins())),
        Arc::new(TxAllowListConfig::new(50, admins())),
    ]);
    assert_eq!(
        upgrades.verify(&registry, &ChainConfig::default()),
        Err(ConfigError::NonMonotonicTimestamp {
            key: "txAllowListConfig".into(),
            previous: 100,
            timestamp: 50,
        })
    );

    // across keys as well
    let upgrades = PrecompileUpgrades::new(vec![
        minter(100),
        Arc::new(FeeManagerConfig::new(50, admins(), None)),
    ]);
    assert!(matches!(
        upgrades.verify(&registry, &ChainConfig::default()),
        Err(ConfigError::NonMonotonicTimestamp { previous: 100, timestamp: 50, .. })
    ));
}

#[test]
fn invalid_module_config_fails_verify() {
    let registry = ModuleRegistry::with_default_modules().unwrap();
    let overlapping =
        AllowListConfig { admin_addresses: vec![ADMIN], enabled_addresses: vec![ADMIN] };
    let upgrades = PrecompileUpgrades::new(vec![Arc::new(TxAllowListConfig::new(1, overlapping))]);
    assert_eq!(
        upgrades.verify(&registry, &ChainConfig::default()),
        Err(ConfigError::AllowListOverlap(ADMIN))
    );
}

#[test]
fn configure_fires_once_while_timestamps_advance() {
    let registry = ModuleRegistry::with_default_modules().unwrap();
    let chain = ChainConfig::default();
    let upgrades = PrecompileUpgrades::new(vec![minter(10)]);
    upgrades.verify(&registry, &chain).unwrap();

    let mut state = MemoryState::new();
    let mut parent = None;
    for (number, timestamp) in [0u64, 4, 9, 10, 11, 12, 30].into_iter().enumerate() {
        let block = BlockContext::new(number as u64, timestamp);
        upgrades.check_configure(&registry, &chain, parent, &block, &mut state).unwrap();
        parent = Some(timestamp);
    }
    // credited exactly once
    assert_eq!(state.balance(RICH), U256::from(1_000u64));
    let account = state.account(NATIVE_MINTER_ADDRESS).unwrap();
    assert_eq!((account.nonce, account.code.clone()), (1, PRECOMPILE_MARKER_CODE));
}

#[test]
fn genesis_applies_everything_up_to_its_timestamp() {
    let registry = ModuleRegistry::with_default_modules().unwrap();
    let chain = ChainConfig { allow_fee_recipients: true, ..ChainConfig::default() };
    let upgrades = PrecompileUpgrades::new(vec![
        Arc::new(TxAllowListConfig::new(0, admins())),
        Arc::new(FeeManagerConfig::new(0, AllowListConfig::default(), None)),
        Arc::new(RewardManagerConfig::new(0, AllowListConfig::default(), None)),
        Arc::new(TxAllowListConfig::disable(5)),
    ]);
    upgrades.verify(&registry, &chain).unwrap();

    let mut state = MemoryState::new();
    upgrades
        .check_configure(&registry, &chain, None, &BlockContext::new(0, 0), &mut state)
        .unwrap();
    assert_eq!(tx_allow_list_status(&mut state, ADMIN).unwrap(), Role::Admin);
    assert_eq!(get_stored_fee_config(&mut state).unwrap(), FeeConfig::default());
    assert_eq!(reward_mode(&mut state).unwrap(), RewardMode::FeeRecipients);
    assert!(state.account(FEE_MANAGER_ADDRESS).is_some());

    upgrades
        .check_configure(&registry, &chain, Some(0), &BlockContext::new(1, 5), &mut state)
        .unwrap();
    assert_eq!(tx_allow_list_status(&mut state, ADMIN).unwrap(), Role::None);
    assert_eq!(upgrades.enabled_at(&registry, 5).len(), 2);
}

#[test]
fn registry_is_compatible_with_itself() {
    let upgrades = PrecompileUpgrades::new(vec![
        minter(0),
        Arc::new(TxAllowListConfig::new(10, admins())),
        Arc::new(NativeMinterConfig::disable(20)),
    ]);
    for head in [0, 5, 10, 20, 1_000] {
        upgrades.check_compatible(&upgrades, head).unwrap();
    }
}

#[test]
fn activated_config_contents_are_immutable() {
    let stored = PrecompileUpgrades::new(vec![minter(10)]);
    let changed = PrecompileUpgrades::new(vec![Arc::new(NativeMinterConfig::new(
        10,
        admins(),
        BTreeMap::new(),
    )) as Arc<dyn PrecompileConfig>]);

    stored.check_compatible(&changed, 9).unwrap();
    let err = stored.check_compatible(&changed, 10).unwrap_err();
    assert_eq!(err.key, "contractNativeMinterConfig");
    assert_eq!((err.stored, err.new), (Some(10), Some(10)));
    assert_eq!(err.rewind_to, 9);
}

#[test]
fn json_document_round_trips_into_activation() {
    let registry = ModuleRegistry::with_default_modules().unwrap();
    let upgrades = PrecompileUpgrades::from_json(
        r#"{
            "feeManagerConfig": {
                "blockTimestamp": 0,
                "adminAddresses": ["0x00000000000000000000000000000000000000aa"],
                "initialFeeConfig": {
                    "gasLimit": "0x1312d00",
                    "targetBlockRate": "0x2",
                    "minBaseFee": "0x5d21dba00",
                    "targetGas": "0xe4e1c0",
                    "baseFeeChangeDenominator": "0x24",
                    "minBlockGasCost": "0x0",
                    "maxBlockGasCost": "0xf4240",
                    "blockGasCostStep": "0x30d40",
                    "unknownField": true
                }
            }
        }"#,
        &registry,
    )
    .unwrap();
    let chain = ChainConfig::default();
    upgrades.verify(&registry, &chain).unwrap();

    let mut state = MemoryState::new();
    upgrades
        .check_configure(&registry, &chain, None, &BlockContext::new(0, 0), &mut state)
        .unwrap();
    let stored = get_stored_fee_config(&mut state).unwrap();
    assert_eq!(stored.gas_limit, U256::from(20_000_000u64));
    assert_eq!(stored.min_base_fee, U256::from(25_000_000_000u64));
}
