//! Cross-checks the codec against the `sol!` reference encoder.

use alloy_primitives::{address, Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use subnet_abi::{
    decode_strict, parse_signature, AbiType, AbiValue, Argument, ContractAbi, Event,
};

sol! {
    struct Order {
        address maker;
        uint256[] amounts;
        bytes memo;
    }

    function submit(Order[] orders, string tag, bool urgent);
    function setAdmin(address addr);
    function mintNativeCoin(address addr, uint256 amount);

    event RoleSet(uint256 indexed role, address indexed account, address indexed sender, uint256 oldRole);
}

fn order_type() -> AbiType {
    AbiType::parse("(address,uint256[],bytes)").unwrap()
}

fn order_value(maker: Address, amounts: &[u64], memo: &[u8]) -> AbiValue {
    AbiValue::Tuple(vec![
        maker.into(),
        AbiValue::Array(amounts.iter().map(|a| AbiValue::from(*a)).collect()),
        AbiValue::Bytes(memo.to_vec()),
    ])
}

#[test]
fn nested_dynamic_call_matches_reference() {
    let maker_a = address!("0x00000000000000000000000000000000000000aa");
    let maker_b = address!("0x00000000000000000000000000000000000000bb");

    let reference = submitCall {
        orders: vec![
            Order {
                maker: maker_a,
                amounts: vec![U256::from(1u64), U256::from(2u64)],
                memo: Bytes::from_static(b"first"),
            },
            Order { maker: maker_b, amounts: vec![], memo: Bytes::new() },
        ],
        tag: "batch-7".to_string(),
        urgent: true,
    }
    .abi_encode();

    let function = parse_signature("submit((address,uint256[],bytes)[],string,bool)").unwrap();
    assert_eq!(function.selector(), submitCall::SELECTOR);

    let values = vec![
        AbiValue::Array(vec![
            order_value(maker_a, &[1, 2], b"first"),
            order_value(maker_b, &[], b""),
        ]),
        "batch-7".into(),
        true.into(),
    ];
    let ours = function.encode_input(&values).unwrap();
    assert_eq!(ours, reference);
    assert_eq!(function.decode_input_strict(&reference).unwrap(), values);
}

#[test]
fn allow_list_and_minter_calls_match_reference() {
    let addr = address!("0x0000000000000000000000000000000000001234");

    let set_admin = parse_signature("setAdmin(address)").unwrap();
    assert_eq!(
        set_admin.encode_input(&[addr.into()]).unwrap(),
        setAdminCall { addr }.abi_encode()
    );

    let mint = parse_signature("mintNativeCoin(address,uint256)").unwrap();
    let amount = U256::from(10u64).pow(U256::from(18u64));
    assert_eq!(
        mint.encode_input(&[addr.into(), amount.into()]).unwrap(),
        mintNativeCoinCall { addr, amount }.abi_encode()
    );
}

#[test]
fn event_topics_match_reference() {
    let account = address!("0x00000000000000000000000000000000000000aa");
    let sender = address!("0x00000000000000000000000000000000000000bb");
    let event = Event::new(
        "RoleSet",
        vec![
            Argument::indexed("role", AbiType::Uint(256)),
            Argument::indexed("account", AbiType::Address),
            Argument::indexed("sender", AbiType::Address),
            Argument::new("oldRole", AbiType::Uint(256)),
        ],
        false,
    )
    .unwrap();
    assert_eq!(event.topic(), RoleSet::SIGNATURE_HASH);

    let reference = RoleSet {
        role: U256::from(2u64),
        account,
        sender,
        oldRole: U256::from(1u64),
    };
    let (topics, data) = event
        .encode_log(&[2u64.into(), account.into(), sender.into(), 1u64.into()])
        .unwrap();
    let reference_topics: Vec<_> = reference.encode_topics().into_iter().map(|t| t.0).collect();
    assert_eq!(topics, reference_topics);
    assert_eq!(data, reference.encode_data());
}

#[test]
fn truncated_reference_payloads_are_rejected() {
    let reference = submitCall {
        orders: vec![Order {
            maker: Address::ZERO,
            amounts: vec![U256::from(3u64)],
            memo: Bytes::from_static(b"memo"),
        }],
        tag: String::new(),
        urgent: false,
    }
    .abi_encode();
    let types = [AbiType::array(order_type()), AbiType::String, AbiType::Bool];
    let args = &reference[4..];
    assert!(decode_strict(args, &types).is_ok());
    for cut in (32..args.len()).step_by(32) {
        assert!(decode_strict(&args[..cut], &types).is_err(), "cut at {cut}");
    }
}

#[test]
fn json_interface_agrees_with_reference_selectors() {
    let abi = ContractAbi::from_json(
        r#"[
            {"type":"function","name":"setAdmin","inputs":[{"name":"addr","type":"address"}],"outputs":[]},
            {"type":"function","name":"mintNativeCoin","inputs":[{"name":"addr","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[]}
        ]"#,
    )
    .unwrap();
    assert_eq!(abi.method("setAdmin").unwrap().selector(), setAdminCall::SELECTOR);
    assert_eq!(abi.method("mintNativeCoin").unwrap().selector(), mintNativeCoinCall::SELECTOR);
}
