//! # Allow List
//!
//! Three-state role store (`None`, `Enabled`, `Admin`) shared by every gated
//! precompile. Roles live in the precompile's own storage, one slot per subject
//! address, keyed by the address left-padded to 32 bytes.
//!
//! [`get_role`] and [`set_role`] are pure storage access and perform no
//! authorization. The handlers in this module enforce the policy: only admins
//! may change roles, and never in a static call.
//!
//! ```text
//! interface IAllowList {
//!     event RoleSet(uint256 indexed role, address indexed account, address indexed sender, uint256 oldRole);
//!     function setAdmin(address addr) external;
//!     function setEnabled(address addr) external;
//!     function setNone(address addr) external;
//!     function readAllowList(address addr) external view returns (uint256 role);
//! }
//! ```

mod config;
mod role;

pub use config::AllowListConfig;
pub use role::Role;

use crate::{
    contract::{args, decode_args, encode_output, CallContext, FunctionEntry},
    error::{ConfigError, PrecompileError},
    gas::{READ_GAS_COST_PER_SLOT, WRITE_GAS_COST_PER_SLOT},
    state::{StateDB, StateError},
};
use alloy_primitives::{Address, Bytes, U256};
use std::sync::OnceLock;
use subnet_abi::{
    AbiError, AbiType, AbiValue, Argument, Event, Function, StateMutability,
};

/// Gas charged by `setAdmin`, `setEnabled` and `setNone`, excluding the event.
pub const MODIFY_ALLOW_LIST_GAS_COST: u64 = WRITE_GAS_COST_PER_SLOT;

/// Gas charged by `readAllowList`.
pub const READ_ALLOW_LIST_GAS_COST: u64 = READ_GAS_COST_PER_SLOT;

/// Descriptors of the allow-list interface.
#[derive(Debug)]
pub struct AllowListAbi {
    /// `setAdmin(address)`.
    pub set_admin: Function,
    /// `setEnabled(address)`.
    pub set_enabled: Function,
    /// `setNone(address)`.
    pub set_none: Function,
    /// `readAllowList(address) returns (uint256)`.
    pub read_allow_list: Function,
    /// `RoleSet(uint256,address,address,uint256)`.
    pub role_set: Event,
}

impl AllowListAbi {
    fn build() -> Result<Self, AbiError> {
        let setter = |name: &str| {
            Function::new(
                name,
                vec![Argument::new("addr", AbiType::Address)],
                vec![],
                StateMutability::NonPayable,
            )
        };
        Ok(Self {
            set_admin: setter("setAdmin"),
            set_enabled: setter("setEnabled"),
            set_none: setter("setNone"),
            read_allow_list: Function::new(
                "readAllowList",
                vec![Argument::new("addr", AbiType::Address)],
                vec![Argument::new("role", AbiType::Uint(256))],
                StateMutability::View,
            ),
            role_set: Event::new(
                "RoleSet",
                vec![
                    Argument::indexed("role", AbiType::Uint(256)),
                    Argument::indexed("account", AbiType::Address),
                    Argument::indexed("sender", AbiType::Address),
                    Argument::new("oldRole", AbiType::Uint(256)),
                ],
                false,
            )?,
        })
    }

    /// The setter function that assigns `role`.
    pub const fn setter(&self, role: Role) -> &Function {
        match role {
            Role::None => &self.set_none,
            Role::Enabled => &self.set_enabled,
            Role::Admin => &self.set_admin,
        }
    }
}

/// The shared allow-list descriptors.
pub fn allow_list_abi() -> Result<&'static AllowListAbi, PrecompileError> {
    static ABI: OnceLock<Result<AllowListAbi, AbiError>> = OnceLock::new();
    ABI.get_or_init(AllowListAbi::build).as_ref().map_err(|err| PrecompileError::Abi(err.clone()))
}

/// Reads the role of `address` in `precompile`'s allow list.
pub fn get_role(
    state: &mut dyn StateDB,
    precompile: Address,
    address: Address,
) -> Result<Role, PrecompileError> {
    let word = state.get_state(precompile, address.into_word())?;
    let role = Role::from_word(word)?;
    tracing::debug!(target: "allow_list", ?precompile, ?address, %role, "role lookup");
    Ok(role)
}

/// Writes the role of `address` in `precompile`'s allow list.
pub fn set_role(
    state: &mut dyn StateDB,
    precompile: Address,
    address: Address,
    role: Role,
) -> Result<(), StateError> {
    state.set_state(precompile, address.into_word(), role.to_word())
}

/// Fails unless `ctx.caller` holds at least `required` in the called precompile's
/// allow list.
pub fn ensure_role(ctx: &mut CallContext<'_>, required: Role) -> Result<(), PrecompileError> {
    let actual = get_role(ctx.state, ctx.address, ctx.caller)?;
    if actual >= required {
        return Ok(());
    }
    tracing::warn!(
        target: "allow_list",
        caller = ?ctx.caller,
        precompile = ?ctx.address,
        %required,
        %actual,
        "authorization denied"
    );
    Err(PrecompileError::Unauthorized { caller: ctx.caller, required, actual })
}

fn modify(ctx: &mut CallContext<'_>, input: &[u8], role: Role) -> Result<Bytes, PrecompileError> {
    ctx.ensure_writable()?;
    let abi = allow_list_abi()?;
    let values = decode_args(abi.setter(role), input)?;
    let account = args::address(&values, 0)?;

    ensure_role(ctx, Role::Admin)?;

    let old = get_role(ctx.state, ctx.address, account)?;
    let log = ctx.prepare_log(
        &abi.role_set,
        &[
            U256::from(role.as_u64()).into(),
            account.into(),
            ctx.caller.into(),
            U256::from(old.as_u64()).into(),
        ],
    )?;
    set_role(ctx.state, ctx.address, account, role)?;
    ctx.emit(log)?;

    tracing::info!(
        target: "allow_list",
        precompile = ?ctx.address,
        sender = ?ctx.caller,
        ?account,
        %old,
        new = %role,
        "role set"
    );
    Ok(Bytes::new())
}

fn set_admin(ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
    modify(ctx, input, Role::Admin)
}

fn set_enabled(ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
    modify(ctx, input, Role::Enabled)
}

fn set_none(ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
    modify(ctx, input, Role::None)
}

fn read_allow_list(ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
    let abi = allow_list_abi()?;
    let values = decode_args(&abi.read_allow_list, input)?;
    let account = args::address(&values, 0)?;
    let role = get_role(ctx.state, ctx.address, account)?;
    encode_output(&abi.read_allow_list, &[U256::from(role.as_u64()).into()])
}

/// Selector-table entries for the allow-list interface, to be merged into a
/// precompile's own function list.
pub fn allow_list_functions() -> Result<Vec<FunctionEntry>, ConfigError> {
    let abi = allow_list_abi().map_err(ConfigError::from_descriptor)?;
    Ok(vec![
        FunctionEntry::new(&abi.set_admin, MODIFY_ALLOW_LIST_GAS_COST, set_admin),
        FunctionEntry::new(&abi.set_enabled, MODIFY_ALLOW_LIST_GAS_COST, set_enabled),
        FunctionEntry::new(&abi.set_none, MODIFY_ALLOW_LIST_GAS_COST, set_none),
        FunctionEntry::new(&abi.read_allow_list, READ_ALLOW_LIST_GAS_COST, read_allow_list),
    ])
}

/// Call data assigning `role` to `address`.
pub fn pack_modify_allow_list(address: Address, role: Role) -> Result<Bytes, PrecompileError> {
    let abi = allow_list_abi()?;
    Ok(abi.setter(role).encode_input(&[address.into()])?.into())
}

/// Call data reading the role of `address`.
pub fn pack_read_allow_list(address: Address) -> Result<Bytes, PrecompileError> {
    Ok(allow_list_abi()?.read_allow_list.encode_input(&[address.into()])?.into())
}

/// Decodes the output of `readAllowList`.
pub fn unpack_read_allow_list(output: &[u8]) -> Result<Role, PrecompileError> {
    let values = allow_list_abi()?.read_allow_list.decode_output(output)?;
    let value = values
        .first()
        .and_then(AbiValue::as_uint)
        .ok_or_else(|| PrecompileError::InvalidArgument("empty readAllowList output".into()))?;
    Role::from_word(value.into())
}
