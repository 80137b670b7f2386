//! revm integration for subnet stateful precompiles.
//!
//! [`SubnetPrecompiles`] is a revm precompile provider. It serves the subnet
//! precompiles enabled at a block timestamp and hands every other address to an
//! `alloy-evm` [`PrecompilesMap`](alloy_evm::precompiles::PrecompilesMap). Each
//! call runs through the dispatch engine with [`JournalState`] as its state, so
//! writes, balance changes and logs are journaled like any other call, and with
//! the calling frame's static flag as its read-only flag.

pub mod precompile;
pub mod provider;
pub mod state;

pub use precompile::SubnetPrecompile;
pub use provider::SubnetPrecompiles;
pub use state::{block_context, JournalState};
