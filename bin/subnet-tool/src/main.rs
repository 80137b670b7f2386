//! subnet-tool: selectors, calldata and upgrade files for subnet precompiles.

#![allow(missing_docs, rustdoc::missing_crate_level_docs)]

mod values;

use alloy_primitives::hex;
use clap::{Parser, Subcommand};
use eyre::{bail, Result, WrapErr};
use std::path::{Path, PathBuf};
use subnet_abi::{decode, parse_signature, AbiType};
use subnet_precompiles::{ChainConfig, ModuleRegistry, PrecompileUpgrades};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Utilities for working with subnet precompiles.
#[derive(Parser, Debug)]
#[command(name = "subnet-tool", version, about = "Subnet precompile utilities")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the 4-byte selector of a function signature
    Selector {
        /// e.g. `mintNativeCoin(address,uint256)`
        signature: String,
    },
    /// Encode calldata for a function call
    Encode {
        /// Function signature
        signature: String,
        /// One value per input; arrays and tuples as JSON
        args: Vec<String>,
    },
    /// Decode ABI data against a type list
    Decode {
        /// Comma-separated types, e.g. `uint256,string`
        types: String,
        /// Hex data, with or without `0x`
        data: String,
    },
    /// Verify an upgrade file and print its schedule
    CheckUpgrades {
        /// Upgrade file: a list of single-key objects or a flat object
        path: PathBuf,
        /// Chain config JSON used by config verification
        #[arg(long, env = "SUBNET_CHAIN_CONFIG")]
        chain: Option<PathBuf>,
        /// Also list the precompiles enabled at this timestamp
        #[arg(long)]
        at: Option<u64>,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    match Cli::parse().command {
        Command::Selector { signature } => {
            let function = parse_signature(&signature)
                .wrap_err_with(|| format!("invalid signature `{signature}`"))?;
            println!("0x{} {}", hex::encode(function.selector()), function.signature());
        }
        Command::Encode { signature, args } => println!("{}", encode(&signature, &args)?),
        Command::Decode { types, data } => {
            for value in decode_values(&types, &data)? {
                println!("{value}");
            }
        }
        Command::CheckUpgrades { path, chain, at } => check_upgrades(&path, chain.as_deref(), at)?,
    }
    Ok(())
}

fn encode(signature: &str, args: &[String]) -> Result<String> {
    let function = parse_signature(signature)
        .wrap_err_with(|| format!("invalid signature `{signature}`"))?;
    let types = function.input_types();
    if types.len() != args.len() {
        bail!("{} takes {} arguments, got {}", function.signature(), types.len(), args.len());
    }
    let values = types
        .iter()
        .zip(args)
        .map(|(ty, arg)| values::parse_arg(ty, arg))
        .collect::<Result<Vec<_>>>()?;
    let data = function.encode_input(&values).wrap_err("failed to encode arguments")?;
    Ok(format!("0x{}", hex::encode(data)))
}

fn decode_values(types: &str, data: &str) -> Result<Vec<String>> {
    let list = if types.starts_with('(') { types.to_owned() } else { format!("({types})") };
    let AbiType::Tuple(fields) =
        AbiType::parse(&list).wrap_err_with(|| format!("invalid type list `{types}`"))?
    else {
        bail!("`{types}` is not a type list");
    };
    let types: Vec<AbiType> = fields.into_iter().map(|(_, ty)| ty).collect();
    let data = values::parse_hex(data)?;
    let decoded = decode(&data, &types).wrap_err("failed to decode data")?;
    Ok(decoded.iter().map(values::render).collect())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))
}

fn check_upgrades(path: &Path, chain: Option<&Path>, at: Option<u64>) -> Result<()> {
    let registry =
        ModuleRegistry::with_default_modules().wrap_err("failed to build module registry")?;
    let upgrades = PrecompileUpgrades::from_json(&read(path)?, &registry)
        .wrap_err_with(|| format!("invalid upgrade file {}", path.display()))?;
    let chain = match chain {
        Some(chain) => serde_json::from_str::<ChainConfig>(&read(chain)?)
            .wrap_err_with(|| format!("invalid chain config {}", chain.display()))?,
        None => ChainConfig::default(),
    };
    upgrades.verify(&registry, &chain).wrap_err("upgrade schedule rejected")?;
    info!(entries = upgrades.entries().len(), "upgrade schedule verified");

    for entry in upgrades.entries() {
        let timestamp = entry.timestamp().map_or_else(|| "-".to_owned(), |ts| ts.to_string());
        let action = if entry.is_disabled() { "disable" } else { "enable" };
        println!("{timestamp:>12} {action:<7} {} {}", entry.key(), entry.address());
    }
    if let Some(timestamp) = at {
        println!("enabled at {timestamp}:");
        for config in upgrades.enabled_at(&registry, timestamp) {
            println!("  {} {}", config.key(), config.address());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn encodes_mint_calldata() {
        let data = encode(
            "mintNativeCoin(address,uint256)",
            &["0x00000000000000000000000000000000000000aa".to_owned(), "0x64".to_owned()],
        )
        .unwrap();
        assert!(data.starts_with("0x4f5aaaba"));
        assert_eq!(data.len(), 2 + 2 * (4 + 64));
        assert!(data.ends_with("64"));

        assert!(encode("mintNativeCoin(address,uint256)", &["0x00".to_owned()]).is_err());
    }

    #[test]
    fn decodes_a_type_list() {
        let data = format!("0x{:064x}{:064x}", 5, 1);
        assert_eq!(decode_values("uint256,bool", &data).unwrap(), vec!["5", "true"]);
        assert_eq!(decode_values("(uint8)", &format!("{:064x}", 9)).unwrap(), vec!["9"]);
        assert!(decode_values("uint256", "0x01").is_err());
    }
}
