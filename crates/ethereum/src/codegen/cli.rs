//! CLI interface for binding generation, link planning and deployment waits

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Arg, ArgAction, ArgMatches, Command};
use ethers::types::{Address, H256};

use super::{generate_contract_code, ContractSource};
use crate::link::{build_dependency_tree, deployment_plan, library_pattern, DeploymentParams, LinkableContract};
use crate::provider::{poll_interval, EthereumProvider};
use crate::wait::{wait_deployed, wait_mined};
use abibind_core::config::AbibindConfig;
use abibind_core::{Error, Lang, Result};

/// Build the `generate` command
pub fn build_generate_command() -> Command {
    Command::new("generate")
        .about("Generate typed bindings from a contract ABI")
        .arg(
            Arg::new("abi")
                .long("abi")
                .help("Path to the contract ABI JSON file")
                .required(true)
                .value_name("FILE"),
        )
        .arg(
            Arg::new("bin")
                .long("bin")
                .help("Path to the contract creation code (hex)")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("type")
                .long("type")
                .help("Contract type name")
                .required(true)
                .value_name("NAME"),
        )
        .arg(
            Arg::new("pkg")
                .long("pkg")
                .help("Package or module name of the generated file")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("lang")
                .long("lang")
                .help("Target language (rust or go)")
                .value_name("LANG"),
        )
        .arg(
            Arg::new("alias")
                .long("alias")
                .help("Comma-separated renames, e.g. transfer=send,1inch=oneInch")
                .value_name("ALIASES"),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .help("Output file; stdout when omitted")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML configuration file")
                .value_name("FILE"),
        )
}

/// Handle the `generate` command
pub async fn handle_generate_command(matches: &ArgMatches) -> Result<()> {
    let abi_path = required(matches, "abi")?;
    let name = required(matches, "type")?;
    let bin_path = matches.get_one::<String>("bin").map(PathBuf::from);

    let mut config = load_config(matches)?.bind;
    if let Some(pkg) = matches.get_one::<String>("pkg") {
        config.package = pkg.clone();
    }
    if let Some(lang) = matches.get_one::<String>("lang") {
        config.lang = Lang::from_str(lang)?;
    }
    if let Some(aliases) = matches.get_one::<String>("alias") {
        config.aliases.extend(parse_aliases(aliases)?);
    }
    if let Some(out) = matches.get_one::<String>("out") {
        config.output = Some(PathBuf::from(out));
    }

    let source = ContractSource::load(name, Path::new(abi_path), bin_path.as_deref()).await?;
    let to_stdout = config.output.is_none();
    let code = generate_contract_code(&[source], config).await?;

    if to_stdout {
        print!("{}", code);
    }
    Ok(())
}

/// Build the `link` command
pub fn build_link_command() -> Command {
    Command::new("link")
        .about("Print the deployment order of contracts linked through libraries")
        .arg(
            Arg::new("contract")
                .long("contract")
                .help("Contract creation code as NAME=FILE; NAME is the fully qualified name")
                .required(true)
                .action(ArgAction::Append)
                .value_name("NAME=FILE"),
        )
        .arg(
            Arg::new("override")
                .long("override")
                .help("Already deployed contract as NAME=ADDRESS")
                .action(ArgAction::Append)
                .value_name("NAME=ADDRESS"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML configuration file")
                .value_name("FILE"),
        )
}

/// Handle the `link` command
pub async fn handle_link_command(matches: &ArgMatches) -> Result<()> {
    let mut contracts = Vec::new();
    for value in matches.get_many::<String>("contract").into_iter().flatten() {
        let (name, path) = parse_pair(value)?;
        let bytecode = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::Io(format!("Failed to read bytecode file {}: {}", path, e)))?;
        contracts.push(LinkableContract::new(name, bytecode.trim()));
    }

    let mut params = DeploymentParams::new(build_dependency_tree(&contracts)?);

    for (pattern, address) in load_config(matches)?.deploy.overrides {
        params = params.with_override(pattern, parse_address(&address)?);
    }
    for value in matches.get_many::<String>("override").into_iter().flatten() {
        let (name, address) = parse_pair(value)?;
        params = params.with_override(library_pattern(&name), parse_address(&address)?);
    }

    println!("Deployment plan:");
    for (i, contract) in deployment_plan(&params).iter().enumerate() {
        println!("  {}. {} (__${}$__)", i + 1, contract.name, contract.pattern);
    }
    if !params.overrides.is_empty() {
        println!("Overrides:");
        let overrides: BTreeMap<_, _> = params.overrides.iter().collect();
        for (pattern, address) in overrides {
            println!("  __${}$__ -> {:?}", pattern, address);
        }
    }
    Ok(())
}

/// Build the `wait` command
pub fn build_wait_command() -> Command {
    Command::new("wait")
        .about("Wait for a transaction to be mined")
        .arg(
            Arg::new("tx")
                .long("tx")
                .help("Transaction hash")
                .required(true)
                .value_name("HASH"),
        )
        .arg(
            Arg::new("rpc")
                .long("rpc")
                .help("JSON-RPC endpoint (http(s):// or ws(s)://)")
                .value_name("URL"),
        )
        .arg(
            Arg::new("deploy")
                .long("deploy")
                .help("Expect a contract creation and check its code")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML configuration file")
                .value_name("FILE"),
        )
}

/// Handle the `wait` command; Ctrl-C cancels the wait
pub async fn handle_wait_command(matches: &ArgMatches) -> Result<()> {
    let hash = H256::from_str(required(matches, "tx")?)
        .map_err(|e| Error::config(format!("Invalid transaction hash: {}", e)))?;

    let mut config = load_config(matches)?.deploy;
    if let Some(rpc) = matches.get_one::<String>("rpc") {
        config.rpc_url = rpc.clone();
    }

    let provider = EthereumProvider::from_config(&config).await?;
    let interval = poll_interval(&config);
    let cancel = async {
        // A failing signal handler ends the wait as well
        let _ = tokio::signal::ctrl_c().await;
    };

    if matches.get_flag("deploy") {
        let address = wait_deployed(&provider, hash, interval, cancel).await?;
        println!("Contract deployed at {:?}", address);
    } else {
        let receipt = wait_mined(&provider, hash, interval, cancel).await?;
        println!(
            "Transaction mined in block {}",
            receipt.block_number.map(|n| n.to_string()).unwrap_or_default()
        );
    }
    Ok(())
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| Error::config(format!("--{} is required", id)))
}

fn load_config(matches: &ArgMatches) -> Result<AbibindConfig> {
    match matches.get_one::<String>("config") {
        Some(path) => Ok(AbibindConfig::from_file(path)?),
        None => Ok(AbibindConfig::default()),
    }
}

/// Split `NAME=VALUE`
fn parse_pair(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() && !value.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(Error::config(format!("Expected NAME=VALUE, got '{}'", pair))),
    }
}

/// Parse `a=b,c=d` into an alias map
fn parse_aliases(list: &str) -> Result<BTreeMap<String, String>> {
    list.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_pair)
        .collect()
}

fn parse_address(address: &str) -> Result<Address> {
    Address::from_str(address).map_err(|e| Error::config(format!("Invalid address '{}': {}", address, e)))
}
