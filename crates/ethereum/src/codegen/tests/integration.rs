//! Integration tests for Ethereum contract code generation

use std::fs;

use ethers::types::Address;
use tempfile::TempDir;

use crate::codegen::parser::AbiParser;
use crate::codegen::{generate_contract_code, BindingGenerator, ContractSource};
use crate::link::{
    build_dependency_tree, library_pattern, link_and_deploy, placeholder, DeploymentParams,
    LinkableContract,
};
use abibind_core::config::BindConfig;
use abibind_core::{Error, Lang, Result};

/// ERC20 token ABI
const ERC20_ABI: &str = r#"[
  {
    "type": "constructor",
    "inputs": [
      {"name": "_name", "type": "string", "internalType": "string"},
      {"name": "_symbol", "type": "string", "internalType": "string"},
      {"name": "_decimals", "type": "uint8", "internalType": "uint8"},
      {"name": "_initialSupply", "type": "uint256", "internalType": "uint256"}
    ]
  },
  {
    "type": "function",
    "name": "name",
    "inputs": [],
    "outputs": [{"name": "", "type": "string", "internalType": "string"}],
    "stateMutability": "view"
  },
  {
    "type": "function",
    "name": "symbol",
    "inputs": [],
    "outputs": [{"name": "", "type": "string", "internalType": "string"}],
    "stateMutability": "view"
  },
  {
    "type": "function",
    "name": "decimals",
    "inputs": [],
    "outputs": [{"name": "", "type": "uint8", "internalType": "uint8"}],
    "stateMutability": "view"
  },
  {
    "type": "function",
    "name": "totalSupply",
    "inputs": [],
    "outputs": [{"name": "", "type": "uint256", "internalType": "uint256"}],
    "stateMutability": "view"
  },
  {
    "type": "function",
    "name": "balanceOf",
    "inputs": [{"name": "account", "type": "address", "internalType": "address"}],
    "outputs": [{"name": "", "type": "uint256", "internalType": "uint256"}],
    "stateMutability": "view"
  },
  {
    "type": "function",
    "name": "transfer",
    "inputs": [
      {"name": "to", "type": "address", "internalType": "address"},
      {"name": "amount", "type": "uint256", "internalType": "uint256"}
    ],
    "outputs": [{"name": "", "type": "bool", "internalType": "bool"}],
    "stateMutability": "nonpayable"
  },
  {
    "type": "function",
    "name": "allowance",
    "inputs": [
      {"name": "owner", "type": "address", "internalType": "address"},
      {"name": "spender", "type": "address", "internalType": "address"}
    ],
    "outputs": [{"name": "", "type": "uint256", "internalType": "uint256"}],
    "stateMutability": "view"
  },
  {
    "type": "function",
    "name": "approve",
    "inputs": [
      {"name": "spender", "type": "address", "internalType": "address"},
      {"name": "amount", "type": "uint256", "internalType": "uint256"}
    ],
    "outputs": [{"name": "", "type": "bool", "internalType": "bool"}],
    "stateMutability": "nonpayable"
  },
  {
    "type": "function",
    "name": "transferFrom",
    "inputs": [
      {"name": "from", "type": "address", "internalType": "address"},
      {"name": "to", "type": "address", "internalType": "address"},
      {"name": "amount", "type": "uint256", "internalType": "uint256"}
    ],
    "outputs": [{"name": "", "type": "bool", "internalType": "bool"}],
    "stateMutability": "nonpayable"
  },
  {
    "type": "event",
    "name": "Transfer",
    "inputs": [
      {"name": "from", "type": "address", "indexed": true, "internalType": "address"},
      {"name": "to", "type": "address", "indexed": true, "internalType": "address"},
      {"name": "value", "type": "uint256", "indexed": false, "internalType": "uint256"}
    ],
    "anonymous": false
  },
  {
    "type": "event",
    "name": "Approval",
    "inputs": [
      {"name": "owner", "type": "address", "indexed": true, "internalType": "address"},
      {"name": "spender", "type": "address", "indexed": true, "internalType": "address"},
      {"name": "value", "type": "uint256", "indexed": false, "internalType": "uint256"}
    ],
    "anonymous": false
  }
]"#;
/// Library with a single pure function
const MATH_ABI: &str = r#"[
  {
    "type": "function",
    "name": "add",
    "inputs": [
      {"name": "a", "type": "uint256"},
      {"name": "b", "type": "uint256"}
    ],
    "outputs": [{"name": "", "type": "uint256"}],
    "stateMutability": "pure"
  }
]"#;

const CALCULATOR_ABI: &str = r#"[
  {
    "type": "function",
    "name": "sum",
    "inputs": [{"name": "values", "type": "uint256[]"}],
    "outputs": [{"name": "total", "type": "uint256"}],
    "stateMutability": "view"
  },
  {"type": "fallback", "stateMutability": "payable"},
  {"type": "receive", "stateMutability": "payable"}
]"#;

fn config(lang: Lang) -> BindConfig {
    BindConfig {
        package: "token".to_string(),
        lang,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_end_to_end_erc20_rust() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("gen").join("token.rs");

    let config = BindConfig {
        output: Some(output.clone()),
        ..config(Lang::Rust)
    };
    let sources = [ContractSource::new("Token", ERC20_ABI, "0x608060405234801561001057600080fd5b50")];
    let code = generate_contract_code(&sources, config).await?;

    assert_eq!(fs::read_to_string(&output).unwrap(), code);

    assert!(code.contains("pub mod token {"));
    assert!(code.contains("pub struct Token<M> {"));
    assert!(code.contains(
        "pub async fn balance_of(&self, account: Address) -> Result<U256, ContractError<M>>"
    ));
    assert!(code.contains(
        "pub async fn decimals(&self) -> Result<u8, ContractError<M>>"
    ));
    assert!(code.contains(
        "pub fn transfer(&self, to: Address, amount: U256) -> Result<ContractCall<M, ()>, ContractError<M>>"
    ));
    assert!(code.contains(
        "pub fn transfer_from(&self, from: Address, to: Address, amount: U256) -> Result<ContractCall<M, ()>, ContractError<M>>"
    ));
    assert!(code.contains(r#"ethers::utils::id("transfer(address,uint256)")"#));
    assert!(code.contains("selector `0xa9059cbb`"));
    assert!(code.contains("pub fn deploy(client: Arc<M>"));
    assert!(code.contains(r#"pub const BYTECODE: &'static str = "608060405234801561001057600080fd5b50";"#));

    assert!(code.contains(r#"#[ethevent(name = "Transfer", abi = "Transfer(address,address,uint256)")]"#));
    assert!(code.contains("pub struct TokenTransfer {"));
    assert!(code.contains("pub struct TokenApproval {"));
    Ok(())
}

#[tokio::test]
async fn test_end_to_end_erc20_go() -> Result<()> {
    let generator = BindingGenerator::new(config(Lang::Go))?;
    let code = generator.generate(&[ContractSource::new("Token", ERC20_ABI, "")])?;

    // Nothing configured, nothing written
    assert_eq!(generator.write_output(&code).await?, None);

    assert!(code.starts_with("// Code generated by abibind. DO NOT EDIT."));
    assert!(code.contains("package token"));
    assert!(code.contains("var TokenMetaData = bind.MetaData{"));
    assert!(code.contains(&format!("ID:  \"{}\"", library_pattern("Token"))));
    assert!(!code.contains("Bin: "));
    assert!(code.contains("func NewToken() *Token {"));
    assert!(code.contains(
        "func (c *Token) PackConstructor(_name string, _symbol string, _decimals uint8, _initialSupply *big.Int) []byte"
    ));
    assert!(code.contains("func (c *Token) PackBalanceOf(account common.Address) []byte"));
    assert!(code.contains("func (c *Token) PackTransfer(to common.Address, amount *big.Int) []byte"));
    assert!(code.contains("func (c *Token) UnpackTransferEvent(log *types.Log) (*TokenTransfer, error)"));
    assert!(code.contains("const TokenTransferEventName = \"Transfer\""));
    Ok(())
}

#[test]
fn test_erc20_parsing() -> Result<()> {
    let abi = AbiParser::new().parse_content(ERC20_ABI)?;

    let constructor = abi.constructor.as_ref().expect("constructor");
    assert_eq!(constructor.inputs.len(), 4);
    assert_eq!(abi.functions.len(), 9);
    assert_eq!(abi.events.len(), 2);
    assert_eq!(abi.get_view_functions().len(), 6);

    let transactions: Vec<&str> = abi
        .get_transaction_functions()
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(transactions, ["transfer", "approve", "transferFrom"]);

    let approve = abi.functions.iter().find(|f| f.name == "approve").unwrap();
    assert_eq!(approve.selector.as_deref(), Some("0x095ea7b3"));
    Ok(())
}

#[test]
fn test_parser_edge_cases() -> Result<()> {
    let parser = AbiParser::new();

    let abi = parser.parse_content("[]")?;
    assert!(abi.constructor.is_none());
    assert!(abi.functions.is_empty());
    assert!(abi.events.is_empty());

    let abi = parser.parse_content(CALCULATOR_ABI)?;
    assert_eq!(abi.functions.len(), 1);
    assert!(abi.fallback.as_ref().is_some_and(|f| f.payable));
    assert!(abi.receive.as_ref().is_some_and(|f| f.payable));

    assert!(matches!(parser.parse_content("{}"), Err(Error::AbiParse(_))));
    assert!(parser.parse_content("not json").is_err());
    Ok(())
}

/// Bindings and deployment of a contract linked against a library agree on the pattern
#[tokio::test]
async fn test_library_bindings_and_deployment() -> Result<()> {
    let lib_code = "0x60806040";
    let calc_code = format!("0x6080604073{}5af4", placeholder(&library_pattern("MathLib")));

    let sources = [
        ContractSource::new("Calculator", CALCULATOR_ABI, calc_code.clone()),
        ContractSource::new("MathLib", MATH_ABI, lib_code),
    ];

    let go = generate_contract_code(&sources, config(Lang::Go)).await?;
    assert!(go.contains("\t\t&MathLibMetaData,"));
    assert!(go.contains("func (c *MathLib) PackAdd(a *big.Int, b *big.Int) []byte"));

    let model = BindingGenerator::new(config(Lang::Rust))?.build_model(&sources)?;
    let calculator = &model.contracts[0];
    let math = &model.contracts[1];
    assert!(calculator.has_fallback && calculator.has_receive);
    assert!(math.is_library);
    assert!(!calculator.is_library);
    assert_eq!(
        calculator.libraries.get(&math.pattern).map(String::as_str),
        Some("MathLib")
    );

    let rust = generate_contract_code(&sources, config(Lang::Rust)).await?;
    assert!(rust.contains("pub const IS_LIBRARY: bool = true;"));
    assert!(rust.contains("pub const HAS_RECEIVE: bool = true;"));
    assert!(rust.contains("/// Links against `MathLib`"));
    // Only the library can be deployed from its own unlinked bytecode
    assert_eq!(rust.matches("pub fn deploy(").count(), 1);
    assert!(rust.contains("pub fn deploy(client: Arc<M>) -> Result<ethers::contract::Deployer<M>"));

    // Deploy with the same patterns the bindings carry
    let contracts = [
        LinkableContract::new("Calculator", calc_code),
        LinkableContract::new("MathLib", lib_code),
    ];
    let roots = build_dependency_tree(&contracts)?;
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].pattern, calculator.pattern);

    let mut next = 0u8;
    let deployed = link_and_deploy(&DeploymentParams::new(roots), |_input, code| {
        next += 1;
        Ok((Address::repeat_byte(next), code.to_vec()))
    })
    .map_err(|failure| failure.source)?;

    let lib_address = deployed.address(&math.pattern).unwrap();
    assert_eq!(lib_address, Address::repeat_byte(1));
    let linked = &deployed.transactions[&calculator.pattern];
    assert_eq!(&linked[5..25], lib_address.as_bytes());
    Ok(())
}
