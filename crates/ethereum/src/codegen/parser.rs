//! Ethereum ABI parser
//!
//! Parses contract ABI JSON into interface definitions with canonical
//! signatures and selectors. Overloaded functions, events and errors keep their
//! raw name and get a unique `name` (`foo`, `foo0`, `foo1`, ...).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha3::{Digest, Keccak256};
use tracing::debug;

use super::normalize::resolve_name_conflict;
use super::types::AbiType;
use abibind_core::{Error, Result};

/// Parsed Ethereum contract ABI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthereumAbi {
    /// Contract constructor
    pub constructor: Option<AbiFunction>,
    /// Contract functions (view/pure and state-changing)
    pub functions: Vec<AbiFunction>,
    /// Contract events
    pub events: Vec<AbiEvent>,
    /// Contract errors (if present)
    pub errors: Vec<AbiError>,
    /// Fallback function
    pub fallback: Option<AbiFunction>,
    /// Receive function
    pub receive: Option<AbiFunction>,
    /// Raw ABI for reference
    pub raw_abi: Value,
}

/// ABI function definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiFunction {
    /// Unique name within the ABI
    pub name: String,
    /// Name as declared in the contract
    pub raw_name: String,
    /// Function type (function, constructor, fallback, receive)
    pub function_type: String,
    pub inputs: Vec<AbiParameter>,
    pub outputs: Vec<AbiParameter>,
    /// State mutability (pure, view, nonpayable, payable)
    pub state_mutability: String,
    pub payable: bool,
    /// Whether function is constant (view/pure)
    pub constant: bool,
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub signature: Option<String>,
    /// 4-byte selector as 0x-prefixed hex
    pub selector: Option<String>,
}

/// ABI event definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiEvent {
    pub name: String,
    pub raw_name: String,
    pub inputs: Vec<AbiParameter>,
    pub anonymous: bool,
    pub signature: String,
    /// Topic hash as 0x-prefixed hex
    pub topic: String,
}

/// ABI error definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiError {
    pub name: String,
    pub raw_name: String,
    pub inputs: Vec<AbiParameter>,
    pub signature: String,
    pub selector: String,
}

/// ABI parameter definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParameter {
    /// Parameter name
    pub name: String,
    /// Parameter type (e.g., uint256, address, tuple[])
    pub param_type: String,
    /// Internal type (for structs and custom types)
    pub internal_type: Option<String>,
    /// Components (for tuples and structs)
    pub components: Option<Vec<AbiParameter>>,
    /// Whether parameter is indexed (for events)
    pub indexed: bool,
}

/// Ethereum ABI parser
pub struct AbiParser;

impl AbiParser {
    /// Create a new parser instance
    pub fn new() -> Self {
        Self
    }

    /// Parse Ethereum ABI from JSON content
    pub fn parse_content(&self, content: &str) -> Result<EthereumAbi> {
        let value: Value = serde_json::from_str(content).map_err(|e| Error::abi(e.to_string()))?;
        self.parse_abi(&value)
    }

    /// Parse ABI from JSON value
    fn parse_abi(&self, value: &Value) -> Result<EthereumAbi> {
        let abi_array = value
            .as_array()
            .ok_or_else(|| Error::abi("ABI must be an array"))?;

        let mut abi = EthereumAbi {
            constructor: None,
            functions: Vec::new(),
            events: Vec::new(),
            errors: Vec::new(),
            fallback: None,
            receive: None,
            raw_abi: value.clone(),
        };

        for item in abi_array {
            let item_type = item
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("function");

            match item_type {
                "constructor" => {
                    abi.constructor = Some(self.parse_function(item, "constructor")?);
                }
                "function" => {
                    let mut function = self.parse_function(item, "function")?;
                    function.name = resolve_name_conflict(&function.raw_name, |candidate| {
                        abi.functions.iter().any(|f| f.name == candidate)
                    });
                    abi.functions.push(function);
                }
                "event" => {
                    let mut event = self.parse_event(item)?;
                    event.name = resolve_name_conflict(&event.raw_name, |candidate| {
                        abi.events.iter().any(|e| e.name == candidate)
                    });
                    abi.events.push(event);
                }
                "error" => {
                    let mut error = self.parse_error(item)?;
                    error.name = resolve_name_conflict(&error.raw_name, |candidate| {
                        abi.errors.iter().any(|e| e.name == candidate)
                    });
                    abi.errors.push(error);
                }
                "fallback" => {
                    abi.fallback = Some(self.parse_function(item, "fallback")?);
                }
                "receive" => {
                    abi.receive = Some(self.parse_function(item, "receive")?);
                }
                other => {
                    debug!(item_type = other, "skipping unknown ABI entry");
                }
            }
        }

        Ok(abi)
    }

    /// Parse a function from ABI
    fn parse_function(&self, value: &Value, function_type: &str) -> Result<AbiFunction> {
        let name = match value.get("name").and_then(|v| v.as_str()) {
            Some(name) => name.to_string(),
            None if function_type == "function" => {
                return Err(Error::abi("Function must have a name"));
            }
            None => function_type.to_string(),
        };

        let inputs = self.parse_parameter_list(value, "inputs", false)?;
        let outputs = self.parse_parameter_list(value, "outputs", false)?;

        let state_mutability = value
            .get("stateMutability")
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| {
                // Legacy ABIs only carry `constant` and `payable`
                if value.get("constant").and_then(|v| v.as_bool()).unwrap_or(false) {
                    "view"
                } else if value.get("payable").and_then(|v| v.as_bool()).unwrap_or(false) {
                    "payable"
                } else {
                    "nonpayable"
                }
            })
            .to_string();

        let payable = state_mutability == "payable";
        let constant = state_mutability == "view" || state_mutability == "pure";

        let (signature, selector) = if function_type == "function" {
            let signature = Self::canonical_signature(&name, &inputs)?;
            let selector = format!("0x{}", hex::encode(&keccak256(signature.as_bytes())[..4]));
            (Some(signature), Some(selector))
        } else {
            (None, None)
        };

        Ok(AbiFunction {
            name: name.clone(),
            raw_name: name,
            function_type: function_type.to_string(),
            inputs,
            outputs,
            state_mutability,
            payable,
            constant,
            signature,
            selector,
        })
    }

    /// Parse an event from ABI
    fn parse_event(&self, value: &Value) -> Result<AbiEvent> {
        let name = value
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::abi("Event must have a name"))?
            .to_string();

        let inputs = self.parse_parameter_list(value, "inputs", true)?;

        let anonymous = value
            .get("anonymous")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let signature = Self::canonical_signature(&name, &inputs)?;
        let topic = format!("0x{}", hex::encode(keccak256(signature.as_bytes())));

        Ok(AbiEvent {
            name: name.clone(),
            raw_name: name,
            inputs,
            anonymous,
            signature,
            topic,
        })
    }

    /// Parse an error from ABI
    fn parse_error(&self, value: &Value) -> Result<AbiError> {
        let name = value
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::abi("Error must have a name"))?
            .to_string();

        let inputs = self.parse_parameter_list(value, "inputs", false)?;
        let signature = Self::canonical_signature(&name, &inputs)?;
        let selector = format!("0x{}", hex::encode(&keccak256(signature.as_bytes())[..4]));

        Ok(AbiError {
            name: name.clone(),
            raw_name: name,
            inputs,
            signature,
            selector,
        })
    }

    fn parse_parameter_list(&self, value: &Value, key: &str, with_indexed: bool) -> Result<Vec<AbiParameter>> {
        match value.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Self::parse_parameters(items, with_indexed),
            Some(_) => Err(Error::abi(format!("'{}' must be an array", key))),
        }
    }

    fn parse_parameters(array: &[Value], with_indexed: bool) -> Result<Vec<AbiParameter>> {
        let mut parameters = Vec::with_capacity(array.len());

        for param in array {
            let name = param
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let param_type = param
                .get("type")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::abi("Parameter must have a type"))?
                .to_string();

            let internal_type = param
                .get("internalType")
                .and_then(|v| v.as_str())
                .map(String::from);

            let indexed = with_indexed
                && param.get("indexed").and_then(|v| v.as_bool()).unwrap_or(false);

            let components = if param_type.starts_with("tuple") {
                let components = param
                    .get("components")
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| Error::abi(format!("Tuple parameter '{}' has no components", name)))?;
                Some(Self::parse_parameters(components, false)?)
            } else {
                None
            };

            parameters.push(AbiParameter {
                name,
                param_type,
                internal_type,
                components,
                indexed,
            });
        }

        Ok(parameters)
    }

    /// `name(type1,type2,...)` with tuples expanded to their components
    fn canonical_signature(name: &str, inputs: &[AbiParameter]) -> Result<String> {
        let types = inputs
            .iter()
            .map(|param| AbiType::from_param(param).map(|ty| ty.canonical()))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("{}({})", name, types.join(",")))
    }
}

impl Default for AbiParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Keccak-256 digest
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

impl EthereumAbi {
    /// Functions that do not modify state
    pub fn get_view_functions(&self) -> Vec<&AbiFunction> {
        self.functions.iter().filter(|f| f.constant).collect()
    }

    /// State-changing functions
    pub fn get_transaction_functions(&self) -> Vec<&AbiFunction> {
        self.functions.iter().filter(|f| !f.constant).collect()
    }
}
