//! Binding model built from contract ABIs
//!
//! The model is what the templates render: every identifier is already valid
//! in the target language and every type is already spelled out.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use super::lang::{strategy, Language};
use super::normalize::{MemberRole, Normalizer};
use super::parser::{AbiError, AbiEvent, AbiFunction, AbiParameter, AbiParser, EthereumAbi};
use super::types::{AbiType, BoundType, StructDef, StructRegistry, TypeMapper};
use crate::link::find_placeholders;
use abibind_core::{Error, Lang, Result};

pub use crate::link::library_pattern;

/// Kind of a generated contract member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// Read-only method
    Call,
    /// State-changing method
    Transact,
    Event,
    Error,
}

/// A normalized argument, output, event field or error field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedArg {
    pub original_name: String,
    /// Identifier in the target language, never empty
    pub name: String,
    /// Canonical ABI type
    pub abi_type: String,
    pub bound: BoundType,
    /// Type spelled in the target language
    pub ty: String,
    pub indexed: bool,
    /// Type of an indexed event field as stored in the log topics
    pub topic_ty: Option<String>,
}

/// A normalized method, event or error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedMember {
    /// Name as declared in the contract
    pub original_name: String,
    /// Unique name within the ABI (overloads are numbered)
    pub raw_name: String,
    /// Identifier in the target language
    pub name: String,
    pub kind: MemberKind,
    pub signature: String,
    /// 4-byte selector, or the 32-byte topic for events
    pub selector: String,
    pub mutability: String,
    pub payable: bool,
    pub inputs: Vec<NormalizedArg>,
    pub outputs: Vec<NormalizedArg>,
    /// Outputs are returned as one struct rather than a tuple
    pub structured: bool,
    /// Generated struct for structured outputs, event logs and error data
    pub type_name: Option<String>,
}

/// Everything the templates need to bind one contract
#[derive(Debug, Clone, Serialize)]
pub struct ContractModel {
    /// Type name in the target language
    pub name: String,
    pub original_name: String,
    /// Minified ABI JSON embedded in the bindings
    pub abi_json: String,
    /// Creation code without `0x`, empty when only the ABI is known
    pub bytecode: String,
    pub constructor: Vec<NormalizedArg>,
    pub calls: BTreeMap<String, NormalizedMember>,
    pub transacts: BTreeMap<String, NormalizedMember>,
    pub events: BTreeMap<String, NormalizedMember>,
    pub errors: BTreeMap<String, NormalizedMember>,
    pub has_fallback: bool,
    pub has_receive: bool,
    /// Libraries the bytecode links against, by pattern
    pub libraries: BTreeMap<String, String>,
    /// Whether another contract of the package links against this one
    pub is_library: bool,
    pub pattern: String,
}

/// One generation run over several contracts sharing their structs
#[derive(Debug, Clone, Serialize)]
pub struct PackageModel {
    pub package: String,
    pub lang: Lang,
    pub contracts: Vec<ContractModel>,
    pub structs: Vec<StructDef>,
}

/// Builds a [`PackageModel`] from contract ABIs
pub struct BindingBuilder {
    lang: &'static dyn Language,
    aliases: BTreeMap<String, String>,
    /// Known library names by pattern
    libraries: BTreeMap<String, String>,
    registry: StructRegistry,
    contracts: Vec<ContractModel>,
}

impl BindingBuilder {
    pub fn new(lang: Lang) -> Self {
        Self {
            lang: strategy(lang),
            aliases: BTreeMap::new(),
            libraries: BTreeMap::new(),
            registry: StructRegistry::new(),
            contracts: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: BTreeMap<String, String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Register a library by fully qualified name (`path/File.sol:Name`)
    pub fn with_library(mut self, fully_qualified_name: &str) -> Self {
        let name = fully_qualified_name
            .rsplit(':')
            .next()
            .unwrap_or(fully_qualified_name);
        self.libraries.insert(
            library_pattern(fully_qualified_name),
            self.lang.normalize_type_name(name),
        );
        self
    }

    /// Normalize one contract; its structs join the shared registry
    pub fn add_contract(&mut self, name: &str, abi_json: &str, bytecode: &str) -> Result<&ContractModel> {
        let abi = AbiParser::new().parse_content(abi_json)?;
        let abi_json = serde_json::to_string(&abi.raw_abi)?;
        let bytecode = bytecode.trim();
        let bytecode = bytecode.strip_prefix("0x").unwrap_or(bytecode).to_string();

        let contract = ContractBuilder {
            contract: self.lang.normalize_type_name(name),
            lang: self.lang,
            normalizer: Normalizer::new(self.lang).with_aliases(self.aliases.clone()),
            mapper: TypeMapper::new(self.lang),
            registry: &mut self.registry,
        }
        .build(name, &abi, abi_json, bytecode)?;

        info!(
            contract = %contract.name,
            calls = contract.calls.len(),
            transacts = contract.transacts.len(),
            events = contract.events.len(),
            "normalized contract"
        );

        // Every contract of the package may be linked by the others
        self.libraries.insert(contract.pattern.clone(), contract.name.clone());
        self.contracts.push(contract);
        Ok(&self.contracts[self.contracts.len() - 1])
    }

    /// Resolve library links and produce the package model
    pub fn build(mut self, package: &str) -> Result<PackageModel> {
        let mut linked = HashSet::new();
        for contract in &mut self.contracts {
            for pattern in find_placeholders(&contract.bytecode)? {
                let library = self.libraries.get(&pattern).ok_or_else(|| Error::UnknownLibrary {
                    pattern: pattern.clone(),
                    contract: contract.original_name.clone(),
                })?;
                contract.libraries.insert(pattern.clone(), library.clone());
                linked.insert(pattern);
            }
        }
        for contract in &mut self.contracts {
            contract.is_library = linked.contains(&contract.pattern);
        }
        self.check_type_names()?;

        debug!(package, structs = self.registry.len(), "built package model");
        Ok(PackageModel {
            package: package.to_string(),
            lang: self.lang.lang(),
            contracts: self.contracts,
            structs: self.registry.into_vec(),
        })
    }
}

impl BindingBuilder {
    /// Every type the package declares must have its own name
    fn check_type_names(&self) -> Result<()> {
        let mut declared: HashSet<&str> = HashSet::new();
        let structs = self.registry.iter().map(|def| (def.raw_name.as_str(), def.name.as_str()));
        let contracts = self.contracts.iter().flat_map(|contract| {
            let members = contract
                .calls
                .values()
                .chain(contract.events.values())
                .chain(contract.errors.values())
                .filter_map(|member| {
                    member
                        .type_name
                        .as_deref()
                        .map(|name| (member.original_name.as_str(), name))
                });
            std::iter::once((contract.original_name.as_str(), contract.name.as_str())).chain(members)
        });

        for (original, name) in structs.chain(contracts) {
            if !declared.insert(name) {
                return Err(Error::duplicate(original, name));
            }
        }
        Ok(())
    }
}

/// Normalize a single contract on its own
pub fn build_contract(
    name: &str,
    abi_json: &str,
    bytecode: &str,
    aliases: BTreeMap<String, String>,
    lang: Lang,
) -> Result<(ContractModel, Vec<StructDef>)> {
    let mut builder = BindingBuilder::new(lang).with_aliases(aliases);
    builder.add_contract(name, abi_json, bytecode)?;
    let mut package = builder.build(name)?;
    let contract = package
        .contracts
        .pop()
        .ok_or_else(|| Error::generic("no contract built"))?;
    Ok((contract, package.structs))
}

struct ContractBuilder<'a> {
    /// Type name of the contract being built
    contract: String,
    lang: &'static dyn Language,
    normalizer: Normalizer<'static>,
    mapper: TypeMapper<'static>,
    registry: &'a mut StructRegistry,
}

impl ContractBuilder<'_> {
    fn build(mut self, name: &str, abi: &EthereumAbi, abi_json: String, bytecode: String) -> Result<ContractModel> {
        let mut calls = BTreeMap::new();
        let mut transacts = BTreeMap::new();
        let mut events = BTreeMap::new();
        let mut errors = BTreeMap::new();

        // Calls and transacts end up as methods on the same type
        let mut method_names = HashSet::new();
        for function in &abi.functions {
            let member = self.method(function, &mut method_names)?;
            match member.kind {
                MemberKind::Call => calls.insert(function.name.clone(), member),
                _ => transacts.insert(function.name.clone(), member),
            };
        }

        let mut event_names = HashSet::new();
        for event in &abi.events {
            if event.anonymous {
                debug!(event = %event.name, "skipping anonymous event");
                continue;
            }
            let member = self.event(event, &mut event_names)?;
            events.insert(event.name.clone(), member);
        }

        let mut error_names = HashSet::new();
        for error in &abi.errors {
            let member = self.error(error, &mut error_names)?;
            errors.insert(error.name.clone(), member);
        }

        let constructor = match &abi.constructor {
            Some(constructor) => self.args(&constructor.inputs)?,
            None => Vec::new(),
        };

        Ok(ContractModel {
            name: self.contract.clone(),
            original_name: name.to_string(),
            abi_json,
            bytecode,
            constructor,
            calls,
            transacts,
            events,
            errors,
            has_fallback: abi.fallback.is_some(),
            has_receive: abi.receive.is_some(),
            libraries: BTreeMap::new(),
            is_library: false,
            pattern: library_pattern(name),
        })
    }

    fn method(&mut self, function: &AbiFunction, used: &mut HashSet<String>) -> Result<NormalizedMember> {
        let name = self.normalizer.member_name(&function.name, MemberRole::Method, used)?;
        let inputs = self.args(&function.inputs)?;

        let structured = self.is_structured(&function.outputs);
        let outputs = if structured {
            self.fields(&function.outputs, false)?
        } else {
            self.args(&function.outputs)?
        };
        let type_name = structured.then(|| {
            format!("{}{}Output", self.contract, self.lang.normalize_type_name(&function.name))
        });

        Ok(NormalizedMember {
            original_name: function.raw_name.clone(),
            raw_name: function.name.clone(),
            name,
            kind: if function.constant { MemberKind::Call } else { MemberKind::Transact },
            signature: function.signature.clone().unwrap_or_default(),
            selector: function.selector.clone().unwrap_or_default(),
            mutability: function.state_mutability.clone(),
            payable: function.payable,
            inputs,
            outputs,
            structured,
            type_name,
        })
    }

    fn event(&mut self, event: &AbiEvent, used: &mut HashSet<String>) -> Result<NormalizedMember> {
        let name = self.normalizer.member_name(&event.name, MemberRole::Event, used)?;
        let type_name = Some(format!("{}{}", self.contract, name));
        Ok(NormalizedMember {
            original_name: event.raw_name.clone(),
            raw_name: event.name.clone(),
            name,
            kind: MemberKind::Event,
            signature: event.signature.clone(),
            selector: event.topic.clone(),
            mutability: String::new(),
            payable: false,
            inputs: self.fields(&event.inputs, true)?,
            outputs: Vec::new(),
            structured: false,
            type_name,
        })
    }

    fn error(&mut self, error: &AbiError, used: &mut HashSet<String>) -> Result<NormalizedMember> {
        let name = self.normalizer.member_name(&error.name, MemberRole::Error, used)?;
        let type_name = Some(format!("{}{}Error", self.contract, name));
        Ok(NormalizedMember {
            original_name: error.raw_name.clone(),
            raw_name: error.name.clone(),
            name,
            kind: MemberKind::Error,
            signature: error.signature.clone(),
            selector: error.selector.clone(),
            mutability: String::new(),
            payable: false,
            inputs: self.fields(&error.inputs, false)?,
            outputs: Vec::new(),
            structured: false,
            type_name,
        })
    }

    /// Multiple outputs that are all named and stay distinct once cased
    fn is_structured(&self, outputs: &[AbiParameter]) -> bool {
        if outputs.len() < 2 {
            return false;
        }
        let mut seen = HashSet::new();
        outputs.iter().all(|output| {
            if output.name.is_empty() {
                return false;
            }
            let field = self.lang.normalize_field_name(&output.name);
            !field.is_empty() && seen.insert(field)
        })
    }

    /// Parameters bound as function arguments
    fn args(&mut self, params: &[AbiParameter]) -> Result<Vec<NormalizedArg>> {
        let raws: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        let names = self.normalizer.arg_names(&raws);
        self.bind_params(params, names, false)
    }

    /// Parameters bound as struct fields
    fn fields(&mut self, params: &[AbiParameter], topics: bool) -> Result<Vec<NormalizedArg>> {
        let raws: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        let names = self.normalizer.field_names(&raws);
        self.bind_params(params, names, topics)
    }

    fn bind_params(&mut self, params: &[AbiParameter], names: Vec<String>, topics: bool) -> Result<Vec<NormalizedArg>> {
        params
            .iter()
            .zip(names)
            .map(|(param, name)| {
                let abi_type = AbiType::from_param(param)?;
                let bound = self.mapper.map_type(&abi_type, self.registry);
                let indexed = topics && param.indexed;
                let topic_ty = if indexed {
                    let topic = self.mapper.map_topic_type(&abi_type, self.registry);
                    Some(self.lang.bind_topic_type(&topic))
                } else {
                    None
                };
                Ok(NormalizedArg {
                    original_name: param.name.clone(),
                    name,
                    abi_type: abi_type.canonical(),
                    ty: self.lang.bind_type(&bound),
                    bound,
                    indexed,
                    topic_ty,
                })
            })
            .collect()
    }
}
