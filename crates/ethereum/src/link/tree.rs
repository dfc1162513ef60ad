//! Dependency tree of contracts linked through library placeholders

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::debug;

use crate::codegen::parser::keccak256;
use abibind_core::{Error, Result};

/// Number of hex characters in a link pattern
pub const PATTERN_LEN: usize = 34;

const PLACEHOLDER_PATTERN: &str = r"__\$([a-f0-9]{34})\$__";

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> Result<&'static Regex> {
    if let Some(re) = PLACEHOLDER_RE.get() {
        return Ok(re);
    }
    let re = Regex::new(PLACEHOLDER_PATTERN)
        .map_err(|e| Error::parse(format!("invalid placeholder pattern: {}", e)))?;
    Ok(PLACEHOLDER_RE.get_or_init(|| re))
}

/// Link pattern of a fully qualified contract name (`path/File.sol:Name`)
pub fn library_pattern(fully_qualified_name: &str) -> String {
    let digest = hex::encode(keccak256(fully_qualified_name.as_bytes()));
    digest[..PATTERN_LEN].to_string()
}

/// Placeholder text standing in for the address of `pattern`
pub fn placeholder(pattern: &str) -> String {
    format!("__${}$__", pattern)
}

/// Patterns of all placeholders in `bytecode`, unique and in first-seen order
pub fn find_placeholders(bytecode: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    Ok(placeholder_regex()?
        .captures_iter(bytecode)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|pattern| seen.insert(pattern.clone()))
        .collect())
}

/// Unlinked bytecode of one contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkableContract {
    pub name: String,
    pub pattern: String,
    pub bytecode: String,
}

impl LinkableContract {
    /// Contract identified by its fully qualified name
    pub fn new(fully_qualified_name: impl Into<String>, bytecode: impl Into<String>) -> Self {
        let name = fully_qualified_name.into();
        Self {
            pattern: library_pattern(&name),
            name,
            bytecode: bytecode.into(),
        }
    }

    /// Contract with an explicitly assigned pattern
    pub fn with_pattern(
        name: impl Into<String>,
        pattern: impl Into<String>,
        bytecode: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            bytecode: bytecode.into(),
        }
    }
}

/// A contract together with the libraries its bytecode links against.
///
/// A library used by several contracts is the same `Arc` in each of them.
#[derive(Debug)]
pub struct ContractMetadata {
    pub name: String,
    pub pattern: String,
    pub bytecode: String,
    pub deps: Vec<Arc<ContractMetadata>>,
}

impl ContractMetadata {
    /// This contract and everything below it, dependencies before dependents
    pub fn post_order(self: &Arc<Self>) -> Vec<Arc<ContractMetadata>> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        visit_post_order(self, &mut seen, &mut order);
        order
    }
}

/// Append `node` and its unseen dependencies to `order`, dependencies first
pub(crate) fn visit_post_order(
    node: &Arc<ContractMetadata>,
    seen: &mut HashSet<String>,
    order: &mut Vec<Arc<ContractMetadata>>,
) {
    if !seen.insert(node.pattern.clone()) {
        return;
    }
    for dep in &node.deps {
        visit_post_order(dep, seen, order);
    }
    order.push(Arc::clone(node));
}

/// Resolve every contract's placeholders into a shared dependency graph.
///
/// Returns the roots: contracts that no other contract links against, in input
/// order.
pub fn build_dependency_tree(contracts: &[LinkableContract]) -> Result<Vec<Arc<ContractMetadata>>> {
    let mut by_pattern: HashMap<&str, &LinkableContract> = HashMap::new();
    for contract in contracts {
        by_pattern.entry(contract.pattern.as_str()).or_insert(contract);
    }

    let mut resolver = Resolver {
        contracts: by_pattern,
        resolved: HashMap::new(),
        stack: Vec::new(),
    };

    let mut referenced = HashSet::new();
    for contract in contracts {
        let node = resolver.resolve(contract)?;
        referenced.extend(node.deps.iter().map(|dep| dep.pattern.clone()));
    }

    let mut roots = Vec::new();
    let mut emitted = HashSet::new();
    for contract in contracts {
        if referenced.contains(&contract.pattern) || !emitted.insert(contract.pattern.as_str()) {
            continue;
        }
        if let Some(node) = resolver.resolved.get(&contract.pattern) {
            roots.push(Arc::clone(node));
        }
    }

    debug!(contracts = contracts.len(), roots = roots.len(), "built dependency tree");
    Ok(roots)
}

struct Resolver<'a> {
    contracts: HashMap<&'a str, &'a LinkableContract>,
    resolved: HashMap<String, Arc<ContractMetadata>>,
    /// Patterns currently being resolved, outermost first
    stack: Vec<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, contract: &LinkableContract) -> Result<Arc<ContractMetadata>> {
        if let Some(node) = self.resolved.get(&contract.pattern) {
            return Ok(Arc::clone(node));
        }

        if let Some(start) = self.stack.iter().position(|p| *p == contract.pattern) {
            let mut cycle: Vec<String> = self.stack[start..]
                .iter()
                .map(|pattern| self.name_of(pattern))
                .collect();
            cycle.push(contract.name.clone());
            return Err(Error::CyclicDependency(cycle));
        }

        self.stack.push(contract.pattern.clone());
        let deps = self.resolve_deps(contract);
        self.stack.pop();
        let deps = deps?;

        let node = Arc::new(ContractMetadata {
            name: contract.name.clone(),
            pattern: contract.pattern.clone(),
            bytecode: contract.bytecode.clone(),
            deps,
        });
        self.resolved.insert(contract.pattern.clone(), Arc::clone(&node));
        Ok(node)
    }

    fn resolve_deps(&mut self, contract: &LinkableContract) -> Result<Vec<Arc<ContractMetadata>>> {
        let mut deps = Vec::new();
        for pattern in find_placeholders(&contract.bytecode)? {
            let dep = *self
                .contracts
                .get(pattern.as_str())
                .ok_or_else(|| Error::MissingDependency {
                    pattern: pattern.clone(),
                    dependent: contract.name.clone(),
                })?;
            deps.push(self.resolve(dep)?);
        }
        Ok(deps)
    }

    fn name_of(&self, pattern: &str) -> String {
        self.contracts
            .get(pattern)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| pattern.to_string())
    }
}
