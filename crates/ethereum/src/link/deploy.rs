//! Linking and deploying a dependency tree of contracts

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use ethers::types::Address;
use tracing::{debug, info};

use super::tree::{find_placeholders, placeholder, visit_post_order, ContractMetadata};
use abibind_core::{Error, Result};

/// What to deploy and with which constructor inputs
#[derive(Debug, Clone, Default)]
pub struct DeploymentParams {
    /// Root contracts, deployed in order
    pub contracts: Vec<Arc<ContractMetadata>>,
    /// ABI-encoded constructor arguments by pattern
    pub inputs: HashMap<String, Vec<u8>>,
    /// Contracts already on chain by pattern; never redeployed
    pub overrides: HashMap<String, Address>,
}

impl DeploymentParams {
    pub fn new(contracts: Vec<Arc<ContractMetadata>>) -> Self {
        Self {
            contracts,
            ..Default::default()
        }
    }

    pub fn with_input(mut self, pattern: impl Into<String>, input: Vec<u8>) -> Self {
        self.inputs.insert(pattern.into(), input);
        self
    }

    pub fn with_override(mut self, pattern: impl Into<String>, address: Address) -> Self {
        self.overrides.insert(pattern.into(), address);
        self
    }
}

/// Contracts deployed by one run, keyed by pattern
#[derive(Debug, Clone)]
pub struct DeploymentResult<T> {
    pub addresses: BTreeMap<String, Address>,
    pub transactions: BTreeMap<String, T>,
}

impl<T> Default for DeploymentResult<T> {
    fn default() -> Self {
        Self {
            addresses: BTreeMap::new(),
            transactions: BTreeMap::new(),
        }
    }
}

impl<T> DeploymentResult<T> {
    /// Merge the deployments of another run into this one
    pub fn accumulate(&mut self, other: DeploymentResult<T>) {
        self.addresses.extend(other.addresses);
        self.transactions.extend(other.transactions);
    }

    pub fn address(&self, pattern: &str) -> Option<Address> {
        self.addresses.get(pattern).copied()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// A failed run together with everything deployed before the failure
#[derive(Debug)]
pub struct DeploymentFailure<T> {
    pub partial: DeploymentResult<T>,
    pub source: Error,
}

impl<T> fmt::Display for DeploymentFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deployment failed after {} contract(s): {}",
            self.partial.len(),
            self.source
        )
    }
}

impl<T: fmt::Debug> std::error::Error for DeploymentFailure<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Replace the placeholder of each pattern in `libraries` with its address.
///
/// Addresses are written as lower-case hex without a `0x` prefix.
pub fn link_bytecode(bytecode: &str, libraries: &HashMap<String, Address>) -> String {
    libraries
        .iter()
        .fold(bytecode.to_string(), |code, (pattern, address)| {
            code.replace(&placeholder(pattern), &hex::encode(address.as_bytes()))
        })
}

/// Contracts `link_and_deploy` would deploy, in deployment order
pub fn deployment_plan(params: &DeploymentParams) -> Vec<Arc<ContractMetadata>> {
    let mut seen: HashSet<String> = params.overrides.keys().cloned().collect();
    let mut order = Vec::new();
    for root in &params.contracts {
        visit_post_order(root, &mut seen, &mut order);
    }
    order
}

/// Deploy the root contracts and every library they link against.
///
/// Each pattern is deployed at most once; overridden patterns are never
/// deployed and are left out of the result. `deploy` receives the constructor
/// input and the linked creation code. On failure the contracts deployed so far
/// are returned in [`DeploymentFailure::partial`].
pub fn link_and_deploy<T, F>(
    params: &DeploymentParams,
    deploy: F,
) -> std::result::Result<DeploymentResult<T>, DeploymentFailure<T>>
where
    F: FnMut(&[u8], &[u8]) -> Result<(Address, T)>,
{
    let mut deployer = Deployer {
        inputs: &params.inputs,
        known: params.overrides.clone(),
        result: DeploymentResult::default(),
        deploy,
    };

    for root in &params.contracts {
        if let Err(source) = deployer.link_and_deploy(root) {
            return Err(DeploymentFailure {
                partial: deployer.result,
                source,
            });
        }
    }

    info!(deployed = deployer.result.len(), "deployment complete");
    Ok(deployer.result)
}

struct Deployer<'a, T, F> {
    inputs: &'a HashMap<String, Vec<u8>>,
    /// Addresses of overrides and of everything deployed so far
    known: HashMap<String, Address>,
    result: DeploymentResult<T>,
    deploy: F,
}

impl<T, F> Deployer<'_, T, F>
where
    F: FnMut(&[u8], &[u8]) -> Result<(Address, T)>,
{
    fn link_and_deploy(&mut self, contract: &ContractMetadata) -> Result<Address> {
        if let Some(address) = self.known.get(&contract.pattern) {
            return Ok(*address);
        }

        let mut libraries = HashMap::with_capacity(contract.deps.len());
        for dep in &contract.deps {
            let address = self.link_and_deploy(dep)?;
            libraries.insert(dep.pattern.clone(), address);
        }

        let linked = link_bytecode(&contract.bytecode, &libraries);
        let linked = linked.strip_prefix("0x").unwrap_or(&linked);
        if !find_placeholders(linked)?.is_empty() {
            return Err(Error::UnlinkedBytecode(contract.name.clone()));
        }
        let code =
            hex::decode(linked).map_err(|_| Error::UnlinkedBytecode(contract.name.clone()))?;

        let input = self
            .inputs
            .get(&contract.pattern)
            .map(Vec::as_slice)
            .unwrap_or_default();

        debug!(contract = %contract.name, libraries = libraries.len(), "deploying");
        let (address, tx) = (self.deploy)(input, &code)?;
        info!(contract = %contract.name, address = ?address, "deployed");

        self.known.insert(contract.pattern.clone(), address);
        self.result.addresses.insert(contract.pattern.clone(), address);
        self.result.transactions.insert(contract.pattern.clone(), tx);
        Ok(address)
    }
}
