//! Ethereum binding generation and library-linking deployment
//!
//! [`codegen`] turns contract ABIs into typed bindings, [`link`] orders and
//! links library-dependent contracts for deployment and [`wait`] follows the
//! resulting transactions on chain.

pub mod codegen;
pub mod link;
pub mod provider;
pub mod wait;

pub use codegen::{generate_contract_code, BindingGenerator, ContractSource};
pub use link::{
    build_dependency_tree, link_and_deploy, library_pattern, ContractMetadata, DeploymentParams,
    DeploymentResult, LinkableContract,
};
pub use provider::EthereumProvider;
pub use wait::{wait_deployed, wait_mined, ChainBackend};
