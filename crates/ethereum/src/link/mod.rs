//! Library linking and deployment ordering
//!
//! Contract bytecode references libraries through `__$<pattern>$__`
//! placeholders. [`tree`] resolves those references into a dependency graph
//! and [`deploy`] walks it, deploying each contract once after the libraries
//! it links against.

pub mod deploy;
pub mod tree;

pub use deploy::{
    deployment_plan, link_and_deploy, link_bytecode, DeploymentFailure, DeploymentParams,
    DeploymentResult,
};
pub use tree::{
    build_dependency_tree, find_placeholders, library_pattern, placeholder, ContractMetadata,
    LinkableContract,
};
