//! Code generation for Ethereum contracts
//!
//! Turns contract ABIs (and optionally their creation code) into typed Rust or
//! Go bindings.

pub mod cli;
pub mod generator;
pub mod lang;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod templates;
pub mod types;

#[cfg(test)]
mod tests;

pub use generator::{BindingGenerator, ContractSource};
pub use lang::{strategy, Language};
pub use model::{build_contract, BindingBuilder, ContractModel, PackageModel};
pub use parser::AbiParser;
pub use templates::TemplateRenderer;

use abibind_core::config::BindConfig;
use abibind_core::Result;

/// Main entry point for binding generation.
///
/// Renders the bindings of `sources` and writes them to the configured output
/// file, if any. The generated code is returned either way.
pub async fn generate_contract_code(sources: &[ContractSource], config: BindConfig) -> Result<String> {
    let generator = BindingGenerator::new(config)?;
    let code = generator.generate(sources)?;
    generator.write_output(&code).await?;
    Ok(code)
}
