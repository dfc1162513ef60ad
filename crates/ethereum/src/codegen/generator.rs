//! Binding generator
//!
//! Ties the model builder and the template renderer together and handles the
//! file system side of a generation run.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::model::{BindingBuilder, PackageModel};
use super::templates::TemplateRenderer;
use abibind_core::config::BindConfig;
use abibind_core::{Error, Result};

/// ABI and creation code of one contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSource {
    /// Contract type name
    pub name: String,
    /// ABI JSON
    pub abi: String,
    /// Creation code hex, empty when only the ABI is known
    pub bytecode: String,
}

impl ContractSource {
    pub fn new(name: impl Into<String>, abi: impl Into<String>, bytecode: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            abi: abi.into(),
            bytecode: bytecode.into(),
        }
    }

    /// Read the ABI and optional bytecode files of a contract
    pub async fn load(name: &str, abi_path: &Path, bin_path: Option<&Path>) -> Result<Self> {
        debug!(contract = name, abi = %abi_path.display(), "loading contract source");
        let abi = tokio::fs::read_to_string(abi_path).await.map_err(|e| {
            Error::Io(format!("Failed to read ABI file {}: {}", abi_path.display(), e))
        })?;

        let bytecode = match bin_path {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| Error::Io(format!("Failed to read bytecode file {}: {}", path.display(), e)))?
                .trim()
                .to_string(),
            None => String::new(),
        };

        Ok(Self::new(name, abi, bytecode))
    }
}

/// Generates bindings for a set of contracts
pub struct BindingGenerator {
    config: BindConfig,
    renderer: TemplateRenderer,
}

impl BindingGenerator {
    /// Create a new generator with the given configuration
    pub fn new(config: BindConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            renderer: TemplateRenderer::new()?,
        })
    }

    /// Build the package model of `sources`
    pub fn build_model(&self, sources: &[ContractSource]) -> Result<PackageModel> {
        if sources.is_empty() {
            return Err(Error::generic("no contracts to generate bindings for"));
        }

        let mut builder = BindingBuilder::new(self.config.lang).with_aliases(self.config.aliases.clone());
        for library in &self.config.libraries {
            builder = builder.with_library(library);
        }

        for source in sources {
            builder.add_contract(&source.name, &source.abi, &source.bytecode)?;
        }

        builder.build(&self.config.package)
    }

    /// Render the bindings of `sources` into one source file
    pub fn generate(&self, sources: &[ContractSource]) -> Result<String> {
        let model = self.build_model(sources)?;
        let code = self.renderer.render(&model)?;
        info!(
            package = %self.config.package,
            lang = %self.config.lang,
            contracts = model.contracts.len(),
            structs = model.structs.len(),
            "generated bindings"
        );
        Ok(code)
    }

    /// Write generated code to the configured output file.
    ///
    /// Returns the path written, or `None` when no output file is configured.
    pub async fn write_output(&self, code: &str) -> Result<Option<PathBuf>> {
        let Some(path) = &self.config.output else {
            return Ok(None);
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Io(format!("Failed to create output directory {}: {}", parent.display(), e))
            })?;
        }

        tokio::fs::write(path, code)
            .await
            .map_err(|e| Error::Io(format!("Failed to write {}: {}", path.display(), e)))?;

        debug!(path = %path.display(), bytes = code.len(), "wrote bindings");
        Ok(Some(path.clone()))
    }

    pub fn config(&self) -> &BindConfig {
        &self.config
    }
}
