//! Template system for binding generation
//!
//! One Handlebars template per target language renders a whole [`PackageModel`].

use handlebars::Handlebars;

use super::lang::strategy;
use super::model::PackageModel;
use abibind_core::{Error, Result};

/// Renders package models into source files
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl TemplateRenderer {
    /// Create a renderer with the built-in templates registered
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        // Generated source is not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        Self::register_templates(&mut handlebars)?;

        Ok(Self { handlebars })
    }

    fn register_templates(handlebars: &mut Handlebars) -> Result<()> {
        handlebars
            .register_template_string("rust", include_str!("rust.hbs"))
            .map_err(|e| Error::template(format!("Failed to register rust template: {}", e)))?;

        handlebars
            .register_template_string("go", include_str!("go.hbs"))
            .map_err(|e| Error::template(format!("Failed to register go template: {}", e)))?;

        Ok(())
    }

    /// Render the bindings of a package in its target language
    pub fn render(&self, package: &PackageModel) -> Result<String> {
        let template = strategy(package.lang).template_name();
        let data = serde_json::to_value(package)?;
        self.handlebars
            .render(template, &data)
            .map_err(|e| Error::template(format!("Failed to render template {}: {}", template, e)))
    }

    /// Names of the registered templates
    pub fn available_templates(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlebars.get_templates().keys().cloned().collect();
        names.sort();
        names
    }
}
