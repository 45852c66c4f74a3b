use std::collections::HashMap;

use anyhow::anyhow;

use crate::commands::CommandRegistry;
use crate::error::TemplateError;
use crate::parser::Parser;

/// Where the parser sources the raw content of further templates while
/// compiling one (the `extend` and `form` commands pull other templates
/// into the stream).
///
/// This is the open seam for arbitrary loader implementations, so failures
/// cross it as [`anyhow::Error`] and are wrapped into
/// [`TemplateError::Source`] by the parser.
pub trait TemplateSource {
    fn raw_template(&self, qualified_name: &str) -> anyhow::Result<String>;
}

/// An in-memory template source, keyed by qualified name. Handy for tests
/// and for callers that assemble templates programmatically.
impl TemplateSource for HashMap<String, String> {
    fn raw_template(&self, qualified_name: &str) -> anyhow::Result<String> {
        self.get(qualified_name)
            .cloned()
            .ok_or_else(|| anyhow!("no such view '{qualified_name}'"))
    }
}

/// A pluggable content transformer.
///
/// A template's contents can be passed through any number of engines as
/// part of compilation; each turns one representation of the template into
/// the next, with the last producing executable script source.
pub trait Engine {
    fn compile(
        &self,
        source: &dyn TemplateSource,
        qualified_name: &str,
        raw_content: &str,
    ) -> Result<String, TemplateError>;
}

/// The Origin template engine.
///
/// Templates are primarily markup, with Django-like tag constructs layered
/// on top. Compilation runs the lexer over the raw content, parses the
/// token stream into nodes (resolving inheritance through the command set)
/// and renders the nodes to script source ready for caching or immediate
/// execution in a sandbox.
pub struct OriginEngine {
    registry: CommandRegistry,
}

impl OriginEngine {
    /// An engine with the built-in command set.
    #[must_use]
    pub fn new() -> Self {
        OriginEngine {
            registry: CommandRegistry::default(),
        }
    }

    /// An engine dispatching through a caller-assembled command registry.
    #[must_use]
    pub fn with_registry(registry: CommandRegistry) -> Self {
        OriginEngine { registry }
    }
}

impl Default for OriginEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for OriginEngine {
    fn compile(
        &self,
        source: &dyn TemplateSource,
        qualified_name: &str,
        raw_content: &str,
    ) -> Result<String, TemplateError> {
        let mut parser = Parser::new(source, &self.registry, qualified_name, raw_content);
        let nodes = parser.parse(None)?;
        Ok(nodes.to_script())
    }
}

/// The null engine: performs no transformation at all. Its primary use is
/// handling extensions like `.html`, whose content is already final.
pub struct NullEngine;

impl Engine for NullEngine {
    fn compile(
        &self,
        _source: &dyn TemplateSource,
        _qualified_name: &str,
        raw_content: &str,
    ) -> Result<String, TemplateError> {
        Ok(raw_content.to_string())
    }
}
