//! Template location resolution.
//!
//! A resolver turns a template reference (name plus type) into the source
//! holding it and the location inside that source. Resolvers chain, so a
//! local template directory can shadow a builtin bundle.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::model::TemplateType;
use crate::source::TemplateSource;

/// A template addressed by name and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    pub name: String,
    pub template_type: TemplateType,
}

impl TemplateRef {
    pub fn new(name: impl Into<String>, template_type: TemplateType) -> Self {
        Self {
            name: name.into(),
            template_type,
        }
    }

    /// Source-relative location, e.g. `features/logging`.
    pub fn location(&self) -> String {
        format!("{}/{}", self.template_type.folder(), self.name)
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.template_type, self.name)
    }
}

/// Where a template was found.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub source: Arc<dyn TemplateSource>,
    pub location: String,
}

/// Resolves template references to a source and location.
pub trait Resolver: Send + Sync + fmt::Debug {
    fn resolve(&self, template: &TemplateRef) -> TemplateResult<ResolvedTemplate>;
}

/// Resolves `<type folder>/<name>` inside a single source.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    label: String,
    source: Arc<dyn TemplateSource>,
}

impl SourceResolver {
    pub fn new(label: impl Into<String>, source: Arc<dyn TemplateSource>) -> Self {
        Self {
            label: label.into(),
            source,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Resolver for SourceResolver {
    fn resolve(&self, template: &TemplateRef) -> TemplateResult<ResolvedTemplate> {
        let location = template.location();
        if !self.source.exists(Path::new(&location)) {
            return Err(TemplateError::NotFound(format!(
                "{} not found in {} templates",
                template, self.label
            )));
        }
        debug!("Resolved {} to {} in {} templates", template, location, self.label);
        Ok(ResolvedTemplate {
            source: Arc::clone(&self.source),
            location,
        })
    }
}

/// Tries resolvers in order; the first success wins.
#[derive(Debug, Default)]
pub struct ChainResolver {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl ChainResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    pub fn push(&mut self, resolver: Box<dyn Resolver>) {
        self.resolvers.push(resolver);
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl Resolver for ChainResolver {
    fn resolve(&self, template: &TemplateRef) -> TemplateResult<ResolvedTemplate> {
        let mut last_error = None;
        for resolver in &self.resolvers {
            match resolver.resolve(template) {
                Ok(resolved) => return Ok(resolved),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| TemplateError::NotFound(template.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn local() -> Arc<dyn TemplateSource> {
        Arc::new(
            MemorySource::new().with_file("features/logging/template.yaml", "name: local-logging"),
        )
    }

    fn builtin() -> Arc<dyn TemplateSource> {
        Arc::new(
            MemorySource::new()
                .with_file("features/logging/template.yaml", "name: builtin-logging")
                .with_file("projects/go-api/template.yaml", "name: go-api"),
        )
    }

    #[test]
    fn test_location_uses_type_folder() {
        let r = TemplateRef::new("go-api", TemplateType::Project);
        assert_eq!(r.location(), "projects/go-api");
        let r = TemplateRef::new("button", TemplateType::Component);
        assert_eq!(r.location(), "components/button");
    }

    #[test]
    fn test_chain_prefers_first() {
        let chain = ChainResolver::new()
            .with(SourceResolver::new("local", local()))
            .with(SourceResolver::new("builtin", builtin()));

        let resolved = chain
            .resolve(&TemplateRef::new("logging", TemplateType::Feature))
            .unwrap();
        assert_eq!(resolved.location, "features/logging");
        let content = resolved
            .source
            .read(Path::new("features/logging/template.yaml"))
            .unwrap();
        assert_eq!(content, b"name: local-logging");

        let resolved = chain
            .resolve(&TemplateRef::new("go-api", TemplateType::Project))
            .unwrap();
        assert_eq!(resolved.location, "projects/go-api");
    }

    #[test]
    fn test_chain_reports_last_error() {
        let chain = ChainResolver::new()
            .with(SourceResolver::new("local", local()))
            .with(SourceResolver::new("builtin", builtin()));
        let err = chain
            .resolve(&TemplateRef::new("web", TemplateType::Project))
            .unwrap_err();
        assert!(err.to_string().contains("builtin templates"));

        let empty = ChainResolver::new();
        assert!(matches!(
            empty.resolve(&TemplateRef::new("web", TemplateType::Project)),
            Err(TemplateError::NotFound(_))
        ));
    }
}
