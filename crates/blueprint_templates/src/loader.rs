//! Template loading functionality.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::composer::LoadTemplate;
use crate::config::EngineConfig;
use crate::error::{TemplateError, TemplateResult};
use crate::manifest::TemplateManifest;
use crate::model::{Template, TemplateType};
use crate::source::{normalize, DirSource, EntryKind, TemplateSource};

/// Template loader.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    source: Arc<dyn TemplateSource>,
    config: EngineConfig,
}

impl TemplateLoader {
    /// Create a loader over a source with the default configuration.
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        Self {
            source,
            config: EngineConfig::default(),
        }
    }

    /// Create a loader over a directory on disk.
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(DirSource::new(root)))
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn source(&self) -> &Arc<dyn TemplateSource> {
        &self.source
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load a single template.
    ///
    /// `location` is either a template directory or the path of its
    /// definition file, relative to the source root.
    pub fn load(&self, location: &str) -> TemplateResult<Template> {
        let (definition, template_dir) = self.resolve_definition(location)?;
        debug!("Loading template definition from {:?}", definition);

        let bytes = self
            .source
            .read(&definition)
            .map_err(|e| TemplateError::io(&definition, e))?;
        let content = String::from_utf8(bytes).map_err(|e| {
            TemplateError::io(&definition, io::Error::new(io::ErrorKind::InvalidData, e))
        })?;

        let manifest =
            TemplateManifest::from_yaml_str(&content, &definition.display().to_string())?;
        let mut template = manifest.into_template(&template_dir)?;
        template.location = Some(location_string(&template_dir));

        info!(
            "Loaded template: {} ({}, {})",
            template.name,
            template.template_type,
            template.identity()
        );
        Ok(template)
    }

    /// Whether a definition can be found at `location`. Does not parse it.
    pub fn exists(&self, location: &str) -> bool {
        self.resolve_definition(location).is_ok()
    }

    /// Lazily enumerate `(location, name)` of every loadable template.
    ///
    /// Templates that fail to load are skipped.
    pub fn discover(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.discover_templates()
            .map(|(location, template)| (location, template.name))
    }

    /// [`discover`](Self::discover) restricted to one template type.
    pub fn discover_by_type(
        &self,
        template_type: TemplateType,
    ) -> impl Iterator<Item = (String, String)> + '_ {
        self.discover_templates()
            .filter(move |(_, template)| template.template_type == template_type)
            .map(|(location, template)| (location, template.name))
    }

    /// Load every discoverable template, optionally filtered by type.
    pub fn discover_all(&self, template_type: Option<TemplateType>) -> Vec<Template> {
        self.discover_templates()
            .map(|(_, template)| template)
            .filter(|t| template_type.map_or(true, |ty| t.template_type == ty))
            .collect()
    }

    fn discover_templates(&self) -> impl Iterator<Item = (String, Template)> + '_ {
        let mut seen = HashSet::new();
        self.config
            .definition_files()
            .flat_map(move |name| self.source.find_files(name))
            .filter_map(|definition| definition.parent().map(location_string))
            .filter(move |location| seen.insert(location.clone()))
            .filter_map(move |location| match self.load(&location) {
                Ok(template) => Some((location, template)),
                Err(e) => {
                    debug!("Skipping template at {}: {}", location, e);
                    None
                }
            })
    }

    /// Find the definition file for `location`, returning it with the
    /// template directory.
    fn resolve_definition(&self, location: &str) -> TemplateResult<(PathBuf, PathBuf)> {
        let path = normalize(Path::new(location));

        let names_definition = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.config.is_definition_file(n));
        if names_definition {
            if matches!(self.source.kind(&path), Ok(EntryKind::File)) {
                let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                return Ok((path, dir));
            }
            return Err(TemplateError::NotFound(location.to_string()));
        }

        if !matches!(self.source.kind(&path), Ok(EntryKind::Dir)) {
            return Err(TemplateError::NotFound(location.to_string()));
        }
        self.config
            .definition_files()
            .map(|name| path.join(name))
            .find(|candidate| matches!(self.source.kind(candidate), Ok(EntryKind::File)))
            .map(|definition| (definition, path.clone()))
            .ok_or_else(|| {
                TemplateError::NotFound(format!(
                    "no {} found in {}",
                    self.config.definition_file, location
                ))
            })
    }
}

impl LoadTemplate for TemplateLoader {
    fn load(&self, location: &str) -> TemplateResult<Template> {
        TemplateLoader::load(self, location)
    }

    fn identity(&self, location: &str) -> String {
        let path = normalize(Path::new(location));
        let names_definition = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.config.is_definition_file(n));
        if names_definition {
            location_string(path.parent().unwrap_or(Path::new("")))
        } else {
            location_string(&path)
        }
    }
}

/// Slash-separated form of a source-relative directory; `.` for the root.
fn location_string(path: &Path) -> String {
    let parts: Vec<_> = normalize(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
