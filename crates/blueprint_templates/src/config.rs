//! Engine configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TemplateError, TemplateResult};

/// What the renderer does when two file entries render to the same
/// destination path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Fail the whole render
    #[default]
    Error,
    /// Keep the later entry (last write wins)
    Overwrite,
}

fn default_definition_file() -> String {
    "template.yaml".to_string()
}

fn default_alternate_definition_files() -> Vec<String> {
    vec!["template.yml".to_string()]
}

fn default_template_suffix() -> String {
    ".tmpl".to_string()
}

fn default_true() -> bool {
    true
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Name of the template definition file
    #[serde(default = "default_definition_file")]
    pub definition_file: String,
    /// Names tried when the definition file is absent
    #[serde(default = "default_alternate_definition_files")]
    pub alternate_definition_files: Vec<String>,
    /// Suffix marking files whose content is rendered
    #[serde(default = "default_template_suffix")]
    pub template_suffix: String,
    /// Destination collision handling
    #[serde(default)]
    pub collision: CollisionPolicy,
    /// Check the `project_name` role after composition
    #[serde(default = "default_true")]
    pub enforce_project_name_role: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            definition_file: default_definition_file(),
            alternate_definition_files: default_alternate_definition_files(),
            template_suffix: default_template_suffix(),
            collision: CollisionPolicy::default(),
            enforce_project_name_role: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document; missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> TemplateResult<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|source| TemplateError::Parse {
            location: "engine configuration".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> TemplateResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| TemplateError::io(path, e))?;
        Self::from_yaml_str(&content)
    }

    pub fn definition_file(mut self, name: impl Into<String>) -> Self {
        self.definition_file = name.into();
        self
    }

    pub fn template_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.template_suffix = suffix.into();
        self
    }

    pub fn collision(mut self, policy: CollisionPolicy) -> Self {
        self.collision = policy;
        self
    }

    pub fn enforce_project_name_role(mut self, enforce: bool) -> Self {
        self.enforce_project_name_role = enforce;
        self
    }

    /// Definition file names in lookup order.
    pub fn definition_files(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.definition_file.as_str())
            .chain(self.alternate_definition_files.iter().map(String::as_str))
    }

    pub fn is_definition_file(&self, file_name: &str) -> bool {
        self.definition_files().any(|name| name == file_name)
    }

    fn validate(&self) -> TemplateResult<()> {
        if self.definition_file.trim().is_empty() {
            return Err(TemplateError::Config(
                "definition_file must not be empty".to_string(),
            ));
        }
        if self.template_suffix.trim().is_empty() {
            return Err(TemplateError::Config(
                "template_suffix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
