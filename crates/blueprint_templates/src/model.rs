//! Validated template model.
//!
//! Templates are built from a parsed [`TemplateManifest`](crate::manifest::TemplateManifest)
//! by the loader, or constructed directly with the builder methods below.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use blueprint_lang::{Context, Value};

use crate::error::TemplateError;

/// Semantic template type. Does not affect processing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Project,
    Feature,
    Component,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Project => "project",
            TemplateType::Feature => "feature",
            TemplateType::Component => "component",
        }
    }

    /// Folder templates of this type live in, relative to a source root.
    pub fn folder(&self) -> &'static str {
        match self {
            TemplateType::Project => "projects",
            TemplateType::Feature => "features",
            TemplateType::Component => "components",
        }
    }

    pub fn all() -> [TemplateType; 3] {
        [
            TemplateType::Project,
            TemplateType::Feature,
            TemplateType::Component,
        ]
    }
}

impl FromStr for TemplateType {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateType::all()
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                TemplateError::validation(
                    s,
                    format!("unknown template type '{}' (expected project, feature or component)", s),
                )
            })
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of input a variable expects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    String,
    Int,
    Bool,
    Select,
    MultiSelect,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::String => "string",
            VariableType::Int => "int",
            VariableType::Bool => "bool",
            VariableType::Select => "select",
            VariableType::MultiSelect => "multiselect",
        }
    }

    pub fn all() -> [VariableType; 5] {
        [
            VariableType::String,
            VariableType::Int,
            VariableType::Bool,
            VariableType::Select,
            VariableType::MultiSelect,
        ]
    }

    /// Select and multiselect variables need a list of options.
    pub fn requires_options(&self) -> bool {
        matches!(self, VariableType::Select | VariableType::MultiSelect)
    }
}

impl FromStr for VariableType {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VariableType::all()
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                TemplateError::validation(
                    s,
                    format!(
                        "unknown type '{}' (expected string, int, bool, select or multiselect)",
                        s
                    ),
                )
            })
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reserved variable roles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The variable naming the generated project
    ProjectName,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ProjectName => "project_name",
        }
    }
}

impl FromStr for Role {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project_name" => Ok(Role::ProjectName),
            _ => Err(TemplateError::validation(s, format!("unknown role '{}'", s))),
        }
    }
}

/// A user-configurable variable with an interactive prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub prompt: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    pub role: Option<Role>,
    pub default: Option<Value>,
    pub options: Vec<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>, var_type: VariableType) -> Self {
        Self {
            name: name.into(),
            prompt: String::new(),
            var_type,
            role: None,
            default: None,
            options: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::String)
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// Another template composed into this one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Include {
    /// Location of the included template
    pub template: String,
    pub enabled_by_default: bool,
}

impl Include {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            enabled_by_default: false,
        }
    }

    pub fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.enabled_by_default = enabled;
        self
    }
}

/// A file or directory to render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateFile {
    /// Source path; relative to the source root once loaded.
    pub src: PathBuf,
    /// Destination path; may contain template syntax.
    pub dest: String,
}

impl TemplateFile {
    pub fn new(src: impl Into<PathBuf>, dest: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
        }
    }
}

/// A command to run after scaffolding. Collected, never executed here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostInit {
    pub command: String,
    pub workdir: Option<String>,
}

impl PostInit {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            workdir: None,
        }
    }

    pub fn workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }
}

/// A dependency string split into package and optional version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Dependency {
    pub package: String,
    pub version: Option<String>,
}

impl Dependency {
    /// Split on the first `@`. An empty version counts as none.
    pub fn parse(dep: &str) -> Self {
        match dep.split_once('@') {
            Some((package, version)) if !version.is_empty() => Self {
                package: package.to_string(),
                version: Some(version.to_string()),
            },
            Some((package, _)) => Self {
                package: package.to_string(),
                version: None,
            },
            None => Self {
                package: dep.to_string(),
                version: None,
            },
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.package, version),
            None => f.write_str(&self.package),
        }
    }
}

/// A complete template definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    #[serde(rename = "type")]
    pub template_type: TemplateType,
    pub version: String,
    pub description: String,
    pub variables: Vec<Variable>,
    pub includes: Vec<Include>,
    pub dependencies: Vec<String>,
    pub files: Vec<TemplateFile>,
    pub post_init: Vec<PostInit>,
    /// Location the template was loaded from; its identity in include graphs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        template_type: TemplateType,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            template_type,
            version: version.into(),
            description: String::new(),
            variables: Vec::new(),
            includes: Vec::new(),
            dependencies: Vec::new(),
            files: Vec::new(),
            post_init: Vec::new(),
            location: None,
        }
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_include(mut self, include: Include) -> Self {
        self.includes.push(include);
        self
    }

    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    pub fn with_file(mut self, file: TemplateFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_post_init(mut self, post_init: PostInit) -> Self {
        self.post_init.push(post_init);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Identity used for cycle detection: the location, else the name.
    pub fn identity(&self) -> &str {
        self.location.as_deref().unwrap_or(&self.name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Variables carrying the given role.
    pub fn variables_with_role(&self, role: Role) -> Vec<&Variable> {
        self.variables
            .iter()
            .filter(|v| v.role == Some(role))
            .collect()
    }

    /// Parsed view of the dependency list.
    pub fn parsed_dependencies(&self) -> Vec<Dependency> {
        self.dependencies.iter().map(|d| Dependency::parse(d)).collect()
    }

    /// Context pre-filled with variable defaults, overridden by `provided`.
    pub fn default_context(&self, provided: &Context) -> Context {
        let mut ctx: Context = self
            .variables
            .iter()
            .filter_map(|v| v.default.clone().map(|d| (v.name.clone(), d)))
            .collect();
        ctx.merge(provided);
        ctx
    }
}
