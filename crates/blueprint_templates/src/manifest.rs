//! Template definition files.
//!
//! A `template.yaml` is deserialized into the raw [`TemplateManifest`],
//! validated as a whole, and converted into the typed [`Template`]. All
//! validation problems of one definition are reported together.

use std::collections::HashSet;
use std::path::{Component, Path};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{TemplateError, TemplateResult};
use crate::model::{
    Include, PostInit, Role, Template, TemplateFile, TemplateType, Value, Variable, VariableType,
};

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

/// Accepts any YAML scalar as a string so `version: 1.0` reads as "1.0".
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(String::new()),
        Some(serde_yaml::Value::String(s)) => Ok(s),
        Some(serde_yaml::Value::Number(n)) => Ok(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(serde::de::Error::custom("expected a scalar value")),
    }
}

/// Variable as written in a definition file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VariableManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, rename = "type")]
    pub var_type: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IncludeManifest {
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub enabled_by_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileManifest {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub dest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PostInitManifest {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub workdir: Option<String>,
}

/// Raw template definition.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TemplateManifest {
    /// Template name
    #[serde(default)]
    pub name: String,
    /// project, feature or component
    #[serde(default, rename = "type")]
    pub template_type: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variables: Vec<VariableManifest>,
    #[serde(default)]
    pub includes: Vec<IncludeManifest>,
    /// `package` or `package@version`
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub files: Vec<FileManifest>,
    #[serde(default)]
    pub post_init: Vec<PostInitManifest>,
}

impl TemplateManifest {
    /// Parse a definition. `location` is only used in error messages.
    pub fn from_yaml_str(content: &str, location: &str) -> TemplateResult<Self> {
        serde_yaml::from_str(content).map_err(|source| TemplateError::Parse {
            location: location.to_string(),
            source,
        })
    }

    /// Validate and convert into a [`Template`], rewriting every file `src`
    /// to `template_dir/src`.
    pub fn into_template(self, template_dir: &Path) -> TemplateResult<Template> {
        let label = if self.name.trim().is_empty() {
            template_dir.display().to_string()
        } else {
            self.name.clone()
        };

        let mut problems = Vec::new();

        if self.name.trim().is_empty() {
            problems.push("name is required".to_string());
        }
        let template_type = if self.template_type.is_empty() {
            problems.push("type is required".to_string());
            None
        } else {
            match self.template_type.parse::<TemplateType>() {
                Ok(t) => Some(t),
                Err(_) => {
                    problems.push(format!(
                        "unknown type '{}' (expected project, feature or component)",
                        self.template_type
                    ));
                    None
                }
            }
        };
        if self.version.trim().is_empty() {
            problems.push("version is required".to_string());
        }
        if self.files.is_empty() {
            problems.push("at least one file entry is required".to_string());
        }

        let mut seen = HashSet::new();
        let mut variables = Vec::with_capacity(self.variables.len());
        for (i, var) in self.variables.iter().enumerate() {
            if let Some(variable) = convert_variable(i, var, &mut problems) {
                if !seen.insert(variable.name.clone()) {
                    problems.push(format!("duplicate variable '{}'", variable.name));
                }
                variables.push(variable);
            }
        }

        for (i, include) in self.includes.iter().enumerate() {
            if include.template.trim().is_empty() {
                problems.push(format!("includes[{}]: template is required", i));
            }
        }
        for (i, file) in self.files.iter().enumerate() {
            if file.src.trim().is_empty() {
                problems.push(format!("files[{}]: src is required", i));
            } else if leaves_template_dir(Path::new(&file.src)) {
                problems.push(format!(
                    "files[{}]: src '{}' must stay inside the template directory",
                    i, file.src
                ));
            }
            if file.dest.trim().is_empty() {
                problems.push(format!("files[{}]: dest is required", i));
            }
        }
        for (i, post) in self.post_init.iter().enumerate() {
            if post.command.trim().is_empty() {
                problems.push(format!("post_init[{}]: command is required", i));
            }
        }

        let template_type = match (template_type, problems.is_empty()) {
            (Some(t), true) => t,
            _ => return Err(TemplateError::validation(label, problems.join("; "))),
        };

        Ok(Template {
            name: self.name,
            template_type,
            version: self.version,
            description: self.description,
            variables,
            includes: self
                .includes
                .into_iter()
                .map(|i| Include::new(i.template).enabled_by_default(i.enabled_by_default))
                .collect(),
            dependencies: self.dependencies,
            files: self
                .files
                .into_iter()
                .map(|f| TemplateFile::new(template_dir.join(&f.src), f.dest))
                .collect(),
            post_init: self
                .post_init
                .into_iter()
                .map(|p| PostInit {
                    command: p.command,
                    workdir: p.workdir,
                })
                .collect(),
            location: None,
        })
    }
}

/// Absolute paths and `..` components reach outside the template directory.
fn leaves_template_dir(src: &Path) -> bool {
    src.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

fn convert_variable(
    index: usize,
    var: &VariableManifest,
    problems: &mut Vec<String>,
) -> Option<Variable> {
    let start = problems.len();
    let label = if var.name.is_empty() {
        format!("variables[{}]", index)
    } else {
        format!("variable '{}'", var.name)
    };

    if !identifier_regex().is_match(&var.name) {
        problems.push(format!("{}: invalid name '{}'", label, var.name));
    }
    let var_type = var.var_type.parse::<VariableType>().ok();
    if var_type.is_none() {
        problems.push(format!(
            "{}: unknown type '{}' (expected string, int, bool, select or multiselect)",
            label, var.var_type
        ));
    }
    let role = match var.role.as_deref() {
        None | Some("") => None,
        Some(r) => {
            let role = r.parse::<Role>().ok();
            if role.is_none() {
                problems.push(format!("{}: unknown role '{}'", label, r));
            }
            role
        }
    };

    let var_type = var_type?;
    if var_type.requires_options() && var.options.is_empty() {
        problems.push(format!("{}: {} requires options", label, var_type));
    }
    let default = match &var.default {
        None | Some(serde_yaml::Value::Null) => None,
        Some(raw) => match typed_default(var_type, raw, &var.options) {
            Ok(value) => Some(value),
            Err(msg) => {
                problems.push(format!("{}: {}", label, msg));
                None
            }
        },
    };

    if problems.len() > start {
        return None;
    }
    Some(Variable {
        name: var.name.clone(),
        prompt: var.prompt.clone(),
        var_type,
        role,
        default,
        options: var.options.clone(),
    })
}

fn scalar_text(raw: &serde_yaml::Value) -> Option<String> {
    match raw {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn typed_default(
    var_type: VariableType,
    raw: &serde_yaml::Value,
    options: &[String],
) -> Result<Value, String> {
    match var_type {
        VariableType::String => scalar_text(raw)
            .map(Value::String)
            .ok_or_else(|| "default must be a string".to_string()),
        VariableType::Int => match raw {
            serde_yaml::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| format!("default {} is not an integer", n)),
            serde_yaml::Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("default '{}' is not an integer", s)),
            _ => Err("default must be an integer".to_string()),
        },
        VariableType::Bool => match raw {
            serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_yaml::Value::String(s) => match s.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(format!("default '{}' is not a boolean", s)),
            },
            _ => Err("default must be a boolean".to_string()),
        },
        VariableType::Select => {
            let choice = scalar_text(raw).ok_or_else(|| "default must be a string".to_string())?;
            if !options.contains(&choice) {
                return Err(format!("default '{}' is not one of the options", choice));
            }
            Ok(Value::String(choice))
        }
        VariableType::MultiSelect => {
            let seq = raw
                .as_sequence()
                .ok_or_else(|| "default must be a list".to_string())?;
            let mut chosen = Vec::with_capacity(seq.len());
            for item in seq {
                let choice =
                    scalar_text(item).ok_or_else(|| "default entries must be strings".to_string())?;
                if !options.contains(&choice) {
                    return Err(format!("default '{}' is not one of the options", choice));
                }
                chosen.push(choice);
            }
            Ok(Value::List(chosen))
        }
    }
}
