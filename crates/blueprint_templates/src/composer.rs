//! Include composition.
//!
//! The composer resolves a template's includes depth-first and merges them
//! into one effective template:
//!
//! - variables: first declaration of a name wins
//! - dependencies: one entry per package, an explicit version beats an
//!   unversioned reference, output sorted by package
//! - files: first entry for a destination wins
//! - post-init commands: concatenated in resolution order
//!
//! Cycles in the include graph fail with
//! [`TemplateError::CircularDependency`] carrying the offending path.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{TemplateError, TemplateResult};
use crate::model::{Dependency, Include, Role, Template, TemplateType};

/// Loads included templates by location.
pub trait LoadTemplate {
    fn load(&self, location: &str) -> TemplateResult<Template>;

    /// Normalized identity of a location, used for cycle detection.
    fn identity(&self, location: &str) -> String {
        location.to_string()
    }
}

impl<T: LoadTemplate + ?Sized> LoadTemplate for &T {
    fn load(&self, location: &str) -> TemplateResult<Template> {
        (**self).load(location)
    }

    fn identity(&self, location: &str) -> String {
        (**self).identity(location)
    }
}

/// Merges templates with their includes.
#[derive(Debug, Clone)]
pub struct Composer<L> {
    loader: L,
    config: EngineConfig,
}

impl<L: LoadTemplate> Composer<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Compose `template` with everything it includes. The result has no
    /// includes.
    pub fn compose(&self, template: &Template) -> TemplateResult<Template> {
        let path = vec![template.identity().to_string()];
        let composed = self.compose_with_path(template, &path)?;
        self.check_roles(template, &composed)?;
        info!(
            "Composed template {}: {} variables, {} files, {} dependencies",
            composed.name,
            composed.variables.len(),
            composed.files.len(),
            composed.dependencies.len()
        );
        Ok(composed)
    }

    /// Compose after filtering the direct includes by user selection.
    ///
    /// An include is kept if `enabled` maps it to `true`, or if it has no
    /// entry and is enabled by default. Includes of kept includes are always
    /// composed.
    pub fn compose_with_enabled_includes(
        &self,
        template: &Template,
        enabled: &HashMap<String, bool>,
    ) -> TemplateResult<Template> {
        let mut filtered = template.clone();
        filtered.includes.retain(|include| {
            let keep = enabled
                .get(&include.template)
                .copied()
                .unwrap_or(include.enabled_by_default);
            if !keep {
                debug!("Include {} disabled", include.template);
            }
            keep
        });
        self.compose(&filtered)
    }

    /// Every include reachable from `template`, deduplicated in
    /// first-discovery order.
    pub fn get_all_includes(&self, template: &Template) -> TemplateResult<Vec<Include>> {
        let path = vec![template.identity().to_string()];
        let mut seen = HashSet::new();
        let mut includes = Vec::new();
        self.collect_includes(template, &path, &mut seen, &mut includes)?;
        Ok(includes)
    }

    fn compose_with_path(&self, template: &Template, path: &[String]) -> TemplateResult<Template> {
        let mut acc = template.clone();
        acc.includes = Vec::new();
        acc.dependencies = merge_dependencies(&[], &template.dependencies);

        for include in &template.includes {
            let next = self.extend_path(path, include)?;
            let included = self.load_include(include)?;
            let composed = self.compose_with_path(&included, &next)?;
            merge_into(&mut acc, composed);
        }
        Ok(acc)
    }

    fn collect_includes(
        &self,
        template: &Template,
        path: &[String],
        seen: &mut HashSet<String>,
        out: &mut Vec<Include>,
    ) -> TemplateResult<()> {
        for include in &template.includes {
            let next = self.extend_path(path, include)?;
            if let Some(identity) = next.last() {
                if seen.insert(identity.clone()) {
                    out.push(include.clone());
                }
            }
            let included = self.load_include(include)?;
            self.collect_includes(&included, &next, seen, out)?;
        }
        Ok(())
    }

    /// `path` plus the include's identity, or a cycle error.
    fn extend_path(&self, path: &[String], include: &Include) -> TemplateResult<Vec<String>> {
        let identity = self.loader.identity(&include.template);
        let cyclic = path.contains(&identity);
        let mut next = path.to_vec();
        next.push(identity);
        if cyclic {
            return Err(TemplateError::CircularDependency { path: next });
        }
        Ok(next)
    }

    fn load_include(&self, include: &Include) -> TemplateResult<Template> {
        debug!("Loading include {}", include.template);
        self.loader
            .load(&include.template)
            .map_err(|e| TemplateError::IncludeLoad {
                include: include.template.clone(),
                source: Box::new(e),
            })
    }

    fn check_roles(&self, root: &Template, composed: &Template) -> TemplateResult<()> {
        if !self.config.enforce_project_name_role {
            return Ok(());
        }
        let named = composed.variables_with_role(Role::ProjectName);
        if named.len() > 1 {
            let names: Vec<_> = named.iter().map(|v| v.name.as_str()).collect();
            return Err(TemplateError::validation(
                &root.name,
                format!(
                    "only one variable may have role {}, found: {}",
                    Role::ProjectName.as_str(),
                    names.join(", ")
                ),
            ));
        }
        if named.is_empty() && root.template_type == TemplateType::Project {
            return Err(TemplateError::validation(
                &root.name,
                format!(
                    "project templates need a variable with role {}",
                    Role::ProjectName.as_str()
                ),
            ));
        }
        Ok(())
    }
}

/// Merge a composed include into the accumulator.
fn merge_into(dst: &mut Template, src: Template) {
    for variable in src.variables {
        if dst.variable(&variable.name).is_none() {
            dst.variables.push(variable);
        }
    }

    dst.dependencies = merge_dependencies(&dst.dependencies, &src.dependencies);

    for file in src.files {
        if !dst.files.iter().any(|f| f.dest == file.dest) {
            dst.files.push(file);
        }
    }

    dst.post_init.extend(src.post_init);
}

/// Merge two dependency lists into one entry per package, sorted by
/// package name.
pub fn merge_dependencies(dst: &[String], src: &[String]) -> Vec<String> {
    let mut packages: BTreeMap<String, Option<String>> = BTreeMap::new();

    for dep in dst.iter().chain(src) {
        let Dependency { package, version } = Dependency::parse(dep);
        match packages.get_mut(&package) {
            None => {
                packages.insert(package, version);
            }
            Some(existing) => {
                let Some(v) = version else { continue };
                match existing {
                    None => *existing = Some(v),
                    Some(kept) if *kept != v => {
                        warn!(
                            "Conflicting versions for {}: keeping {}, ignoring {}",
                            package, kept, v
                        );
                    }
                    Some(_) => {}
                }
            }
        }
    }

    packages
        .into_iter()
        .map(|(package, version)| Dependency { package, version }.to_string())
        .collect()
}
