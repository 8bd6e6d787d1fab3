//! End-to-end template processing.
//!
//! [`TemplateEngine`] ties the loader, composer and renderer together over
//! one template source. Every error is wrapped with the stage it came from.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use blueprint_lang::{Context, Func};

use crate::composer::Composer;
use crate::config::EngineConfig;
use crate::error::{Stage, TemplateError, TemplateResult};
use crate::loader::TemplateLoader;
use crate::model::{Include, Template, TemplateType, Variable};
use crate::renderer::{RenderedFiles, TemplateRenderer};
use crate::resolver::ResolvedTemplate;
use crate::source::{DirSource, TemplateSource};

/// Loads, composes and renders templates from one source.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    loader: TemplateLoader,
    renderer: TemplateRenderer,
    config: EngineConfig,
}

impl TemplateEngine {
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        Self {
            loader: TemplateLoader::new(Arc::clone(&source)),
            renderer: TemplateRenderer::new(source),
            config: EngineConfig::default(),
        }
    }

    /// Engine over a template directory on disk.
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(DirSource::new(root)))
    }

    /// Engine over the source a resolver picked, plus the location to load.
    pub fn from_resolved(resolved: ResolvedTemplate) -> (Self, String) {
        (Self::new(resolved.source), resolved.location)
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.loader = self.loader.with_config(config.clone());
        self.renderer = self.renderer.with_config(config.clone());
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn loader(&self) -> &TemplateLoader {
        &self.loader
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    fn composer(&self) -> Composer<&TemplateLoader> {
        Composer::new(&self.loader).with_config(self.config.clone())
    }

    pub fn load(&self, location: &str) -> TemplateResult<Template> {
        self.loader
            .load(location)
            .map_err(|e| e.in_stage(Stage::Load))
    }

    pub fn compose(&self, template: &Template) -> TemplateResult<Template> {
        self.composer()
            .compose(template)
            .map_err(|e| e.in_stage(Stage::Compose))
    }

    pub fn compose_with_enabled_includes(
        &self,
        template: &Template,
        enabled: &HashMap<String, bool>,
    ) -> TemplateResult<Template> {
        self.composer()
            .compose_with_enabled_includes(template, enabled)
            .map_err(|e| e.in_stage(Stage::Compose))
    }

    /// Every include reachable from `template`, for building a feature
    /// selection before composing.
    pub fn get_all_includes(&self, template: &Template) -> TemplateResult<Vec<Include>> {
        self.composer()
            .get_all_includes(template)
            .map_err(|e| e.in_stage(Stage::Compose))
    }

    pub fn render_all(&self, template: &Template, ctx: &Context) -> TemplateResult<RenderedFiles> {
        self.renderer
            .render_all(template, ctx)
            .map_err(|e| e.in_stage(Stage::Render))
    }

    /// Load, compose and render the template at `location`.
    pub fn process(&self, location: &str, ctx: &Context) -> TemplateResult<RenderedFiles> {
        let composed = self.composed_template(location)?;
        self.render_all(&composed, ctx)
    }

    /// Like [`process`](Self::process), composing only the selected direct
    /// includes.
    pub fn process_with_includes(
        &self,
        location: &str,
        ctx: &Context,
        enabled: &HashMap<String, bool>,
    ) -> TemplateResult<RenderedFiles> {
        let template = self.load(location)?;
        let composed = self.compose_with_enabled_includes(&template, enabled)?;
        self.render_all(&composed, ctx)
    }

    /// The fully composed template, without rendering.
    pub fn composed_template(&self, location: &str) -> TemplateResult<Template> {
        let template = self.load(location)?;
        self.compose(&template)
    }

    /// Variables of the composed template, includes' variables included.
    pub fn template_variables(&self, location: &str) -> TemplateResult<Vec<Variable>> {
        Ok(self.composed_template(location)?.variables)
    }

    /// Dependencies of the composed template.
    pub fn template_dependencies(&self, location: &str) -> TemplateResult<Vec<String>> {
        Ok(self.composed_template(location)?.dependencies)
    }

    pub fn discover(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.loader.discover()
    }

    pub fn discover_by_type(
        &self,
        template_type: TemplateType,
    ) -> impl Iterator<Item = (String, String)> + '_ {
        self.loader.discover_by_type(template_type)
    }

    pub fn exists(&self, location: &str) -> bool {
        self.loader.exists(location)
    }

    /// Register a custom function for template content and paths.
    pub fn add_template_func(&mut self, name: impl Into<String>, func: Func) {
        self.renderer.add_func(name, func);
    }
}

impl From<TemplateLoader> for TemplateEngine {
    fn from(loader: TemplateLoader) -> Self {
        let config = loader.config().clone();
        let renderer = TemplateRenderer::new(Arc::clone(loader.source())).with_config(config.clone());
        Self {
            loader,
            renderer,
            config,
        }
    }
}

/// Stage label of an engine error, if it carries one.
pub fn failed_stage(err: &TemplateError) -> Option<Stage> {
    match err {
        TemplateError::Stage { stage, .. } => Some(*stage),
        _ => None,
    }
}
