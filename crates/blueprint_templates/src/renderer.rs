//! Template rendering.
//!
//! Rendering runs in three phases so that no output is produced for a
//! template containing a syntax error anywhere:
//!
//! 1. plan: expand every file entry, walking directories recursively
//! 2. parse: compile every destination path and every marker-suffixed file
//! 3. render: substitute the context, copying plain files byte for byte

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use blueprint_lang::{Context, Func, TemplateEnv, TextTemplate};
use tracing::{debug, info, warn};

use crate::config::{CollisionPolicy, EngineConfig};
use crate::error::{TemplateError, TemplateResult};
use crate::model::Template;
use crate::source::{normalize, EntryKind, TemplateSource};

/// Destination path to file content.
pub type RenderedFiles = BTreeMap<PathBuf, Vec<u8>>;

/// A file entry after directory expansion.
#[derive(Debug)]
struct PlannedFile {
    src: PathBuf,
    dest: String,
}

#[derive(Debug)]
enum Content {
    Render(TextTemplate),
    Copy,
}

#[derive(Debug)]
struct ParsedFile {
    src: PathBuf,
    dest_raw: String,
    dest: TextTemplate,
    content: Content,
}

/// Template renderer for producing output files.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    env: TemplateEnv,
    source: Arc<dyn TemplateSource>,
    config: EngineConfig,
}

impl TemplateRenderer {
    /// Create a renderer reading template files from `source`.
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        Self {
            env: TemplateEnv::new(),
            source,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a custom template function.
    pub fn add_func(&mut self, name: impl Into<String>, func: Func) {
        self.env.add_func(name, func);
    }

    pub fn env(&self) -> &TemplateEnv {
        &self.env
    }

    /// Render every file of a composed template.
    pub fn render_all(&self, template: &Template, ctx: &Context) -> TemplateResult<RenderedFiles> {
        let mut planned = Vec::new();
        for file in &template.files {
            self.plan(&file.src, &file.dest, &mut planned)?;
        }

        let parsed = planned
            .into_iter()
            .map(|file| self.parse(file))
            .collect::<TemplateResult<Vec<_>>>()?;

        let mut output = RenderedFiles::new();
        let mut origins: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
        for file in &parsed {
            let (dest, content) = self.render_parsed(template, file, ctx)?;
            if let Some(first) = origins.get(&dest) {
                match self.config.collision {
                    CollisionPolicy::Error => {
                        return Err(TemplateError::Collision {
                            dest,
                            first: first.clone(),
                            second: file.src.clone(),
                        });
                    }
                    CollisionPolicy::Overwrite => {
                        warn!(
                            "{:?} from {:?} overwrites output of {:?}",
                            dest, file.src, first
                        );
                    }
                }
            }
            origins.insert(dest.clone(), file.src.clone());
            output.insert(dest, content);
        }

        info!("Rendered template {}: {} files", template.name, output.len());
        Ok(output)
    }

    /// Render a template string.
    pub fn render_string(&self, name: &str, content: &str, ctx: &Context) -> TemplateResult<String> {
        let tmpl = self.env.parse(name, content).map_err(TemplateError::Syntax)?;
        tmpl.render(ctx)
            .map_err(|source| TemplateError::RenderExecution {
                path: name.to_string(),
                source,
            })
    }

    /// Render a destination path template.
    pub fn render_path(&self, dest: &str, ctx: &Context) -> TemplateResult<PathBuf> {
        let rendered = self.render_string(dest, dest, ctx)?;
        Ok(normalize(Path::new(&rendered)))
    }

    /// Render the content of a source file.
    pub fn render_file(&self, src: &Path, ctx: &Context) -> TemplateResult<String> {
        let content = self.read_text(src)?;
        self.render_string(&src.display().to_string(), &content, ctx)
    }

    /// Read a source file unmodified.
    pub fn copy(&self, src: &Path) -> TemplateResult<Vec<u8>> {
        self.source.read(src).map_err(|e| TemplateError::io(src, e))
    }

    fn plan(&self, src: &Path, dest: &str, out: &mut Vec<PlannedFile>) -> TemplateResult<()> {
        let kind = self
            .source
            .kind(src)
            .map_err(|e| TemplateError::io(src, e))?;
        match kind {
            EntryKind::File => out.push(PlannedFile {
                src: src.to_path_buf(),
                dest: dest.to_string(),
            }),
            EntryKind::Dir => {
                let names = self
                    .source
                    .read_dir(src)
                    .map_err(|e| TemplateError::io(src, e))?;
                for name in names {
                    let child_dest = format!("{}/{}", dest.trim_end_matches('/'), name);
                    self.plan(&src.join(&name), &child_dest, out)?;
                }
            }
        }
        Ok(())
    }

    fn parse(&self, file: PlannedFile) -> TemplateResult<ParsedFile> {
        let dest = self
            .env
            .parse(&file.dest, &file.dest)
            .map_err(TemplateError::Syntax)?;
        let content = if self.is_template_file(&file.src) {
            let text = self.read_text(&file.src)?;
            let tmpl = self
                .env
                .parse(&file.src.display().to_string(), &text)
                .map_err(TemplateError::Syntax)?;
            Content::Render(tmpl)
        } else {
            Content::Copy
        };
        Ok(ParsedFile {
            src: file.src,
            dest_raw: file.dest,
            dest,
            content,
        })
    }

    fn render_parsed(
        &self,
        template: &Template,
        file: &ParsedFile,
        ctx: &Context,
    ) -> TemplateResult<(PathBuf, Vec<u8>)> {
        let mut dest = file
            .dest
            .render(ctx)
            .map_err(|source| TemplateError::RenderExecution {
                path: file.dest_raw.clone(),
                source,
            })?;

        let content = match &file.content {
            Content::Render(tmpl) => {
                let suffix = self.config.template_suffix.as_str();
                if dest.ends_with(suffix) {
                    dest.truncate(dest.len() - suffix.len());
                }
                let rendered = tmpl
                    .render(ctx)
                    .map_err(|source| TemplateError::RenderExecution {
                        path: file.src.display().to_string(),
                        source,
                    })?;
                debug!("Rendered: {:?} -> {}", file.src, dest);
                rendered.into_bytes()
            }
            Content::Copy => {
                debug!("Copied: {:?} -> {}", file.src, dest);
                self.copy(&file.src)?
            }
        };

        let rendered = normalize(Path::new(&dest));
        if rendered.as_os_str().is_empty() {
            return Err(TemplateError::validation(
                &template.name,
                format!("destination '{}' rendered to an empty path", file.dest_raw),
            ));
        }
        let escapes = rendered
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(TemplateError::validation(
                &template.name,
                format!(
                    "destination '{}' rendered to {:?}, outside the output root",
                    file.dest_raw, rendered
                ),
            ));
        }
        Ok((rendered, content))
    }

    fn is_template_file(&self, src: &Path) -> bool {
        src.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(self.config.template_suffix.as_str()))
    }

    fn read_text(&self, src: &Path) -> TemplateResult<String> {
        let bytes = self.copy(src)?;
        String::from_utf8(bytes)
            .map_err(|e| TemplateError::io(src, io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}
