//! # blueprint_templates
//!
//! Template loading, composition and rendering for blueprint.
//!
//! Templates are declared in `template.yaml` files and may include other
//! templates. The engine:
//!
//! - loads and validates a definition from a [`TemplateSource`]
//! - composes it with its includes, detecting cycles and merging variables,
//!   dependencies, files and post-init commands
//! - renders destination paths and `.tmpl` file contents with a
//!   [`Context`], copying other files unchanged
//!
//! ## Example
//!
//! ```rust,no_run
//! use blueprint_templates::{Context, TemplateEngine};
//!
//! let engine = TemplateEngine::from_dir("templates");
//! let ctx = Context::new().with("project_name", "my-api");
//! let files = engine.process("projects/go-api", &ctx).unwrap();
//! for (path, content) in &files {
//!     println!("{} ({} bytes)", path.display(), content.len());
//! }
//! ```

pub mod composer;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod model;
pub mod renderer;
pub mod resolver;
pub mod source;

pub use blueprint_lang::{Context, Func, FuncError, FuncValue, Value};
pub use composer::{merge_dependencies, Composer, LoadTemplate};
pub use config::{CollisionPolicy, EngineConfig};
pub use engine::{failed_stage, TemplateEngine};
pub use error::{Stage, TemplateError, TemplateResult};
pub use loader::TemplateLoader;
pub use manifest::TemplateManifest;
pub use model::{
    Dependency, Include, PostInit, Role, Template, TemplateFile, TemplateType, Variable,
    VariableType,
};
pub use renderer::{RenderedFiles, TemplateRenderer};
pub use resolver::{ChainResolver, ResolvedTemplate, Resolver, SourceResolver, TemplateRef};
pub use source::{DirSource, EntryKind, MemorySource, TemplateSource};
