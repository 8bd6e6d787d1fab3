//! # blueprint_lang
//!
//! The text template language used by blueprint templates, built on
//! [`gtmpl`]'s Go text/template implementation.
//!
//! Templates mix literal text with `{{ … }}` actions:
//!
//! - `{{ .name }}` prints a context variable, `{{ $.name }}` always reads
//!   from the top-level context
//! - `{{ .name | snakeCase | toUpper }}` pipes a value through functions,
//!   the piped value becoming the last argument
//! - `{{ if … }}`, `{{ else }}`, `{{ range … }}`, `{{ with … }}` and
//!   `{{ end }}` control output
//! - `{{- … -}}` trims surrounding whitespace, `{{/* … */}}` is a comment
//!
//! Missing variables evaluate to no value: they are false in conditions and
//! empty for `default`, `empty` and `coalesce`.
//!
//! ## Example
//!
//! ```rust
//! use blueprint_lang::{Context, TemplateEnv};
//!
//! let env = TemplateEnv::new();
//! let ctx = Context::new().with("pkg", "myapp");
//! let out = env.render_str("path", "{{ .pkg }}/main.go", &ctx).unwrap();
//! assert_eq!(out, "myapp/main.go");
//! ```

pub mod context;
pub mod error;
pub mod funcs;
pub mod template;
pub mod value;

pub use context::Context;
pub use error::{LangError, LangResult, ValueError};
pub use funcs::{Func, FuncRegistry};
pub use gtmpl::FuncError;
pub use template::{TemplateEnv, TextTemplate};
pub use value::{FuncValue, Value};
