//! Parsed templates and the environment that compiles them.

use std::fmt;

use crate::context::Context;
use crate::error::{LangError, LangResult};
use crate::funcs::{Func, FuncRegistry};

/// A parsed template, ready to render any number of times.
pub struct TextTemplate {
    name: String,
    inner: gtmpl::Template,
}

impl fmt::Debug for TextTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextTemplate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TextTemplate {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute the template against `ctx`.
    pub fn render(&self, ctx: &Context) -> LangResult<String> {
        self.inner
            .render(&ctx.to_exec_context())
            .map_err(|e| LangError::Exec {
                name: self.name.clone(),
                message: e.to_string(),
            })
    }
}

/// Function registry plus compilation entry points.
///
/// Functions must be registered before the templates that call them are
/// parsed.
#[derive(Debug, Clone)]
pub struct TemplateEnv {
    funcs: FuncRegistry,
}

impl Default for TemplateEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEnv {
    /// Environment with the standard function library.
    pub fn new() -> Self {
        Self::with_funcs(FuncRegistry::builtin())
    }

    pub fn with_funcs(funcs: FuncRegistry) -> Self {
        Self { funcs }
    }

    pub fn funcs(&self) -> &FuncRegistry {
        &self.funcs
    }

    /// Register a custom function. Already-parsed templates keep the
    /// functions they were parsed with.
    pub fn add_func(&mut self, name: impl Into<String>, func: Func) {
        self.funcs.register(name, func);
    }

    /// Parse `source`; `name` identifies it in error messages.
    pub fn parse(&self, name: &str, source: &str) -> LangResult<TextTemplate> {
        let mut inner = gtmpl::Template::default();
        for (func_name, func) in self.funcs.iter() {
            inner.add_func(func_name, func);
        }
        inner.parse(source).map_err(|e| LangError::Parse {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        Ok(TextTemplate {
            name: name.to_string(),
            inner,
        })
    }

    /// Parse and render in one step.
    pub fn render_str(&self, name: &str, source: &str, ctx: &Context) -> LangResult<String> {
        self.parse(name, source)?.render(ctx)
    }
}
