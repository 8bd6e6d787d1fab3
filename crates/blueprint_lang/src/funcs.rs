//! Template function library.
//!
//! Functions take their subject as the last argument so they compose in
//! pipelines: `{{ .name | replace "-" "_" | toUpper }}`. The comparison and
//! logic functions (`eq`, `ne`, `not`, `and`, `or`, `len`) come with the
//! template engine itself.

use std::collections::BTreeMap;
use std::fmt;

use gtmpl::FuncError;
use heck::{ToKebabCase, ToLowerCamelCase, ToPascalCase, ToSnakeCase};

use crate::value::{self, FuncValue, Value};

/// Signature shared by builtin and custom functions.
pub type Func = fn(&[FuncValue]) -> Result<FuncValue, FuncError>;

type FuncResult = Result<FuncValue, FuncError>;

/// Named functions available to templates.
#[derive(Clone, Default)]
pub struct FuncRegistry {
    funcs: BTreeMap<String, Func>,
}

impl fmt::Debug for FuncRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncRegistry")
            .field("funcs", &self.funcs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FuncRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the standard function library.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        // Strings
        registry.register("toLower", to_lower);
        registry.register("toUpper", to_upper);
        registry.register("title", title);
        registry.register("trim", trim);
        registry.register("trimLeft", trim_left);
        registry.register("trimRight", trim_right);
        registry.register("replace", replace);
        registry.register("contains", contains);
        registry.register("hasPrefix", has_prefix);
        registry.register("hasSuffix", has_suffix);
        registry.register("split", split);
        registry.register("join", join);

        // Case conversion
        registry.register("snakeCase", snake_case);
        registry.register("camelCase", camel_case);
        registry.register("pascalCase", pascal_case);
        registry.register("kebabCase", kebab_case);

        // Paths
        registry.register("base", path_base);
        registry.register("dir", path_dir);
        registry.register("ext", path_ext);
        registry.register("joinPath", join_path_func);

        // Conversions
        registry.register("toString", to_string);
        registry.register("toInt", to_int);
        registry.register("toBool", to_bool);

        // Emptiness
        registry.register("default", default_or);
        registry.register("empty", empty);
        registry.register("coalesce", coalesce);

        registry
    }

    /// Register (or replace) a function.
    pub fn register(&mut self, name: impl Into<String>, func: Func) {
        self.funcs.insert(name.into(), func);
    }

    pub fn get(&self, name: &str) -> Option<Func> {
        self.funcs.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Func)> + '_ {
        self.funcs.iter().map(|(name, func)| (name.as_str(), *func))
    }
}

fn failure(name: &str, message: impl fmt::Display) -> FuncError {
    FuncError::Generic(format!("error calling {}: {}", name, message))
}

fn arity(name: &str, want: &str, got: usize) -> FuncError {
    FuncError::Generic(format!(
        "wrong number of args for {}: want {}, got {}",
        name, want, got
    ))
}

/// Strings pass through, nil is the empty string, anything else is a type error.
fn string_arg(name: &str, arg: &FuncValue) -> Result<String, FuncError> {
    match Value::from_func_value(arg) {
        Some(Value::String(s)) => Ok(s),
        None => Ok(String::new()),
        Some(other) => Err(FuncError::Generic(format!(
            "wrong type for value in {}; expected string; got {}",
            name,
            other.kind()
        ))),
    }
}

fn one_arg<'a>(name: &str, args: &'a [FuncValue]) -> Result<&'a FuncValue, FuncError> {
    match args {
        [arg] => Ok(arg),
        _ => Err(arity(name, "1", args.len())),
    }
}

fn string_fn(name: &str, args: &[FuncValue], f: impl FnOnce(&str) -> String) -> FuncResult {
    let s = string_arg(name, one_arg(name, args)?)?;
    Ok(FuncValue::String(f(&s)))
}

fn two_strings(name: &str, args: &[FuncValue]) -> Result<(String, String), FuncError> {
    match args {
        [a, b] => Ok((string_arg(name, a)?, string_arg(name, b)?)),
        _ => Err(arity(name, "2", args.len())),
    }
}

fn or_nil(value: Option<Value>) -> FuncValue {
    value.map_or(FuncValue::NoValue, Value::into_func_value)
}

fn to_lower(args: &[FuncValue]) -> FuncResult {
    string_fn("toLower", args, |s| s.to_lowercase())
}

fn to_upper(args: &[FuncValue]) -> FuncResult {
    string_fn("toUpper", args, |s| s.to_uppercase())
}

fn title(args: &[FuncValue]) -> FuncResult {
    string_fn("title", args, title_case)
}

fn trim(args: &[FuncValue]) -> FuncResult {
    string_fn("trim", args, |s| s.trim().to_string())
}

fn trim_left(args: &[FuncValue]) -> FuncResult {
    let (cutset, s) = two_strings("trimLeft", args)?;
    Ok(FuncValue::String(
        s.trim_start_matches(|c: char| cutset.contains(c)).to_string(),
    ))
}

fn trim_right(args: &[FuncValue]) -> FuncResult {
    let (cutset, s) = two_strings("trimRight", args)?;
    Ok(FuncValue::String(
        s.trim_end_matches(|c: char| cutset.contains(c)).to_string(),
    ))
}

fn replace(args: &[FuncValue]) -> FuncResult {
    match args {
        [old, new, s] => {
            let old = string_arg("replace", old)?;
            let new = string_arg("replace", new)?;
            let s = string_arg("replace", s)?;
            Ok(FuncValue::String(s.replace(&old, &new)))
        }
        _ => Err(arity("replace", "3", args.len())),
    }
}

fn contains(args: &[FuncValue]) -> FuncResult {
    let (sub, s) = two_strings("contains", args)?;
    Ok(FuncValue::Bool(s.contains(&sub)))
}

fn has_prefix(args: &[FuncValue]) -> FuncResult {
    let (prefix, s) = two_strings("hasPrefix", args)?;
    Ok(FuncValue::Bool(s.starts_with(&prefix)))
}

fn has_suffix(args: &[FuncValue]) -> FuncResult {
    let (suffix, s) = two_strings("hasSuffix", args)?;
    Ok(FuncValue::Bool(s.ends_with(&suffix)))
}

fn split(args: &[FuncValue]) -> FuncResult {
    let (sep, s) = two_strings("split", args)?;
    let parts: Vec<String> = s.split(&sep).map(String::from).collect();
    Ok(Value::List(parts).into_func_value())
}

fn join(args: &[FuncValue]) -> FuncResult {
    let [sep, list] = args else {
        return Err(arity("join", "2", args.len()));
    };
    let sep = string_arg("join", sep)?;
    match Value::from_func_value(list) {
        Some(Value::List(items)) => Ok(FuncValue::String(items.join(&sep))),
        None => Ok(FuncValue::String(String::new())),
        Some(other) => Err(FuncError::Generic(format!(
            "wrong type for value in join; expected list; got {}",
            other.kind()
        ))),
    }
}

fn snake_case(args: &[FuncValue]) -> FuncResult {
    string_fn("snakeCase", args, |s| s.to_snake_case())
}

fn camel_case(args: &[FuncValue]) -> FuncResult {
    string_fn("camelCase", args, |s| s.to_lower_camel_case())
}

fn pascal_case(args: &[FuncValue]) -> FuncResult {
    string_fn("pascalCase", args, |s| s.to_pascal_case())
}

fn kebab_case(args: &[FuncValue]) -> FuncResult {
    string_fn("kebabCase", args, |s| s.to_kebab_case())
}

fn path_base(args: &[FuncValue]) -> FuncResult {
    string_fn("base", args, base)
}

fn path_dir(args: &[FuncValue]) -> FuncResult {
    string_fn("dir", args, dir)
}

fn path_ext(args: &[FuncValue]) -> FuncResult {
    string_fn("ext", args, ext)
}

fn join_path_func(args: &[FuncValue]) -> FuncResult {
    let parts = args
        .iter()
        .map(|a| string_arg("joinPath", a))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FuncValue::String(join_path(&parts)))
}

fn to_string(args: &[FuncValue]) -> FuncResult {
    let arg = Value::from_func_value(one_arg("toString", args)?);
    Ok(FuncValue::String(value::to_string(arg.as_ref())))
}

fn to_int(args: &[FuncValue]) -> FuncResult {
    let arg = Value::from_func_value(one_arg("toInt", args)?);
    value::to_int(arg.as_ref())
        .map(FuncValue::from)
        .map_err(|e| failure("toInt", e))
}

fn to_bool(args: &[FuncValue]) -> FuncResult {
    let arg = Value::from_func_value(one_arg("toBool", args)?);
    Ok(FuncValue::Bool(value::to_bool(arg.as_ref())))
}

fn default_or(args: &[FuncValue]) -> FuncResult {
    let [fallback, value] = args else {
        return Err(arity("default", "2", args.len()));
    };
    Ok(or_nil(value::default_value(
        Value::from_func_value(fallback),
        Value::from_func_value(value),
    )))
}

fn empty(args: &[FuncValue]) -> FuncResult {
    let arg = Value::from_func_value(one_arg("empty", args)?);
    Ok(FuncValue::Bool(value::is_empty(arg.as_ref())))
}

fn coalesce(args: &[FuncValue]) -> FuncResult {
    if args.is_empty() {
        return Err(arity("coalesce", "at least 1", 0));
    }
    Ok(or_nil(value::coalesce(
        args.iter().map(Value::from_func_value),
    )))
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    out
}

fn base(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
}

fn dir(path: &str) -> String {
    match path.rfind('/') {
        None => ".".to_string(),
        Some(0) => "/".to_string(),
        Some(i) => clean_path(&path[..i]),
    }
}

fn ext(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rfind('.')
        .map(|i| name[i..].to_string())
        .unwrap_or_default()
}

fn join_path(parts: &[String]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        String::new()
    } else {
        clean_path(&joined)
    }
}

/// Lexical path cleaning: collapse separators, drop `.`, resolve `..`.
fn clean_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let body = parts.join("/");
    match (absolute, body.is_empty()) {
        (true, _) => format!("/{}", body),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}
