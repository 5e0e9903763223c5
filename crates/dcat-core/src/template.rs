//! Path-based template interpolation.
//!
//! Templates are JSON trees whose strings may embed `{{path}}` placeholders.
//! A placeholder can chain alternatives with `||` (the first one that
//! resolves wins, the last one may be a literal) and can name a transform
//! with `{{path:transformName}}`.
//!
//! ```
//! use dcat_core::template::{interpolate, Transforms};
//! use serde_json::json;
//!
//! let template = json!({ "title": "{{metadata.title||name}}", "kind": "Dataset {{type}}" });
//! let data = json!({ "name": "Trails", "type": "Feature Layer" });
//!
//! let filled = interpolate(&template, &data, &Transforms::new()).unwrap();
//! assert_eq!(filled, json!({ "title": "Trails", "kind": "Dataset Feature Layer" }));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{is_truthy, lookup_path};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+?)\}\}").expect("placeholder pattern is valid"));

/// Errors raised while filling a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A placeholder names a transform that is not registered.
    #[error("Attempted to apply non-existent transform {name} on {key}")]
    UnknownTransform { name: String, key: String },

    /// A registered transform rejected its input.
    #[error("Transform {name} failed on {key}: {message}")]
    TransformFailed {
        name: String,
        key: String,
        message: String,
    },
}

/// A named transform: receives the template key and the resolved value.
pub type TransformFn = Arc<dyn Fn(&str, Value) -> Result<Value, String> + Send + Sync>;

/// Table of transforms available to placeholders.
#[derive(Clone, Default)]
pub struct Transforms {
    table: HashMap<String, TransformFn>,
}

impl Transforms {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table holding the built-in `toISO` and `toArray` transforms.
    pub fn with_defaults() -> Self {
        let mut transforms = Self::new();
        transforms.register("toISO", to_iso).register("toArray", to_array);
        transforms
    }

    /// Registers (or replaces) a transform under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, transform: F) -> &mut Self
    where
        F: Fn(&str, Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.table.insert(name.into(), Arc::new(transform));
        self
    }

    pub fn get(&self, name: &str) -> Option<&TransformFn> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }
}

impl fmt::Debug for Transforms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.table.keys().collect();
        names.sort();
        f.debug_struct("Transforms").field("names", &names).finish()
    }
}

/// Returns true if `value` still contains a `{{...}}` placeholder.
pub fn is_unresolved(value: &str) -> bool {
    PLACEHOLDER.is_match(value)
}

/// Fills every placeholder in `template` from `data`.
///
/// A string that is exactly one placeholder is replaced by the resolved value
/// with its JSON type intact. Placeholders embedded in longer strings are
/// substituted as text. Placeholders that resolve to nothing are left as-is.
///
/// # Errors
///
/// Returns `TemplateError::UnknownTransform` when a placeholder names a
/// transform missing from `transforms`, and `TemplateError::TransformFailed`
/// when a transform rejects its value.
pub fn interpolate(
    template: &Value,
    data: &Value,
    transforms: &Transforms,
) -> Result<Value, TemplateError> {
    fill(template, "", data, transforms)
}

/// Lists every record path referenced by the template's placeholders.
///
/// Each `||` alternative is listed and transform suffixes are stripped. Paths
/// appear once, in the order first seen.
pub fn list_dependencies(template: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_dependencies(template, &mut paths);
    paths
}

fn collect_dependencies(node: &Value, paths: &mut Vec<String>) {
    match node {
        Value::String(s) => {
            for caps in PLACEHOLDER.captures_iter(s) {
                for alternative in caps[1].split("||") {
                    let (path, _) = split_transform(alternative.trim());
                    if !path.is_empty() && !paths.iter().any(|p| p == path) {
                        paths.push(path.to_string());
                    }
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_dependencies(item, paths)),
        Value::Object(map) => map.values().for_each(|v| collect_dependencies(v, paths)),
        _ => {}
    }
}

fn fill(
    node: &Value,
    key: &str,
    data: &Value,
    transforms: &Transforms,
) -> Result<Value, TemplateError> {
    match node {
        Value::String(s) => fill_string(s, key, data, transforms),
        Value::Array(items) => items
            .iter()
            .map(|item| fill(item, key, data, transforms))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut filled = Map::with_capacity(map.len());
            for (k, v) in map {
                filled.insert(k.clone(), fill(v, k, data, transforms)?);
            }
            Ok(Value::Object(filled))
        }
        other => Ok(other.clone()),
    }
}

fn fill_string(
    s: &str,
    key: &str,
    data: &Value,
    transforms: &Transforms,
) -> Result<Value, TemplateError> {
    let Some(first) = PLACEHOLDER.captures(s) else {
        return Ok(Value::String(s.to_string()));
    };

    if first[0].len() == s.len() {
        let resolved = resolve(&first[1], key, data, transforms)?;
        return Ok(resolved.unwrap_or_else(|| Value::String(s.to_string())));
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(s) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&s[last..whole.start()]);
        match resolve(&caps[1], key, data, transforms)? {
            Some(Value::String(text)) => out.push_str(&text),
            Some(other) => out.push_str(&other.to_string()),
            None => out.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    out.push_str(&s[last..]);
    Ok(Value::String(out))
}

/// Resolves one placeholder expression. `Ok(None)` means nothing matched.
fn resolve(
    expression: &str,
    key: &str,
    data: &Value,
    transforms: &Transforms,
) -> Result<Option<Value>, TemplateError> {
    let alternatives: Vec<&str> = expression.split("||").map(str::trim).collect();
    let last = alternatives.len().saturating_sub(1);

    for (i, alternative) in alternatives.iter().enumerate() {
        let (path, transform_name) = split_transform(alternative);
        let transform = match transform_name {
            Some(name) => Some(transforms.get(name).ok_or_else(|| {
                TemplateError::UnknownTransform {
                    name: name.to_string(),
                    key: key.to_string(),
                }
            })?),
            None => None,
        };

        if let Some(value) = lookup_path(data, path).filter(|v| is_present(v)) {
            return match (transform, transform_name) {
                (Some(apply), Some(name)) => (**apply)(key, value.clone()).map(Some).map_err(|message| {
                    TemplateError::TransformFailed {
                        name: name.to_string(),
                        key: key.to_string(),
                        message,
                    }
                }),
                _ => Ok(Some(value.clone())),
            };
        }

        if i == last && i > 0 {
            return Ok(Some(Value::String((*alternative).to_string())));
        }
    }

    Ok(None)
}

/// Splits `path:transform`. The suffix only counts as a transform when it is
/// an identifier, so literals such as URLs keep their colons.
fn split_transform(alternative: &str) -> (&str, Option<&str>) {
    match alternative.split_once(':') {
        Some((path, name)) if is_identifier(name) => (path.trim(), Some(name)),
        _ => (alternative, None),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Built-in `toISO`: parses epoch milliseconds, RFC 3339 or `YYYY-MM-DD` and
/// emits an ISO-8601 UTC timestamp with millisecond precision. Epoch
/// milliseconds must be JSON numbers; a digit-only string is not a date.
pub fn to_iso(_key: &str, value: Value) -> Result<Value, String> {
    let parsed = match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => parse_date(s),
        _ => None,
    };

    parsed
        .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
        .ok_or_else(|| format!("Invalid time value: {}", value))
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}

/// Built-in `toArray`: falsy values become `[]`, arrays pass through and
/// anything else is wrapped in a one-element array.
pub fn to_array(_key: &str, value: Value) -> Result<Value, String> {
    Ok(match value {
        v if !is_truthy(&v) => Value::Array(Vec::new()),
        Value::Array(items) => Value::Array(items),
        other => Value::Array(vec![other]),
    })
}
