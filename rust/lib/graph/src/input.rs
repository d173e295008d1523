//! Type coercion — editable input kinds inferred from declared column
//! types, and raw form values coerced back on save.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::TypeRegistry;

static BOOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(boolean|bool|tinyint)\b").unwrap());

static INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(int|integer|smallint|mediumint|bigint)\b").unwrap());

static ENUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*enum\s*\((.*)\)\s*$").unwrap());

/// One quoted literal inside `ENUM(...)`, single or double quoted.
static ENUM_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)""#).unwrap()
});

static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?\s*$").unwrap()
});

/// How a field is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    Bool,
    Int,
    Select,
    ToOne,
    ToMany,
    Text,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Bool => "bool",
            InputKind::Int => "int",
            InputKind::Select => "select",
            InputKind::ToOne => "to-one",
            InputKind::ToMany => "to-many",
            InputKind::Text => "text",
        }
    }
}

/// Editing descriptor for one field: `{"type", "default", "options"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDescriptor {
    #[serde(rename = "type")]
    pub kind: InputKind,

    #[serde(default)]
    pub default: Value,

    /// Finite choice set (value → label), `null` when free-form.
    #[serde(default)]
    pub options: Option<IndexMap<String, String>>,
}

impl InputDescriptor {
    pub fn new(kind: InputKind) -> Self {
        Self {
            kind,
            default: Value::String(String::new()),
            options: None,
        }
    }

    /// Options where every label equals its value.
    pub fn with_options<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(
            values
                .into_iter()
                .map(|v| {
                    let v = v.into();
                    (v.clone(), v)
                })
                .collect(),
        );
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }
}

/// Derive the input descriptor for `field` of type `ty` declared as `declared`.
///
/// Precedence: the type's `describe_field` hook, then boolean, integer,
/// enumeration, known record type, and finally free text. A value in the
/// type's own defaults map replaces the inferred default.
pub fn derive_input_descriptor(
    registry: &TypeRegistry,
    ty: &str,
    field: &str,
    declared: &str,
) -> InputDescriptor {
    if let Some(hooks) = registry.hooks_for(ty) {
        if let Some(descriptor) = hooks.describe_field(registry, field) {
            return descriptor;
        }
    }

    let declared = declared.trim();
    let mut descriptor = if BOOL_RE.is_match(declared) {
        InputDescriptor::new(InputKind::Bool)
    } else if INT_RE.is_match(declared) {
        InputDescriptor::new(InputKind::Int)
    } else if let Some(caps) = ENUM_RE.captures(declared) {
        let values = enum_values(&caps[1]);
        let first = values.first().cloned().unwrap_or_default();
        InputDescriptor::new(InputKind::Select)
            .with_options(values)
            .with_default(Value::String(first))
    } else if registry.contains(declared) {
        let is_to_one = registry
            .def(ty)
            .map(|d| d.has_one.contains_key(field))
            .unwrap_or(false);
        let kind = if is_to_one {
            InputKind::ToOne
        } else {
            InputKind::ToMany
        };
        InputDescriptor::new(kind).with_options(registry.subclasses_of(declared))
    } else {
        InputDescriptor::new(InputKind::Text)
    };

    if let Some(default) = registry.def(ty).and_then(|d| d.defaults.get(field)) {
        descriptor.default = default.clone();
    }
    descriptor
}

/// Literal values of an enumeration body, in declared order.
fn enum_values(body: &str) -> Vec<String> {
    ENUM_VALUE_RE
        .captures_iter(body)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| unescape(m.as_str()))
        .collect()
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// True for decimal number literals: optional sign, fraction and exponent,
/// surrounding whitespace allowed.
pub fn is_numeric(s: &str) -> bool {
    NUMERIC_RE.is_match(s)
}

/// Coerce a submitted scalar before it is written.
///
/// `"true"`/`"false"` (any case) become `1`/`0`, numeric strings become
/// integers (fractions truncate toward zero), everything else passes through.
pub fn coerce_scalar(value: Value) -> Value {
    match value {
        Value::String(s) => coerce_str(s),
        Value::Bool(b) => Value::from(b as i64),
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(|f| Value::from(f.trunc() as i64))
            .unwrap_or(Value::Number(n)),
        other => other,
    }
}

fn coerce_str(s: String) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::from(1);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::from(0);
    }
    if is_numeric(&s) {
        let trimmed = s.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::from(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Value::from(f.trunc() as i64);
        }
    }
    Value::String(s)
}
