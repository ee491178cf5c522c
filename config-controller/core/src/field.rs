//! Field-pathed validation errors.
//!
//! Errors render the same way the Kubernetes API server renders them, so
//! messages surfaced through admission read like any other invalid-object
//! rejection, e.g.:
//!
//! ```text
//! serviceintentions.consul.hashicorp.com "foo" is invalid: spec.sources[0].action: Invalid value: "fail": must be one of "allow", "deny"
//! ```

use crate::GROUP;
use serde::Serialize;
use std::fmt;

/// The path of a field within a resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Path(String);

/// The rejected value carried by a [`FieldError`].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Str(String),
    /// A number already formatted in its shortest form.
    Number(String),
    Bool(bool),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Required,
    Invalid,
    Forbidden,
    Duplicate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    pub kind: ErrorKind,
    pub field: Path,
    pub value: Value,
    pub detail: String,
}

/// An ordered collection of field errors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorList(Vec<FieldError>);

/// A resource failed validation.
#[derive(Clone, Debug, PartialEq)]
pub struct Invalid {
    /// The lower-case kind, e.g. `servicedefaults`.
    pub kind: String,
    pub name: String,
    pub errors: ErrorList,
}

/// Formats `s` as a double-quoted, escaped string.
pub fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("{s:?}"))
}

/// The detail used when a value is not one of an enumerated set.
pub fn not_in_slice_message(allowed: &[&str]) -> String {
    format!(r#"must be one of "{}""#, allowed.join(r#"", ""#))
}

// === impl Path ===

impl Path {
    pub fn new(root: impl Into<String>) -> Self {
        Self(root.into())
    }

    pub fn spec() -> Self {
        Self::new("spec")
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            return Self::new(name);
        }
        Self(format!("{}.{}", self.0, name))
    }

    #[must_use]
    pub fn index(&self, i: usize) -> Self {
        Self(format!("{}[{}]", self.0, i))
    }

    #[must_use]
    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}[{}]", self.0, key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// === impl Value ===

impl Value {
    /// Renders a structured value as compact JSON of its resource shape.
    pub fn repr<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => Self::Str(json),
            Err(_) => Self::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Str(s) => f.write_str(&quote(s)),
            Self::Number(n) => f.write_str(n),
            Self::Bool(b) => fmt::Display::fmt(b, f),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::Str(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! number_value {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Self::Number(n.to_string())
                }
            }
        )+
    };
}

number_value!(i32, i64, u16, u32, u64, usize, f32, f64);

// === impl ErrorKind ===

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Required => "Required value",
            Self::Invalid => "Invalid value",
            Self::Forbidden => "Forbidden",
            Self::Duplicate => "Duplicate value",
        })
    }
}

impl ErrorKind {
    /// The cause type the API server reports for this kind of error.
    pub fn reason(self) -> &'static str {
        match self {
            Self::Required => "FieldValueRequired",
            Self::Invalid => "FieldValueInvalid",
            Self::Forbidden => "FieldValueForbidden",
            Self::Duplicate => "FieldValueDuplicate",
        }
    }
}

// === impl FieldError ===

impl FieldError {
    pub fn required(field: Path, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Required,
            field,
            value: Value::Str(String::new()),
            detail: detail.into(),
        }
    }

    pub fn invalid(field: Path, value: impl Into<Value>, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Invalid,
            field,
            value: value.into(),
            detail: detail.into(),
        }
    }

    pub fn forbidden(field: Path, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Forbidden,
            field,
            value: Value::Str(String::new()),
            detail: detail.into(),
        }
    }

    pub fn duplicate(field: Path, value: impl Into<Value>) -> Self {
        Self {
            kind: ErrorKind::Duplicate,
            field,
            value: value.into(),
            detail: String::new(),
        }
    }

    /// The message without its field path, e.g.
    /// `Invalid value: "fail": must be one of "allow", "deny"`.
    pub fn body(&self) -> String {
        let mut body = self.kind.to_string();
        // Required and forbidden fields never echo a value.
        if !matches!(self.kind, ErrorKind::Required | ErrorKind::Forbidden) {
            body.push_str(": ");
            body.push_str(&self.value.to_string());
        }
        if !self.detail.is_empty() {
            body.push_str(": ");
            body.push_str(&self.detail);
        }
        body
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.body())
    }
}

impl std::error::Error for FieldError {}

// === impl ErrorList ===

impl ErrorList {
    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// Fails with an [`Invalid`] error naming the resource when any errors
    /// were collected.
    pub fn into_result(self, kind: &str, name: &str) -> Result<(), Invalid> {
        if self.is_empty() {
            return Ok(());
        }
        Err(Invalid {
            kind: kind.to_string(),
            name: name.to_string(),
            errors: self,
        })
    }
}

impl Extend<FieldError> for ErrorList {
    fn extend<I: IntoIterator<Item = FieldError>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl FromIterator<FieldError> for ErrorList {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ErrorList {
    /// A single error renders bare; several render as a bracketed list with
    /// repeated messages collapsed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            return fmt::Display::fmt(&self.0[0], f);
        }

        let mut seen = ahash::AHashSet::new();
        let msgs = self
            .0
            .iter()
            .map(ToString::to_string)
            .filter(|msg| seen.insert(msg.clone()))
            .collect::<Vec<_>>();
        if msgs.len() == 1 {
            return f.write_str(&msgs[0]);
        }
        write!(f, "[{}]", msgs.join(", "))
    }
}

// === impl Invalid ===

impl Invalid {
    /// The individual violations, one per field error.
    pub fn causes(&self) -> Vec<&FieldError> {
        self.errors.iter().collect()
    }
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} {} is invalid: {}",
            self.kind,
            GROUP,
            quote(&self.name),
            self.errors
        )
    }
}

impl std::error::Error for Invalid {}
