//! Field paths and field-qualified error lists
//!
//! Provides [`FieldPath`] for addressing fields within an object and
//! [`ErrorList`], the ordered collection of [`FieldError`]s returned by
//! validation. An empty list means admissible.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Segment of a field path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Named child field
    Field(String),
    /// List index
    Index(usize),
    /// Map key
    Key(String),
}

/// Path to a field within an object
///
/// # Examples
/// - `metadata.name`
/// - `spec.containers[0].image`
/// - `metadata.labels[app]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// Root path with a first field
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self(vec![PathSegment::Field(root.into())])
    }

    /// Empty path
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Append a field, returning new path
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(PathSegment::Field(name.into()));
        new
    }

    /// Append a list index, returning new path
    #[must_use]
    pub fn index(&self, i: usize) -> Self {
        let mut new = self.clone();
        new.0.push(PathSegment::Index(i));
        new
    }

    /// Append a map key, returning new path
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(PathSegment::Key(key.into()));
        new
    }

    /// Path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Check if root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => f.write_str(name)?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
                PathSegment::Key(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

/// Category of a field error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    /// Required field is missing
    Required,
    /// Value does not satisfy a syntax or semantic rule
    Invalid,
    /// Field may not be set or changed
    Forbidden,
    /// Value collides with another entry
    Duplicate,
    /// Value is not one of the supported values
    NotSupported,
    /// Value exceeds a length limit
    TooLong,
    /// Validation itself failed
    Internal,
}

impl ErrorType {
    /// Human-readable description
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "Required value",
            Self::Invalid => "Invalid value",
            Self::Forbidden => "Forbidden",
            Self::Duplicate => "Duplicate value",
            Self::NotSupported => "Unsupported value",
            Self::TooLong => "Too long",
            Self::Internal => "Internal error",
        }
    }
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single field-qualified validation failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Error category
    pub error_type: ErrorType,
    /// Offending field
    pub field: FieldPath,
    /// Offending value, if it is meaningful to echo back
    pub bad_value: Option<serde_json::Value>,
    /// Extra explanation
    pub detail: String,
}

impl FieldError {
    fn build(
        error_type: ErrorType,
        field: &FieldPath,
        bad_value: Option<serde_json::Value>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            error_type,
            field: field.clone(),
            bad_value,
            detail: detail.into(),
        }
    }

    /// Required field missing
    #[must_use]
    pub fn required(field: &FieldPath, detail: impl Into<String>) -> Self {
        Self::build(ErrorType::Required, field, None, detail)
    }

    /// Invalid value
    #[must_use]
    pub fn invalid(field: &FieldPath, value: impl Serialize, detail: impl Into<String>) -> Self {
        Self::build(ErrorType::Invalid, field, serde_json::to_value(value).ok(), detail)
    }

    /// Field may not be set
    #[must_use]
    pub fn forbidden(field: &FieldPath, detail: impl Into<String>) -> Self {
        Self::build(ErrorType::Forbidden, field, None, detail)
    }

    /// Duplicate value
    #[must_use]
    pub fn duplicate(field: &FieldPath, value: impl Serialize) -> Self {
        Self::build(ErrorType::Duplicate, field, serde_json::to_value(value).ok(), "")
    }

    /// Value outside the supported set
    #[must_use]
    pub fn not_supported(field: &FieldPath, value: impl Serialize, supported: &[&str]) -> Self {
        let detail = if supported.is_empty() {
            String::new()
        } else {
            format!("supported values: {}", supported.join(", "))
        };
        Self::build(ErrorType::NotSupported, field, serde_json::to_value(value).ok(), detail)
    }

    /// Value too long
    #[must_use]
    pub fn too_long(field: &FieldPath, max_len: usize) -> Self {
        Self::build(
            ErrorType::TooLong,
            field,
            None,
            format!("must have at most {max_len} bytes"),
        )
    }

    /// Validation could not complete
    #[must_use]
    pub fn internal(field: &FieldPath, detail: impl Into<String>) -> Self {
        Self::build(ErrorType::Internal, field, None, detail)
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.error_type)?;
        if let Some(value) = &self.bad_value {
            write!(f, ": {value}")?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Ordered list of field errors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorList(Vec<FieldError>);

impl ErrorList {
    /// Create empty list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append one error
    #[inline]
    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// Append all errors of another list, keeping order
    #[inline]
    pub fn append(&mut self, mut other: ErrorList) {
        self.0.append(&mut other.0);
    }

    /// Number of errors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if admissible
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in order
    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// Borrow as slice
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[FieldError] {
        &self.0
    }
}

impl Display for ErrorList {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => Ok(()),
            [single] => write!(f, "{single}"),
            many => {
                f.write_str("[")?;
                for (i, err) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{err}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<Vec<FieldError>> for ErrorList {
    fn from(value: Vec<FieldError>) -> Self {
        Self(value)
    }
}

impl FromIterator<FieldError> for ErrorList {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<FieldError> for ErrorList {
    fn extend<I: IntoIterator<Item = FieldError>>(&mut self, iter: I) {
        self.0.extend(iter);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_display() {
        let path = FieldPath::new("spec").child("containers").index(0).child("image");
        assert_eq!(path.to_string(), "spec.containers[0].image");

        let labels = FieldPath::new("metadata").child("labels").key("app");
        assert_eq!(labels.to_string(), "metadata.labels[app]");
    }

    #[test]
    fn root_path_is_empty() {
        assert!(FieldPath::root().is_empty());
        assert_eq!(FieldPath::root().to_string(), "");
    }

    #[test]
    fn error_display_includes_value_and_detail() {
        let err = FieldError::invalid(&FieldPath::new("metadata").child("name"), "a/b", "may not contain '/'");
        assert_eq!(
            err.to_string(),
            "metadata.name: Invalid value: \"a/b\": may not contain '/'"
        );
    }

    #[test]
    fn list_preserves_order_on_append() {
        let path = FieldPath::new("spec");
        let mut first = ErrorList::new();
        first.push(FieldError::required(&path.child("a"), ""));

        let second: ErrorList = vec![
            FieldError::forbidden(&path.child("b"), ""),
            FieldError::forbidden(&path.child("c"), ""),
        ]
        .into();

        first.append(second);
        let fields: Vec<String> = first.iter().map(|e| e.field.to_string()).collect();
        assert_eq!(fields, vec!["spec.a", "spec.b", "spec.c"]);
    }

    #[test]
    fn list_display_brackets_multiple() {
        let path = FieldPath::new("x");
        let list: ErrorList = vec![
            FieldError::required(&path, ""),
            FieldError::forbidden(&path, ""),
        ]
        .into_iter()
        .collect();

        assert_eq!(list.to_string(), "[x: Required value, x: Forbidden]");
    }
}
