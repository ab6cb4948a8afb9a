//! Resource objects and metadata accessors
//!
//! Provides the [`Object`] trait through which generic code reaches an
//! object's [`ObjectMeta`], and [`DynamicObject`] as a payload-agnostic
//! implementation.

use crate::meta::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Group/kind pair identifying a resource type
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKind {
    /// API group; empty for the core group
    pub group: String,
    /// Kind name
    pub kind: String,
}

impl GroupKind {
    /// Create new group/kind
    #[inline]
    #[must_use]
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
        }
    }
}

impl Display for GroupKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            f.write_str(&self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

/// Group/resource pair naming a collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupResource {
    /// API group; empty for the core group
    pub group: String,
    /// Plural resource name
    pub resource: String,
}

impl GroupResource {
    /// Create new group/resource
    #[inline]
    #[must_use]
    pub fn new(group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            resource: resource.into(),
        }
    }
}

impl Display for GroupResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            f.write_str(&self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

/// Storage key of a single object
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespacedName {
    /// Namespace; empty for cluster-scoped objects
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl NamespacedName {
    /// Create new key
    #[inline]
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an object's metadata
    #[inline]
    #[must_use]
    pub fn of(meta: &ObjectMeta) -> Self {
        Self::new(meta.namespace.clone(), meta.name.clone())
    }
}

impl Display for NamespacedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// Failure to reach an object's metadata
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessorError {
    /// Object type carries no metadata envelope
    #[error("object of kind {0} does not carry metadata")]
    NoMetadata(String),

    /// Metadata exists but cannot be interpreted
    #[error("malformed metadata: {0}")]
    Malformed(String),
}

/// A versioned resource with a metadata envelope
///
/// Accessors return `Result` so that generic code can tell "this object has
/// no usable metadata" apart from "the metadata is empty".
pub trait Object: fmt::Debug + Send + Sync {
    /// Group and kind of this object
    fn group_kind(&self) -> GroupKind;

    /// Borrow metadata
    fn meta(&self) -> Result<&ObjectMeta, AccessorError>;

    /// Borrow metadata mutably
    fn meta_mut(&mut self) -> Result<&mut ObjectMeta, AccessorError>;
}

/// API version and kind carried on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    /// `group/version`, or `version` for the core group
    pub api_version: String,
    /// Kind name
    pub kind: String,
}

impl TypeMeta {
    /// Group part of the API version
    #[must_use]
    pub fn group(&self) -> &str {
        match self.api_version.split_once('/') {
            Some((group, _)) => group,
            None => "",
        }
    }
}

/// Object with an untyped JSON payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicObject {
    /// Type information
    #[serde(flatten)]
    pub types: TypeMeta,

    /// Metadata envelope
    pub metadata: ObjectMeta,

    /// Everything else
    #[serde(flatten)]
    pub data: serde_json::Value,
}

impl DynamicObject {
    /// Create new object of the given type
    #[must_use]
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, metadata: ObjectMeta) -> Self {
        Self {
            types: TypeMeta {
                api_version: api_version.into(),
                kind: kind.into(),
            },
            metadata,
            data: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// With payload
    #[inline]
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

impl Object for DynamicObject {
    fn group_kind(&self) -> GroupKind {
        GroupKind::new(self.types.group(), self.types.kind.clone())
    }

    fn meta(&self) -> Result<&ObjectMeta, AccessorError> {
        Ok(&self.metadata)
    }

    fn meta_mut(&mut self) -> Result<&mut ObjectMeta, AccessorError> {
        Ok(&mut self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn group_kind_display() {
        assert_eq!(GroupKind::new("", "Pod").to_string(), "Pod");
        assert_eq!(GroupKind::new("apps", "Deployment").to_string(), "Deployment.apps");
    }

    #[test]
    fn namespaced_name_display() {
        assert_eq!(NamespacedName::new("ns", "a").to_string(), "ns/a");
        assert_eq!(NamespacedName::new("", "node-1").to_string(), "node-1");
    }

    #[test]
    fn dynamic_object_group_from_api_version() {
        let obj = DynamicObject::new("apps/v1", "Deployment", ObjectMeta::named("ns", "web"));
        assert_eq!(obj.group_kind(), GroupKind::new("apps", "Deployment"));

        let core = DynamicObject::new("v1", "ConfigMap", ObjectMeta::default());
        assert_eq!(core.group_kind().group, "");
    }

    #[test]
    fn dynamic_object_deserializes_payload() {
        let obj: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": "cfg", "namespace": "ns", "generation": 2 },
            "data": { "k": "v" }
        }))
        .unwrap();

        assert_eq!(obj.metadata.name, "cfg");
        assert_eq!(obj.metadata.generation, 2);
        assert_eq!(obj.data["data"]["k"], "v");
    }
}
