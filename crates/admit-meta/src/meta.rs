//! Object metadata envelope
//!
//! Provides [`ObjectMeta`], the identity and lifecycle envelope every
//! resource carries, plus the [`Time`] and [`Uid`] value types it uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Timestamp with second-level semantics
///
/// A missing timestamp is modelled as `Option<Time>::None`, which plays the
/// role of the zero time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(pub DateTime<Utc>);

impl Time {
    /// Current wall-clock time
    #[inline]
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Build from unix seconds; out-of-range values clamp to the epoch
    #[must_use]
    pub fn from_unix(secs: i64) -> Self {
        Self(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }

    /// Unix seconds
    #[inline]
    #[must_use]
    pub fn unix(&self) -> i64 {
        self.0.timestamp()
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

/// Unique identifier assigned by the system at creation
///
/// The empty string means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Wrap an existing identifier
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Fresh random identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Check if unset
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Uid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Metadata envelope shared by all resources
///
/// Fields fall into three classes:
/// - client-writable: `labels`, `annotations`, `finalizers`
/// - system-owned: `generation`, `uid`, `creation_timestamp`
/// - sticky once set: `deletion_timestamp`, `deletion_grace_period_seconds`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    /// Object name, unique within its namespace
    pub name: String,

    /// Prefix used to generate a name when `name` is empty
    #[serde(skip_serializing_if = "String::is_empty")]
    pub generate_name: String,

    /// Namespace; empty for cluster-scoped objects
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// System-assigned identifier
    #[serde(skip_serializing_if = "Uid::is_empty")]
    pub uid: Uid,

    /// Opaque optimistic-concurrency token
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_version: String,

    /// Count of meaningful spec changes, maintained by storage
    pub generation: i64,

    /// When the object was first persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<Time>,

    /// When graceful deletion was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<Time>,

    /// Grace period granted at deletion time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_grace_period_seconds: Option<i64>,

    /// Identifying key/value pairs
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Non-identifying key/value pairs
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Keys that must be cleared before the object is removed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
}

impl ObjectMeta {
    /// Metadata with just a namespace and name
    #[must_use]
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// With UID
    #[inline]
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<Uid>) -> Self {
        self.uid = uid.into();
        self
    }

    /// With resource version
    #[inline]
    #[must_use]
    pub fn with_resource_version(mut self, rv: impl Into<String>) -> Self {
        self.resource_version = rv.into();
        self
    }

    /// With generation
    #[inline]
    #[must_use]
    pub fn with_generation(mut self, generation: i64) -> Self {
        self.generation = generation;
        self
    }

    /// With creation timestamp
    #[inline]
    #[must_use]
    pub fn with_creation_timestamp(mut self, ts: Time) -> Self {
        self.creation_timestamp = Some(ts);
        self
    }

    /// With label
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Check if graceful deletion has been requested
    #[inline]
    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_empty_by_default() {
        assert!(Uid::default().is_empty());
        assert!(!Uid::generate().is_empty());
    }

    #[test]
    fn time_from_unix_roundtrips_seconds() {
        assert_eq!(Time::from_unix(1_700_000_000).unix(), 1_700_000_000);
    }

    #[test]
    fn builders_populate_fields() {
        let meta = ObjectMeta::named("ns", "obj")
            .with_uid("u1")
            .with_resource_version("7")
            .with_generation(3)
            .with_label("app", "web");

        assert_eq!(meta.namespace, "ns");
        assert_eq!(meta.uid.as_str(), "u1");
        assert_eq!(meta.resource_version, "7");
        assert_eq!(meta.generation, 3);
        assert_eq!(meta.labels.get("app").map(String::as_str), Some("web"));
        assert!(!meta.is_deleting());
    }

    #[test]
    fn serializes_camel_case_and_skips_empty() {
        let meta = ObjectMeta::named("ns", "obj").with_uid("u1");
        let json = serde_json::to_value(&meta).unwrap();

        assert_eq!(json["uid"], "u1");
        assert!(json.get("deletionTimestamp").is_none());
        assert!(json.get("generateName").is_none());
    }
}
