//! Testing utilities for the admit workspace
//!
//! Shared fixtures, an instrumented strategy and an in-memory backend.

#![allow(missing_docs)]

mod backend;
mod strategy;

pub use backend::MemoryBackend;
pub use strategy::{Hook, RecordingStrategy};

use admit_meta::{AccessorError, DynamicObject, GroupKind, Object, ObjectMeta, Time};
use std::sync::Once;

pub const WIDGET_API_VERSION: &str = "example.io/v1";
pub const WIDGET_KIND: &str = "Widget";

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Stored widget: uid `u1`, resource version `1`, created at t=1000
pub fn stored_widget(namespace: &str, name: &str) -> DynamicObject {
    let meta = ObjectMeta::named(namespace, name)
        .with_uid("u1")
        .with_resource_version("1")
        .with_generation(1)
        .with_creation_timestamp(Time::from_unix(1_000));
    DynamicObject::new(WIDGET_API_VERSION, WIDGET_KIND, meta)
        .with_data(serde_json::json!({ "spec": { "replicas": 1 } }))
}

/// Object whose metadata may be made unreadable
#[derive(Debug, Clone, PartialEq)]
pub struct SealedObject {
    pub inner: DynamicObject,
    pub readable: bool,
}

impl SealedObject {
    pub fn readable(inner: DynamicObject) -> Self {
        Self { inner, readable: true }
    }

    pub fn unreadable(inner: DynamicObject) -> Self {
        Self {
            inner,
            readable: false,
        }
    }
}

impl Object for SealedObject {
    fn group_kind(&self) -> GroupKind {
        self.inner.group_kind()
    }

    fn meta(&self) -> Result<&ObjectMeta, AccessorError> {
        if self.readable {
            Ok(&self.inner.metadata)
        } else {
            Err(AccessorError::NoMetadata(self.inner.types.kind.clone()))
        }
    }

    fn meta_mut(&mut self) -> Result<&mut ObjectMeta, AccessorError> {
        if self.readable {
            Ok(&mut self.inner.metadata)
        } else {
            Err(AccessorError::NoMetadata(self.inner.types.kind.clone()))
        }
    }
}
