//! Admit REST
//!
//! Update admission for versioned, multi-tenant resources.
//!
//! # Core Concepts
//!
//! - [`UpdateStrategy`]: Per-resource-type policy (scope, hooks, validation, commit)
//! - [`before_update`]: The ordered admission pipeline every update goes through
//! - [`RequestContext`]: Ambient per-request namespace, warnings and cancellation
//! - [`StatusError`]: Fault / conflict / invalid taxonomy returned to callers
//!
//! # Example
//!
//! ```rust,ignore
//! use admit_rest::{before_update, RequestContext};
//!
//! let ctx = RequestContext::new().with_namespace("default");
//! let mut incoming = client_object;
//! before_update(&strategy, &ctx, &mut incoming, &stored_object)?;
//! let persisted = strategy.update(&ctx, &key, incoming, &stored_object, false).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod context;
pub mod errors;
pub mod namespace;
pub mod strategy;
pub mod update;
pub mod warning;

pub use context::RequestContext;
pub use errors::{StatusError, StatusReason};
pub use namespace::{ensure_object_namespace_matches_request_namespace, expected_namespace_for_scope};
pub use strategy::{RecursionGuard, UpdateStrategy, UpdateValidator, ValidatingStrategy};
pub use update::{before_update, validate_common_fields, UpdatePass, UpdateStep, UPDATE_STEPS};
pub use warning::{add_warning, NoopWarningSink, Warning, WarningLimits, WarningRecorder, WarningSink};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for implementing strategies
    pub use crate::{
        before_update, RecursionGuard, RequestContext, StatusError, UpdateStrategy,
    };
    pub use admit_meta::{ErrorList, FieldError, FieldPath, NamespacedName, Object, ObjectMeta};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
