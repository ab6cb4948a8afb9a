//! Admit Meta
//!
//! Data model shared by the admission pipeline and storage front-ends.
//!
//! # Core Concepts
//!
//! - [`ObjectMeta`]: Identity and lifecycle envelope of every resource
//! - [`Object`]: Accessor trait through which generic code reads and writes metadata
//! - [`ErrorList`]: Ordered, field-path-qualified validation failures
//! - [`validation`]: Common metadata checks applied to all resource types
//!
//! # Example
//!
//! ```rust,ignore
//! use admit_meta::{validation, FieldPath, ObjectMeta};
//!
//! let meta = ObjectMeta::named("default", "web");
//! let errs = validation::validate_object_meta(
//!     &meta,
//!     true,
//!     validation::validate_path_segment_name,
//!     &FieldPath::new("metadata"),
//! );
//! assert!(errs.is_empty());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod field;
mod meta;
mod object;
pub mod validation;

pub use field::{ErrorList, ErrorType, FieldError, FieldPath, PathSegment};
pub use meta::{ObjectMeta, Time, Uid};
pub use object::{
    AccessorError, DynamicObject, GroupKind, GroupResource, NamespacedName, Object, TypeMeta,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
