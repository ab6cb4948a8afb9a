//! Admit Registry
//!
//! Generic front-end placing a resource's strategies behind one entry point.
//!
//! # Core Concepts
//!
//! - [`Store`]: Update (begin hook, preconditions, admission, commit) and watch
//! - [`WatchStrategy`]: Backend subscription primitive
//! - [`WatchHandle`]: Cancellable event subscription
//! - [`StoreConfig`]: Store tunables, loadable from TOML
//!
//! # Example
//!
//! ```rust,ignore
//! use admit_registry::{ListOptions, Store, UpdateOptions};
//!
//! let store = Store::new(resource, Arc::new(strategy), Arc::new(backend));
//! let (ctx, warnings) = store.request_context("default");
//! let persisted = store.update(&ctx, &key, incoming, Some(prior), UpdateOptions::default()).await?;
//!
//! let mut events = store.watch(&ctx, &ListOptions::default()).await?;
//! while let Some(event) = events.next().await { /* ... */ }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod store;
pub mod watch;

pub use config::{ConfigError, StoreConfig};
pub use store::{Store, UpdateOptions};
pub use watch::{ListOptions, Stopper, WatchEvent, WatchHandle, WatchSender, WatchStrategy};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
