//! Update strategy contract
//!
//! Provides the [`UpdateStrategy`] trait a resource type implements to
//! declare its scoping, mutability and validation rules, and to commit
//! admitted objects to its backing store.

use crate::context::RequestContext;
use crate::errors::StatusError;
use admit_meta::validation::{validate_path_segment_name, ValidateNameFn};
use admit_meta::{ErrorList, NamespacedName, Object};
use async_trait::async_trait;

/// Per-resource-type update policy
///
/// Implementations are registered once and shared across concurrent
/// requests, so they must not keep per-request state outside the
/// [`RequestContext`].
///
/// # Hook order
/// `prepare_for_update` → `validate_update` → `warnings_on_update` →
/// `canonicalize`, all driven by [`crate::before_update`]. `update` or
/// `invoke_update` is called by the store afterwards.
#[async_trait]
pub trait UpdateStrategy: std::fmt::Debug + Send + Sync {
    /// Object type this strategy governs
    type Object: Object + Clone + 'static;

    /// Whether objects live inside a namespace
    fn namespace_scoped(&self) -> bool;

    /// Whether an update of a missing object may become a create
    fn allow_create_on_update(&self) -> bool;

    /// Whether an update without a resource version is accepted
    fn allow_unconditional_update(&self) -> bool;

    /// Setup hook run before any mutation; an error aborts the update
    fn begin_update(&self, _ctx: &RequestContext) -> Result<(), StatusError> {
        Ok(())
    }

    /// Normalize `obj` before validation
    ///
    /// May strip non-persisted fields, sort order-insensitive lists or
    /// apply defaults. Must not remove a field whose absence would itself be
    /// a validation error.
    fn prepare_for_update(&self, ctx: &RequestContext, obj: &mut Self::Object, old: &Self::Object);

    /// Validate the update; must not mutate, returns every error found
    fn validate_update(&self, ctx: &RequestContext, obj: &Self::Object, old: &Self::Object) -> ErrorList;

    /// Advisory warnings, evaluated only after validation passed
    ///
    /// Messages about a field should read `path.to.field: message`.
    fn warnings_on_update(&self, ctx: &RequestContext, obj: &Self::Object, old: &Self::Object) -> Vec<String>;

    /// Rewrite `obj` into canonical form; runs only on valid objects
    fn canonicalize(&self, obj: &mut Self::Object);

    /// Validator applied to `metadata.name` and `metadata.generateName`
    fn name_validator(&self) -> ValidateNameFn {
        validate_path_segment_name
    }

    /// Commit the admitted object to the backing store
    ///
    /// The only hook allowed to perform I/O, and the only one that can
    /// report store conflicts such as a stale resource version.
    async fn update(
        &self,
        ctx: &RequestContext,
        key: &NamespacedName,
        obj: Self::Object,
        old: &Self::Object,
        dry_run: bool,
    ) -> Result<Self::Object, StatusError>;

    /// Indirect commit for stores that re-enter the update path
    ///
    /// Returns the persisted object and an optional side-effect object.
    /// Nested calls must go through [`RecursionGuard::enter`].
    async fn invoke_update(
        &self,
        _ctx: &RequestContext,
        _obj: Self::Object,
        _old: &Self::Object,
        _recursion: RecursionGuard,
    ) -> Result<(Self::Object, Option<Self::Object>), StatusError> {
        Err(StatusError::MethodNotSupported("indirect update".to_string()))
    }
}

/// Depth budget for [`UpdateStrategy::invoke_update`] re-entry
///
/// A fresh guard sits at depth 0. Each nested commit calls [`enter`],
/// which fails once `max_depth` nested levels are in use. A max depth of 1
/// allows exactly one re-entry.
///
/// [`enter`]: RecursionGuard::enter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursionGuard {
    depth: u32,
    max_depth: u32,
}

impl RecursionGuard {
    /// Guard at depth 0
    #[inline]
    #[must_use]
    pub fn new(max_depth: u32) -> Self {
        Self { depth: 0, max_depth }
    }

    /// Current depth
    #[inline]
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// True when called from within another commit
    #[inline]
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.depth > 0
    }

    /// Guard for one level deeper
    pub fn enter(&self) -> Result<Self, StatusError> {
        if self.depth >= self.max_depth {
            return Err(StatusError::RecursionLimit { depth: self.depth });
        }
        Ok(Self {
            depth: self.depth + 1,
            max_depth: self.max_depth,
        })
    }
}

impl Default for RecursionGuard {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Extra validation layered onto a strategy
pub trait UpdateValidator<O>: std::fmt::Debug + Send + Sync {
    /// Validate the update; must not mutate
    fn validate(&self, ctx: &RequestContext, obj: &O, old: &O) -> ErrorList;
}

/// Strategy that appends a validator's errors to an inner strategy's
///
/// Everything else is delegated unchanged.
#[derive(Debug)]
pub struct ValidatingStrategy<S, V> {
    inner: S,
    validator: V,
}

impl<S, V> ValidatingStrategy<S, V> {
    /// Wrap `inner` with `validator`
    #[inline]
    #[must_use]
    pub fn new(inner: S, validator: V) -> Self {
        Self { inner, validator }
    }

    /// Inner strategy
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S, V> UpdateStrategy for ValidatingStrategy<S, V>
where
    S: UpdateStrategy,
    V: UpdateValidator<S::Object>,
{
    type Object = S::Object;

    fn namespace_scoped(&self) -> bool {
        self.inner.namespace_scoped()
    }

    fn allow_create_on_update(&self) -> bool {
        self.inner.allow_create_on_update()
    }

    fn allow_unconditional_update(&self) -> bool {
        self.inner.allow_unconditional_update()
    }

    fn begin_update(&self, ctx: &RequestContext) -> Result<(), StatusError> {
        self.inner.begin_update(ctx)
    }

    fn prepare_for_update(&self, ctx: &RequestContext, obj: &mut Self::Object, old: &Self::Object) {
        self.inner.prepare_for_update(ctx, obj, old);
    }

    fn validate_update(&self, ctx: &RequestContext, obj: &Self::Object, old: &Self::Object) -> ErrorList {
        let mut errs = self.inner.validate_update(ctx, obj, old);
        errs.append(self.validator.validate(ctx, obj, old));
        errs
    }

    fn warnings_on_update(&self, ctx: &RequestContext, obj: &Self::Object, old: &Self::Object) -> Vec<String> {
        self.inner.warnings_on_update(ctx, obj, old)
    }

    fn canonicalize(&self, obj: &mut Self::Object) {
        self.inner.canonicalize(obj);
    }

    fn name_validator(&self) -> ValidateNameFn {
        self.inner.name_validator()
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        key: &NamespacedName,
        obj: Self::Object,
        old: &Self::Object,
        dry_run: bool,
    ) -> Result<Self::Object, StatusError> {
        self.inner.update(ctx, key, obj, old, dry_run).await
    }

    async fn invoke_update(
        &self,
        ctx: &RequestContext,
        obj: Self::Object,
        old: &Self::Object,
        recursion: RecursionGuard,
    ) -> Result<(Self::Object, Option<Self::Object>), StatusError> {
        self.inner.invoke_update(ctx, obj, old, recursion).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_allows_single_reentry_by_default() {
        let guard = RecursionGuard::default();
        assert!(!guard.is_nested());

        let nested = guard.enter().unwrap();
        assert_eq!(nested.depth(), 1);
        assert!(nested.is_nested());

        let err = nested.enter().unwrap_err();
        assert!(matches!(err, StatusError::RecursionLimit { depth: 1 }));
    }

    #[test]
    fn guard_with_zero_depth_refuses_any_reentry() {
        assert!(RecursionGuard::new(0).enter().is_err());
    }

    #[test]
    fn guard_with_deeper_budget() {
        let guard = RecursionGuard::new(3);
        let depth3 = guard.enter().and_then(|g| g.enter()).and_then(|g| g.enter()).unwrap();
        assert_eq!(depth3.depth(), 3);
        assert!(depth3.enter().is_err());
    }
}
