//! Generic store front-end
//!
//! [`Store`] binds a resource's update and watch strategies to a qualified
//! resource name. Updates go through the strategy's begin hook, the
//! resource-version precondition and the admission pipeline before the
//! strategy commits. Watches are forwarded unchanged.

use crate::config::StoreConfig;
use crate::watch::{ListOptions, WatchHandle, WatchStrategy};
use admit_meta::{AccessorError, GroupResource, NamespacedName, Object};
use admit_rest::{before_update, RecursionGuard, RequestContext, StatusError, UpdateStrategy, WarningRecorder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;

/// Options of a single update call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateOptions {
    /// Validate and simulate without a durable write
    pub dry_run: bool,
}

impl UpdateOptions {
    /// Options for a dry run
    #[inline]
    #[must_use]
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

/// Front-end for one resource collection
#[derive(Debug)]
pub struct Store<S, W> {
    qualified_resource: GroupResource,
    update_strategy: Arc<S>,
    watch_strategy: Arc<W>,
    config: StoreConfig,
}

impl<S, W> Store<S, W> {
    /// Create store with default configuration
    #[must_use]
    pub fn new(qualified_resource: GroupResource, update_strategy: Arc<S>, watch_strategy: Arc<W>) -> Self {
        Self {
            qualified_resource,
            update_strategy,
            watch_strategy,
            config: StoreConfig::default(),
        }
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Resource this store serves
    #[inline]
    #[must_use]
    pub fn qualified_resource(&self) -> &GroupResource {
        &self.qualified_resource
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Update strategy
    #[inline]
    #[must_use]
    pub fn update_strategy(&self) -> &S {
        &self.update_strategy
    }

    /// Fresh request context recording warnings under this store's limits
    #[must_use]
    pub fn request_context(&self, namespace: impl Into<String>) -> (RequestContext, Arc<WarningRecorder>) {
        let recorder = Arc::new(WarningRecorder::with_limits(self.config.warnings));
        let ctx = RequestContext::new()
            .with_namespace(namespace)
            .with_warning_sink(recorder.clone());
        (ctx, recorder)
    }
}

impl<S: UpdateStrategy, W> Store<S, W> {
    /// Admit and commit an update
    ///
    /// `prior` is the last durably observed object, `None` if it does not
    /// exist. Store conflicts from the commit are returned as-is; retrying
    /// means re-fetching `prior` and calling this again with the client's
    /// original object.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        key: &NamespacedName,
        mut incoming: S::Object,
        prior: Option<S::Object>,
        options: UpdateOptions,
    ) -> Result<S::Object, StatusError> {
        let Some(prior) = prior else {
            return Err(self.missing(key));
        };
        self.admit(ctx, &mut incoming, &prior)?;

        tracing::debug!(
            resource = %self.qualified_resource,
            key = %key,
            dry_run = options.dry_run,
            request_id = %ctx.request_id(),
            "committing update"
        );
        self.update_strategy
            .update(ctx, key, incoming, &prior, options.dry_run)
            .await
    }

    /// Admit an update and commit it through the strategy's indirect path
    ///
    /// The strategy receives a fresh [`RecursionGuard`] bounded by
    /// `max_update_recursion`.
    pub async fn invoke_update(
        &self,
        ctx: &RequestContext,
        mut incoming: S::Object,
        prior: &S::Object,
    ) -> Result<(S::Object, Option<S::Object>), StatusError> {
        self.admit(ctx, &mut incoming, prior)?;

        tracing::debug!(
            resource = %self.qualified_resource,
            max_depth = self.config.max_update_recursion,
            request_id = %ctx.request_id(),
            "invoking indirect update"
        );
        let guard = RecursionGuard::new(self.config.max_update_recursion);
        self.update_strategy.invoke_update(ctx, incoming, prior, guard).await
    }

    fn admit(&self, ctx: &RequestContext, incoming: &mut S::Object, prior: &S::Object) -> Result<(), StatusError> {
        if ctx.is_cancelled() {
            return Err(StatusError::Cancelled);
        }
        self.update_strategy.begin_update(ctx)?;
        self.ensure_resource_version(incoming, prior)?;
        before_update(self.update_strategy.as_ref(), ctx, incoming, prior)
    }

    fn ensure_resource_version(&self, incoming: &mut S::Object, prior: &S::Object) -> Result<(), StatusError> {
        let meta = incoming.meta_mut().map_err(accessor_fault)?;
        if !meta.resource_version.is_empty() {
            return Ok(());
        }
        if !self.update_strategy.allow_unconditional_update() {
            return Err(StatusError::BadRequest(format!(
                "{} {:?}: resourceVersion must be specified for an update",
                self.qualified_resource, meta.name
            )));
        }
        meta.resource_version = prior.meta().map_err(accessor_fault)?.resource_version.clone();
        Ok(())
    }

    fn missing(&self, key: &NamespacedName) -> StatusError {
        if self.update_strategy.allow_create_on_update() {
            StatusError::MethodNotSupported(format!("create on update of {}", self.qualified_resource))
        } else {
            StatusError::not_found(self.qualified_resource.clone(), key.name.clone())
        }
    }
}

impl<S, W: WatchStrategy> Store<S, W> {
    /// Open a watch on the backing store
    ///
    /// Pure delegation, wrapped in a span and a single log line.
    pub async fn watch(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<WatchHandle<W::Object>, StatusError> {
        let span = tracing::info_span!(
            "watch",
            resource = %self.qualified_resource,
            request_id = %ctx.request_id(),
        );
        async {
            tracing::info!(?options, "watch");
            self.watch_strategy.watch(ctx, options).await
        }
        .instrument(span)
        .await
    }
}

fn accessor_fault(err: AccessorError) -> StatusError {
    StatusError::internal(err)
}
