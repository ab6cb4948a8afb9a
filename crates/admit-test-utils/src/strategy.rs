//! Strategy recording every hook invocation

use crate::backend::MemoryBackend;
use admit_meta::{ErrorList, FieldError, NamespacedName, Object};
use admit_rest::{RecursionGuard, RequestContext, StatusError, UpdateStrategy};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Strategy hooks, as recorded by [`RecordingStrategy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    BeginUpdate,
    PrepareForUpdate,
    ValidateUpdate,
    WarningsOnUpdate,
    Canonicalize,
    Update,
    InvokeUpdate,
}

type PrepareFn<O> = fn(&mut O, &O);
type CanonicalizeFn<O> = fn(&mut O);

/// Configurable strategy that logs hook calls in order
pub struct RecordingStrategy<O> {
    namespace_scoped: bool,
    allow_create_on_update: bool,
    allow_unconditional_update: bool,
    fail_begin: bool,
    validation_errors: Vec<FieldError>,
    warnings: Vec<String>,
    prepare: Option<PrepareFn<O>>,
    canonicalize: Option<CanonicalizeFn<O>>,
    backend: Option<Arc<MemoryBackend<O>>>,
    cascade_depth: u32,
    calls: Mutex<Vec<Hook>>,
    prepared_generation: Mutex<Option<i64>>,
}

impl<O> std::fmt::Debug for RecordingStrategy<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingStrategy")
            .field("namespace_scoped", &self.namespace_scoped)
            .field("validation_errors", &self.validation_errors.len())
            .field("warnings", &self.warnings)
            .field("calls", &*self.calls.lock())
            .finish_non_exhaustive()
    }
}

impl<O> RecordingStrategy<O> {
    fn build(namespace_scoped: bool) -> Self {
        Self {
            namespace_scoped,
            allow_create_on_update: false,
            allow_unconditional_update: false,
            fail_begin: false,
            validation_errors: Vec::new(),
            warnings: Vec::new(),
            prepare: None,
            canonicalize: None,
            backend: None,
            cascade_depth: 0,
            calls: Mutex::new(Vec::new()),
            prepared_generation: Mutex::new(None),
        }
    }

    pub fn namespaced() -> Self {
        Self::build(true)
    }

    pub fn cluster_scoped() -> Self {
        Self::build(false)
    }

    pub fn with_validation_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.validation_errors = errors;
        self
    }

    pub fn with_warnings(mut self, warnings: &[&str]) -> Self {
        self.warnings = warnings.iter().map(ToString::to_string).collect();
        self
    }

    pub fn with_prepare(mut self, prepare: PrepareFn<O>) -> Self {
        self.prepare = Some(prepare);
        self
    }

    pub fn with_canonicalize(mut self, canonicalize: CanonicalizeFn<O>) -> Self {
        self.canonicalize = Some(canonicalize);
        self
    }

    pub fn with_backend(mut self, backend: Arc<MemoryBackend<O>>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Number of nested `invoke_update` re-entries to attempt before committing
    pub fn with_cascade_depth(mut self, depth: u32) -> Self {
        self.cascade_depth = depth;
        self
    }

    pub fn allowing_unconditional_update(mut self) -> Self {
        self.allow_unconditional_update = true;
        self
    }

    pub fn allowing_create_on_update(mut self) -> Self {
        self.allow_create_on_update = true;
        self
    }

    pub fn failing_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }

    /// Hooks called so far, in order
    pub fn calls(&self) -> Vec<Hook> {
        self.calls.lock().clone()
    }

    /// Number of calls to `hook`
    pub fn count(&self, hook: Hook) -> usize {
        self.calls.lock().iter().filter(|h| **h == hook).count()
    }

    /// Generation the incoming object carried when `prepare_for_update` ran
    pub fn prepared_generation(&self) -> Option<i64> {
        *self.prepared_generation.lock()
    }

    fn record(&self, hook: Hook) {
        self.calls.lock().push(hook);
    }
}

#[async_trait]
impl<O> UpdateStrategy for RecordingStrategy<O>
where
    O: Object + Clone + 'static,
{
    type Object = O;

    fn namespace_scoped(&self) -> bool {
        self.namespace_scoped
    }

    fn allow_create_on_update(&self) -> bool {
        self.allow_create_on_update
    }

    fn allow_unconditional_update(&self) -> bool {
        self.allow_unconditional_update
    }

    fn begin_update(&self, _ctx: &RequestContext) -> Result<(), StatusError> {
        self.record(Hook::BeginUpdate);
        if self.fail_begin {
            return Err(StatusError::MethodNotSupported("update disabled".to_string()));
        }
        Ok(())
    }

    fn prepare_for_update(&self, _ctx: &RequestContext, obj: &mut O, old: &O) {
        self.record(Hook::PrepareForUpdate);
        *self.prepared_generation.lock() = obj.meta().ok().map(|m| m.generation);
        if let Some(prepare) = self.prepare {
            prepare(obj, old);
        }
    }

    fn validate_update(&self, _ctx: &RequestContext, _obj: &O, _old: &O) -> ErrorList {
        self.record(Hook::ValidateUpdate);
        self.validation_errors.iter().cloned().collect()
    }

    fn warnings_on_update(&self, _ctx: &RequestContext, _obj: &O, _old: &O) -> Vec<String> {
        self.record(Hook::WarningsOnUpdate);
        self.warnings.clone()
    }

    fn canonicalize(&self, obj: &mut O) {
        self.record(Hook::Canonicalize);
        if let Some(canonicalize) = self.canonicalize {
            canonicalize(obj);
        }
    }

    async fn update(
        &self,
        _ctx: &RequestContext,
        key: &NamespacedName,
        obj: O,
        _old: &O,
        dry_run: bool,
    ) -> Result<O, StatusError> {
        self.record(Hook::Update);
        match &self.backend {
            Some(backend) => backend.update(key, obj, dry_run),
            None => Ok(obj),
        }
    }

    async fn invoke_update(
        &self,
        ctx: &RequestContext,
        obj: O,
        old: &O,
        recursion: RecursionGuard,
    ) -> Result<(O, Option<O>), StatusError> {
        self.record(Hook::InvokeUpdate);
        if recursion.depth() < self.cascade_depth {
            let nested = recursion.enter()?;
            return self.invoke_update(ctx, obj, old, nested).await;
        }

        let key = NamespacedName::of(obj.meta().map_err(StatusError::internal)?);
        let persisted = self.update(ctx, &key, obj, old, false).await?;
        Ok((persisted, Some(old.clone())))
    }
}
