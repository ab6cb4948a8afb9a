//! Update admission pipeline
//!
//! [`before_update`] gives every resource type the same baseline treatment
//! on update, whatever its strategy. It runs [`UPDATE_STEPS`] in order over
//! an [`UpdatePass`]; each step can also be driven on its own.
//!
//! On success the incoming object is in its final canonical form and ready
//! for the strategy's commit. The pipeline performs no I/O and holds no
//! locks, so it is safe to run once per in-flight request concurrently.

use crate::context::RequestContext;
use crate::errors::StatusError;
use crate::namespace::{ensure_object_namespace_matches_request_namespace, expected_namespace_for_scope};
use crate::strategy::UpdateStrategy;
use crate::warning::add_warning;
use admit_meta::validation::{validate_object_meta, validate_object_meta_update};
use admit_meta::{AccessorError, ErrorList, FieldPath, GroupKind, Object, ObjectMeta};
use anyhow::anyhow;

/// A named step of the update pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateStep {
    /// Read the incoming object's metadata and kind
    ReadIncomingMeta,
    /// Resolve the expected namespace and check the object against it
    EnsureNamespace,
    /// Read the prior object's metadata
    ReadPriorMeta,
    /// Overwrite incoming generation with the prior one
    PinGeneration,
    /// Strategy normalization hook
    PrepareForUpdate,
    /// Restore system-owned and sticky fields from the prior object
    BackfillSystemFields,
    /// Common metadata validation
    ValidateCommonFields,
    /// Strategy validation hook
    ValidateStrategy,
    /// Reject if any error was collected
    RejectInvalid,
    /// Strategy warnings hook, forwarded to the request's sink
    EmitWarnings,
    /// Strategy canonicalization hook
    Canonicalize,
}

/// Steps in execution order
pub const UPDATE_STEPS: [UpdateStep; 11] = [
    UpdateStep::ReadIncomingMeta,
    UpdateStep::EnsureNamespace,
    UpdateStep::ReadPriorMeta,
    UpdateStep::PinGeneration,
    UpdateStep::PrepareForUpdate,
    UpdateStep::BackfillSystemFields,
    UpdateStep::ValidateCommonFields,
    UpdateStep::ValidateStrategy,
    UpdateStep::RejectInvalid,
    UpdateStep::EmitWarnings,
    UpdateStep::Canonicalize,
];

impl UpdateStep {
    /// Stable step name, used in logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadIncomingMeta => "read_incoming_meta",
            Self::EnsureNamespace => "ensure_namespace",
            Self::ReadPriorMeta => "read_prior_meta",
            Self::PinGeneration => "pin_generation",
            Self::PrepareForUpdate => "prepare_for_update",
            Self::BackfillSystemFields => "backfill_system_fields",
            Self::ValidateCommonFields => "validate_common_fields",
            Self::ValidateStrategy => "validate_strategy",
            Self::RejectInvalid => "reject_invalid",
            Self::EmitWarnings => "emit_warnings",
            Self::Canonicalize => "canonicalize",
        }
    }
}

fn incoming_meta<O: Object>(obj: &O) -> Result<&ObjectMeta, StatusError> {
    obj.meta().map_err(|e| accessor_fault(e, "new"))
}

fn incoming_meta_mut<O: Object>(obj: &mut O) -> Result<&mut ObjectMeta, StatusError> {
    obj.meta_mut().map_err(|e| accessor_fault(e, "new"))
}

fn prior_meta<O: Object>(obj: &O) -> Result<&ObjectMeta, StatusError> {
    obj.meta().map_err(|e| accessor_fault(e, "old"))
}

fn accessor_fault(err: AccessorError, which: &str) -> StatusError {
    StatusError::internal(anyhow::Error::new(err).context(format!("failed to get {which} object metadata")))
}

/// State of one pipeline run
///
/// Holds the objects under admission and the field errors collected so far.
#[derive(Debug)]
pub struct UpdatePass<'a, S: UpdateStrategy> {
    strategy: &'a S,
    ctx: &'a RequestContext,
    incoming: &'a mut S::Object,
    prior: &'a S::Object,
    kind: GroupKind,
    errors: ErrorList,
}

impl<'a, S: UpdateStrategy> UpdatePass<'a, S> {
    /// Start a pass over `incoming` against `prior`
    pub fn new(
        strategy: &'a S,
        ctx: &'a RequestContext,
        incoming: &'a mut S::Object,
        prior: &'a S::Object,
    ) -> Self {
        let kind = incoming.group_kind();
        Self {
            strategy,
            ctx,
            incoming,
            prior,
            kind,
            errors: ErrorList::new(),
        }
    }

    /// Field errors collected so far
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &ErrorList {
        &self.errors
    }

    /// Object under admission
    #[inline]
    #[must_use]
    pub fn incoming(&self) -> &S::Object {
        self.incoming
    }

    /// Execute a single step
    pub fn run(&mut self, step: UpdateStep) -> Result<(), StatusError> {
        tracing::trace!(step = step.name(), kind = %self.kind, "update step");
        match step {
            UpdateStep::ReadIncomingMeta => self.read_incoming_meta(),
            UpdateStep::EnsureNamespace => self.ensure_namespace(),
            UpdateStep::ReadPriorMeta => self.read_prior_meta(),
            UpdateStep::PinGeneration => self.pin_generation(),
            UpdateStep::PrepareForUpdate => {
                self.strategy.prepare_for_update(self.ctx, self.incoming, self.prior);
                Ok(())
            }
            UpdateStep::BackfillSystemFields => self.backfill_system_fields(),
            UpdateStep::ValidateCommonFields => self.validate_common_fields(),
            UpdateStep::ValidateStrategy => {
                let errs = self.strategy.validate_update(self.ctx, self.incoming, self.prior);
                self.errors.append(errs);
                Ok(())
            }
            UpdateStep::RejectInvalid => self.reject_invalid(),
            UpdateStep::EmitWarnings => {
                for warning in self.strategy.warnings_on_update(self.ctx, self.incoming, self.prior) {
                    add_warning(self.ctx, "", &warning);
                }
                Ok(())
            }
            UpdateStep::Canonicalize => {
                self.strategy.canonicalize(self.incoming);
                Ok(())
            }
        }
    }

    fn read_incoming_meta(&mut self) -> Result<(), StatusError> {
        incoming_meta(self.incoming)?;
        self.kind = self.incoming.group_kind();
        Ok(())
    }

    fn ensure_namespace(&mut self) -> Result<(), StatusError> {
        let request_namespace = self
            .ctx
            .namespace()
            .ok_or_else(|| StatusError::internal(anyhow!("no namespace information found in request context")))?;
        let expected = expected_namespace_for_scope(request_namespace, self.strategy.namespace_scoped());
        let meta = incoming_meta_mut(self.incoming)?;
        ensure_object_namespace_matches_request_namespace(expected, meta).map_err(|err| {
            tracing::debug!(kind = %self.kind, name = %meta.name, error = %err, "namespace conflict");
            err
        })
    }

    fn read_prior_meta(&mut self) -> Result<(), StatusError> {
        prior_meta(self.prior).map(|_| ())
    }

    fn pin_generation(&mut self) -> Result<(), StatusError> {
        let generation = prior_meta(self.prior)?.generation;
        incoming_meta_mut(self.incoming)?.generation = generation;
        Ok(())
    }

    fn backfill_system_fields(&mut self) -> Result<(), StatusError> {
        let old = prior_meta(self.prior)?;
        let meta = incoming_meta_mut(self.incoming)?;

        if meta.uid.is_empty() {
            meta.uid = old.uid.clone();
        }
        if old.creation_timestamp.is_some() {
            meta.creation_timestamp = old.creation_timestamp;
        }
        if old.deletion_timestamp.is_some() {
            meta.deletion_timestamp = old.deletion_timestamp;
        }
        if old.deletion_grace_period_seconds.is_some() && meta.deletion_grace_period_seconds.is_none() {
            meta.deletion_grace_period_seconds = old.deletion_grace_period_seconds;
        }
        Ok(())
    }

    fn validate_common_fields(&mut self) -> Result<(), StatusError> {
        let errs = validate_common_fields(self.strategy, self.incoming, self.prior)?;
        self.errors.append(errs);
        Ok(())
    }

    fn reject_invalid(&mut self) -> Result<(), StatusError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let name = incoming_meta(self.incoming)?.name.clone();
        let errors = std::mem::take(&mut self.errors);
        tracing::debug!(kind = %self.kind, name = %name, errors = errors.len(), "update rejected as invalid");
        Err(StatusError::invalid(self.kind.clone(), name, errors))
    }
}

/// Metadata checks every resource type gets on update
///
/// Failure to read metadata is a fault, not a field error.
pub fn validate_common_fields<S: UpdateStrategy>(
    strategy: &S,
    obj: &S::Object,
    old: &S::Object,
) -> Result<ErrorList, StatusError> {
    let meta = incoming_meta(obj)?;
    let old_meta = prior_meta(old)?;
    let path = FieldPath::new("metadata");

    let mut errs = validate_object_meta(meta, strategy.namespace_scoped(), strategy.name_validator(), &path);
    errs.append(validate_object_meta_update(meta, old_meta, &path));
    Ok(errs)
}

/// Admit an update of `prior` to `incoming`
///
/// Runs [`UPDATE_STEPS`] in order. On success `incoming` has been
/// normalized, validated and canonicalized. On error nothing further runs;
/// a retry must start again from a freshly fetched prior object, since
/// `incoming` may already have been mutated.
pub fn before_update<S: UpdateStrategy>(
    strategy: &S,
    ctx: &RequestContext,
    incoming: &mut S::Object,
    prior: &S::Object,
) -> Result<(), StatusError> {
    if ctx.is_cancelled() {
        return Err(StatusError::Cancelled);
    }

    let mut pass = UpdatePass::new(strategy, ctx, incoming, prior);
    for step in UPDATE_STEPS {
        pass.run(step)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_in_pipeline_order() {
        let names: Vec<&str> = UPDATE_STEPS.iter().map(UpdateStep::name).collect();
        assert_eq!(
            names,
            vec![
                "read_incoming_meta",
                "ensure_namespace",
                "read_prior_meta",
                "pin_generation",
                "prepare_for_update",
                "backfill_system_fields",
                "validate_common_fields",
                "validate_strategy",
                "reject_invalid",
                "emit_warnings",
                "canonicalize",
            ]
        );
    }

    #[test]
    fn validation_precedes_warnings_and_canonicalize() {
        let pos = |s: UpdateStep| UPDATE_STEPS.iter().position(|x| *x == s).unwrap();
        assert!(pos(UpdateStep::PinGeneration) < pos(UpdateStep::PrepareForUpdate));
        assert!(pos(UpdateStep::RejectInvalid) < pos(UpdateStep::EmitWarnings));
        assert!(pos(UpdateStep::EmitWarnings) < pos(UpdateStep::Canonicalize));
    }
}
