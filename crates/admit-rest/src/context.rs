//! Ambient request context
//!
//! One [`RequestContext`] is built per inbound request and passed by
//! reference through every hook. It carries the resolved target namespace,
//! the warning sink and the cancellation signal; nothing here is shared
//! across requests.

use crate::warning::{NoopWarningSink, WarningSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Per-request state threaded through the update path
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    namespace: Option<String>,
    warnings: Arc<dyn WarningSink>,
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Create context with no namespace information
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            namespace: None,
            warnings: Arc::new(NoopWarningSink),
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// With resolved request namespace; empty for cluster-wide requests
    #[inline]
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// With warning sink
    #[inline]
    #[must_use]
    pub fn with_warning_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.warnings = sink;
        self
    }

    /// With deadline after which the context counts as cancelled
    #[inline]
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Request identifier, for log correlation
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Namespace resolved for this request, if any was resolved at all
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Sink receiving this request's warnings
    #[inline]
    #[must_use]
    pub fn warning_sink(&self) -> &dyn WarningSink {
        self.warnings.as_ref()
    }

    /// Cancel the request; clones observe it too
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check cancellation flag and deadline
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn namespace_absent_until_set() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.namespace(), None);

        let ctx = ctx.with_namespace("ns-a");
        assert_eq!(ctx.namespace(), Some("ns-a"));
    }

    #[test]
    fn cancel_is_shared_with_clones() {
        let ctx = RequestContext::new();
        let clone = ctx.clone();
        assert!(!clone.is_cancelled());

        ctx.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn past_deadline_counts_as_cancelled() {
        let past = Instant::now() - Duration::from_millis(1);
        assert!(RequestContext::new().with_deadline(past).is_cancelled());

        let future = Instant::now() + Duration::from_secs(60);
        assert!(!RequestContext::new().with_deadline(future).is_cancelled());
    }
}
