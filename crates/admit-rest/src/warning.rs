//! Advisory warnings attached to a request
//!
//! Warnings never block a request. The pipeline hands each one to the
//! [`WarningSink`] carried by the [`RequestContext`]; deduplication and
//! limits are the sink's business.

use crate::context::RequestContext;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single advisory message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Warning {
    /// Component that raised the warning; may be empty
    pub agent: String,
    /// Message, conventionally `path.to.field: message`
    pub text: String,
}

/// Receiver of request warnings
pub trait WarningSink: std::fmt::Debug + Send + Sync {
    /// Record a warning; no result is reported back
    fn add_warning(&self, agent: &str, text: &str);
}

/// Send a warning to the context's sink
#[inline]
pub fn add_warning(ctx: &RequestContext, agent: &str, text: &str) {
    ctx.warning_sink().add_warning(agent, text);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWarningSink;

impl WarningSink for NoopWarningSink {
    fn add_warning(&self, _agent: &str, _text: &str) {}
}

/// Limits applied by [`WarningRecorder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningLimits {
    /// Maximum number of distinct warnings kept per request
    pub max_count: usize,
    /// Maximum message length in characters; longer messages are truncated
    pub max_message_len: usize,
}

impl Default for WarningLimits {
    fn default() -> Self {
        Self {
            max_count: 64,
            max_message_len: 256,
        }
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    warnings: Vec<Warning>,
    seen: HashSet<String>,
    dropped: usize,
}

/// In-memory sink collecting a request's warnings
///
/// Empty messages are ignored, repeated messages are kept once, long
/// messages are truncated, and anything past `max_count` is counted as
/// dropped.
#[derive(Debug, Default)]
pub struct WarningRecorder {
    limits: WarningLimits,
    state: Mutex<RecorderState>,
}

impl WarningRecorder {
    /// Create recorder with default limits
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create recorder with explicit limits
    #[inline]
    #[must_use]
    pub fn with_limits(limits: WarningLimits) -> Self {
        Self {
            limits,
            state: Mutex::new(RecorderState::default()),
        }
    }

    /// Warnings recorded so far, in arrival order
    #[must_use]
    pub fn warnings(&self) -> Vec<Warning> {
        self.state.lock().warnings.clone()
    }

    /// Message texts recorded so far, in arrival order
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.state.lock().warnings.iter().map(|w| w.text.clone()).collect()
    }

    /// Number of warnings rejected by the count limit
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.state.lock().dropped
    }
}

impl WarningSink for WarningRecorder {
    fn add_warning(&self, agent: &str, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let text: String = if text.chars().count() > self.limits.max_message_len {
            text.chars().take(self.limits.max_message_len).collect()
        } else {
            text.to_string()
        };

        let mut state = self.state.lock();
        if state.seen.contains(&text) {
            return;
        }
        if state.warnings.len() >= self.limits.max_count {
            state.dropped += 1;
            return;
        }
        state.seen.insert(text.clone());
        state.warnings.push(Warning {
            agent: agent.to_string(),
            text,
        });
    }
}
