//! Deduplicated diagnostics
//!
//! Range validation runs inside loops over every configured zone and protocol,
//! so the same malformed entry would otherwise be logged hundreds of times.
//! [`ReportOnce`] remembers which messages were already emitted and lets each
//! distinct message through exactly once per instance.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Seen-set of diagnostic messages.
#[derive(Debug, Default)]
pub struct ReportOnce {
    seen: Mutex<HashSet<String>>,
}

impl ReportOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` and returns `true` if it had not been seen before.
    pub fn first_time(&self, message: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if seen.contains(message) {
            return false;
        }
        seen.insert(message.to_string());
        true
    }

    /// Logs `message` at info level unless it was already reported.
    pub fn info(&self, message: String) {
        if self.first_time(&message) {
            tracing::info!("{}", message);
        }
    }

    /// Logs `message` at warn level unless it was already reported.
    pub fn warn(&self, message: String) {
        if self.first_time(&message) {
            tracing::warn!("{}", message);
        }
    }

    /// Logs `message` at error level the first time, debug afterwards.
    pub fn error_then_debug(&self, message: String) {
        if self.first_time(&message) {
            tracing::error!("{}", message);
        } else {
            tracing::debug!("{}", message);
        }
    }

    /// Number of distinct messages reported so far.
    pub fn len(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
