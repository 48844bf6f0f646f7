//! Cooperative cancellation for in-flight query sessions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for one query session.
///
/// Clones observe the same flag, so the UI side can keep one handle while the
/// transport polls another. Cancellation is one-way: once set, the flag never
/// clears, and a session that should run again gets a fresh token. The transport
/// consults the token before every network read and before applying each
/// frame, so the first terminal transition (completion, failure, or this
/// flag) wins and everything after it is discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
