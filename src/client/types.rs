//! Shared types for the query client

use super::events::QueryEvent;

/// One submitted test question. Immutable once built.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Tenant whose bot is being queried.
    pub tenant_id: String,
    /// Opaque bearer credential (API key or session token); the client never
    /// inspects it.
    pub credential: String,
    /// Question text; must be non-empty.
    pub query_text: String,
    /// Streaming SSE transport vs single-shot JSON call.
    pub streaming: bool,
}

/// Where a query session currently stands.
///
/// `Completed`, `Cancelled`, and `Failed` are sticky: whichever terminal
/// transition happens first wins, and every later event or transition is a
/// no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOutcome {
    #[default]
    Pending,
    Completed,
    Cancelled,
    Failed,
}

/// Snapshot of one query session, updated by folding decoded events.
///
/// `text` only ever grows, and only while the outcome is `Pending`. One
/// instance exists per [`QueryRequest`]; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub text: String,
    pub confidence: Option<f64>,
    pub source_count: Option<usize>,
    pub latency_ms: Option<u64>,
    pub outcome: QueryOutcome,
    pub error_detail: Option<String>,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome != QueryOutcome::Pending
    }

    /// Fold one decoded event into the snapshot. Pure state update, no I/O.
    ///
    /// Once the outcome is `Cancelled` or `Failed` every event is ignored;
    /// after `Completed` only the (idempotent) end-of-stream sentinel would
    /// arrive again and it is ignored too.
    pub fn apply(&mut self, event: &QueryEvent) {
        if self.is_terminal() {
            return;
        }
        match event {
            QueryEvent::ContentDelta(text) => self.text.push_str(text),
            QueryEvent::TerminalMetadata {
                confidence,
                source_count,
                latency_ms,
            } => {
                if confidence.is_some() {
                    self.confidence = *confidence;
                }
                if source_count.is_some() {
                    self.source_count = *source_count;
                }
                if latency_ms.is_some() {
                    self.latency_ms = *latency_ms;
                }
            }
            QueryEvent::EndOfStream => self.outcome = QueryOutcome::Completed,
            QueryEvent::Unparsable(_) => {}
        }
    }

    /// Transition to `Cancelled` if still pending.
    pub fn mark_cancelled(&mut self) {
        if !self.is_terminal() {
            self.outcome = QueryOutcome::Cancelled;
        }
    }

    /// Transition to `Failed` with a user-facing detail if still pending.
    pub fn mark_failed(&mut self, detail: impl Into<String>) {
        if !self.is_terminal() {
            self.outcome = QueryOutcome::Failed;
            self.error_detail = Some(detail.into());
        }
    }
}

/// Callback invoked with a fresh snapshot after every fold step.
///
/// This is the session's only yield point between network reads, so
/// implementations should be fast and non-blocking.
pub type SnapshotCallback = Box<dyn Fn(&QueryResult) + Send + Sync>;
