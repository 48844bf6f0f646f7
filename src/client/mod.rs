//! Query client core
//!
//! Everything between "the user pressed Run Test" and "the UI shows an
//! answer" lives here: transport selection, SSE frame assembly, event
//! decoding, the result fold, and cooperative cancellation. The layers above
//! hand in an opaque bearer credential and a tenant id and get back
//! incremental [`QueryResult`] snapshots; how the credential was obtained is
//! not this module's business.

pub mod cancel;
pub mod error;
pub mod events;
pub mod streaming;
pub mod transport;
mod types;

use std::sync::Mutex;
use std::time::Duration;

use url::Url;

pub use cancel::CancelToken;
pub use error::QueryError;
pub use events::{decode_frame, QueryEvent};
pub use transport::run_query;
pub use types::{QueryOutcome, QueryRequest, QueryResult, SnapshotCallback};

/// One test panel's connection to the query API.
///
/// At most one query is in flight per session: starting a new run installs a
/// fresh [`CancelToken`] and cancels the previous one, so two folds can never
/// race on shared UI state. [`stop`] cancels whatever is currently running.
///
/// [`stop`]: QuerySession::stop
pub struct QuerySession {
    client: reqwest::Client,
    base_url: Url,
    active: Mutex<Option<CancelToken>>,
}

impl QuerySession {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, QueryError> {
        let base_url = Url::parse(base_url).map_err(|err| {
            QueryError::Other(anyhow::anyhow!("invalid base URL '{base_url}': {err}"))
        })?;
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| QueryError::Other(err.into()))?;
        Ok(Self {
            client,
            base_url,
            active: Mutex::new(None),
        })
    }

    /// Run one query, invoking `on_update` with a snapshot after every fold
    /// step. Returns the terminal snapshot.
    ///
    /// Any previously started run is cancelled first.
    pub async fn run(&self, request: QueryRequest, on_update: SnapshotCallback) -> QueryResult {
        let token = CancelToken::new();
        if let Some(previous) = self
            .active
            .lock()
            .unwrap()
            .replace(token.clone())
        {
            previous.cancel();
        }
        transport::run_query(&self.client, &self.base_url, &request, &token, &on_update).await
    }

    /// Cancel the active run, if any. Safe to call from another thread (e.g.
    /// a Ctrl+C handler); the transport observes it at its next poll.
    pub fn stop(&self) {
        if let Some(token) = self.active.lock().unwrap().as_ref() {
            token.cancel();
        }
    }
}
