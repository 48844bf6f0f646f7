//! Transport driver for the two query strategies
//!
//! A query runs on one cooperative task: network reads are the only
//! suspension points, and between reads the driver feeds the frame decoder,
//! folds the resulting events, and hands a snapshot to the caller so a UI can
//! repaint without waiting for the rest of the stream. Errors never escape as
//! `Err` from [`run_query`]; they land in the snapshot as a `Failed` outcome
//! with the detail text shown to the user.

use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use url::Url;

use super::cancel::CancelToken;
use super::error::QueryError;
use super::events::{decode_frame, ConfidenceValue, QueryEvent};
use super::streaming::SseFrameDecoder;
use super::types::{QueryRequest, QueryResult, SnapshotCallback};

/// Accept header value requesting the SSE transport.
const EVENT_STREAM_ACCEPT: &str = "text/event-stream";

/// Abort a streaming read after this long without any bytes.
const STREAM_CHUNK_TIMEOUT: Duration = Duration::from_secs(60);

/// Poll interval while awaiting the next chunk, so a cancel request is
/// observed promptly even when the server is silent.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Request body for the single-shot endpoint.
#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    query: &'a str,
}

/// Response body of the single-shot endpoint.
#[derive(Debug, Deserialize)]
struct QueryResponseBody {
    answer: String,
    #[serde(default)]
    confidence: Option<ConfidenceValue>,
    #[serde(default)]
    latency_ms: Option<u64>,
    #[serde(default)]
    sources: Vec<serde_json::Value>,
}

/// Run one query to completion, cancellation, or failure.
///
/// The returned snapshot always carries a terminal outcome. `on_update` fires
/// after every fold step, including the terminal one.
pub async fn run_query(
    client: &reqwest::Client,
    base_url: &Url,
    request: &QueryRequest,
    token: &CancelToken,
    on_update: &SnapshotCallback,
) -> QueryResult {
    let mut result = QueryResult::new();

    if request.query_text.trim().is_empty() {
        let err = QueryError::BadRequest("query text must not be empty".to_string());
        result.mark_failed(err.to_string());
        on_update(&result);
        return result;
    }
    if token.is_cancelled() {
        result.mark_cancelled();
        on_update(&result);
        return result;
    }

    let driven = if request.streaming {
        run_streaming(client, base_url, request, token, on_update, &mut result).await
    } else {
        run_single_shot(client, base_url, request, token, on_update, &mut result).await
    };

    if let Err(err) = driven {
        tracing::warn!("query for tenant {} failed: {}", request.tenant_id, err);
        result.mark_failed(err.to_string());
        on_update(&result);
    }
    result
}

fn endpoint(base_url: &Url, tenant_id: &str, streaming: bool) -> Result<Url, QueryError> {
    let suffix = if streaming { "/stream" } else { "" };
    let raw = format!(
        "{}/v1/tenants/{}/query{}",
        base_url.as_str().trim_end_matches('/'),
        tenant_id,
        suffix
    );
    Url::parse(&raw).map_err(|err| QueryError::Other(anyhow::anyhow!("bad endpoint URL: {err}")))
}

async fn run_single_shot(
    client: &reqwest::Client,
    base_url: &Url,
    request: &QueryRequest,
    token: &CancelToken,
    on_update: &SnapshotCallback,
    result: &mut QueryResult,
) -> Result<(), QueryError> {
    let url = endpoint(base_url, &request.tenant_id, false)?;
    tracing::debug!("POST {}", url);

    let response = client
        .post(url)
        .header("Authorization", format!("Bearer {}", request.credential))
        .json(&QueryBody {
            query: &request.query_text,
        })
        .send()
        .await
        .map_err(QueryError::from_network_error)?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(QueryError::from_http_status(status, body));
    }

    let body: QueryResponseBody = response
        .json()
        .await
        .map_err(|err| QueryError::Other(anyhow::anyhow!("malformed response body: {err}")))?;

    // The await above may have raced a cancel request; cancellation wins.
    if token.is_cancelled() {
        result.mark_cancelled();
        on_update(result);
        return Ok(());
    }

    let events = [
        QueryEvent::TerminalMetadata {
            confidence: body.confidence.and_then(|c| c.as_score()),
            source_count: Some(body.sources.len()),
            latency_ms: body.latency_ms,
        },
        QueryEvent::ContentDelta(body.answer),
        QueryEvent::EndOfStream,
    ];
    for event in &events {
        result.apply(event);
        on_update(result);
    }
    Ok(())
}

async fn run_streaming(
    client: &reqwest::Client,
    base_url: &Url,
    request: &QueryRequest,
    token: &CancelToken,
    on_update: &SnapshotCallback,
    result: &mut QueryResult,
) -> Result<(), QueryError> {
    let mut url = endpoint(base_url, &request.tenant_id, true)?;
    url.query_pairs_mut()
        .append_pair("query", &request.query_text);
    tracing::debug!("GET {}", url);

    let response = client
        .get(url)
        .header("Authorization", format!("Bearer {}", request.credential))
        .header("Accept", EVENT_STREAM_ACCEPT)
        .send()
        .await
        .map_err(QueryError::from_network_error)?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(QueryError::from_http_status(status, body));
    }

    let mut stream = response.bytes_stream();
    let mut decoder = SseFrameDecoder::new();
    let mut frames_seen: usize = 0;
    let mut last_activity = std::time::Instant::now();

    'read: loop {
        if token.is_cancelled() {
            result.mark_cancelled();
            on_update(result);
            return Ok(());
        }
        if last_activity.elapsed() >= STREAM_CHUNK_TIMEOUT {
            return Err(QueryError::Network(format!(
                "stream stalled for {} seconds",
                STREAM_CHUNK_TIMEOUT.as_secs()
            )));
        }

        let chunk = match timeout(CANCEL_POLL_INTERVAL, stream.next()).await {
            Ok(Some(read)) => read.map_err(QueryError::from_network_error)?,
            Ok(None) => break 'read,
            // Poll interval elapsed with no data; re-check cancel and stall.
            Err(_) => continue,
        };
        last_activity = std::time::Instant::now();

        for payload in decoder.feed(&chunk) {
            // A stop request between frames discards everything still queued,
            // even though the bytes already arrived.
            if token.is_cancelled() {
                result.mark_cancelled();
                on_update(result);
                return Ok(());
            }
            frames_seen += 1;
            result.apply(&decode_frame(&payload));
            on_update(result);
        }
        if result.is_terminal() {
            break;
        }
    }

    if !result.is_terminal() {
        if let Some(payload) = decoder.flush() {
            frames_seen += 1;
            result.apply(&decode_frame(&payload));
            on_update(result);
        }
    }

    if !result.is_terminal() {
        if frames_seen == 0 {
            return Err(QueryError::EmptyStream);
        }
        // Server closed without the end sentinel. Tolerated: keep whatever
        // text accumulated and complete the session.
        tracing::debug!(
            "stream ended without end sentinel after {} frames",
            frames_seen
        );
        result.apply(&QueryEvent::EndOfStream);
        on_update(result);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_tenant_path() {
        let base = Url::parse("http://localhost:8000").unwrap();
        let url = endpoint(&base, "t-42", false).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/v1/tenants/t-42/query");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash_and_picks_stream_path() {
        let base = Url::parse("https://api.example.com/").unwrap();
        let url = endpoint(&base, "t-42", true).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/tenants/t-42/query/stream"
        );
    }

    #[test]
    fn streaming_url_encodes_the_query() {
        let base = Url::parse("http://localhost:8000").unwrap();
        let mut url = endpoint(&base, "t-1", true).unwrap();
        url.query_pairs_mut()
            .append_pair("query", "what is 2 + 2?");
        assert!(url.as_str().ends_with("query=what+is+2+%2B+2%3F"));
    }
}
