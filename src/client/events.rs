//! Decoding of assembled frames into typed query events
//!
//! One frame decodes independently of its neighbors: the `[DONE]` sentinel is
//! matched on the trimmed payload before any JSON parsing, a payload with a
//! string `content` field is an incremental delta, and a payload carrying
//! `confidence` or `sources` is the once-per-query terminal metadata.
//! Anything else decodes to [`QueryEvent::Unparsable`], which the fold drops:
//! a transient malformed frame must not abort an otherwise-good stream.

use serde::Deserialize;

/// End-of-stream sentinel emitted by the server as a literal frame payload.
pub const END_SENTINEL: &str = "[DONE]";

/// A decoded application event from one frame (or synthesized by the
/// non-streaming transport).
#[derive(Debug, Clone, PartialEq)]
pub enum QueryEvent {
    /// Incremental answer text.
    ContentDelta(String),
    /// Answer-level metadata, delivered once per query.
    TerminalMetadata {
        confidence: Option<f64>,
        source_count: Option<usize>,
        latency_ms: Option<u64>,
    },
    /// Explicit end-of-stream sentinel.
    EndOfStream,
    /// Frame that matched no known shape; dropped by the fold.
    Unparsable(String),
}

/// Answer confidence as it appears on the wire.
///
/// Current servers report a numeric score; an older deployment emitted the
/// labels `high`/`medium`/`low`. Both are accepted and exposed as a number.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConfidenceValue {
    Score(f64),
    Label(String),
}

impl ConfidenceValue {
    pub fn as_score(&self) -> Option<f64> {
        match self {
            ConfidenceValue::Score(score) => Some(*score),
            ConfidenceValue::Label(label) => match label.as_str() {
                "high" => Some(0.9),
                "medium" => Some(0.6),
                "low" => Some(0.3),
                _ => None,
            },
        }
    }
}

/// Probe shape for streamed JSON payloads.
///
/// `content` must be a string when present; a frame where it is some other
/// type fails the parse and falls through to `Unparsable`.
#[derive(Debug, Deserialize)]
struct StreamPayload {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    confidence: Option<ConfidenceValue>,
    #[serde(default)]
    sources: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    latency_ms: Option<u64>,
}

/// Decode one frame payload into a [`QueryEvent`].
pub fn decode_frame(payload: &str) -> QueryEvent {
    let payload = payload.trim();
    if payload == END_SENTINEL {
        return QueryEvent::EndOfStream;
    }

    match serde_json::from_str::<StreamPayload>(payload) {
        Ok(parsed) => {
            if let Some(text) = parsed.content {
                QueryEvent::ContentDelta(text)
            } else if parsed.confidence.is_some() || parsed.sources.is_some() {
                QueryEvent::TerminalMetadata {
                    confidence: parsed.confidence.and_then(|c| c.as_score()),
                    source_count: parsed.sources.map(|s| s.len()),
                    latency_ms: parsed.latency_ms,
                }
            } else {
                tracing::debug!("dropping frame with no recognized fields: {}", payload);
                QueryEvent::Unparsable(payload.to_string())
            }
        }
        Err(err) => {
            tracing::debug!("dropping unparsable frame ({}): {}", err, payload);
            QueryEvent::Unparsable(payload.to_string())
        }
    }
}
