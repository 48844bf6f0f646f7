//! Frame assembly for the streaming query endpoint
//!
//! The streaming endpoint delivers Server-Sent Events: `data:` lines carrying
//! either a JSON payload or the `[DONE]` sentinel. The transport hands us raw
//! byte chunks with no alignment guarantees, so this decoder buffers text and
//! only emits payloads once their terminating newline has arrived. Blank
//! lines (SSE record separators) and non-`data:` fields are skipped, which
//! makes the decoder indifferent to whether the server separates records with
//! `\n` or `\n\n`.

/// Field prefix that marks a payload-bearing SSE line.
const DATA_FIELD: &str = "data:";

/// Incremental SSE frame decoder.
///
/// Buffers incoming bytes and extracts complete `data:` payloads. Handles:
/// - frames split across multiple chunks (including mid-delimiter splits)
/// - multiple frames arriving in a single chunk
/// - a trailing frame whose final newline never arrives (see [`flush`])
///
/// [`flush`]: SseFrameDecoder::flush
///
/// # Example
/// ```
/// use weaver_cli::client::streaming::SseFrameDecoder;
///
/// let mut decoder = SseFrameDecoder::new();
///
/// let frames = decoder.feed(b"data: {\"content\":\"Hel\"}\n\ndata: {\"cont");
/// assert_eq!(frames, vec!["{\"content\":\"Hel\"}"]);
///
/// // The split frame completes on the next chunk.
/// let frames = decoder.feed(b"ent\":\"lo\"}\n\n");
/// assert_eq!(frames, vec!["{\"content\":\"lo\"}"]);
/// ```
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: String,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk, returning the payloads of every frame it completed.
    ///
    /// Frames are returned in arrival order. Anything after the last newline
    /// stays buffered for the next `feed` or `flush`. Bytes are converted
    /// lossily, so a broken UTF-8 sequence degrades to replacement characters
    /// instead of aborting the stream.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut frames = Vec::new();
        while let Some(newline_pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline_pos).collect();
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(payload) = line.strip_prefix(DATA_FIELD) {
                frames.push(payload.trim().to_string());
            }
        }
        frames
    }

    /// Drain the buffer when the transport reports end-of-input.
    ///
    /// Returns the trailing frame if the residue is a complete `data:` line
    /// that merely lacked its closing newline. Any other residue is an
    /// incomplete frame that cannot be decoded safely and is dropped.
    pub fn flush(&mut self) -> Option<String> {
        let residue = std::mem::take(&mut self.buffer);
        residue
            .trim()
            .strip_prefix(DATA_FIELD)
            .map(|payload| payload.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_complete_frame() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.feed(b"data: {\"content\":\"hi\"}\n\n");
        assert_eq!(frames, vec!["{\"content\":\"hi\"}"]);
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.feed(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(frames, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn frame_split_across_chunks() {
        let mut decoder = SseFrameDecoder::new();

        let frames = decoder.feed(b"data: {\"content\":\"hel");
        assert_eq!(frames, Vec::<String>::new());

        let frames = decoder.feed(b"lo\"}\n\n");
        assert_eq!(frames, vec!["{\"content\":\"hello\"}"]);
    }

    #[test]
    fn delimiter_split_across_chunks() {
        let mut decoder = SseFrameDecoder::new();

        let frames = decoder.feed(b"data: [DONE]");
        assert_eq!(frames, Vec::<String>::new());

        let frames = decoder.feed(b"\n");
        assert_eq!(frames, vec!["[DONE]"]);
    }

    #[test]
    fn single_newline_records_accepted() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.feed(b"data: {\"a\":1}\ndata: {\"b\":2}\n");
        assert_eq!(frames, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn non_data_fields_and_blank_lines_skipped() {
        let mut decoder = SseFrameDecoder::new();
        let frames =
            decoder.feed(b": keepalive\n\nevent: message\ndata: {\"x\":1}\n\nretry: 500\n");
        assert_eq!(frames, vec!["{\"x\":1}"]);
    }

    #[test]
    fn flush_recovers_trailing_data_line() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.feed(b"data: {\"a\":1}\n\ndata: [DONE]");
        assert_eq!(frames, vec!["{\"a\":1}"]);
        assert_eq!(decoder.flush(), Some("[DONE]".to_string()));
    }

    #[test]
    fn flush_discards_non_frame_residue() {
        let mut decoder = SseFrameDecoder::new();
        decoder.feed(b"data: {\"a\":1}\n: half a comm");
        assert_eq!(decoder.flush(), None);
    }

    #[test]
    fn flush_clears_buffer() {
        let mut decoder = SseFrameDecoder::new();
        decoder.feed(b"data: {\"a\":1}");
        assert_eq!(decoder.flush(), Some("{\"a\":1}".to_string()));
        assert_eq!(decoder.flush(), None);
    }

    #[test]
    fn invalid_utf8_degrades_lossily() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.feed(b"data: {\"content\":\"\xFF\"}\n");
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("content"));
    }

    fn feed_in_pieces(bytes: &[u8], cuts: &[usize]) -> Vec<String> {
        let mut decoder = SseFrameDecoder::new();
        let mut frames = Vec::new();
        let mut start = 0;
        for &cut in cuts {
            frames.extend(decoder.feed(&bytes[start..cut]));
            start = cut;
        }
        frames.extend(decoder.feed(&bytes[start..]));
        frames.extend(decoder.flush());
        frames
    }

    proptest! {
        /// Splitting the stream at arbitrary byte boundaries must produce the
        /// same ordered frame sequence as feeding it whole.
        #[test]
        fn prop_chunk_boundary_invariance(
            mut cuts in proptest::collection::vec(0usize..=96, 0..8),
        ) {
            let bytes: &[u8] = b"data: {\"content\":\"Hel\"}\n\ndata: {\"content\":\"lo\"}\n\n\
                                 data: {\"confidence\":0.92,\"sources\":[1,2]}\n\ndata: [DONE]\n\n";
            cuts.retain(|&c| c <= bytes.len());
            cuts.sort_unstable();

            let whole = feed_in_pieces(bytes, &[]);
            let pieces = feed_in_pieces(bytes, &cuts);
            prop_assert_eq!(pieces, whole);
        }
    }
}
