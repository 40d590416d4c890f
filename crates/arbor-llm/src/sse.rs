//! # SSE Parser
//!
//! Shared Server-Sent Events parser for both drivers:
//! - Line buffering from chunked responses
//! - `data: ` prefix extraction
//! - `[DONE]` marker filtering
//! - Remaining buffer processing (configurable per driver)
//!
//! A body read error is yielded once as `Err` and ends the stream.

use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

use crate::provider::ProviderError;

/// Options for the SSE parser.
#[derive(Clone, Copy, Debug)]
pub struct SseParserOptions {
    /// Whether to process remaining buffer content after the stream ends.
    /// The native backend may omit the final newline; the universal one
    /// always terminates with `[DONE]`.
    pub process_remaining_buffer: bool,
}

impl Default for SseParserOptions {
    fn default() -> Self {
        Self {
            process_remaining_buffer: true,
        }
    }
}

/// Parse SSE lines from a byte stream and yield JSON data strings.
pub fn parse_sse_lines<S, E>(
    byte_stream: S,
    options: SseParserOptions,
) -> impl Stream<Item = Result<String, ProviderError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display + Send + 'static,
{
    let process_remaining = options.process_remaining_buffer;

    futures::stream::unfold(
        (byte_stream, BytesMut::with_capacity(8192), false),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let Ok(line) = std::str::from_utf8(&line_bytes) else {
                        warn!("skipping SSE line with invalid UTF-8");
                        continue;
                    };

                    if let Some(data) = extract_sse_data(line) {
                        return Some((Ok(data), (stream, buffer, false)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => {
                        buffer.extend_from_slice(&chunk);
                    }
                    Some(Err(e)) => {
                        warn!("SSE stream read error: {e}");
                        let err = ProviderError::Stream {
                            message: e.to_string(),
                        };
                        return Some((Err(err), (stream, buffer, true)));
                    }
                    None => {
                        if process_remaining && !buffer.is_empty() {
                            let Ok(line) = std::str::from_utf8(&buffer) else {
                                return None;
                            };
                            if let Some(data) = extract_sse_data(line.trim()) {
                                buffer.clear();
                                return Some((Ok(data), (stream, buffer, true)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Extract the data payload from an SSE line.
///
/// Returns `None` for comments, empty lines, non-data fields and `[DONE]`.
fn extract_sse_data(line: &str) -> Option<String> {
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))?
        .trim();

    if data == "[DONE]" || data.is_empty() {
        return None;
    }

    Some(data.to_string())
}

/// Parse JSON from an SSE data string.
///
/// Returns `None` on failure with a warning carrying a truncated preview.
pub fn parse_sse_data<T: serde::de::DeserializeOwned>(data: &str, provider: &str) -> Option<T> {
    match serde_json::from_str(data) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(
                provider = provider,
                error = %e,
                data_preview = arbor_core::text::truncate_str(data, 100),
                "dropping unparsable SSE event"
            );
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::logging::capture_logs;

    type Chunk = Result<Bytes, std::io::Error>;

    async fn collect(chunks: Vec<Chunk>, options: SseParserOptions) -> Vec<Result<String, ProviderError>> {
        parse_sse_lines(futures::stream::iter(chunks), options)
            .collect()
            .await
    }

    fn oks(results: Vec<Result<String, ProviderError>>) -> Vec<String> {
        results.into_iter().map(Result::unwrap).collect()
    }

    // ── extract_sse_data ─────────────────────────────────────────────────

    #[test]
    fn extract_data_line() {
        assert_eq!(extract_sse_data("data: {\"a\":1}"), Some("{\"a\":1}".into()));
        assert_eq!(extract_sse_data("data:{\"a\":1}"), Some("{\"a\":1}".into()));
    }

    #[test]
    fn extract_skips_markers_and_noise() {
        assert_eq!(extract_sse_data("data: [DONE]"), None);
        assert_eq!(extract_sse_data("data: "), None);
        assert_eq!(extract_sse_data(""), None);
        assert_eq!(extract_sse_data(": keep-alive"), None);
        assert_eq!(extract_sse_data("event: message"), None);
    }

    // ── parse_sse_data ───────────────────────────────────────────────────

    #[test]
    fn parse_invalid_json_warns_and_returns_none() {
        let (logs, _guard) = capture_logs();
        let result: Option<serde_json::Value> = parse_sse_data("not json", "test");
        assert!(result.is_none());
        assert!(logs.has_event(tracing::Level::WARN, "dropping unparsable SSE event"));
    }

    // ── parse_sse_lines ──────────────────────────────────────────────────

    #[tokio::test]
    async fn multiple_events_in_one_chunk() {
        let out = collect(
            vec![Ok(Bytes::from("data: {\"a\":1}\n\ndata: {\"b\":2}\n\n"))],
            SseParserOptions::default(),
        )
        .await;
        assert_eq!(oks(out), vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[tokio::test]
    async fn event_split_across_chunks() {
        let out = collect(
            vec![Ok(Bytes::from("data: {\"par")), Ok(Bytes::from("tial\":true}\n\n"))],
            SseParserOptions::default(),
        )
        .await;
        assert_eq!(oks(out), vec!["{\"partial\":true}"]);
    }

    #[tokio::test]
    async fn done_marker_and_crlf() {
        let out = collect(
            vec![Ok(Bytes::from("data: {\"ok\":true}\r\n\r\ndata: [DONE]\r\n\r\n"))],
            SseParserOptions::default(),
        )
        .await;
        assert_eq!(oks(out), vec!["{\"ok\":true}"]);
    }

    #[tokio::test]
    async fn remaining_buffer_toggle() {
        let chunk = || vec![Ok(Bytes::from("data: {\"trailing\":true}"))];
        let on = collect(chunk(), SseParserOptions { process_remaining_buffer: true }).await;
        assert_eq!(on.len(), 1);
        let off = collect(chunk(), SseParserOptions { process_remaining_buffer: false }).await;
        assert!(off.is_empty());
    }

    #[tokio::test]
    async fn read_error_yields_err_then_ends() {
        let out = collect(
            vec![
                Ok(Bytes::from("data: {\"a\":1}\n\n")),
                Err(std::io::Error::other("connection reset")),
                Ok(Bytes::from("data: {\"never\":1}\n\n")),
            ],
            SseParserOptions::default(),
        )
        .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_deref().unwrap(), "{\"a\":1}");
        assert!(matches!(&out[1], Err(ProviderError::Stream { message }) if message.contains("reset")));
    }

    #[tokio::test]
    async fn empty_stream() {
        assert!(collect(vec![], SseParserOptions::default()).await.is_empty());
    }

    // ── chunking invariance ──────────────────────────────────────────────

    proptest::proptest! {
        #[test]
        fn chunk_boundaries_do_not_change_events(cuts in proptest::collection::vec(0usize..120, 0..6)) {
            let body = "data: {\"a\":1}\r\n\r\n: ping\n\ndata: {\"b\":\"x y\"}\n\ndata: [DONE]\n\n";
            let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c % body.len()).collect();
            cuts.sort_unstable();
            cuts.dedup();

            let mut chunks: Vec<Chunk> = Vec::new();
            let mut start = 0;
            for cut in cuts.into_iter().chain(std::iter::once(body.len())) {
                if cut > start {
                    chunks.push(Ok(Bytes::copy_from_slice(&body.as_bytes()[start..cut])));
                    start = cut;
                }
            }

            let out = futures::executor::block_on(collect(chunks, SseParserOptions::default()));
            proptest::prop_assert_eq!(oks(out), vec!["{\"a\":1}".to_owned(), "{\"b\":\"x y\"}".to_owned()]);
        }
    }
}
