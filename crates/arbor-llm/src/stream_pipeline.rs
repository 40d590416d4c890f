//! Stream pipeline shared by both drivers.
//!
//! Both drivers follow the same shape: send the request, turn a non-2xx
//! response into a failure, parse SSE lines, deserialize each JSON payload,
//! feed it through a per-driver [`StreamHandler`], and let the handler flush
//! buffered tool calls when the body ends.

use futures::StreamExt;
use futures::stream;
use tracing::{debug, error};

use arbor_core::events::StreamEvent;

use crate::provider::{ProviderError, ProviderResult, StreamEventStream};
use crate::sse::{SseParserOptions, parse_sse_data, parse_sse_lines};

/// Per-driver translation of wire chunks into [`StreamEvent`]s.
pub trait StreamHandler: Send + 'static {
    /// Deserialized SSE payload type.
    type Chunk: serde::de::DeserializeOwned + Send;

    /// Events produced by one chunk. A terminal event ends the stream.
    fn on_chunk(&mut self, chunk: Self::Chunk) -> Vec<StreamEvent>;

    /// Events produced when the body ends cleanly: buffered tool calls (if
    /// any) followed by [`StreamEvent::Done`].
    fn finish(self) -> Vec<StreamEvent>;
}

/// Turn a non-2xx response into [`ProviderError::Api`] carrying the raw body.
pub async fn check_status(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!(status = status.as_u16(), body_len = body.len(), "backend returned error status");
    Err(ProviderError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Convert an HTTP response's SSE body into a [`StreamEventStream`].
pub fn sse_to_event_stream<H: StreamHandler>(
    response: reqwest::Response,
    options: SseParserOptions,
    provider: impl Into<String>,
    handler: H,
) -> StreamEventStream {
    let provider: String = provider.into();
    Box::pin(async_stream::stream! {
        let mut handler = handler;
        let lines = parse_sse_lines(response.bytes_stream(), options);
        futures::pin_mut!(lines);

        while let Some(line) = lines.next().await {
            let data = match line {
                Ok(data) => data,
                Err(e) => {
                    yield e.to_failed_event();
                    return;
                }
            };
            let Some(chunk) = parse_sse_data::<H::Chunk>(&data, &provider) else {
                continue;
            };
            for event in handler.on_chunk(chunk) {
                let terminal = event.is_terminal();
                yield event;
                if terminal {
                    return;
                }
            }
        }

        debug!(provider = %provider, "stream body ended");
        for event in handler.finish() {
            yield event;
        }
    })
}

/// A stream holding a single failure event.
pub fn failed_stream(err: &ProviderError) -> StreamEventStream {
    Box::pin(stream::once(std::future::ready(err.to_failed_event())))
}

/// Map the result of sending a request into a stream.
///
/// Auth faults stay `Err` (they are raised before dispatch); everything else
/// becomes a one-event failure stream.
pub fn wrap_provider_stream(
    provider_name: &str,
    inner: ProviderResult<StreamEventStream>,
) -> ProviderResult<StreamEventStream> {
    match inner {
        Ok(s) => Ok(s),
        Err(e @ ProviderError::Auth { .. }) => Err(e),
        Err(e) => {
            error!(error = %e, category = e.category(), provider = %provider_name, "stream failed");
            Ok(failed_stream(&e))
        }
    }
}
