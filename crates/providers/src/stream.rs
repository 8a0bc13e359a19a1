//! Shared streaming infrastructure for the backend adapters.
//!
//! Both backends deliver the response as a byte stream that must be
//! reassembled into discrete payloads before parsing: the OpenAI-style
//! flavor frames payloads as SSE `data:` lines, the Ollama flavor as
//! newline-delimited JSON. The two framings share one loop:
//! buffer chunks, drain complete payloads, feed each payload to a
//! backend-specific parser, flush the tail when the body closes.

use df_domain::error::Result;
use df_domain::stream::{BoxStream, StreamEvent};
use futures_util::StreamExt;

use crate::util::from_reqwest;

/// How a backend frames its incremental payloads on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    /// SSE events delimited by `\n\n`; only `data:` lines carry payloads.
    Sse,
    /// One JSON object per `\n`-terminated line.
    Ndjson,
}

/// Extract complete `data:` payloads from an SSE buffer.
///
/// SSE events are delimited by `\n\n`. Each event block may contain
/// `event:`, `data:`, `id:`, or `retry:` lines; only `data:` lines
/// matter here. The buffer is drained in place: consumed bytes are
/// removed and any trailing partial event remains for the next call.
pub(crate) fn drain_sse_data(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2); // remove the \n\n delimiter

        for line in block.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    payloads.push(data.to_string());
                }
            }
        }
    }

    payloads
}

/// Extract complete lines from an NDJSON buffer, leaving any trailing
/// partial line in place.
pub(crate) fn drain_ndjson_lines(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();

    while let Some(pos) = buffer.find('\n') {
        let line: String = buffer.drain(..=pos).collect();
        let line = line.trim();
        if !line.is_empty() {
            payloads.push(line.to_string());
        }
    }

    payloads
}

fn drain(framing: Framing, buffer: &mut String) -> Vec<String> {
    match framing {
        Framing::Sse => drain_sse_data(buffer),
        Framing::Ndjson => drain_ndjson_lines(buffer),
    }
}

/// Build a [`BoxStream`] from a streaming `reqwest::Response` and a
/// backend-specific payload parser.
///
/// The parser receives each complete payload string and returns zero or
/// more events; malformed payloads are its responsibility to skip (and
/// log), never to fail the stream. The stream automatically:
/// 1. Buffers incoming chunks and drains complete payloads
/// 2. Flushes the remaining buffer when the response body closes
/// 3. Emits a fallback `Done` if the parser never produced one
pub(crate) fn response_stream<F>(
    response: reqwest::Response,
    framing: Framing,
    mut parse_payload: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> Vec<StreamEvent> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer = String::new();
        let mut done_emitted = false;

        loop {
            match response.chunk().await {
                Ok(Some(bytes)) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));

                    for payload in drain(framing, &mut buffer) {
                        for event in parse_payload(&payload) {
                            if matches!(&event, StreamEvent::Done { .. }) {
                                done_emitted = true;
                            }
                            yield Ok(event);
                        }
                        if done_emitted {
                            break;
                        }
                    }
                    if done_emitted {
                        break;
                    }
                }
                Ok(None) => {
                    // Body closed -- flush any remaining partial payload.
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                        for payload in drain(framing, &mut buffer) {
                            for event in parse_payload(&payload) {
                                if matches!(&event, StreamEvent::Done { .. }) {
                                    done_emitted = true;
                                }
                                yield Ok(event);
                            }
                        }
                    }
                    break;
                }
                Err(e) => {
                    yield Err(from_reqwest(e));
                    break;
                }
            }
        }

        if !done_emitted {
            yield Ok(StreamEvent::Done { finish_reason: Some("stop".into()) });
        }
    };

    Box::pin(stream)
}

/// Accumulate a token stream into one text buffer.
///
/// Fragments are concatenated in arrival order; the stream's own
/// ordering is authoritative. Transport errors abort the accumulation.
pub async fn collect_text(
    mut stream: BoxStream<'static, Result<StreamEvent>>,
) -> Result<String> {
    let mut collected = String::new();

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::Token { text } => collected.push_str(&text),
            StreamEvent::Done { .. } => break,
        }
    }

    Ok(collected)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
