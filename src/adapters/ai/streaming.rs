//! Shared plumbing for line-delimited streaming responses.
//!
//! Network chunks do not respect line boundaries, so bytes are buffered
//! until a full line is available. Each complete line is handed to a
//! provider-specific decoder that says whether it carried text, was noise,
//! marked the end of the stream, or reported an error.

use futures::stream::{self, Stream, StreamExt};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::collections::VecDeque;
use std::pin::Pin;

use crate::ports::{AIError, TextStream};

/// What a single decoded line means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Human-readable delta.
    Text(String),
    /// Envelope noise, keep-alives, empty deltas, malformed payloads.
    Skip,
    /// Provider's terminal marker.
    Done,
    /// Backend reported an error inside the stream.
    Failed(AIError),
}

/// Accumulates bytes and splits them into complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds bytes and returns every line completed by them, without the
    /// trailing `\n` / `\r\n`.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(Self::decode(&raw[..raw.len() - 1]));
        }
        lines
    }

    /// Returns the unterminated tail, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(Self::decode(&raw))
    }

    fn decode(raw: &[u8]) -> String {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        String::from_utf8_lossy(raw).into_owned()
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

struct DecodeState<F> {
    bytes: ByteStream,
    buffer: LineBuffer,
    ready: VecDeque<String>,
    exhausted: bool,
    decode: F,
}

/// Turns a streaming HTTP response into text deltas using `decode`.
///
/// Stops at the first `Done` or `Failed` line; a transport error mid-stream
/// becomes the final `Err` item.
pub fn decode_lines<F>(response: Response, decode: F) -> TextStream
where
    F: Fn(&str) -> LineOutcome + Send + 'static,
{
    let bytes: ByteStream = Box::pin(
        response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec())),
    );
    decode_byte_stream(bytes, decode)
}

fn decode_byte_stream<F>(bytes: ByteStream, decode: F) -> TextStream
where
    F: Fn(&str) -> LineOutcome + Send + 'static,
{
    let state = DecodeState {
        bytes,
        buffer: LineBuffer::new(),
        ready: VecDeque::new(),
        exhausted: false,
        decode,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                match (state.decode)(&line) {
                    LineOutcome::Text(text) => return Some((Ok(text), state)),
                    LineOutcome::Skip => continue,
                    LineOutcome::Done => return None,
                    LineOutcome::Failed(err) => {
                        state.ready.clear();
                        state.exhausted = true;
                        return Some((Err(err), state));
                    }
                }
            }

            if state.exhausted {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.buffer.feed(&chunk);
                    state.ready.extend(lines);
                }
                Some(Err(e)) => {
                    state.exhausted = true;
                    return Some((Err(AIError::network(format!("stream interrupted: {}", e))), state));
                }
                None => {
                    state.exhausted = true;
                    if let Some(tail) = state.buffer.finish() {
                        state.ready.push_back(tail);
                    }
                }
            }
        }
    }))
}

/// Sends a request, mapping transport failures to `AIError`.
pub async fn send(request: RequestBuilder) -> Result<Response, AIError> {
    request.send().await.map_err(|e| {
        if e.is_timeout() {
            AIError::network(format!("request timed out: {}", e))
        } else if e.is_connect() {
            AIError::network(format!("Connection failed: {}", e))
        } else {
            AIError::network(e.to_string())
        }
    })
}

/// Passes success responses through; maps everything else to an error.
pub async fn check_status(response: Response) -> Result<Response, AIError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => Err(AIError::AuthenticationFailed),
        code => Err(AIError::http(code, body)),
    }
}

/// Stricter check for connection probes: only `200 OK` counts as reachable.
pub async fn check_probe_status(response: Response) -> Result<Response, AIError> {
    let response = check_status(response).await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(AIError::http(
            status.as_u16(),
            "probe endpoint did not answer 200 OK",
        ));
    }
    Ok(response)
}

/// Strips the SSE `data:` field name, returning the payload.
pub fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
}
