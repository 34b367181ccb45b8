//! Server-Sent Events (SSE) processing for streaming chat completions.
//!
//! This module converts the raw byte stream of an HTTP response into a stream of
//! [`StreamEvent`]s. Events are separated by a blank line and carry their payload
//! on `data:` lines; the literal payload `[DONE]` terminates the stream.

use std::error;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::types::{ApiErrorResponse, ChatCompletionChunk, StreamEvent};
use crate::{Error, Result};

/// Process a stream of bytes into a stream of server-sent events.
///
/// Bytes are buffered until a complete event is available, so events and
/// multibyte characters split across network chunks are reassembled. Once
/// `[DONE]` has been yielded the stream ends, even if the body continues.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin + Send + 'static,
    E: error::Error + Send + Sync + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let state = SseState {
        buffer: Vec::new(),
        done: false,
    };

    stream::unfold((stream, state), |(mut stream, mut state)| async move {
        if state.done {
            return None;
        }
        loop {
            // First check if we have a complete event in the buffer
            if let Some(event) = state.next_event() {
                match event {
                    Some(event) => {
                        record(&event);
                        if matches!(event, Ok(StreamEvent::Done)) {
                            state.done = true;
                        }
                        return Some((event, (stream, state)));
                    }
                    None => continue,
                }
            }

            // Read more data
            match stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    state.buffer.extend_from_slice(&bytes);
                }
                Some(Err(e)) => {
                    STREAM_ERRORS.click();
                    state.done = true;
                    return Some((Err(e), (stream, state)));
                }
                None => {
                    // End of body: a final event may lack its trailing blank line.
                    state.done = true;
                    let rest = std::mem::take(&mut state.buffer);
                    let event = parse_event(&rest)?;
                    record(&event);
                    return Some((event, (stream, state)));
                }
            }
        }
    })
}

struct SseState {
    buffer: Vec<u8>,
    done: bool,
}

impl SseState {
    /// Pops one complete event off the buffer.
    ///
    /// Returns `None` when no complete event is buffered, and `Some(None)` when an
    /// event carried nothing of interest (comments, keep-alives).
    fn next_event(&mut self) -> Option<Option<Result<StreamEvent>>> {
        let (end, delimiter_len) = find_event_boundary(&self.buffer)?;
        let raw: Vec<u8> = self.buffer.drain(..end + delimiter_len).take(end).collect();
        Some(parse_event(&raw))
    }
}

fn record(event: &Result<StreamEvent>) {
    match event {
        Ok(_) => STREAM_EVENTS.click(),
        Err(_) => STREAM_ERRORS.click(),
    }
}

/// Finds the first blank-line delimiter, accepting both `\n\n` and `\r\n\r\n`.
fn find_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Parse the text of one event, ignoring blank and comment-only events.
fn parse_event(raw: &[u8]) -> Option<Result<StreamEvent>> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => return Some(Err(e.into())),
    };

    // Multiple data lines are joined with newlines per the SSE format.
    let mut data: Option<String> = None;
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            match &mut data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => data = Some(value.to_string()),
            }
        }
    }

    let data = data?;
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    Some(parse_data(data))
}

fn parse_data(data: &str) -> Result<StreamEvent> {
    if data == "[DONE]" {
        return Ok(StreamEvent::Done);
    }
    if let Ok(err) = serde_json::from_str::<ApiErrorResponse>(data) {
        return Err(Error::api(
            500,
            err.error.error_type.or(Some("stream_error".to_string())),
            err.error.message,
            None,
        ));
    }
    serde_json::from_str::<ChatCompletionChunk>(data)
        .map(StreamEvent::Chunk)
        .map_err(|e| {
            Error::serialization(
                format!("Failed to parse chunk JSON: {e}"),
                Some(Box::new(e)),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    type ByteResult = std::result::Result<Bytes, io::Error>;

    fn chunk_event(text: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"index\":0,\"delta\":{{\"content\":{}}}}}]}}\n\n",
            serde_json::to_string(text).unwrap()
        )
    }

    async fn collect(chunks: Vec<ByteResult>) -> Vec<Result<StreamEvent>> {
        let stream = Box::pin(stream::iter(chunks));
        process_sse(stream).collect().await
    }

    #[tokio::test]
    async fn parse_chunk_then_done() {
        let body = format!("{}data: [DONE]\n\n", chunk_event("Hello"));
        let events = collect(vec![Ok(Bytes::from(body))]).await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap().text_delta(), Some("Hello"));
        assert!(matches!(events[1], Ok(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn nothing_after_done() {
        let body = format!("data: [DONE]\n\n{}", chunk_event("late"));
        let events = collect(vec![Ok(Bytes::from(body))]).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn handle_split_event() {
        let body = chunk_event("split");
        let (a, b) = body.split_at(10);
        let events = collect(vec![
            Ok(Bytes::from(a.to_string())),
            Ok(Bytes::from(b.to_string())),
        ])
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().text_delta(), Some("split"));
    }

    #[tokio::test]
    async fn handle_split_multibyte_character() {
        let body = chunk_event("héllo 🤖").into_bytes();
        let cut = body.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let events = collect(vec![
            Ok(Bytes::copy_from_slice(&body[..cut])),
            Ok(Bytes::copy_from_slice(&body[cut..])),
        ])
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().text_delta(), Some("héllo 🤖"));
    }

    #[tokio::test]
    async fn skip_comments_and_crlf() {
        let body = ": keep-alive\r\n\r\ndata: [DONE]\r\n\r\n";
        let events = collect(vec![Ok(Bytes::from(body))]).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn trailing_event_without_blank_line() {
        let body = chunk_event("tail");
        let body = body.trim_end().to_string();
        let events = collect(vec![Ok(Bytes::from(body))]).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().text_delta(), Some("tail"));
    }

    #[tokio::test]
    async fn handle_malformed_event() {
        let events = collect(vec![Ok(Bytes::from("data: {not json\n\n"))]).await;

        assert_eq!(events.len(), 1);
        let err = events[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("Failed to parse chunk JSON"));
    }

    #[tokio::test]
    async fn in_band_error_payload() {
        let body = "data: {\"error\":{\"message\":\"model overloaded\",\"type\":\"server_error\"}}\n\n";
        let events = collect(vec![Ok(Bytes::from(body))]).await;

        let err = events[0].as_ref().unwrap_err();
        assert_eq!(err.to_string(), "server_error: model overloaded");
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let events = collect(vec![
            Ok(Bytes::from(chunk_event("partial"))),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from(chunk_event("never"))),
        ])
        .await;

        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(events[1].as_ref().unwrap_err().is_streaming());
    }
}
