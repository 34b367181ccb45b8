//! Logging trait for Groq client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows callers to capture
//! and log all API interactions passing through the [`Groq`](crate::Groq) client,
//! and [`JsonLinesLogger`], which appends one JSON object per interaction to a file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::types::{ChatCompletionRequest, StreamEvent};
use crate::{Error, Result};

/// A trait for logging Groq client operations.
///
/// Implementations never see the API key: only the request body, the decoded
/// stream events, and errors are passed in.
pub trait ClientLogger: Send + Sync {
    /// Log an outbound chat-completion request.
    fn log_request(&self, request: &ChatCompletionRequest);

    /// Log an individual streaming event.
    fn log_stream_event(&self, event: &StreamEvent);

    /// Log a failed request or a failure inside a stream.
    fn log_error(&self, error: &Error);
}

/// A [`ClientLogger`] that writes JSON lines.
pub struct JsonLinesLogger {
    writer: Mutex<BufWriter<File>>,
}

#[derive(Serialize)]
struct LogLine<'a, T: Serialize> {
    timestamp_ms: u128,
    kind: &'static str,
    payload: &'a T,
}

impl JsonLinesLogger {
    /// Opens `path` for appending, creating it if necessary.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|err| Error::io("failed to open client log file", err))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_line<T: Serialize>(&self, kind: &'static str, payload: &T) {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let line = LogLine {
            timestamp_ms,
            kind,
            payload,
        };
        // Write failures are dropped.
        let Ok(json) = serde_json::to_string(&line) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{json}");
            let _ = writer.flush();
        }
    }
}

impl ClientLogger for JsonLinesLogger {
    fn log_request(&self, request: &ChatCompletionRequest) {
        self.write_line("request", request);
    }

    fn log_stream_event(&self, event: &StreamEvent) {
        self.write_line("stream_event", event);
    }

    fn log_error(&self, error: &Error) {
        self.write_line("error", &error.to_string());
    }
}
