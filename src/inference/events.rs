//! Server-sent event parsing for the Gradio queue stream.
//!
//! The stream multiplexes heartbeats, queue estimates and progress updates;
//! only the `process_completed` event carries the answer.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// Event tag of the message that carries the final output
pub const PROCESS_COMPLETED: &str = "process_completed";

/// JSON pointer from `output` to the assistant text of the first chat turn
const REPLY_TEXT_POINTER: &str = "/data/0/0/1/0/text";

#[derive(Debug, Deserialize)]
struct QueueEvent {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    output: Option<Value>,
}

fn summary_regex() -> &'static Regex {
    static SUMMARY: OnceLock<Regex> = OnceLock::new();
    SUMMARY.get_or_init(|| Regex::new(r"(?s)<summary>.*?</summary>").expect("valid regex"))
}

/// Remove every `<summary>...</summary>` region, including ones spanning lines
pub fn strip_summary(text: &str) -> String {
    summary_regex().replace_all(text, "").into_owned()
}

/// Interpret one line of the event stream.
///
/// Returns the cleaned reply when the line is a completed event carrying
/// text. Anything else (other events, comments, malformed JSON, completed
/// events without the expected payload) yields `None`.
pub fn completed_reply(line: &str) -> Option<String> {
    let payload = line.strip_prefix("data:")?.trim_start();

    let event: QueueEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            debug!("Skipping malformed event line: {}", e);
            return None;
        }
    };

    if event.msg.as_deref() != Some(PROCESS_COMPLETED) {
        return None;
    }

    let output = event.output?;
    let has_history = output
        .pointer("/data/0")
        .and_then(Value::as_array)
        .map_or(false, |history| !history.is_empty());
    if !has_history {
        debug!("Completed event without chat history");
        return None;
    }

    match output.pointer(REPLY_TEXT_POINTER).and_then(Value::as_str) {
        Some(text) => Some(strip_summary(text)),
        None => {
            debug!("Completed event without reply text");
            None
        }
    }
}

/// Splits a byte stream into lines.
///
/// Bytes are buffered until a newline arrives so multi-byte characters split
/// across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(idx) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=idx).collect();
            let line = String::from_utf8_lossy(&raw[..idx]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Whatever is left once the stream has ended
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches('\r');
        (!line.is_empty()).then(|| line.to_string())
    }
}
