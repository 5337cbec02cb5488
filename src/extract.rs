//! Structured field recovery from free-form model replies
//!
//! Replies are treated as hostile text: they may narrate reasoning, restate
//! drafts, wrap the answer in prose, or contain broken JSON. The extractor
//! collects every JSON object it can find and keeps the last usable one,
//! since later objects in a reasoning-style reply are usually the final answer.

use crate::inference::strip_summary;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Marker some models print before their final answer
pub const FINAL_OUTPUT_MARKER: &str = "Final Output";

/// The three fields recovered from a reply, trimmed. Empty means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedCompletion {
    pub title: String,
    pub description: String,
    pub category: String,
}

impl ParsedCompletion {
    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            title: field(object, "Title"),
            description: field(object, "Description"),
            category: field(object, "Category"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty() && self.category.is_empty()
    }
}

/// Recover the completion fields from a model reply.
///
/// Returns `None` when the reply is blank, holds no parseable JSON object,
/// or every object found leaves all three fields empty.
pub fn extract(reply: &str) -> Option<ParsedCompletion> {
    let text = reply.replace("\r\n", "\n");
    if text.trim().is_empty() {
        debug!("Reply is empty");
        return None;
    }

    let text = strip_summary(&text);
    let text = match text.split_once(FINAL_OUTPUT_MARKER) {
        Some((_, answer)) => answer,
        None => text.as_str(),
    };

    let objects = json_objects(text);
    if objects.is_empty() {
        debug!("No JSON object found in reply");
        return None;
    }

    let parsed = objects
        .iter()
        .rev()
        .map(ParsedCompletion::from_object)
        .find(|parsed| !parsed.is_empty());

    if parsed.is_none() {
        debug!(candidates = objects.len(), "Every JSON object in reply was empty");
    }
    parsed
}

/// Every JSON object embedded in `text`, in order of appearance.
///
/// Spans are found with a brace-depth scanner that skips braces inside string
/// literals. When a balanced span does not parse, scanning resumes just after
/// its opening brace so an object nested inside broken text is still found.
pub fn json_objects(text: &str) -> Vec<Map<String, Value>> {
    let bytes = text.as_bytes();
    let mut objects = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('{') {
        let open = pos + offset;
        let Some(close) = matching_brace(bytes, open) else {
            pos = open + 1;
            continue;
        };

        match serde_json::from_str::<Value>(&text[open..=close]) {
            Ok(Value::Object(object)) => {
                objects.push(object);
                pos = close + 1;
            }
            Ok(_) => pos = open + 1,
            Err(e) => {
                debug!(offset = open, "Skipping malformed JSON candidate: {}", e);
                pos = open + 1;
            }
        }
    }

    objects
}

/// Index of the `}` closing the `{` at `open`, if the span is balanced
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Field value by key, exact key first, then ASCII case-insensitive
fn field(object: &Map<String, Value>, key: &str) -> String {
    let value = object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    });

    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
