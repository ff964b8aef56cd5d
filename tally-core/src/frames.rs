//! Incremental decoder for the line-framed assistant stream.
//!
//! Wire format: UTF-8, one frame per `\n`-terminated line, `<code>:<json>`.
//!   0:  text delta (JSON string)
//!   9:  tool-call announcement `{toolCallId, toolName, args}`
//!   a:  tool-call result `{toolCallId, result}`
//! Anything else is raw text. A known code with a payload that does not
//! deserialize is also treated as raw text for that line only.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::message::{ConversationMessage, ToolCall};

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    TextDelta(String),
    ToolCall(ToolCall),
    ToolResult { tool_call_id: String, result: Value },
    RawFallback(String),
}

#[derive(Deserialize)]
struct ResultPayload {
    #[serde(rename = "toolCallId")]
    tool_call_id: String,
    #[serde(default)]
    result: Value,
}

/// Parse one complete line. Returns `None` for lines with nothing to apply.
pub fn parse_frame(line: &str) -> Option<Frame> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let typed = line.split_once(':').and_then(|(code, payload)| match code {
        "0" => serde_json::from_str::<String>(payload).ok().map(Frame::TextDelta),
        "9" => serde_json::from_str::<ToolCall>(payload).ok().map(Frame::ToolCall),
        "a" => serde_json::from_str::<ResultPayload>(payload)
            .ok()
            .map(|p| Frame::ToolResult {
                tool_call_id: p.tool_call_id,
                result: p.result,
            }),
        _ => None,
    });

    match typed {
        Some(frame) => Some(frame),
        None => raw_fallback(line),
    }
}

fn raw_fallback(line: &str) -> Option<Frame> {
    let text = line.strip_prefix("data:").unwrap_or(line).trim();
    if text.is_empty() {
        return None;
    }
    Some(Frame::RawFallback(text.to_string()))
}

/// Builds an assistant message from stream chunks split at arbitrary byte offsets.
#[derive(Debug, Clone)]
pub struct StreamDecoder {
    buf: Vec<u8>,
    message: ConversationMessage,
}

impl StreamDecoder {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            buf: Vec::new(),
            message: ConversationMessage::assistant(message_id, ""),
        }
    }

    /// Consume a chunk; only fully terminated lines are applied.
    /// Returns the number of frames applied.
    pub fn feed(&mut self, chunk: &[u8]) -> usize {
        let scan_from = self.buf.len();
        self.buf.extend_from_slice(chunk);
        if !chunk.contains(&b'\n') {
            return 0;
        }

        let mut applied = 0;
        let mut start = 0;
        // Bytes before scan_from were already known not to contain a newline.
        let mut i = scan_from;
        while i < self.buf.len() {
            if self.buf[i] == b'\n' {
                let line = String::from_utf8_lossy(&self.buf[start..i]).into_owned();
                if self.apply_line(&line) {
                    applied += 1;
                }
                start = i + 1;
            }
            i += 1;
        }
        self.buf.drain(..start);
        applied
    }

    /// The message as decoded so far
    pub fn message(&self) -> &ConversationMessage {
        &self.message
    }

    /// Flush the trailing partial line and return the final message.
    pub fn finish(mut self) -> ConversationMessage {
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.apply_line(&line);
        }
        self.message
    }

    fn apply_line(&mut self, line: &str) -> bool {
        match parse_frame(line) {
            Some(frame) => {
                self.apply(frame);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, frame: Frame) {
        match frame {
            Frame::TextDelta(delta) => self.message.push_delta(&delta),
            Frame::ToolCall(call) => {
                let id = call.id.clone();
                if !self.message.tool_invocations.announce(call) {
                    debug!(tool_call_id = %id, "duplicate tool-call announcement ignored");
                }
            }
            Frame::ToolResult { tool_call_id, result } => {
                if !self.message.tool_invocations.resolve(&tool_call_id, result) {
                    debug!(%tool_call_id, "tool result for unknown or completed call ignored");
                }
            }
            Frame::RawFallback(text) => {
                debug!(len = text.len(), "raw fallback line");
                self.message.push_line(&text);
            }
        }
    }
}
