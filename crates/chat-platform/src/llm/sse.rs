//! Decoder for OpenAI-style Server-Sent Events.
//!
//! Bytes arrive in arbitrary chunks; lines are only decoded once complete,
//! so multi-byte characters and JSON payloads split across chunks survive.
//! Each `data:` line carries one chat-completion chunk, and `data: [DONE]`
//! ends the stream.

use serde::Deserialize;
use chat_core::ports::CompletionEvent;
use chat_types::ChatError;

const DONE_MARKER: &str = "[DONE]";

pub struct SseDecoder {
    buffer: Vec<u8>,
    /// HTTP status of the response; attached to in-stream errors
    status: u16,
    done: bool,
}

impl SseDecoder {
    pub fn new(status: u16) -> Self {
        Self {
            buffer: Vec::new(),
            status,
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes, returning events for every line completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<CompletionEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line, &mut events);
        }
        events
    }

    /// Flush a final line that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<CompletionEvent> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(&line, &mut events);
        }
        events
    }

    fn decode_line(&mut self, raw: &[u8], events: &mut Vec<CompletionEvent>) {
        if self.done {
            return;
        }
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\r', '\n']);

        // Blank separators, `:` comments and non-data fields carry no content.
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data == DONE_MARKER {
            self.done = true;
            events.push(CompletionEvent::Done);
            return;
        }

        let chunk: StreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.done = true;
                events.push(CompletionEvent::Error(ChatError::Serialization(format!(
                    "Malformed stream chunk: {}",
                    e
                ))));
                return;
            }
        };

        if let Some(error) = chunk.error {
            self.done = true;
            events.push(CompletionEvent::Error(ChatError::Upstream {
                status: self.status,
                message: error.message,
            }));
            return;
        }

        for choice in chunk.choices {
            if let Some(content) = choice.delta.and_then(|d| d.content) {
                if !content.is_empty() {
                    events.push(CompletionEvent::Delta(content));
                }
            }
            if choice.finish_reason.is_some() {
                self.done = true;
                events.push(CompletionEvent::Done);
                return;
            }
        }
    }
}

// ─── Wire types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"index\":0,\"delta\":{{\"content\":{}}},\"finish_reason\":null}}]}}\n\n",
            serde_json::to_string(content).unwrap()
        )
    }

    fn delta(text: &str) -> CompletionEvent {
        CompletionEvent::Delta(text.to_string())
    }

    #[test]
    fn test_decodes_deltas_and_done() {
        let mut decoder = SseDecoder::new(200);
        let body = format!("{}{}data: [DONE]\n\n", chunk("Hel"), chunk("lo"));
        let events = decoder.feed(body.as_bytes());
        assert_eq!(events, vec![delta("Hel"), delta("lo"), CompletionEvent::Done]);
        assert!(decoder.is_done());
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = SseDecoder::new(200);
        let body = chunk("héllo");
        let bytes = body.as_bytes();
        // Split inside the two-byte 'é'
        let split = body.find('é').unwrap() + 1;
        assert!(decoder.feed(&bytes[..split]).is_empty());
        assert_eq!(decoder.feed(&bytes[split..]), vec![delta("héllo")]);
    }

    #[test]
    fn test_role_only_and_empty_deltas_are_skipped() {
        let mut decoder = SseDecoder::new(200);
        let body = "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n\n";
        assert!(decoder.feed(body.as_bytes()).is_empty());
    }

    #[test]
    fn test_finish_reason_ends_stream() {
        let mut decoder = SseDecoder::new(200);
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"!\"},\"finish_reason\":\"stop\"}]}\n\n\
                    data: [DONE]\n\n";
        assert_eq!(decoder.feed(body.as_bytes()), vec![delta("!"), CompletionEvent::Done]);
    }

    #[test]
    fn test_comments_and_crlf() {
        let mut decoder = SseDecoder::new(200);
        let body = ": keep-alive\r\n\r\ndata:{\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\r\n\r\n";
        assert_eq!(decoder.feed(body.as_bytes()), vec![delta("x")]);
    }

    #[test]
    fn test_in_stream_error() {
        let mut decoder = SseDecoder::new(200);
        let body = "data: {\"error\":{\"message\":\"overloaded\",\"type\":\"server_error\"}}\n\n";
        assert_eq!(
            decoder.feed(body.as_bytes()),
            vec![CompletionEvent::Error(ChatError::Upstream {
                status: 200,
                message: "overloaded".to_string(),
            })]
        );
    }

    #[test]
    fn test_malformed_chunk_is_error() {
        let mut decoder = SseDecoder::new(200);
        let events = decoder.feed(b"data: {not json}\n");
        assert!(matches!(events.as_slice(), [CompletionEvent::Error(ChatError::Serialization(_))]));
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new(200);
        assert!(decoder.feed(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), vec![CompletionEvent::Done]);
    }

    #[test]
    fn test_nothing_after_done() {
        let mut decoder = SseDecoder::new(200);
        let body = format!("data: [DONE]\n\n{}", chunk("late"));
        assert_eq!(decoder.feed(body.as_bytes()), vec![CompletionEvent::Done]);
    }
}
