//! Decoding of streamed completions: `data: {json}` frames separated by
//! newlines, each carrying `choices[0].delta.content`.
//!
//! Network chunks do not respect frame boundaries, so bytes are buffered until
//! a full line is available. That also keeps multi-byte UTF-8 sequences intact
//! when they straddle two chunks.

use serde::Deserialize;

use crate::constants::{STREAM_DONE_SENTINEL, STREAM_FRAME_MARKER};
use crate::error::ChatError;

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    done: bool,
    failed: bool,
}

impl FrameDecoder {
    /// Feeds one network chunk and returns what its completed lines decoded
    /// to, in order. Decoding stops for good at the first malformed frame.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, ChatError>> {
        self.buffer.extend_from_slice(chunk);
        let mut decoded = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if !self.collect_line(&line, &mut decoded) {
                break;
            }
        }
        decoded
    }

    /// Flushes a trailing frame that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<Result<String, ChatError>> {
        let rest = std::mem::take(&mut self.buffer);
        let mut decoded = Vec::new();
        self.collect_line(&rest, &mut decoded);
        decoded
    }

    fn collect_line(&mut self, raw: &[u8], decoded: &mut Vec<Result<String, ChatError>>) -> bool {
        match self.decode_line(raw) {
            Ok(Some(delta)) => decoded.push(Ok(delta)),
            Ok(None) => {}
            Err(e) => {
                self.failed = true;
                self.buffer.clear();
                decoded.push(Err(e));
                return false;
            }
        }
        true
    }

    fn decode_line(&mut self, raw: &[u8]) -> Result<Option<String>, ChatError> {
        if self.done || self.failed {
            return Ok(None);
        }
        let line = std::str::from_utf8(raw)
            .map_err(|e| ChatError::MalformedFrame(format!("invalid UTF-8: {}", e)))?
            .trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(payload) = line.strip_prefix(STREAM_FRAME_MARKER) else {
            // event:, id: and comment lines carry no content
            return Ok(None);
        };
        let payload = payload.trim();
        if payload == STREAM_DONE_SENTINEL {
            self.done = true;
            return Ok(None);
        }
        let chunk: StreamChunk = serde_json::from_str(payload)
            .map_err(|e| ChatError::MalformedFrame(format!("{}: {}", e, payload)))?;
        Ok(chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    fn ok(decoded: Vec<Result<String, ChatError>>) -> Vec<String> {
        decoded.into_iter().map(|d| d.unwrap()).collect()
    }

    #[test]
    fn test_frames_in_one_chunk() {
        let mut decoder = FrameDecoder::default();
        let body = format!("{}{}", frame("Hel"), frame("lo"));
        assert_eq!(ok(decoder.push(body.as_bytes())), vec!["Hel", "lo"]);
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = FrameDecoder::default();
        let body = frame("Bonjour ✨");
        let (first, second) = body.as_bytes().split_at(body.len() - 7);

        assert!(decoder.push(first).is_empty());
        assert_eq!(ok(decoder.push(second)), vec!["Bonjour ✨"]);
    }

    #[test]
    fn test_split_inside_multibyte_character() {
        let mut decoder = FrameDecoder::default();
        let body = frame("é");
        let split = body.find('é').unwrap() + 1;
        let (first, second) = body.as_bytes().split_at(split);

        assert!(decoder.push(first).is_empty());
        assert_eq!(ok(decoder.push(second)), vec!["é"]);
    }

    #[test]
    fn test_role_only_and_non_data_lines_are_skipped() {
        let mut decoder = FrameDecoder::default();
        let body = concat!(
            ": keep-alive\n",
            "event: message\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"},\"finish_reason\":null}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n",
        );
        assert_eq!(ok(decoder.push(body.as_bytes())), vec!["Hi"]);
    }

    #[test]
    fn test_malformed_frame_keeps_earlier_deltas_and_stops() {
        let mut decoder = FrameDecoder::default();
        let body = format!("{}data: {{\"choices\": [\n{}", frame("ok"), frame("late"));

        let decoded = decoder.push(body.as_bytes());
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].as_deref().unwrap(), "ok");
        assert!(matches!(decoded[1], Err(ChatError::MalformedFrame(_))));

        assert!(decoder.push(frame("after").as_bytes()).is_empty());
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_finish_flushes_unterminated_frame() {
        let mut decoder = FrameDecoder::default();
        let body = frame("tail");
        assert!(decoder.push(body.trim_end().as_bytes()).is_empty());
        assert_eq!(ok(decoder.finish()), vec!["tail"]);
        assert!(decoder.finish().is_empty());
    }
}
