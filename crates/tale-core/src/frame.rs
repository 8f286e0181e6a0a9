//! Transport frames and their wire encoding.
//!
//! On the wire every frame is one JSON object on its own line:
//!
//! ```text
//! {"type":"content","data":"<Narrator>A door"}
//! {"type":"content","data":" creaks.</Narrator>"}
//! {"type":"complete","choices":[{"id":"enter","text":"Step inside"}]}
//! ```

use serde::{Deserialize, Serialize};

use crate::choice::Choice;
use crate::error::{CoreError, CoreResult};

/// One delivery unit from the transport.
///
/// A round is any number of `Content` frames followed by exactly one
/// `Complete` frame. Concatenating the content payloads in order reproduces
/// the generator's markup for the round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentFrame {
    /// A fragment of markup. Boundaries carry no meaning.
    Content {
        /// The fragment text.
        #[serde(rename = "data")]
        payload: String,
    },
    /// End of round, carrying the decision set. Empty means the story ended.
    Complete {
        /// Choices for the upcoming choice point.
        #[serde(default)]
        choices: Vec<Choice>,
    },
}

impl ContentFrame {
    /// Build a content frame.
    pub fn content(payload: impl Into<String>) -> Self {
        Self::Content {
            payload: payload.into(),
        }
    }

    /// Build a terminal frame.
    pub fn complete(choices: Vec<Choice>) -> Self {
        Self::Complete { choices }
    }

    /// Whether this is the terminal frame of a round.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Encode a frame as a single JSON line (without the trailing newline).
pub fn encode_frame(frame: &ContentFrame) -> CoreResult<String> {
    Ok(serde_json::to_string(frame)?)
}

/// Decode a single JSON line into a frame.
pub fn decode_frame(line: &str) -> CoreResult<ContentFrame> {
    match serde_json::from_str::<ContentFrame>(line) {
        Ok(frame) => Ok(frame),
        Err(err) => {
            // Distinguish "well-formed but unknown type" from garbage.
            let value: serde_json::Value = serde_json::from_str(line)?;
            match value.get("type").and_then(|t| t.as_str()) {
                Some(kind) if kind != "content" && kind != "complete" => {
                    Err(CoreError::UnknownFrameType(kind.to_string()))
                }
                _ => Err(CoreError::Frame(err)),
            }
        }
    }
}

/// Reassembles newline-delimited frames from arbitrarily split input.
#[derive(Debug, Default)]
pub struct LineDecoder {
    partial: String,
}

impl LineDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of wire text, returning every frame completed by it.
    ///
    /// Blank lines are skipped. A bad line yields an error in its position
    /// without disturbing the lines around it.
    pub fn push(&mut self, chunk: &str) -> Vec<CoreResult<ContentFrame>> {
        self.partial.push_str(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            let line = line.trim();
            if !line.is_empty() {
                frames.push(decode_frame(line));
            }
        }
        frames
    }

    /// Decode whatever remains after the input ends without a newline.
    pub fn finish(&mut self) -> Option<CoreResult<ContentFrame>> {
        let rest = std::mem::take(&mut self.partial);
        let rest = rest.trim();
        (!rest.is_empty()).then(|| decode_frame(rest))
    }

    /// Whether unterminated input is buffered.
    pub fn has_partial(&self) -> bool {
        !self.partial.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_content_frame() {
        let line = encode_frame(&ContentFrame::content("<Narr")).unwrap();
        assert_eq!(line, r#"{"type":"content","data":"<Narr"}"#);
    }

    #[test]
    fn encode_complete_frame() {
        let line = encode_frame(&ContentFrame::complete(vec![Choice::new("a", "Go")])).unwrap();
        assert_eq!(
            line,
            r#"{"type":"complete","choices":[{"id":"a","text":"Go"}]}"#
        );
    }

    #[test]
    fn decode_complete_without_choices_field() {
        let frame = decode_frame(r#"{"type":"complete"}"#).unwrap();
        assert_eq!(frame, ContentFrame::complete(Vec::new()));
        assert!(frame.is_complete());
    }

    #[test]
    fn decode_unknown_type() {
        let err = decode_frame(r#"{"type":"heartbeat"}"#).unwrap_err();
        assert!(matches!(err, CoreError::UnknownFrameType(t) if t == "heartbeat"));
    }

    #[test]
    fn decode_garbage() {
        assert!(matches!(decode_frame("not json"), Err(CoreError::Frame(_))));
        assert!(matches!(
            decode_frame(r#"{"type":"content"}"#),
            Err(CoreError::Frame(_))
        ));
    }

    #[test]
    fn line_decoder_handles_split_lines() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(r#"{"type":"content","#).is_empty());
        assert!(dec.has_partial());
        let frames = dec.push("\"data\":\"ab\"}\n\n{\"type\":\"comp");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap(), &ContentFrame::content("ab"));

        let frames = dec.push("lete\",\"choices\":[]}\n");
        assert_eq!(
            frames[0].as_ref().unwrap(),
            &ContentFrame::complete(Vec::new())
        );
        assert!(!dec.has_partial());
        assert!(dec.finish().is_none());
    }

    #[test]
    fn line_decoder_reports_bad_line_and_continues() {
        let mut dec = LineDecoder::new();
        let frames = dec.push("oops\n{\"type\":\"content\",\"data\":\"x\"}\n");
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_err());
        assert!(frames[1].is_ok());
    }

    #[test]
    fn line_decoder_finish_decodes_trailing_line() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(r#"{"type":"complete","choices":[]}"#).is_empty());
        let last = dec.finish().unwrap().unwrap();
        assert!(last.is_complete());
    }
}
