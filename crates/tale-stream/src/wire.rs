//! Reading a recorded wire transcript back into a round.

use tale_core::{Choice, ContentFrame, LineDecoder};

use crate::error::{StreamError, StreamResult};

/// A round read back from its wire framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRound {
    /// Concatenated content payloads.
    pub markup: String,
    /// Choices from the terminal frame.
    pub choices: Vec<Choice>,
    /// Number of content frames.
    pub frames: usize,
}

/// Decode a newline-delimited JSON transcript of exactly one round.
pub fn read_wire(transcript: &str) -> StreamResult<WireRound> {
    let mut decoder = LineDecoder::new();
    let mut decoded = decoder.push(transcript);
    decoded.extend(decoder.finish());

    let mut markup = String::new();
    let mut frames = 0;
    let mut choices = None;
    for frame in decoded {
        match frame? {
            ContentFrame::Content { .. } if choices.is_some() => {
                return Err(StreamError::Sequence(
                    "content frame after the terminal frame".to_string(),
                ));
            }
            ContentFrame::Content { payload } => {
                markup.push_str(&payload);
                frames += 1;
            }
            ContentFrame::Complete { .. } if choices.is_some() => {
                return Err(StreamError::Sequence("second terminal frame".to_string()));
            }
            ContentFrame::Complete { choices: c } => choices = Some(c),
        }
    }
    let choices =
        choices.ok_or_else(|| StreamError::Sequence("missing terminal frame".to_string()))?;
    Ok(WireRound {
        markup,
        choices,
        frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_round() {
        let wire = concat!(
            "{\"type\":\"content\",\"data\":\"<Narrator>A door\"}\n",
            "{\"type\":\"content\",\"data\":\" creaks.</Narrator>\"}\n",
            "{\"type\":\"complete\",\"choices\":[{\"id\":\"enter\",\"text\":\"Step inside\"}]}\n",
        );
        let round = read_wire(wire).unwrap();
        assert_eq!(round.markup, "<Narrator>A door creaks.</Narrator>");
        assert_eq!(round.frames, 2);
        assert_eq!(round.choices, vec![Choice::new("enter", "Step inside")]);
    }

    #[test]
    fn missing_complete_is_an_error() {
        let wire = "{\"type\":\"content\",\"data\":\"x\"}\n";
        assert!(matches!(read_wire(wire), Err(StreamError::Sequence(_))));
    }

    #[test]
    fn content_after_complete_is_an_error() {
        let wire = "{\"type\":\"complete\",\"choices\":[]}\n{\"type\":\"content\",\"data\":\"x\"}";
        assert!(matches!(read_wire(wire), Err(StreamError::Sequence(_))));
    }

    #[test]
    fn bad_json_is_a_framing_error() {
        assert!(matches!(read_wire("{not json}\n"), Err(StreamError::Framing(_))));
    }
}
