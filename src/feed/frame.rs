use super::FeedMessage;
use crate::error::Result;

/// Splits a line stream into message payloads.
///
/// Understands Server-Sent-Events framing (`data:` lines terminated by a blank
/// line) and bare JSON lines, so a captured event stream and a JSON-lines log
/// can both be replayed.
#[derive(Default)]
pub struct FrameDecoder {
    data: Vec<String>,
    /// The open frame lost a line and is dropped at its terminator
    skipping: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (with or without its terminator). Returns a payload when
    /// the line completes a frame.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end_matches(['\n', '\r']);

        if line.is_empty() {
            if self.skipping {
                self.skipping = false;
                self.data.clear();
                return None;
            }
            return self.take();
        }

        if line.starts_with(':') || self.skipping {
            return None;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            self.data.push(rest.to_string());
            return None;
        }

        if self.data.is_empty() && line.trim_start().starts_with('{') {
            return Some(line.to_string());
        }

        // event:, id:, retry: and unknown fields carry nothing we use
        None
    }

    /// Drop the frame currently being assembled, along with its remaining
    /// lines up to the next blank line.
    pub fn skip_frame(&mut self) {
        self.data.clear();
        self.skipping = true;
    }

    /// Flush a frame left open at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.skipping {
            self.skipping = false;
            self.data.clear();
            return None;
        }
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}

pub fn parse_frame(payload: &str) -> Result<FeedMessage> {
    Ok(serde_json::from_str(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_frame() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push_line(": keep-alive\n"), None);
        assert_eq!(decoder.push_line("event: tick\n"), None);
        assert_eq!(decoder.push_line("data: {\"apps\":[],\n"), None);
        assert_eq!(decoder.push_line("data: \"sample\":null}\r\n"), None);
        let payload = decoder.push_line("\n").unwrap();
        assert_eq!(payload, "{\"apps\":[],\n\"sample\":null}");

        let msg = parse_frame(&payload).unwrap();
        assert!(msg.apps.is_empty());
        assert!(msg.sample.is_none());
    }

    #[test]
    fn test_json_lines() {
        let mut decoder = FrameDecoder::new();
        let payload = decoder.push_line("{\"apps\":[]}\n").unwrap();
        assert_eq!(payload, "{\"apps\":[]}");
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_blank_lines_between_frames() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push_line(""), None);
        assert_eq!(decoder.push_line(""), None);
    }

    #[test]
    fn test_unterminated_frame_flushed_at_end() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push_line("data: {}"), None);
        assert_eq!(decoder.finish().as_deref(), Some("{}"));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_skipped_frame_drops_remaining_lines() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push_line("data: {\"apps\":"), None);
        decoder.skip_frame();
        assert_eq!(decoder.push_line("data: []}"), None);
        assert_eq!(decoder.push_line(""), None);
        assert_eq!(decoder.push_line("data: {}"), None);
        assert_eq!(decoder.push_line("").as_deref(), Some("{}"));
    }

    #[test]
    fn test_malformed_payload() {
        assert!(parse_frame("{not json").is_err());
    }
}
