//! SSE line and frame parsing
//!
//! Splits a decoded response body into frames. A frame is the block of
//! `event:`/`data:` lines between two blank lines.

/// Represents a parsed SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Event type declaration (e.g., "event: progress")
    Event(String),
    /// Data payload (e.g., "data: {\"step\": \"plan\"}")
    Data(String),
    /// Empty line - signals end of a frame
    Empty,
    /// Comment line (starts with ':') or an SSE field we don't use
    Comment(String),
}

/// One complete SSE frame: an optional event name plus its data lines in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// Name from the `event:` line, if any
    pub event_name: Option<String>,
    /// Payload lines from each `data:` line
    pub data_lines: Vec<String>,
}

impl Frame {
    pub fn new(event_name: Option<String>, data_lines: Vec<String>) -> Self {
        Self {
            event_name,
            data_lines,
        }
    }

    /// The frame payload, data lines joined with newlines.
    pub fn data(&self) -> String {
        self.data_lines.join("\n")
    }
}

/// Parse a single SSE line into its component type
pub fn parse_sse_line(line: &str) -> SseLine {
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        // Only the single separator space belongs to the framing
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        return SseLine::Data(rest.to_string());
    }

    // id:, retry: and anything unrecognised
    SseLine::Comment(line.to_string())
}

/// Stateful frame parser that accumulates lines and emits complete frames.
///
/// Tied to one response body; call [`FrameParser::reset`] before reusing it.
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Current event name being accumulated
    current_event: Option<String>,
    /// Accumulated data lines (SSE allows multiple data: lines)
    current_data: Vec<String>,
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a line to the parser, returning a frame when a blank line
    /// closes a block that carried at least one data line.
    pub fn feed_line(&mut self, line: &str) -> Option<Frame> {
        match parse_sse_line(line) {
            SseLine::Event(name) => {
                self.current_event = Some(name);
                None
            }
            SseLine::Data(data) => {
                self.current_data.push(data);
                None
            }
            SseLine::Empty => {
                if self.current_data.is_empty() {
                    // An event name with no data never becomes a frame
                    self.current_event = None;
                    return None;
                }
                Some(Frame {
                    event_name: self.current_event.take(),
                    data_lines: std::mem::take(&mut self.current_data),
                })
            }
            SseLine::Comment(_) => None,
        }
    }

    /// Whether a partially accumulated frame is pending.
    pub fn has_pending(&self) -> bool {
        self.current_event.is_some() || !self.current_data.is_empty()
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.current_event = None;
        self.current_data.clear();
    }
}

/// Lazy iterator of frames over a sequence of lines.
///
/// A trailing block without a closing blank line is dropped.
#[derive(Debug)]
pub struct Frames<I> {
    lines: I,
    parser: FrameParser,
}

impl<I, S> Iterator for Frames<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        for line in self.lines.by_ref() {
            if let Some(frame) = self.parser.feed_line(line.as_ref()) {
                return Some(frame);
            }
        }
        None
    }
}

/// Parse frames lazily from any sequence of lines.
pub fn parse_frames<I, S>(lines: I) -> Frames<I::IntoIter>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Frames {
        lines: lines.into_iter(),
        parser: FrameParser::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(parse_sse_line(""), SseLine::Empty);
        assert_eq!(parse_sse_line("\r"), SseLine::Empty);
    }

    #[test]
    fn test_parse_comment_line() {
        assert_eq!(
            parse_sse_line(": keep-alive"),
            SseLine::Comment("keep-alive".to_string())
        );
        assert_eq!(parse_sse_line(":"), SseLine::Comment(String::new()));
    }

    #[test]
    fn test_parse_event_line() {
        assert_eq!(
            parse_sse_line("event: progress"),
            SseLine::Event("progress".to_string())
        );
        assert_eq!(
            parse_sse_line("event:   tool_call_start  "),
            SseLine::Event("tool_call_start".to_string())
        );
    }

    #[test]
    fn test_parse_data_line_keeps_inner_whitespace() {
        assert_eq!(
            parse_sse_line("data: {\"a\": 1}"),
            SseLine::Data("{\"a\": 1}".to_string())
        );
        assert_eq!(parse_sse_line("data:x"), SseLine::Data("x".to_string()));
        assert_eq!(
            parse_sse_line("data:   indented"),
            SseLine::Data("  indented".to_string())
        );
        assert_eq!(parse_sse_line("data: a\r"), SseLine::Data("a".to_string()));
    }

    #[test]
    fn test_parse_unknown_fields_are_ignored() {
        assert!(matches!(parse_sse_line("id: 42"), SseLine::Comment(_)));
        assert!(matches!(parse_sse_line("retry: 1000"), SseLine::Comment(_)));
    }

    #[test]
    fn test_parser_emits_on_blank_line() {
        let mut parser = FrameParser::new();
        assert!(parser.feed_line("event: connected").is_none());
        assert!(parser.feed_line(r#"data: {"sessionId":"abc"}"#).is_none());

        let frame = parser.feed_line("").unwrap();
        assert_eq!(frame.event_name.as_deref(), Some("connected"));
        assert_eq!(frame.data(), r#"{"sessionId":"abc"}"#);
        assert!(!parser.has_pending());
    }

    #[test]
    fn test_parser_joins_multiple_data_lines() {
        let mut parser = FrameParser::new();
        parser.feed_line("event: final");
        parser.feed_line("data: {\"content\":");
        parser.feed_line("data: \"hi\"}");
        let frame = parser.feed_line("").unwrap();
        assert_eq!(frame.data_lines.len(), 2);
        assert_eq!(frame.data(), "{\"content\":\n\"hi\"}");
    }

    #[test]
    fn test_parser_blank_without_data_emits_nothing() {
        let mut parser = FrameParser::new();
        parser.feed_line("event: heartbeat");
        assert!(parser.feed_line("").is_none());

        // The dangling name must not leak into the next frame
        parser.feed_line("data: {}");
        let frame = parser.feed_line("").unwrap();
        assert_eq!(frame.event_name, None);
    }

    #[test]
    fn test_parser_ignores_comments_between_lines() {
        let mut parser = FrameParser::new();
        parser.feed_line(": keep-alive");
        parser.feed_line("event: progress");
        parser.feed_line(": another");
        parser.feed_line("data: {}");
        let frame = parser.feed_line("").unwrap();
        assert_eq!(frame.event_name.as_deref(), Some("progress"));
    }

    #[test]
    fn test_parser_reset() {
        let mut parser = FrameParser::new();
        parser.feed_line("event: final");
        parser.feed_line("data: {}");
        assert!(parser.has_pending());
        parser.reset();
        assert!(parser.feed_line("").is_none());
    }

    #[test]
    fn test_parse_frames_drops_unterminated_tail() {
        let body = "event: a\ndata: 1\n\nevent: b\ndata: 2\n\nevent: c\ndata: 3";
        let frames: Vec<Frame> = parse_frames(body.lines()).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event_name.as_deref(), Some("a"));
        assert_eq!(frames[1].data(), "2");
    }

    #[test]
    fn test_parse_frames_preserves_data_order() {
        let lines = vec![
            "event: x", "data: one", "data: two", "", "data: three", "",
        ];
        let frames: Vec<Frame> = parse_frames(lines).collect();
        let joined: Vec<String> = frames.iter().map(Frame::data).collect();
        assert_eq!(joined, vec!["one\ntwo".to_string(), "three".to_string()]);
    }

    #[test]
    fn test_parse_frames_handles_crlf() {
        let body = "event: final\r\ndata: {}\r\n\r\n";
        let frames: Vec<Frame> = parse_frames(body.split('\n')).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data(), "{}");
    }
}
