use std::collections::VecDeque;

/// Where a log line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
    Stdout,
    Stderr,
    /// Message added by the front-end itself (termination, exit status)
    System,
}

/// One cleaned line of job output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Origin of the line
    pub source: LineSource,
    /// Decoded text without control sequences or surrounding whitespace
    pub text: String,
    /// Redraws the previous line of the same source (progress bars)
    pub replaces_previous: bool,
}

impl LogLine {
    /// Create a new LogLine
    pub fn new(source: LineSource, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
            replaces_previous: false,
        }
    }

    /// Create a line that overwrites the previous line of its source
    pub fn redraw(source: LineSource, text: impl Into<String>) -> Self {
        Self {
            replaces_previous: true,
            ..Self::new(source, text)
        }
    }

    /// Create a front-end message line
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(LineSource::System, text)
    }
}

/// Ring buffer for log lines
///
/// When max lines is exceeded, old lines are automatically discarded.
/// Uses VecDeque internally for O(1) removal from the front.
pub struct LogBuffer {
    lines: VecDeque<LogLine>,
    max_lines: usize,
}

impl LogBuffer {
    /// Create a buffer with specified max lines
    ///
    /// # Arguments
    /// * `max_lines` - Maximum number of lines to keep (0 for unlimited)
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines,
        }
    }

    /// Add a log line
    ///
    /// When max_lines is exceeded, the oldest line is discarded.
    pub fn push(&mut self, line: LogLine) {
        if self.max_lines > 0 && self.lines.len() >= self.max_lines {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Overwrite the newest line, or add it when the buffer is empty
    pub fn replace_last(&mut self, line: LogLine) {
        match self.lines.back_mut() {
            Some(last) => *last = line,
            None => self.lines.push_back(line),
        }
    }

    /// Get the newest line
    pub fn last(&self) -> Option<&LogLine> {
        self.lines.back()
    }

    /// Get lines in specified range
    ///
    /// Empty or partial result if out of bounds.
    pub fn get_range(&self, start: usize, count: usize) -> Vec<&LogLine> {
        self.lines.iter().skip(start).take(count).collect()
    }

    /// Return the number of lines in the buffer
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Remove every line
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Return an iterator over all lines
    pub fn iter(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stdout(text: &str) -> LogLine {
        LogLine::new(LineSource::Stdout, text)
    }

    #[test]
    fn log_buffer_push_adds_line_to_buffer() {
        let mut buffer = LogBuffer::new(100);
        buffer.push(stdout("hello"));

        assert_eq!(buffer.len(), 1);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn log_buffer_push_discards_oldest_line_when_max_exceeded() {
        let mut buffer = LogBuffer::new(3);
        for text in ["line1", "line2", "line3", "line4"] {
            buffer.push(stdout(text));
        }

        assert_eq!(buffer.len(), 3);
        let texts: Vec<_> = buffer.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["line2", "line3", "line4"]);
    }

    #[test]
    fn log_buffer_push_unlimited_when_max_lines_is_zero() {
        let mut buffer = LogBuffer::new(0);
        for i in 0..1000 {
            buffer.push(stdout(&format!("line{}", i)));
        }

        assert_eq!(buffer.len(), 1000);
    }

    #[test]
    fn log_buffer_get_range_returns_partial_when_exceeds_buffer() {
        let mut buffer = LogBuffer::new(100);
        for i in 0..5 {
            buffer.push(stdout(&format!("line{}", i)));
        }

        let lines = buffer.get_range(3, 10);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "line3");
        assert_eq!(lines[1].text, "line4");
        assert!(buffer.get_range(10, 5).is_empty());
    }

    #[test]
    fn log_buffer_replace_last_overwrites_newest_line() {
        let mut buffer = LogBuffer::new(100);
        buffer.replace_last(stdout("10%"));
        buffer.push(stdout("20%"));
        buffer.replace_last(stdout("30%"));

        let texts: Vec<_> = buffer.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["10%", "30%"]);
        assert_eq!(buffer.last().map(|l| l.text.as_str()), Some("30%"));
    }

    #[test]
    fn log_buffer_clear_removes_all_lines() {
        let mut buffer = LogBuffer::new(100);
        buffer.push(stdout("a"));
        buffer.push(LogLine::system("[system] done"));

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn log_line_system_sets_source() {
        let line = LogLine::system("[system] training completed successfully");
        assert_eq!(line.source, LineSource::System);
    }
}
