use crate::buffer::{LogBuffer, LogLine};

/// Scrollable log view of the job's output
pub struct Console {
    buffer: LogBuffer,
    scroll_offset: usize,
    horizontal_scroll: usize,
    auto_scroll: bool,
    visible_lines: usize,
}

impl Console {
    /// Create a new console
    pub fn new(max_buffer_lines: usize) -> Self {
        Self {
            buffer: LogBuffer::new(max_buffer_lines),
            scroll_offset: 0,
            horizontal_scroll: 0,
            auto_scroll: true,
            visible_lines: 0,
        }
    }

    /// Add a log line
    ///
    /// A redraw replaces the newest line when both come from the same stream.
    pub fn push(&mut self, line: LogLine) {
        let redraws_last = line.replaces_previous
            && self
                .buffer
                .last()
                .is_some_and(|last| last.source == line.source);
        if redraws_last {
            self.buffer.replace_last(line);
        } else {
            self.buffer.push(line);
        }
        if self.auto_scroll {
            self.scroll_to_bottom();
        } else {
            // Eviction can shrink the scrollable range
            self.scroll_offset = self.scroll_offset.min(self.max_scroll_offset());
        }
    }

    /// Get reference to log buffer
    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    /// Set the number of visible lines
    pub fn set_visible_lines(&mut self, lines: usize) {
        self.visible_lines = lines;
        if self.auto_scroll {
            self.scroll_to_bottom();
        }
    }

    /// Get current scroll offset
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Scroll down by one line
    pub fn scroll_down(&mut self) {
        let max_offset = self.max_scroll_offset();
        if self.scroll_offset < max_offset {
            self.scroll_offset += 1;
        }
    }

    /// Scroll up by one line
    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    /// Scroll down by half page
    pub fn scroll_half_page_down(&mut self) {
        let half_page = self.visible_lines / 2;
        let max_offset = self.max_scroll_offset();
        self.scroll_offset = (self.scroll_offset + half_page).min(max_offset);
    }

    /// Scroll up by half page
    pub fn scroll_half_page_up(&mut self) {
        let half_page = self.visible_lines / 2;
        self.scroll_offset = self.scroll_offset.saturating_sub(half_page);
    }

    /// Scroll to top
    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    /// Scroll to bottom
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_scroll_offset();
    }

    /// Check if auto scroll is enabled
    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    /// Toggle auto scroll
    pub fn toggle_auto_scroll(&mut self) {
        self.auto_scroll = !self.auto_scroll;
        if self.auto_scroll {
            self.scroll_to_bottom();
        }
    }

    /// Set auto scroll
    pub fn set_auto_scroll(&mut self, enabled: bool) {
        self.auto_scroll = enabled;
    }

    /// Get current horizontal scroll offset
    pub fn horizontal_scroll(&self) -> usize {
        self.horizontal_scroll
    }

    /// Scroll left by one character
    pub fn scroll_left(&mut self) {
        self.horizontal_scroll = self.horizontal_scroll.saturating_sub(1);
    }

    /// Scroll right by one character
    pub fn scroll_right(&mut self) {
        self.horizontal_scroll += 1;
    }

    /// Scroll to leftmost position
    pub fn scroll_to_left(&mut self) {
        self.horizontal_scroll = 0;
    }

    /// Clear the log and reset scroll positions
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scroll_offset = 0;
        self.horizontal_scroll = 0;
        self.auto_scroll = true;
    }

    fn max_scroll_offset(&self) -> usize {
        self.buffer.len().saturating_sub(self.visible_lines)
    }
}
