use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::app::{App, JobStatus};
use crate::buffer::{LineSource, LogLine};

/// Rows taken by the console border
const BORDER_ROWS: u16 = 2;

/// TUI rendering handler
pub struct Renderer;

impl Renderer {
    /// Number of log lines that fit in a terminal of the given height
    pub fn visible_lines(height: u16) -> usize {
        // Status bar takes one row
        height.saturating_sub(BORDER_ROWS + 1) as usize
    }

    /// Render application state
    pub fn render(frame: &mut Frame, app: &App) {
        let [log_area, status_area] =
            Layout::vertical([Constraint::Min(BORDER_ROWS + 1), Constraint::Length(1)])
                .areas(frame.area());

        Self::render_console(frame, app, log_area);
        Self::render_status(frame, app, status_area);
    }

    fn render_console(frame: &mut Frame, app: &App, area: Rect) {
        let console = app.console();
        let height = area.height.saturating_sub(BORDER_ROWS) as usize;
        let skip = console.horizontal_scroll();

        let lines: Vec<Line> = console
            .buffer()
            .get_range(console.scroll_offset(), height)
            .into_iter()
            .map(|line| styled_line(line, skip))
            .collect();

        let title = format!(" {} ", app.invocation().command());
        let paragraph = Paragraph::new(lines).block(Block::bordered().title(title));
        frame.render_widget(paragraph, area);
    }

    fn render_status(frame: &mut Frame, app: &App, area: Rect) {
        let (label, color) = match app.status() {
            JobStatus::Pending => ("pending".to_string(), Color::Gray),
            JobStatus::Running => ("running".to_string(), Color::Yellow),
            JobStatus::Finished { exit_code: 0 } => ("finished".to_string(), Color::Green),
            JobStatus::Finished { exit_code } => (format!("failed ({})", exit_code), Color::Red),
            JobStatus::Failed { reason } => (format!("error: {}", reason), Color::Red),
        };
        let follow = if app.console().auto_scroll() { "on" } else { "off" };

        let status = Line::from(vec![
            Span::styled(
                format!(" {} ", label),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" follow:{} ", follow)),
            Span::styled(
                " s:stop q:quit j/k:scroll g/G:top/bottom f:follow",
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        frame.render_widget(Paragraph::new(status), area);
    }
}

fn styled_line(line: &LogLine, skip: usize) -> Line<'static> {
    let text: String = line.text.chars().skip(skip).collect();
    match line.source {
        LineSource::System => Line::from(Span::styled(
            text,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        LineSource::Stdout | LineSource::Stderr => Line::from(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Invocation, Supervisor};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render_to_string(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| Renderer::render(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn app_with_lines(lines: &[LogLine]) -> App {
        let mut app = App::new(
            Supervisor::default(),
            Invocation::new("yolo", ["train"]),
            100,
        );
        app.console_mut().set_visible_lines(10);
        for line in lines {
            app.console_mut().push(line.clone());
        }
        app
    }

    #[test]
    fn renderer_visible_lines_excludes_border_and_status() {
        assert_eq!(Renderer::visible_lines(10), 7);
        assert_eq!(Renderer::visible_lines(2), 0);
    }

    #[test]
    fn renderer_render_shows_lines_title_and_status() {
        let app = app_with_lines(&[
            LogLine::new(LineSource::Stdout, "Epoch 1/100"),
            LogLine::system("[system] done"),
        ]);

        let screen = render_to_string(&app, 60, 8);

        assert!(screen.contains("yolo"));
        assert!(screen.contains("Epoch 1/100"));
        assert!(screen.contains("[system] done"));
        assert!(screen.contains("pending"));
    }

    #[test]
    fn renderer_render_applies_horizontal_scroll() {
        let mut app = app_with_lines(&[LogLine::new(LineSource::Stdout, "abcdefXYZ")]);
        for _ in 0..6 {
            app.console_mut().scroll_right();
        }

        let screen = render_to_string(&app, 40, 6);

        assert!(screen.contains("XYZ"));
        assert!(!screen.contains("abcdef"));
    }

    #[test]
    fn renderer_render_starts_at_scroll_offset() {
        let lines: Vec<_> = (0..20)
            .map(|i| LogLine::new(LineSource::Stdout, format!("row-{:02}", i)))
            .collect();
        let mut app = app_with_lines(&lines);
        app.console_mut().set_visible_lines(Renderer::visible_lines(8));

        let screen = render_to_string(&app, 40, 8);

        // Following output: the last five rows are shown
        assert!(screen.contains("row-19"));
        assert!(screen.contains("row-15"));
        assert!(!screen.contains("row-14"));
    }
}
