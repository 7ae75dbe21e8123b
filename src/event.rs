use crate::buffer::LogLine;

/// Notification produced by a supervised job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// Cleaned output line from stdout or stderr
    Line(LogLine),
    /// Process exited; delivered once per job
    Finished { exit_code: i32 },
}
