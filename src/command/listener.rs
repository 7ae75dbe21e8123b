use tokio::sync::mpsc;

use crate::buffer::LogLine;
use crate::event::JobEvent;

/// Observer of a supervised job
///
/// Listeners are called synchronously from the task driving the supervisor,
/// in registration order.
pub trait JobListener {
    /// A cleaned output line was produced
    fn on_line(&mut self, line: &LogLine);

    /// The process exited; called once per job
    fn on_finished(&mut self, exit_code: i32);
}

/// Listener forwarding every notification into a channel
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<JobEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn forward(&self, event: JobEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("job event receiver dropped");
        }
    }
}

impl JobListener for ChannelListener {
    fn on_line(&mut self, line: &LogLine) {
        self.forward(JobEvent::Line(line.clone()));
    }

    fn on_finished(&mut self, exit_code: i32) {
        self.forward(JobEvent::Finished { exit_code });
    }
}
