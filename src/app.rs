use tokio::sync::mpsc;
use tracing::warn;

use crate::buffer::LogLine;
use crate::command::{ChannelListener, Invocation, Supervisor};
use crate::event::JobEvent;
use crate::tui::Console;

/// Console message appended after a manual stop
pub const TERMINATED_MESSAGE: &str = "[system] training terminated manually";

/// Training job status as shown in the status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Not started yet
    Pending,
    /// Running
    Running,
    /// Finished with exit code
    Finished { exit_code: i32 },
    /// Failed to start
    Failed { reason: String },
}

/// Console message describing how the job ended
pub fn finish_message(exit_code: i32) -> String {
    if exit_code == 0 {
        "[system] training completed successfully".to_string()
    } else {
        format!("[system] training exited abnormally (code {})", exit_code)
    }
}

/// Application state
pub struct App {
    supervisor: Supervisor,
    invocation: Invocation,
    events: mpsc::UnboundedReceiver<JobEvent>,
    console: Console,
    status: JobStatus,
    should_quit: bool,
    stop_requested: bool,
    terminated_manually: bool,
}

impl App {
    /// Initialize the application
    pub fn new(mut supervisor: Supervisor, invocation: Invocation, max_buffer_lines: usize) -> Self {
        let (listener, events) = ChannelListener::new();
        supervisor.subscribe(Box::new(listener));
        Self {
            supervisor,
            invocation,
            events,
            console: Console::new(max_buffer_lines),
            status: JobStatus::Pending,
            should_quit: false,
            stop_requested: false,
            terminated_manually: false,
        }
    }

    /// Start the training job
    pub fn start_job(&mut self) {
        self.console.clear();
        self.terminated_manually = false;
        match self.supervisor.start(&self.invocation) {
            Ok(()) => self.status = JobStatus::Running,
            Err(e) => {
                warn!(error = %e, "failed to start training job");
                self.console
                    .push(LogLine::system(format!("[system] failed to start training: {}", e)));
                self.status = JobStatus::Failed {
                    reason: e.to_string(),
                };
            }
        }
    }

    /// Dispatch available job output without blocking
    pub fn poll_job(&mut self) {
        if let Err(e) = self.supervisor.poll() {
            warn!(error = %e, "failed to poll training job");
            self.console
                .push(LogLine::system(format!("[system] lost track of training: {}", e)));
        }
        self.drain_events();
    }

    /// Ask the main loop to stop the running job
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Take the pending stop request, if any
    pub fn take_stop_request(&mut self) -> bool {
        std::mem::take(&mut self.stop_requested)
    }

    /// Kill the running job and log the manual termination
    pub async fn stop_job(&mut self) {
        if !self.supervisor.is_running() {
            return;
        }
        self.terminated_manually = true;
        if let Err(e) = self.supervisor.terminate().await {
            warn!(error = %e, "failed to terminate training job");
            self.console
                .push(LogLine::system(format!("[system] failed to stop training: {}", e)));
        }
        self.drain_events();
    }

    /// Kill any running job before exiting
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.supervisor.terminate().await {
            warn!(error = %e, "failed to terminate training job on exit");
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: JobEvent) {
        match event {
            JobEvent::Line(line) => self.console.push(line),
            JobEvent::Finished { exit_code } => {
                if self.terminated_manually {
                    self.console.push(LogLine::system(TERMINATED_MESSAGE));
                }
                self.console.push(LogLine::system(finish_message(exit_code)));
                self.status = JobStatus::Finished { exit_code };
            }
        }
    }

    /// Check if the application should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Set the quit flag
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Get the job status
    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    /// Get the invocation being supervised
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Get reference to the console
    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Get mutable reference to the console
    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Platform;
    use crate::filter::OutputFilter;
    use std::time::Duration;

    fn shell_app(script: &str) -> App {
        App::new(
            Supervisor::default(),
            Invocation::new("sh", ["-c", script]),
            100,
        )
    }

    async fn poll_until_finished(app: &mut App) {
        for _ in 0..500 {
            app.poll_job();
            if matches!(app.status(), JobStatus::Finished { .. }) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn console_texts(app: &App) -> Vec<String> {
        app.console()
            .buffer()
            .iter()
            .map(|line| line.text.clone())
            .collect()
    }

    #[test]
    fn app_new_initializes_correctly() {
        let app = shell_app("true");

        assert_eq!(app.status(), &JobStatus::Pending);
        assert!(!app.should_quit());
        assert!(app.console().buffer().is_empty());
    }

    #[test]
    fn app_quit_sets_flag() {
        let mut app = shell_app("true");
        app.quit();
        assert!(app.should_quit());
    }

    #[test]
    fn app_take_stop_request_clears_flag() {
        let mut app = shell_app("true");
        assert!(!app.take_stop_request());

        app.request_stop();
        assert!(app.take_stop_request());
        assert!(!app.take_stop_request());
    }

    #[test]
    fn finish_message_distinguishes_success() {
        assert_eq!(finish_message(0), "[system] training completed successfully");
        assert_eq!(
            finish_message(2),
            "[system] training exited abnormally (code 2)"
        );
    }

    #[tokio::test]
    async fn app_start_job_reports_unsupported_platform() {
        let supervisor =
            Supervisor::with_platform(Platform::named("plan9"), OutputFilter::default());
        let mut app = App::new(supervisor, Invocation::new("yolo", ["train"]), 100);

        app.start_job();

        assert!(matches!(app.status(), JobStatus::Failed { .. }));
        let texts = console_texts(&app);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("[system] failed to start training"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn app_poll_job_collects_output_and_exit() {
        let mut app = shell_app("echo epoch 1; echo epoch 2");

        app.start_job();
        assert_eq!(app.status(), &JobStatus::Running);
        poll_until_finished(&mut app).await;

        assert_eq!(app.status(), &JobStatus::Finished { exit_code: 0 });
        assert_eq!(
            console_texts(&app),
            vec![
                "epoch 1".to_string(),
                "epoch 2".to_string(),
                finish_message(0),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn app_poll_job_redraws_progress_in_place() {
        let mut app = shell_app(
            r"printf 'epoch 1: 10%%\r'; sleep 0.2; printf 'epoch 1: 50%%\r'; sleep 0.2; printf 'epoch 1: 100%%\n'",
        );

        app.start_job();
        poll_until_finished(&mut app).await;

        assert_eq!(
            console_texts(&app),
            vec!["epoch 1: 100%".to_string(), finish_message(0)]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn app_stop_job_logs_manual_termination() {
        let mut app = shell_app("exec sleep 10");

        app.start_job();
        app.stop_job().await;

        assert!(matches!(
            app.status(),
            JobStatus::Finished { exit_code } if *exit_code != 0
        ));
        let texts = console_texts(&app);
        assert_eq!(texts[texts.len() - 2], TERMINATED_MESSAGE);
        assert!(texts[texts.len() - 1].starts_with("[system] training exited abnormally"));
    }

    #[tokio::test]
    async fn app_stop_job_without_running_job_does_nothing() {
        let mut app = shell_app("true");

        app.stop_job().await;

        assert_eq!(app.status(), &JobStatus::Pending);
        assert!(app.console().buffer().is_empty());
    }
}
