use std::io::{self, Write};
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use train_runner::app::{App, TERMINATED_MESSAGE, finish_message};
use train_runner::buffer::{LineSource, LogLine};
use train_runner::command::{Invocation, JobListener, Supervisor};
use train_runner::config::TrainConfig;
use train_runner::filter::{FallbackDecoder, OutputFilter};
use train_runner::logging::{LogTarget, init_logging, log_file_path};
use train_runner::tui::{Renderer, handle_key};

/// Default maximum buffer lines in the console
const DEFAULT_MAX_BUFFER_LINES: usize = 10000;

/// Poll interval for job output (milliseconds)
const POLL_INTERVAL_MS: u64 = 10;

/// Exit status for invalid arguments
const USAGE_EXIT_CODE: i32 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "train-runner",
    author,
    version,
    about = "Launch a training job and follow its console output",
    long_about = None
)]
struct Args {
    #[command(flatten)]
    train: TrainConfig,

    /// Training tool executable
    #[arg(long, default_value = "yolo")]
    command: String,

    /// Encodings tried in order when decoding job output
    #[arg(long, value_delimiter = ',', default_values = ["utf-8", "gbk", "latin1"])]
    encodings: Vec<String>,

    /// Maximum buffer lines in the console
    #[arg(short = 'b', long, default_value_t = DEFAULT_MAX_BUFFER_LINES)]
    max_buffer_lines: usize,

    /// Stream output to stdout instead of the console view
    #[arg(long)]
    plain: bool,

    /// Print the training command line and exit
    #[arg(long)]
    dry_run: bool,
}

/// Prints job output to stdout in plain mode
struct PlainPrinter;

impl JobListener for PlainPrinter {
    fn on_line(&mut self, line: &LogLine) {
        let written = match line.source {
            LineSource::Stderr => writeln!(io::stderr(), "{}", line.text),
            LineSource::Stdout | LineSource::System => writeln!(io::stdout(), "{}", line.text),
        };
        if written.is_err() {
            tracing::debug!("failed to write job output");
        }
    }

    fn on_finished(&mut self, exit_code: i32) {
        println!("{}", finish_message(exit_code));
    }
}

/// Initialize the terminal for TUI
fn init_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to its original state
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

/// Run the console view
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> io::Result<()> {
    app.start_job();

    loop {
        // Update visible lines based on terminal size
        let size = terminal.size()?;
        app.console_mut()
            .set_visible_lines(Renderer::visible_lines(size.height));

        terminal.draw(|frame| {
            Renderer::render(frame, &app);
        })?;

        app.poll_job();

        if event::poll(Duration::from_millis(POLL_INTERVAL_MS))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            handle_key(&mut app, key);
        }

        if app.take_stop_request() {
            app.stop_job().await;
        }

        if app.should_quit() {
            app.shutdown().await;
            break;
        }
    }

    Ok(())
}

/// Stream the job to stdout until it exits or Ctrl-C is pressed
async fn run_plain(mut supervisor: Supervisor, invocation: &Invocation) -> io::Result<i32> {
    supervisor.subscribe(Box::new(PlainPrinter));
    supervisor.start(invocation).map_err(io::Error::other)?;

    let finished = tokio::select! {
        result = supervisor.wait() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match finished {
        Some(result) => {
            let exit_code = result.map_err(io::Error::other)?;
            Ok(exit_code.unwrap_or(0))
        }
        None => {
            println!("{}", TERMINATED_MESSAGE);
            supervisor.terminate().await.map_err(io::Error::other)?;
            Ok(supervisor.exit_code().unwrap_or(-1))
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();

    if let Err(e) = args.train.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(USAGE_EXIT_CODE);
    }
    let decoder = match FallbackDecoder::from_labels(args.encodings.as_slice()) {
        Ok(decoder) => decoder,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(USAGE_EXIT_CODE);
        }
    };

    let invocation = args.train.to_invocation(&args.command);
    if args.dry_run {
        println!("{}", invocation);
        return Ok(());
    }

    let _log_guard = init_logging(if args.plain {
        LogTarget::Stderr
    } else {
        LogTarget::File
    });
    info!(command = %invocation, "launching training");

    let supervisor = Supervisor::new(OutputFilter::new(decoder));

    if args.plain {
        let exit_code = run_plain(supervisor, &invocation).await?;
        if exit_code != 0 {
            std::process::exit(exit_code);
        }
        return Ok(());
    }

    let app = App::new(supervisor, invocation, args.max_buffer_lines);

    let mut terminal = init_terminal()?;
    let result = run_app(&mut terminal, app).await;
    restore_terminal(&mut terminal)?;

    if result.is_err() {
        eprintln!("See {} for details", log_file_path().display());
    }
    result
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_plain_returns_job_exit_code() {
        let invocation = Invocation::new("sh", ["-c", "exit 3"]);

        let exit_code = run_plain(Supervisor::default(), &invocation)
            .await
            .unwrap();

        assert_eq!(exit_code, 3);
    }
}
