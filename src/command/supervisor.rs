use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::buffer::{LineSource, LogLine};
use crate::command::{Invocation, JobListener, Platform};
use crate::error::SupervisorError;
use crate::filter::{LineAssembler, OutputFilter, RawLine};

/// Read buffer size for each output stream
const CHUNK_SIZE: usize = 8192;

/// Capacity of the chunk channel between stream readers and the supervisor
const CHUNK_CHANNEL_CAPACITY: usize = 1000;

/// How long to keep collecting output after a forced kill
const DRAIN_AFTER_KILL: Duration = Duration::from_millis(500);

/// Exit code reported when the process was ended by a signal
const SIGNALED_EXIT_CODE: i32 = -1;

/// Captured output stream of the child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl From<Stream> for LineSource {
    fn from(stream: Stream) -> Self {
        match stream {
            Stream::Stdout => LineSource::Stdout,
            Stream::Stderr => LineSource::Stderr,
        }
    }
}

/// Lifecycle of the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// No job started yet (or reset)
    Idle,
    /// Process is running or its output is still being drained
    Running,
    /// Process exited and the exit code was delivered
    Finished { exit_code: i32 },
}

/// Raw output read by a stream reader task
#[derive(Debug)]
enum Chunk {
    Data { stream: Stream, bytes: Vec<u8> },
    Closed { stream: Stream },
    Failed { stream: Stream, message: String },
}

/// Line assembly state of one output stream
#[derive(Debug, Default)]
struct StreamLines {
    assembler: LineAssembler,
    /// The last line sent to listeners ended with a carriage return
    redrawing: bool,
}

/// The one active process and everything needed to drain it
struct Job {
    child: Child,
    pid: Option<u32>,
    receiver: mpsc::Receiver<Chunk>,
    readers: Vec<JoinHandle<()>>,
    stdout: StreamLines,
    stderr: StreamLines,
}

impl Job {
    fn lines(&mut self, stream: Stream) -> &mut StreamLines {
        match stream {
            Stream::Stdout => &mut self.stdout,
            Stream::Stderr => &mut self.stderr,
        }
    }

    fn assembler(&mut self, stream: Stream) -> &mut LineAssembler {
        &mut self.lines(stream).assembler
    }

    /// Turn a chunk into the raw lines it completes
    fn take_lines(&mut self, chunk: Chunk) -> Vec<(Stream, RawLine)> {
        match chunk {
            Chunk::Data { stream, bytes } => self
                .assembler(stream)
                .push(&bytes)
                .into_iter()
                .map(|line| (stream, line))
                .collect(),
            Chunk::Closed { stream } => self
                .assembler(stream)
                .finish()
                .map(|line| vec![(stream, line)])
                .unwrap_or_default(),
            Chunk::Failed { stream, message } => {
                warn!(?stream, %message, "failed to read job output");
                Vec::new()
            }
        }
    }

    /// Flush whatever both streams still hold
    fn take_remainders(&mut self) -> Vec<(Stream, RawLine)> {
        [Stream::Stdout, Stream::Stderr]
            .into_iter()
            .filter_map(|stream| self.assembler(stream).finish().map(|line| (stream, line)))
            .collect()
    }
}

/// Supervises one external job at a time
///
/// The supervisor never blocks. Output is read by background tasks that only
/// forward raw chunks; decoding, cleaning and listener notification happen in
/// whichever task drives the supervisor through [`Supervisor::poll`],
/// [`Supervisor::tick`] or [`Supervisor::wait`].
pub struct Supervisor {
    platform: Platform,
    filter: OutputFilter,
    listeners: Vec<Box<dyn JobListener + Send>>,
    job: Option<Job>,
    state: JobState,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(OutputFilter::default())
    }
}

impl Supervisor {
    /// Create a supervisor for the current platform
    pub fn new(filter: OutputFilter) -> Self {
        Self::with_platform(Platform::current(), filter)
    }

    /// Create a supervisor for an explicit platform
    pub fn with_platform(platform: Platform, filter: OutputFilter) -> Self {
        Self {
            platform,
            filter,
            listeners: Vec::new(),
            job: None,
            state: JobState::Idle,
        }
    }

    /// Register a listener for lines and the finish notification
    pub fn subscribe(&mut self, listener: Box<dyn JobListener + Send>) {
        self.listeners.push(listener);
    }

    /// Get the current state
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Check if a job is active
    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }

    /// Exit code of the finished job
    pub fn exit_code(&self) -> Option<i32> {
        match self.state {
            JobState::Finished { exit_code } => Some(exit_code),
            _ => None,
        }
    }

    /// Process ID of the running job
    pub fn pid(&self) -> Option<u32> {
        self.job.as_ref().and_then(|job| job.pid)
    }

    /// Start a job
    ///
    /// Spawns `invocation` with stdout and stderr piped and starts one reader
    /// task per stream. Must be called from within a tokio runtime.
    pub fn start(&mut self, invocation: &Invocation) -> Result<(), SupervisorError> {
        match self.state {
            JobState::Running => return Err(SupervisorError::AlreadyRunning),
            JobState::Finished { .. } => return Err(SupervisorError::Finished),
            JobState::Idle => {}
        }

        let program = self.platform.program_for(invocation.command()).ok_or_else(|| {
            SupervisorError::UnsupportedPlatform {
                os: self.platform.os().to_string(),
                command: invocation.command().to_string(),
            }
        })?;

        let mut child = Command::new(&program)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                command: program.clone(),
                source,
            })?;

        let pid = child.id();
        let (tx, rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(read_stream(stdout, Stream::Stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(read_stream(stderr, Stream::Stderr, tx.clone())));
        }

        // Drop the sender - channel will close when both reader tasks complete
        drop(tx);

        info!(
            command = %program,
            pid = ?pid,
            args = invocation.args().len(),
            "job started"
        );

        self.job = Some(Job {
            child,
            pid,
            receiver: rx,
            readers,
            stdout: StreamLines::default(),
            stderr: StreamLines::default(),
        });
        self.state = JobState::Running;
        Ok(())
    }

    /// Dispatch every event that is already available, without waiting
    ///
    /// Meant to be called once per frame of a UI loop.
    pub fn poll(&mut self) -> Result<(), SupervisorError> {
        loop {
            let Some(job) = self.job.as_mut() else {
                return Ok(());
            };

            match job.receiver.try_recv() {
                Ok(chunk) => self.dispatch_chunk(chunk),
                Err(mpsc::error::TryRecvError::Empty) => return Ok(()),
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    // Both streams drained; report the exit once the process is reaped
                    return match job.child.try_wait()? {
                        Some(status) => {
                            self.finish(status.code().unwrap_or(SIGNALED_EXIT_CODE));
                            Ok(())
                        }
                        None => Ok(()),
                    };
                }
            }
        }
    }

    /// Wait for the next chunk or for the exit, and dispatch it
    ///
    /// Returns `false` once no job is running.
    pub async fn tick(&mut self) -> Result<bool, SupervisorError> {
        let Some(job) = self.job.as_mut() else {
            return Ok(false);
        };

        match job.receiver.recv().await {
            Some(chunk) => {
                self.dispatch_chunk(chunk);
                Ok(true)
            }
            None => {
                let status = job.child.wait().await?;
                self.finish(status.code().unwrap_or(SIGNALED_EXIT_CODE));
                Ok(false)
            }
        }
    }

    /// Drive the job to completion and return its exit code
    ///
    /// Returns `None` when no job was started.
    pub async fn wait(&mut self) -> Result<Option<i32>, SupervisorError> {
        while self.tick().await? {}
        Ok(self.exit_code())
    }

    /// Forcibly kill the running job
    ///
    /// No-op when no job is active. Output already produced is flushed and the
    /// exit code is delivered to listeners before this returns.
    pub async fn terminate(&mut self) -> Result<(), SupervisorError> {
        let Some(job) = self.job.as_mut() else {
            return Ok(());
        };

        info!(pid = ?job.pid, "terminating job");
        job.child.kill().await?;
        let status = job.child.wait().await?;

        let mut pending = Vec::new();
        let drained = tokio::time::timeout(DRAIN_AFTER_KILL, async {
            while let Some(chunk) = job.receiver.recv().await {
                pending.push(chunk);
            }
        })
        .await;
        if drained.is_err() {
            debug!("output streams still open after kill");
        }

        for chunk in pending {
            self.dispatch_chunk(chunk);
        }
        self.finish(status.code().unwrap_or(SIGNALED_EXIT_CODE));
        Ok(())
    }

    /// Return a finished supervisor to `Idle` so another job can start
    pub fn reset(&mut self) -> Result<(), SupervisorError> {
        if self.is_running() {
            return Err(SupervisorError::AlreadyRunning);
        }
        self.state = JobState::Idle;
        Ok(())
    }

    fn dispatch_chunk(&mut self, chunk: Chunk) {
        let Some(job) = self.job.as_mut() else {
            return;
        };
        let lines = job.take_lines(chunk);
        emit_lines(&self.filter, &mut self.listeners, job, lines);
    }

    /// Flush remaining output, release the job and notify listeners once
    fn finish(&mut self, exit_code: i32) {
        let Some(mut job) = self.job.take() else {
            return;
        };

        let remainders = job.take_remainders();
        emit_lines(&self.filter, &mut self.listeners, &mut job, remainders);
        for reader in &job.readers {
            reader.abort();
        }

        info!(pid = ?job.pid, exit_code, "job finished");
        self.state = JobState::Finished { exit_code };
        for listener in self.listeners.iter_mut() {
            listener.on_finished(exit_code);
        }
    }
}

/// Clean assembled lines and hand the visible ones to every listener
///
/// A line following a carriage-return redraw of the same stream is marked as
/// replacing it. A newline-terminated line that cleans to nothing still ends
/// the redraw, so the progress line before it stays.
fn emit_lines(
    filter: &OutputFilter,
    listeners: &mut [Box<dyn JobListener + Send>],
    job: &mut Job,
    lines: Vec<(Stream, RawLine)>,
) {
    for (stream, raw) in lines {
        let state = job.lines(stream);
        let Some(text) = filter.clean(&raw.bytes) else {
            if !raw.open {
                state.redrawing = false;
            }
            continue;
        };

        let line = if state.redrawing {
            LogLine::redraw(stream.into(), text)
        } else {
            LogLine::new(stream.into(), text)
        };
        state.redrawing = raw.open;

        for listener in listeners.iter_mut() {
            listener.on_line(&line);
        }
    }
}

/// Forward raw chunks from one stream until it closes
async fn read_stream<R>(mut reader: R, stream: Stream, tx: mpsc::Sender<Chunk>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let chunk = match reader.read(&mut buf).await {
            Ok(0) => Chunk::Closed { stream },
            Ok(n) => Chunk::Data {
                stream,
                bytes: buf[..n].to_vec(),
            },
            Err(e) => Chunk::Failed {
                stream,
                message: e.to_string(),
            },
        };

        let last = !matches!(chunk, Chunk::Data { .. });
        if tx.send(chunk).await.is_err() || last {
            break;
        }
    }
}
