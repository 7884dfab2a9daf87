#![warn(missing_docs)]
//! # crossway-app
//!
//! ## Purpose
//! Orchestrates selection, submission, and result display for `crossway`.
//!
//! ## Responsibilities
//! - Own the [`WorkflowState`] and apply every legal transition through
//!   [`WorkflowController`].
//! - Keep at most one submission in flight and discard resolutions that belong
//!   to an abandoned submission.
//! - Load client configuration and build the production upload client.
//! - Parse operator shell commands, load picked files, and run the [`Shell`]
//!   event loop.
//!
//! ## Data flow
//! Shell command -> [`WorkflowController::select_files`] /
//! [`WorkflowController::request_submit`] -> [`run_submission`] ->
//! [`WorkflowController::resolve`] -> [`WorkflowController::panel`].
//!
//! ## Ownership and lifetimes
//! The controller is the single writer of workflow state. Submissions run as
//! owned futures holding a [`SubmissionTicket`]; they never borrow the
//! controller, so the event loop stays free while a request is in flight.
//!
//! ## Error model
//! Workflow outcomes are states, not errors. [`AppError`] covers startup and
//! shell plumbing: configuration, client construction, file loading, and
//! command parsing.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crossway_core::{
    LaneVideo, LaneVideoSet, SelectionRejection, VideoSelection, validate_selection,
};
use crossway_ui::{ResultPanel, WorkflowState, project_panel};
use crossway_upload::{ReqwestTransport, SubmissionOutcome, UploadClient, UploadError};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("CROSSWAY_VERSION");

/// Service address used when none is configured.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";

/// Upload timeout used when none is configured.
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 300;

/// Env var holding the analysis service base address.
pub const SERVICE_URL_ENV: &str = "CROSSWAY_SERVICE_URL";

/// Env var holding the upload timeout in whole seconds.
pub const UPLOAD_TIMEOUT_ENV: &str = "CROSSWAY_UPLOAD_TIMEOUT_SECS";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Runtime client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Analysis service base address.
    pub service_url: Url,
    /// Per-request timeout applied by the transport.
    pub upload_timeout: Duration,
}

impl ClientConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    /// See [`ClientConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`; unset or blank keys use defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidServiceUrl`] for unparsable or non-HTTP
    /// addresses and [`ConfigError::InvalidTimeout`] for a timeout that is not
    /// a positive integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let configured = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let raw_url = configured(SERVICE_URL_ENV).unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());
        let service_url = Url::parse(&raw_url)
            .map_err(|error| ConfigError::InvalidServiceUrl(format!("{raw_url}: {error}")))?;
        if !matches!(service_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidServiceUrl(format!(
                "{raw_url}: scheme must be http or https"
            )));
        }

        let upload_timeout = match configured(UPLOAD_TIMEOUT_ENV) {
            None => Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
            Some(raw) => match raw.parse::<u64>() {
                Ok(seconds) if seconds > 0 => Duration::from_secs(seconds),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
        };

        Ok(Self {
            service_url,
            upload_timeout,
        })
    }

    /// Builds the production upload client.
    ///
    /// # Errors
    /// Returns [`AppError::Upload`] when the transport or endpoints cannot be
    /// set up.
    pub fn build_client(&self) -> Result<UploadClient, AppError> {
        let transport = ReqwestTransport::new(self.upload_timeout)?;
        Ok(UploadClient::new(
            self.service_url.as_str(),
            Arc::new(transport),
        )?)
    }
}

/// Permission to run one submission, tagged with the generation it belongs to.
#[derive(Debug, Clone)]
pub struct SubmissionTicket {
    generation: u64,
    videos: LaneVideoSet,
}

impl SubmissionTicket {
    /// Generation the ticket was issued against.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Videos to upload.
    pub fn videos(&self) -> &LaneVideoSet {
        &self.videos
    }
}

/// Resolved submission, still tagged with its ticket's generation.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionCompletion {
    /// Generation copied from the ticket.
    pub generation: u64,
    /// What the upload produced.
    pub outcome: SubmissionOutcome,
}

/// Controller answer to a submit request.
#[derive(Debug, Clone)]
pub enum SubmitDecision {
    /// Caller must run the ticket with [`run_submission`].
    Dispatch(SubmissionTicket),
    /// Selection does not hold exactly four videos; nothing was sent.
    Rejected(SelectionRejection),
    /// A submission is already in flight; the request was dropped.
    Busy,
}

/// Whether a completion changed the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Completion belonged to the current submission and was applied.
    Applied,
    /// Completion belonged to an abandoned submission and was discarded.
    Stale,
}

/// Single writer of [`WorkflowState`].
#[derive(Debug, Clone)]
pub struct WorkflowController {
    state: WorkflowState,
    generation: u64,
    advisory: Option<String>,
}

impl WorkflowController {
    /// Creates a controller in [`WorkflowState::Idle`].
    pub fn new() -> Self {
        Self {
            state: WorkflowState::Idle,
            generation: 0,
            advisory: None,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Current generation. Tickets issued before the latest selection or
    /// submit carry a smaller one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Transient advisory from the last rejected submit, if any.
    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }

    /// Returns `true` while a submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    /// Result panel projection of the current state.
    pub fn panel(&self) -> ResultPanel {
        project_panel(&self.state)
    }

    /// Replaces the selection and discards any prior outcome.
    ///
    /// While a submission is in flight this abandons it: its completion will
    /// resolve as [`Resolution::Stale`].
    pub fn select_files(&mut self, selection: VideoSelection) {
        if self.state.is_busy() {
            info!("abandoning in-flight submission #{}", self.generation);
        }

        self.generation += 1;
        self.advisory = None;
        debug!("selection #{} holds {} videos", self.generation, selection.len());
        self.state = WorkflowState::Selecting { selection };
    }

    /// Validates the current selection and, if it holds four videos, moves to
    /// [`WorkflowState::Submitting`].
    pub fn request_submit(&mut self) -> SubmitDecision {
        if self.state.is_busy() {
            debug!("submit ignored; submission #{} in flight", self.generation);
            return SubmitDecision::Busy;
        }

        let validated = match &self.state {
            WorkflowState::Selecting { selection } => validate_selection(selection),
            _ => Err(SelectionRejection { selected: 0 }),
        };

        match validated {
            Err(rejection) => {
                info!("submit rejected: {rejection}");
                self.advisory = Some(rejection.to_string());
                SubmitDecision::Rejected(rejection)
            }
            Ok(videos) => {
                self.generation += 1;
                self.advisory = None;
                info!(
                    "dispatching submission #{} ({} bytes)",
                    self.generation,
                    videos.total_bytes()
                );
                let ticket = SubmissionTicket {
                    generation: self.generation,
                    videos: videos.clone(),
                };
                self.state = WorkflowState::Submitting { videos };
                SubmitDecision::Dispatch(ticket)
            }
        }
    }

    /// Applies a completion if it belongs to the current submission.
    pub fn resolve(&mut self, completion: SubmissionCompletion) -> Resolution {
        if !self.state.is_busy() || completion.generation != self.generation {
            warn!(
                "discarding stale completion #{} (current #{}, state {})",
                completion.generation,
                self.generation,
                self.state.name()
            );
            return Resolution::Stale;
        }

        self.state = match completion.outcome {
            SubmissionOutcome::Completed(result) => WorkflowState::Succeeded(result),
            SubmissionOutcome::Rejected(message) => WorkflowState::Failed(message),
            SubmissionOutcome::Failed(failure) => {
                WorkflowState::Failed(failure.user_message().to_string())
            }
        };
        info!(
            "submission #{} resolved as {}",
            completion.generation,
            self.state.name()
        );
        Resolution::Applied
    }
}

impl Default for WorkflowController {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one submission to completion.
///
/// The returned future owns the ticket, so it can be spawned and later fed to
/// [`WorkflowController::resolve`].
pub async fn run_submission(client: &UploadClient, ticket: SubmissionTicket) -> SubmissionCompletion {
    let outcome = client.submit(ticket.videos()).await;
    SubmissionCompletion {
        generation: ticket.generation,
        outcome,
    }
}

/// Operator shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Replace the selection with these files, in lane order.
    Select(Vec<PathBuf>),
    /// Submit the current selection.
    Submit,
    /// Print state and result panel.
    Status,
    /// Probe the service health route.
    Ping,
    /// Print command help.
    Help,
    /// Leave the shell.
    Quit,
}

/// Shell help text.
pub const SHELL_HELP: &str = "\
commands:
  select <file> [<file> ...]  pick lane videos (lane1 first, whitespace separated)
  submit                      upload the picked videos for analysis
  status                      show the workflow state and results
  ping                        check that the analysis service is reachable
  help                        show this help
  quit                        leave";

/// Parses one shell line; blank lines yield `None`.
///
/// # Errors
/// Returns [`AppError::UnknownCommand`] for anything else unrecognised.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, AppError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "select" => ShellCommand::Select(words.map(PathBuf::from).collect()),
        "submit" | "run" => ShellCommand::Submit,
        "status" => ShellCommand::Status,
        "ping" => ShellCommand::Ping,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(AppError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

/// Whether the shell keeps reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlow {
    /// Keep reading input.
    Continue,
    /// Operator asked to leave.
    Quit,
}

enum ShellEvent {
    Completed(SubmissionCompletion),
    Pinged {
        endpoint: Url,
        result: Result<(), UploadError>,
    },
}

/// Operator shell.
///
/// Input lines, submission completions, and health probe answers share one
/// event loop. Network work is always spawned, so the loop keeps reading
/// input while a request is pending; only the shell touches the controller.
pub struct Shell {
    client: UploadClient,
    controller: WorkflowController,
    in_flight: Option<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<ShellEvent>,
    events_rx: mpsc::UnboundedReceiver<ShellEvent>,
}

impl Shell {
    /// Creates an idle shell around `client`.
    pub fn new(client: UploadClient) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            client,
            controller: WorkflowController::new(),
            in_flight: None,
            events_tx,
            events_rx,
        }
    }

    /// Workflow controller driven by this shell.
    pub fn controller(&self) -> &WorkflowController {
        &self.controller
    }

    /// Returns `true` while a spawned submission is neither resolved nor
    /// aborted.
    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Runs until `quit` or end of input, writing everything to `out`.
    ///
    /// Pending events are drained before the next input line is read.
    ///
    /// # Errors
    /// Returns [`AppError::Input`] when input cannot be read or `out` cannot
    /// be written.
    pub async fn run<R>(&mut self, input: R, out: &mut impl Write) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
    {
        writeln!(out, "crossway {}", app_version())?;
        writeln!(out, "{SHELL_HELP}")?;
        self.write_panel(out)?;

        let mut lines = input.lines();
        loop {
            tokio::select! {
                biased;

                Some(event) = self.events_rx.recv() => self.handle_event(event, out)?,
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if self.handle_line(&line, out).await? == ShellFlow::Quit {
                        break;
                    }
                }
            }
        }

        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        Ok(())
    }

    /// Applies one input line.
    ///
    /// Re-selecting while a submission is pending aborts its task.
    ///
    /// # Errors
    /// Returns [`AppError::Input`] when `out` cannot be written.
    pub async fn handle_line(
        &mut self,
        line: &str,
        out: &mut impl Write,
    ) -> Result<ShellFlow, AppError> {
        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(ShellFlow::Continue),
            Err(error) => {
                writeln!(out, "{error}")?;
                return Ok(ShellFlow::Continue);
            }
        };

        match command {
            ShellCommand::Quit => return Ok(ShellFlow::Quit),
            ShellCommand::Help => writeln!(out, "{SHELL_HELP}")?,
            ShellCommand::Status => self.write_status(out)?,
            ShellCommand::Ping => self.spawn_ping(out)?,
            ShellCommand::Select(paths) => match read_selection(&paths).await {
                Ok(selection) => {
                    if let Some(handle) = self.in_flight.take() {
                        handle.abort();
                    }
                    self.controller.select_files(selection);
                    self.write_status(out)?;
                }
                Err(error) => writeln!(out, "{error}")?,
            },
            ShellCommand::Submit => match self.controller.request_submit() {
                SubmitDecision::Dispatch(ticket) => {
                    self.spawn_submission(ticket);
                    self.write_panel(out)?;
                }
                SubmitDecision::Rejected(rejection) => {
                    writeln!(out, "Please upload exactly 4 videos ({rejection}).")?;
                }
                SubmitDecision::Busy => writeln!(out, "A submission is already running.")?,
            },
        }
        Ok(ShellFlow::Continue)
    }

    /// Applies a submission completion. Stale completions print nothing.
    ///
    /// # Errors
    /// Returns [`AppError::Input`] when `out` cannot be written.
    pub fn handle_completion(
        &mut self,
        completion: SubmissionCompletion,
        out: &mut impl Write,
    ) -> Result<Resolution, AppError> {
        let resolution = self.controller.resolve(completion);
        if resolution == Resolution::Applied {
            self.in_flight = None;
            self.write_panel(out)?;
        }
        Ok(resolution)
    }

    fn handle_event(&mut self, event: ShellEvent, out: &mut impl Write) -> Result<(), AppError> {
        match event {
            ShellEvent::Completed(completion) => {
                self.handle_completion(completion, out)?;
            }
            ShellEvent::Pinged {
                endpoint,
                result: Ok(()),
            } => writeln!(out, "service at {endpoint} is up")?,
            ShellEvent::Pinged {
                result: Err(error), ..
            } => writeln!(out, "service unreachable: {error}")?,
        }
        Ok(())
    }

    fn spawn_submission(&mut self, ticket: SubmissionTicket) {
        let client = self.client.clone();
        let events = self.events_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let completion = run_submission(&client, ticket).await;
            // Receiver lives as long as the shell.
            let _ = events.send(ShellEvent::Completed(completion));
        }));
    }

    fn spawn_ping(&self, out: &mut impl Write) -> Result<(), AppError> {
        writeln!(out, "pinging {}", self.client.health_endpoint())?;
        let client = self.client.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = client.ping().await;
            let _ = events.send(ShellEvent::Pinged {
                endpoint: client.health_endpoint().clone(),
                result,
            });
        });
        Ok(())
    }

    fn write_status(&self, out: &mut impl Write) -> Result<(), AppError> {
        let state = self.controller.state();
        write!(out, "state: {} #{}", state.name(), self.controller.generation())?;
        match state {
            WorkflowState::Selecting { selection } => {
                writeln!(out, " ({} videos picked)", selection.len())?;
                for (index, video) in selection.videos().iter().enumerate() {
                    writeln!(
                        out,
                        "  {}. {} ({} bytes)",
                        index + 1,
                        video.file_name(),
                        video.len()
                    )?;
                }
            }
            _ => writeln!(out)?,
        }
        if let Some(advisory) = self.controller.advisory() {
            writeln!(out, "note: {advisory}")?;
        }
        self.write_panel(out)
    }

    fn write_panel(&self, out: &mut impl Write) -> Result<(), AppError> {
        for line in self.controller.panel().lines() {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

/// Reads picked files into a selection, preserving order.
///
/// # Errors
/// Returns [`AppError::ReadVideo`] for the first file that cannot be read.
pub async fn read_selection(paths: &[PathBuf]) -> Result<VideoSelection, AppError> {
    let mut videos = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| AppError::ReadVideo {
                path: path.clone(),
                source,
            })?;
        videos.push(LaneVideo::new(display_file_name(path), bytes));
    }
    Ok(VideoSelection::new(videos))
}

fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Initialises `env_logger` with an `info` default, overridable by `RUST_LOG`.
///
/// Lines follow `timestamp | level | target | message`, with a `duration`
/// key appended when present. Calling it twice is harmless.
pub fn init_logging() {
    use log::kv::Key;

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            match record.key_values().get(Key::from("duration")) {
                Some(duration) => writeln!(
                    buf,
                    "{timestamp} | {} | {} | {} | duration={duration}",
                    record.level(),
                    record.target(),
                    record.args()
                ),
                None => writeln!(
                    buf,
                    "{timestamp} | {} | {} | {}",
                    record.level(),
                    record.target(),
                    record.args()
                ),
            }
        })
        .try_init();
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Service URL is unusable.
    #[error("invalid {}: {}", SERVICE_URL_ENV, .0)]
    InvalidServiceUrl(String),
    /// Timeout is not a positive number of seconds.
    #[error("invalid {}: {}", UPLOAD_TIMEOUT_ENV, .0)]
    InvalidTimeout(String),
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Upload client setup error.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),
    /// A picked file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    ReadVideo {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Shell input failure.
    #[error("shell input error: {0}")]
    Input(#[from] std::io::Error),
    /// Unrecognised shell verb.
    #[error("unknown command `{0}`; type `help`")]
    UnknownCommand(String),
}
