//! Supervision of converter processes.
//!
//! A [`ProcessRunner`] owns at most one child process at a time. Each run
//! gets its own worker thread which forwards the child's combined output
//! over a channel and finishes with exactly one terminal [`RunnerEvent`].

pub mod command;
pub mod events;
pub mod locate;
pub mod models;
pub mod probes;

use std::ffi::OsString;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Sender};
use log::{debug, info, warn};

use crate::error::RunnerError;
use crate::params::ConversionParams;

pub use command::{build_command, display_command};
pub use events::{RunHandle, RunId, RunnerEvent};
pub use locate::{ToolLocator, CONVERTER_TOOL, INSTALL_HINT};
pub use models::ModelDownload;
pub use probes::{check_ocr_engine, ModelValidator, ProbeResult, RequiredArtifacts};

/// How long a cancelled process gets to exit before it is killed.
pub const CANCEL_GRACE: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const IDLE: u64 = 0;
const RULE: &str = "============================================================";

struct ActiveProcess {
    run: u64,
    child: Child,
}

struct Shared {
    active: AtomicU64,
    slot: Mutex<Option<ActiveProcess>>,
}

impl Shared {
    fn lock_slot(&self) -> MutexGuard<'_, Option<ActiveProcess>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, run: u64) -> bool {
        self.active.load(Ordering::Acquire) == run
    }

    /// Drops `run`'s slot entry and returns the runner to idle, leaving a
    /// newer run untouched.
    fn release(&self, run: u64) {
        let mut slot = self.lock_slot();
        if slot.as_ref().is_some_and(|p| p.run == run) {
            if let Some(mut stale) = slot.take() {
                let _ = stale.child.kill();
                let _ = stale.child.wait();
            }
        }
        let _ = self
            .active
            .compare_exchange(run, IDLE, Ordering::AcqRel, Ordering::Acquire);
    }
}

/// Releases the run even if the worker unwinds.
struct RunGuard {
    run: u64,
    shared: Arc<Shared>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.shared.release(self.run);
    }
}

enum Job {
    Convert(Vec<OsString>),
    Download(Vec<(String, Vec<OsString>)>),
}

impl Job {
    fn kind(&self) -> &'static str {
        match self {
            Job::Convert(_) => "convert",
            Job::Download(_) => "download",
        }
    }

    fn error_prefix(&self) -> &'static str {
        match self {
            Job::Convert(_) => "Conversion error",
            Job::Download(_) => "Model download error",
        }
    }
}

enum StepOutcome {
    Exited(i32),
    Cancelled,
}

pub struct ProcessRunner {
    locator: ToolLocator,
    next_run: AtomicU64,
    shared: Arc<Shared>,
    cancel_grace: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(ToolLocator::default())
    }
}

impl ProcessRunner {
    pub fn new(locator: ToolLocator) -> Self {
        Self {
            locator,
            next_run: AtomicU64::new(1),
            shared: Arc::new(Shared {
                active: AtomicU64::new(IDLE),
                slot: Mutex::new(None),
            }),
            cancel_grace: CANCEL_GRACE,
        }
    }

    /// Overrides [`CANCEL_GRACE`].
    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    pub fn locator(&self) -> &ToolLocator {
        &self.locator
    }

    pub fn check_tool_available(&self) -> bool {
        self.locator.is_available()
    }

    pub fn is_running(&self) -> bool {
        self.shared.active.load(Ordering::Acquire) != IDLE
    }

    pub fn current_run(&self) -> Option<RunId> {
        match self.shared.active.load(Ordering::Acquire) {
            IDLE => None,
            run => Some(RunId(run)),
        }
    }

    /// Starts converting one input.
    ///
    /// Returns [`RunnerError::Busy`] without spawning anything while another
    /// run is active.
    pub fn convert(&self, params: &ConversionParams) -> Result<RunHandle, RunnerError> {
        let argv = build_command(&self.locator.resolve(), params);
        self.start(Job::Convert(argv))
    }

    /// Downloads converter models with the companion tool, one step per entry.
    pub fn download_models(&self, downloads: &[ModelDownload]) -> Result<RunHandle, RunnerError> {
        let tools = self.locator.companion().resolve();
        let steps = downloads
            .iter()
            .map(|d| (d.title(), d.command(&tools)))
            .collect();
        self.start(Job::Download(steps))
    }

    fn start(&self, job: Job) -> Result<RunHandle, RunnerError> {
        let run = self.next_run.fetch_add(1, Ordering::Relaxed);
        if self
            .shared
            .active
            .compare_exchange(IDLE, run, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Rejecting {} job: runner busy", job.kind());
            return Err(RunnerError::Busy);
        }

        let (tx, rx) = unbounded();
        let shared = Arc::clone(&self.shared);

        let spawned = thread::Builder::new()
            .name(format!("docbatch-run-{}", run))
            .spawn(move || run_worker(run, job, shared, tx));

        if let Err(e) = spawned {
            self.shared.release(run);
            return Err(RunnerError::Spawn(e));
        }

        Ok(RunHandle::new(RunId(run), rx))
    }

    /// Stops the active run, if any.
    ///
    /// Sends a graceful terminate, waits up to the grace period, then kills.
    /// Returns whether a run was active. Safe to call repeatedly.
    pub fn cancel(&self) -> bool {
        let (previous, process) = {
            let mut slot = self.shared.lock_slot();
            let previous = self.shared.active.swap(IDLE, Ordering::AcqRel);
            (previous, slot.take())
        };

        if previous == IDLE {
            return false;
        }

        info!("Cancelling {}", RunId(previous));
        if let Some(ActiveProcess { mut child, .. }) = process {
            terminate(&mut child, self.cancel_grace);
        }
        true
    }
}

impl Drop for ProcessRunner {
    fn drop(&mut self) {
        if self.is_running() {
            self.cancel();
        }
    }
}

fn run_worker(run: u64, job: Job, shared: Arc<Shared>, tx: Sender<RunnerEvent>) {
    let span = tracing::info_span!("runner", run = run, kind = job.kind());
    let _entered = span.enter();
    let guard = RunGuard {
        run,
        shared: Arc::clone(&shared),
    };

    let outcome = match &job {
        Job::Convert(argv) => run_step(run, argv, &shared, &tx).map(|step| match step {
            StepOutcome::Exited(code) => RunnerEvent::Completed(code),
            StepOutcome::Cancelled => RunnerEvent::Cancelled,
        }),
        Job::Download(steps) => run_downloads(run, steps, &shared, &tx),
    };

    let terminal = match outcome {
        Ok(event) => event,
        Err(e) => {
            let message = if matches!(e, RunnerError::ToolNotFound { .. }) {
                e.to_string()
            } else {
                format!("{}: {}", job.error_prefix(), e)
            };
            warn!("{}", message);
            let _ = tx.send(RunnerEvent::Output(format!("ERROR: {}", message)));
            RunnerEvent::Error(message)
        }
    };

    // Idle before the terminal event so the receiver can start the next run.
    drop(guard);
    debug!("Finished with {:?}", terminal);
    let _ = tx.send(terminal);
}

fn run_downloads(
    run: u64,
    steps: &[(String, Vec<OsString>)],
    shared: &Shared,
    tx: &Sender<RunnerEvent>,
) -> Result<RunnerEvent, RunnerError> {
    let mut last_failure = 0;

    for (title, argv) in steps {
        for line in [RULE, title.as_str(), RULE] {
            let _ = tx.send(RunnerEvent::Output(line.to_string()));
        }
        match run_step(run, argv, shared, tx)? {
            StepOutcome::Cancelled => return Ok(RunnerEvent::Cancelled),
            StepOutcome::Exited(0) => {}
            StepOutcome::Exited(code) => {
                last_failure = code;
                let _ = tx.send(RunnerEvent::Output(format!(
                    "[WARNING] {} returned code {}",
                    display_command(argv),
                    code
                )));
            }
        }
    }

    let summary = if last_failure == 0 {
        "[SUCCESS] Model download completed!"
    } else {
        "[COMPLETED] Model download finished with warnings."
    };
    for line in [RULE, summary, RULE] {
        let _ = tx.send(RunnerEvent::Output(line.to_string()));
    }
    Ok(RunnerEvent::Completed(last_failure))
}

fn run_step(
    run: u64,
    argv: &[OsString],
    shared: &Shared,
    tx: &Sender<RunnerEvent>,
) -> Result<StepOutcome, RunnerError> {
    if !shared.is_current(run) {
        return Ok(StepOutcome::Cancelled);
    }
    let Some((program, args)) = argv.split_first() else {
        return Err(RunnerError::Io(std::io::Error::new(
            ErrorKind::InvalidInput,
            "empty command line",
        )));
    };

    let _ = tx.send(RunnerEvent::Output(format!(
        "Executing: {}",
        display_command(argv)
    )));

    let (reader, writer) = std::io::pipe()?;
    let mut child = {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer);
        // `command` drops at the end of this block, closing our write ends
        // so the reader sees EOF once the child exits.
        command.spawn().map_err(|e| launch_error(program, e))?
    };
    info!("Started pid {}", child.id());

    {
        let mut slot = shared.lock_slot();
        if !shared.is_current(run) {
            drop(slot);
            let _ = child.kill();
            let _ = child.wait();
            return Ok(StepOutcome::Cancelled);
        }
        *slot = Some(ActiveProcess { run, child });
    }

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                let _ = tx.send(RunnerEvent::Output(line.to_string()));
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    wait_for_exit(run, shared)
}

fn wait_for_exit(run: u64, shared: &Shared) -> Result<StepOutcome, RunnerError> {
    loop {
        {
            let mut slot = shared.lock_slot();
            let Some(active) = slot.as_mut().filter(|p| p.run == run) else {
                return Ok(StepOutcome::Cancelled);
            };
            if let Some(status) = active.child.try_wait()? {
                *slot = None;
                debug!("Process exited with {}", status);
                return Ok(StepOutcome::Exited(exit_code(status)));
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn launch_error(program: &OsString, e: std::io::Error) -> RunnerError {
    if e.kind() == ErrorKind::NotFound {
        let tool = Path::new(program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string_lossy().into_owned());
        RunnerError::ToolNotFound {
            tool,
            hint: INSTALL_HINT.to_string(),
        }
    } else {
        RunnerError::Io(e)
    }
}

fn terminate(child: &mut Child, grace: Duration) {
    request_terminate(child);

    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Process {} exited after terminate: {}", child.id(), status);
                return;
            }
            Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to poll process {}: {}", child.id(), e);
                break;
            }
        }
    }

    warn!(
        "Process {} did not exit within {:?}, killing",
        child.id(),
        grace
    );
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn request_terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(child.id() as i32);
    if let Err(e) = kill(pid, Signal::SIGTERM) {
        debug!("SIGTERM to {} failed: {}", pid, e);
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child) {
    let _ = child.kill();
}
