//! Sequential processing of a [`ConversionQueue`] through a [`ProcessRunner`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use log::{debug, info, warn};

use crate::broadcast::{LogBroadcaster, QueueEventBroadcaster};
use crate::error::BatchError;
use crate::params::{ConversionOptions, ConversionParams};
use crate::queue::{ConversionQueue, ItemId, QueueItemStatus, QueueStats};
use crate::runner::{ModelValidator, ProcessRunner, RunHandle, RunnerEvent};

const RULE: &str = "============================================================";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of one [`BatchDriver::run`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub stats: QueueStats,
    /// The batch stopped because of a cancel rather than running dry.
    pub cancelled: bool,
}

/// Stops a running batch from another thread.
#[derive(Clone)]
pub struct CancelHandle {
    halt: Arc<AtomicBool>,
    runner: Arc<ProcessRunner>,
}

impl CancelHandle {
    /// Halts the batch and terminates the current process.
    pub fn cancel(&self) -> bool {
        self.halt.store(true, Ordering::SeqCst);
        self.runner.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.halt.load(Ordering::SeqCst)
    }
}

enum Outcome {
    Completed(i32),
    Error(String),
    Cancelled,
}

pub struct BatchDriver {
    runner: Arc<ProcessRunner>,
    halt: Arc<AtomicBool>,
    queue_events: Option<QueueEventBroadcaster>,
    console: Option<LogBroadcaster>,
}

impl BatchDriver {
    pub fn new(runner: Arc<ProcessRunner>) -> Self {
        Self {
            runner,
            halt: Arc::new(AtomicBool::new(false)),
            queue_events: None,
            console: None,
        }
    }

    pub fn with_broadcaster(mut self, broadcaster: QueueEventBroadcaster) -> Self {
        self.queue_events = Some(broadcaster);
        self
    }

    pub fn with_console(mut self, console: LogBroadcaster) -> Self {
        self.console = Some(console);
        self
    }

    pub fn runner(&self) -> &Arc<ProcessRunner> {
        &self.runner
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            halt: Arc::clone(&self.halt),
            runner: Arc::clone(&self.runner),
        }
    }

    /// Checks that a batch can start: the output directory exists (it is
    /// created if needed) and, in offline mode, `validator` accepts the
    /// artifacts directory.
    pub fn prepare(
        &self,
        options: &ConversionOptions,
        validator: &dyn ModelValidator,
    ) -> Result<(), BatchError> {
        let output_dir = options.output_dir();
        std::fs::create_dir_all(output_dir).map_err(|source| BatchError::OutputDirectory {
            path: output_dir.to_path_buf(),
            source,
        })?;

        if let Some(root) = options.mode().artifacts_root() {
            let probe = validator.check(root);
            if !probe.ok {
                return Err(BatchError::ModelsMissing {
                    diagnostic: probe.diagnostic,
                });
            }
            debug!("{}", probe.diagnostic);
        }

        Ok(())
    }

    /// Converts pending items one at a time until none remain or the batch
    /// is cancelled.
    ///
    /// Converter output and progress lines go to `on_output` in order. A
    /// cancelled batch leaves later items pending; calling `run` again
    /// resumes with them. An item whose result arrived before the cancel
    /// keeps that result.
    pub fn run<F>(
        &self,
        queue: &mut ConversionQueue,
        options: Arc<ConversionOptions>,
        mut on_output: F,
    ) -> BatchSummary
    where
        F: FnMut(&str),
    {
        self.halt.store(false, Ordering::SeqCst);
        let mut cancelled = false;

        loop {
            if self.halt.load(Ordering::SeqCst) {
                self.emit(&mut on_output, "[CANCELLED] Conversion cancelled by user.");
                cancelled = true;
                break;
            }

            let Some(next) = queue.next_pending() else {
                break;
            };
            let (id, path, filename) = (next.id, next.path.clone(), next.filename.clone());

            self.transition(queue, id, QueueItemStatus::Processing, None);
            let stats = queue.stats();
            let index = stats.total - stats.pending;
            info!("Processing [{}/{}]: {}", index, stats.total, filename);

            self.emit(&mut on_output, RULE);
            self.emit(
                &mut on_output,
                &format!("Processing [{}/{}]: {}", index, stats.total, filename),
            );
            self.emit(&mut on_output, RULE);

            let params = ConversionParams::new(path, Arc::clone(&options));
            let outcome = match self.runner.convert(&params) {
                Ok(handle) => self.drain(handle, &mut on_output),
                Err(_) if self.halt.load(Ordering::SeqCst) => Outcome::Cancelled,
                Err(e) => Outcome::Error(e.to_string()),
            };

            match outcome {
                Outcome::Completed(0) => {
                    self.transition(queue, id, QueueItemStatus::Completed, None);
                    self.emit(&mut on_output, &format!("[SUCCESS] Completed: {}", filename));
                }
                Outcome::Completed(code) => {
                    self.transition(
                        queue,
                        id,
                        QueueItemStatus::Failed,
                        Some(format!("exit code {}", code)),
                    );
                    self.emit(
                        &mut on_output,
                        &format!("[FAILED] {} (exit code: {})", filename, code),
                    );
                }
                Outcome::Error(message) => {
                    self.emit(&mut on_output, &format!("[ERROR] {}: {}", filename, message));
                    self.transition(queue, id, QueueItemStatus::Failed, Some(message));
                }
                Outcome::Cancelled => {
                    self.transition(queue, id, QueueItemStatus::Cancelled, None);
                    self.emit(&mut on_output, "[CANCELLED] Conversion cancelled by user.");
                    cancelled = true;
                    break;
                }
            }
        }

        let stats = queue.stats();
        if cancelled {
            info!(
                "Batch cancelled: {} completed, {} failed, {} pending",
                stats.completed, stats.failed, stats.pending
            );
        } else {
            self.emit(&mut on_output, RULE);
            self.emit(&mut on_output, "[QUEUE COMPLETE]");
            self.emit(&mut on_output, &format!("Total files processed: {}", stats.total));
            self.emit(
                &mut on_output,
                &format!("Completed successfully: {}", stats.completed),
            );
            self.emit(&mut on_output, &format!("Failed: {}", stats.failed));
            self.emit(
                &mut on_output,
                &format!("Output directory: {}", options.output_dir().display()),
            );
            self.emit(&mut on_output, RULE);
            info!(
                "Batch complete: {} completed, {} failed",
                stats.completed, stats.failed
            );
        }

        BatchSummary { stats, cancelled }
    }

    fn drain<F: FnMut(&str)>(&self, handle: RunHandle, on_output: &mut F) -> Outcome {
        loop {
            match handle.recv_timeout(POLL_INTERVAL) {
                Ok(RunnerEvent::Output(line)) => self.emit(on_output, &line),
                Ok(RunnerEvent::Completed(code)) => return Outcome::Completed(code),
                Ok(RunnerEvent::Error(message)) => return Outcome::Error(message),
                Ok(RunnerEvent::Cancelled) => return Outcome::Cancelled,
                Err(RecvTimeoutError::Timeout) if self.halt.load(Ordering::SeqCst) => {
                    // The cancel may have landed before this run registered.
                    // A cancelled run can also stay blocked on a pipe held
                    // open by a grandchild; once it is no longer current,
                    // stop waiting for it.
                    if self.runner.current_run() == Some(handle.id()) {
                        self.runner.cancel();
                    } else {
                        debug!("Abandoning {} after cancel", handle.id());
                        return Outcome::Cancelled;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("{} ended without a result", handle.id());
                    return Outcome::Error("Converter worker exited unexpectedly".to_string());
                }
            }
        }
    }

    fn transition(
        &self,
        queue: &mut ConversionQueue,
        id: ItemId,
        status: QueueItemStatus,
        error: Option<String>,
    ) {
        if !queue.set_status(id, status, error) {
            warn!("Item {} could not move to {}", id, status);
            return;
        }
        if let (Some(broadcaster), Some(item)) = (&self.queue_events, queue.get(id)) {
            broadcaster.item_changed(item);
        }
    }

    fn emit<F: FnMut(&str)>(&self, on_output: &mut F, line: &str) {
        on_output(line);
        if let Some(console) = &self.console {
            console.output(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ProcessingMode;
    use crate::runner::{ProbeResult, ToolLocator};
    use std::path::Path;
    use tempfile::TempDir;

    fn driver() -> BatchDriver {
        BatchDriver::new(Arc::new(ProcessRunner::new(ToolLocator::new(
            "docbatch-missing-converter",
        ))))
    }

    #[test]
    fn test_prepare_creates_output_dir() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("nested").join("out");
        let options = ConversionOptions::builder(&out).build().unwrap();

        let never = |_: &Path| ProbeResult::failed("not consulted online");
        driver().prepare(&options, &never).unwrap();
        assert!(out.is_dir());
    }

    #[test]
    fn test_prepare_offline_runs_validator() {
        let temp = TempDir::new().unwrap();
        let options = ConversionOptions::builder(temp.path().join("out"))
            .mode(ProcessingMode::Offline {
                artifacts_root: temp.path().join("artifacts"),
            })
            .build()
            .unwrap();

        let missing = |_: &Path| ProbeResult::failed("Missing files: layout");
        match driver().prepare(&options, &missing) {
            Err(BatchError::ModelsMissing { diagnostic }) => {
                assert!(diagnostic.contains("layout"))
            }
            other => panic!("expected models missing, got {:?}", other),
        }

        let present = |_: &Path| ProbeResult::ok("ok");
        assert!(driver().prepare(&options, &present).is_ok());
    }

    #[test]
    fn test_prepare_rejects_file_as_output_dir() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("taken");
        std::fs::write(&file, b"").unwrap();
        let options = ConversionOptions::builder(file.join("out")).build().unwrap();

        let fine = |_: &Path| ProbeResult::ok("ok");
        assert!(matches!(
            driver().prepare(&options, &fine),
            Err(BatchError::OutputDirectory { .. })
        ));
    }

    #[test]
    fn test_empty_queue_completes() {
        let temp = TempDir::new().unwrap();
        let options = Arc::new(ConversionOptions::builder(temp.path()).build().unwrap());
        let mut queue = ConversionQueue::new();
        let mut lines = Vec::new();

        let summary = driver().run(&mut queue, options, |l| lines.push(l.to_string()));

        assert!(!summary.cancelled);
        assert_eq!(summary.stats.total, 0);
        assert!(lines.iter().any(|l| l == "[QUEUE COMPLETE]"));
    }

    #[cfg(unix)]
    #[test]
    #[serial_test::serial]
    fn test_cancel_after_result_keeps_result() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let tool = temp.path().join("docling");
        std::fs::write(&tool, "#!/bin/sh\necho \"converted $(basename \"$1\")\"\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        let driver = BatchDriver::new(Arc::new(ProcessRunner::new(
            ToolLocator::new("docling").with_override(Some(tool)),
        )));

        let mut queue = ConversionQueue::new();
        for name in ["a.pdf", "b.pdf"] {
            let path = temp.path().join(name);
            std::fs::write(&path, b"%PDF").unwrap();
            queue.add(&path).unwrap();
        }
        let options = Arc::new(ConversionOptions::builder(temp.path().join("out")).build().unwrap());

        // The cancel arrives once the converter has already produced its
        // last line, leaving nothing for the runner to stop.
        let halt = Arc::clone(&driver.halt);
        let mut lines = Vec::new();
        let summary = driver.run(&mut queue, options, |line| {
            if line == "converted a.pdf" {
                halt.store(true, Ordering::SeqCst);
            }
            lines.push(line.to_string());
        });

        assert!(summary.cancelled);
        assert_eq!(queue.items()[0].status, QueueItemStatus::Completed);
        assert_eq!(queue.items()[1].status, QueueItemStatus::Pending);
        assert!(lines.iter().any(|l| l == "[SUCCESS] Completed: a.pdf"));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("[CANCELLED] Conversion cancelled by user.")
        );
    }

    #[test]
    fn test_cancel_handle_is_idempotent() {
        let driver = driver();
        let handle = driver.cancel_handle();
        assert!(!handle.is_cancelled());
        assert!(!handle.cancel());
        assert!(!handle.cancel());
        assert!(handle.is_cancelled());
    }
}
