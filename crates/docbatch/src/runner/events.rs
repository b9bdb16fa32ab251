use std::fmt;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

/// Identifies one supervised invocation. Zero is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(pub(crate) u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Output and outcome of a run, in the order the worker observed them.
///
/// Every run ends with exactly one terminal event, sent after its last
/// [`RunnerEvent::Output`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    /// One line of combined stdout/stderr, without the trailing newline.
    Output(String),
    /// The process exited. Holds its exit code, or -1 when it was killed by a signal.
    Completed(i32),
    /// The process could not be launched or supervised.
    Error(String),
    /// The run was cancelled before the process exited on its own.
    Cancelled,
}

impl RunnerEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunnerEvent::Output(_))
    }
}

/// Receiving side of a started run.
#[derive(Debug)]
pub struct RunHandle {
    id: RunId,
    events: Receiver<RunnerEvent>,
}

impl RunHandle {
    pub(crate) fn new(id: RunId, events: Receiver<RunnerEvent>) -> Self {
        Self { id, events }
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    /// Blocks for the next event. `None` once the worker has gone away.
    pub fn recv(&self) -> Option<RunnerEvent> {
        self.events.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<RunnerEvent, RecvTimeoutError> {
        self.events.recv_timeout(timeout)
    }

    /// Drains the run to completion, returning output lines and the terminal event.
    pub fn wait(self) -> (Vec<String>, Option<RunnerEvent>) {
        let mut lines = Vec::new();
        for event in self.events.iter() {
            match event {
                RunnerEvent::Output(line) => lines.push(line),
                terminal => return (lines, Some(terminal)),
            }
        }
        (lines, None)
    }
}
