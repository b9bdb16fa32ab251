//! Console line broadcasting for the live output panel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// How a console line should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    /// Raw output forwarded from the converter.
    Output,
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsoleLine {
    pub timestamp: DateTime<Utc>,
    pub level: ConsoleLevel,
    pub text: String,
}

impl ConsoleLine {
    pub fn new(level: ConsoleLevel, text: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            text: text.to_string(),
        }
    }

    /// Classifies a line by the bracketed tag it starts with, if any.
    pub fn classify(text: &str) -> Self {
        let level = if text.starts_with("[SUCCESS]") || text.starts_with("[QUEUE COMPLETE]") {
            ConsoleLevel::Success
        } else if text.starts_with("[WARNING]") || text.starts_with("[CANCELLED]") {
            ConsoleLevel::Warning
        } else if text.starts_with("[FAILED]")
            || text.starts_with("[ERROR]")
            || text.starts_with("ERROR:")
        {
            ConsoleLevel::Error
        } else {
            ConsoleLevel::Output
        };
        Self::new(level, text)
    }
}

#[derive(Clone)]
pub struct LogBroadcaster {
    sender: broadcast::Sender<ConsoleLine>,
}

impl LogBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn send(&self, line: ConsoleLine) {
        // No active receivers is fine
        let _ = self.sender.send(line);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleLine> {
        self.sender.subscribe()
    }

    pub fn output(&self, text: &str) {
        self.send(ConsoleLine::classify(text));
    }

    pub fn info(&self, text: &str) {
        self.send(ConsoleLine::new(ConsoleLevel::Info, text));
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new(1000)
    }
}
