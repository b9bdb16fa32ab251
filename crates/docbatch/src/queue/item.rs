use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a queue item. Assigned in increasing order, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl QueueItemStatus {
    /// Completed, failed and cancelled items are never processed again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QueueItemStatus::Completed | QueueItemStatus::Failed | QueueItemStatus::Cancelled
        )
    }

    /// Whether a status update from `self` to `next` is legal.
    ///
    /// Processing is only entered from pending, and nothing leaves a
    /// terminal state. A pending item may be cancelled before it starts.
    pub fn can_transition_to(self, next: QueueItemStatus) -> bool {
        use QueueItemStatus::*;
        match (self, next) {
            (Pending, Processing) | (Pending, Cancelled) => true,
            (Processing, Completed) | (Processing, Failed) | (Processing, Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for QueueItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueItemStatus::Pending => write!(f, "Pending"),
            QueueItemStatus::Processing => write!(f, "Processing"),
            QueueItemStatus::Completed => write!(f, "Completed"),
            QueueItemStatus::Failed => write!(f, "Failed"),
            QueueItemStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// A single file in the conversion queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: ItemId,
    /// Absolute path of the file.
    pub path: PathBuf,
    /// File name only, for display.
    pub filename: String,
    /// Size in bytes at the time the file was queued.
    pub size: u64,
    /// Lowercase extension, or "unknown".
    pub format: String,
    pub status: QueueItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub added_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    pub(crate) fn new(id: ItemId, path: PathBuf, size: u64) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let format = format_tag(&path);

        Self {
            id,
            path,
            filename,
            size,
            format,
            status: QueueItemStatus::Pending,
            error_message: None,
            added_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    /// Human readable size, e.g. "1.5 KB".
    pub fn size_display(&self) -> String {
        let mut size = self.size as f64;
        for unit in ["B", "KB", "MB", "GB"] {
            if size < 1024.0 {
                return format!("{:.1} {}", size, unit);
            }
            size /= 1024.0;
        }
        format!("{:.1} TB", size)
    }

    /// Wall-clock time spent processing, once the item has finished.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Lowercase extension of `path`, or "unknown" when it has none.
pub fn format_tag(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_with_size(size: u64) -> QueueItem {
        QueueItem::new(ItemId(1), PathBuf::from("/docs/report.PDF"), size)
    }

    #[test]
    fn test_new_item_is_pending() {
        let item = item_with_size(10);
        assert_eq!(item.status, QueueItemStatus::Pending);
        assert_eq!(item.filename, "report.PDF");
        assert_eq!(item.format, "pdf");
        assert!(item.started_at.is_none());
        assert!(item.ended_at.is_none());
        assert!(item.error_message.is_none());
    }

    #[test]
    fn test_format_tag_unknown() {
        assert_eq!(format_tag(Path::new("/tmp/Makefile")), "unknown");
        assert_eq!(format_tag(Path::new("/tmp/archive.tar.GZ")), "gz");
    }

    #[test]
    fn test_size_display() {
        assert_eq!(item_with_size(512).size_display(), "512.0 B");
        assert_eq!(item_with_size(1536).size_display(), "1.5 KB");
        assert_eq!(item_with_size(5 * 1024 * 1024).size_display(), "5.0 MB");
        assert_eq!(
            item_with_size(3 * 1024 * 1024 * 1024 * 1024).size_display(),
            "3.0 TB"
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!QueueItemStatus::Pending.is_terminal());
        assert!(!QueueItemStatus::Processing.is_terminal());
        assert!(QueueItemStatus::Completed.is_terminal());
        assert!(QueueItemStatus::Failed.is_terminal());
        assert!(QueueItemStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_transitions() {
        use QueueItemStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Processing));
        assert!(!Processing.can_transition_to(Processing));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&QueueItemStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }
}
