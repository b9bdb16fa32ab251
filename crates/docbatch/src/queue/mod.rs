//! Ordered batch of files awaiting conversion.
//!
//! The queue is a plain data structure owned by the caller's thread. Apart
//! from the existence checks made when files are added it performs no I/O.

pub mod item;
pub mod scanner;

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};
use serde::Serialize;

use crate::error::QueueError;

pub use item::{ItemId, QueueItem, QueueItemStatus};
pub use scanner::{filter_dropped, scan_directory, DROP_EXTENSIONS, SUPPORTED_EXTENSIONS};

/// Per-status counts over the whole queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Pending plus processing.
    pub remaining: usize,
}

/// Outcome of a bulk add: what made it in and what was skipped.
#[derive(Debug, Default)]
pub struct AddReport {
    pub added: Vec<QueueItem>,
    pub rejected: Vec<(PathBuf, QueueError)>,
}

#[derive(Debug)]
pub struct ConversionQueue {
    items: Vec<QueueItem>,
    next_id: u64,
}

impl Default for ConversionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionQueue {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
        }
    }

    /// Queues a single file. The path must name an existing regular file.
    pub fn add<P: AsRef<Path>>(&mut self, path: P) -> Result<&QueueItem, QueueError> {
        let path = path.as_ref();

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(QueueError::NotFound(path.to_path_buf()));
            }
            Err(e) => {
                return Err(QueueError::InvalidInput {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        if !metadata.is_file() {
            return Err(QueueError::InvalidInput {
                path: path.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }

        let absolute = std::path::absolute(path).map_err(|e| QueueError::InvalidInput {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let id = ItemId(self.next_id);
        self.next_id += 1;

        debug!("Queued {} as item {}", absolute.display(), id);
        self.items.push(QueueItem::new(id, absolute, metadata.len()));

        let index = self.items.len() - 1;
        Ok(&self.items[index])
    }

    /// Queues every path that validates. Failures are reported, not fatal.
    pub fn add_many<I, P>(&mut self, paths: I) -> AddReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = AddReport::default();

        for path in paths {
            let path = path.as_ref();
            match self.add(path) {
                Ok(item) => report.added.push(item.clone()),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.rejected.push((path.to_path_buf(), e));
                }
            }
        }

        report
    }

    /// Queues every supported file found in `dir`.
    pub fn add_directory<P: AsRef<Path>>(
        &mut self,
        dir: P,
        recursive: bool,
    ) -> Result<AddReport, QueueError> {
        let files = scan_directory(dir.as_ref(), recursive)?;
        Ok(self.add_many(files))
    }

    /// Removes an item. Refuses (returns false) while it is processing.
    pub fn remove(&mut self, id: ItemId) -> bool {
        match self.items.iter().position(|item| item.id == id) {
            Some(index) if self.items[index].status != QueueItemStatus::Processing => {
                self.items.remove(index);
                true
            }
            _ => false,
        }
    }

    /// Removes each id it can. Returns how many were removed.
    pub fn remove_many<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = ItemId>,
    {
        ids.into_iter().filter(|id| self.remove(*id)).count()
    }

    /// Drops everything except the item currently being processed.
    pub fn clear_pending(&mut self) {
        self.items
            .retain(|item| item.status == QueueItemStatus::Processing);
    }

    /// Drops completed and failed items.
    pub fn clear_terminal(&mut self) {
        self.items.retain(|item| {
            !matches!(
                item.status,
                QueueItemStatus::Completed | QueueItemStatus::Failed
            )
        });
    }

    pub fn get(&self, id: ItemId) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// First pending item in insertion order.
    pub fn next_pending(&self) -> Option<&QueueItem> {
        self.items
            .iter()
            .find(|item| item.status == QueueItemStatus::Pending)
    }

    /// Moves an item to `status`, stamping start and end times.
    ///
    /// Returns false for an unknown id or a transition that
    /// [`QueueItemStatus::can_transition_to`] forbids; the item is left
    /// untouched in both cases.
    pub fn set_status(
        &mut self,
        id: ItemId,
        status: QueueItemStatus,
        error_message: Option<String>,
    ) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };

        if !item.status.can_transition_to(status) {
            debug!(
                "Ignoring status change of item {} from {} to {}",
                id, item.status, status
            );
            return false;
        }

        item.status = status;
        item.error_message = error_message;

        if status == QueueItemStatus::Processing {
            item.started_at = Some(Utc::now());
        } else if status.is_terminal() {
            item.ended_at = Some(Utc::now());
        }

        true
    }

    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            total: self.items.len(),
            ..QueueStats::default()
        };

        for item in &self.items {
            match item.status {
                QueueItemStatus::Pending => stats.pending += 1,
                QueueItemStatus::Processing => stats.processing += 1,
                QueueItemStatus::Completed => stats.completed += 1,
                QueueItemStatus::Failed => stats.failed += 1,
                QueueItemStatus::Cancelled => stats.cancelled += 1,
            }
        }

        stats.remaining = stats.pending + stats.processing;
        stats
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueueItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a ConversionQueue {
    type Item = &'a QueueItem;
    type IntoIter = std::slice::Iter<'a, QueueItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
