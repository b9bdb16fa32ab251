//! Filling the queue from folders and drop targets.

mod common;

use common::TestHarness;
use docbatch::queue::{filter_dropped, ConversionQueue, QueueItemStatus};
use docbatch::QueueError;

#[test]
fn test_add_directory_filters_and_sorts() {
    let harness = TestHarness::new();
    harness.input_file("b.pdf");
    harness.input_file("a.DOCX");
    harness.input_file("notes.txt");
    harness.input_file("nested/c.png");

    let mut queue = ConversionQueue::new();
    let report = queue.add_directory(&harness.input_dir, false).unwrap();

    let names: Vec<_> = report.added.iter().map(|i| i.filename.as_str()).collect();
    assert_eq!(names, vec!["a.DOCX", "b.pdf"]);
    assert!(report.rejected.is_empty());
    assert_eq!(queue.items()[0].format, "docx");

    let report = queue.add_directory(&harness.input_dir, true).unwrap();
    assert_eq!(report.added.len(), 3);
    assert_eq!(queue.len(), 5);
    assert_eq!(queue.stats().pending, 5);
}

#[test]
fn test_add_directory_rejects_file() {
    let harness = TestHarness::new();
    let file = harness.input_file("a.pdf");

    let mut queue = ConversionQueue::new();
    assert!(matches!(
        queue.add_directory(&file, true),
        Err(QueueError::InvalidInput { .. })
    ));
    assert!(queue.is_empty());
}

#[test]
fn test_dropped_paths_expand_folders() {
    let harness = TestHarness::new();
    let data = harness.input_file("data.json");
    let pdf = harness.input_file("docs/report.pdf");
    harness.input_file("docs/skip.exe");
    let missing = harness.input_dir.join("gone.pdf");

    let accepted = filter_dropped([
        data.clone(),
        harness.input_dir.join("docs"),
        missing,
    ]);

    assert_eq!(accepted, vec![data, pdf]);
}

#[test]
fn test_mixed_add_reports_rejections() {
    let harness = TestHarness::new();
    let good = harness.input_file("good.pdf");
    let missing = harness.input_dir.join("missing.pdf");

    let mut queue = ConversionQueue::new();
    let report = queue.add_many([good, missing.clone(), harness.input_dir.clone()]);

    assert_eq!(report.added.len(), 1);
    assert_eq!(report.rejected.len(), 2);
    assert!(matches!(&report.rejected[0], (p, QueueError::NotFound(_)) if *p == missing));
    assert!(matches!(report.rejected[1].1, QueueError::InvalidInput { .. }));
    assert_eq!(queue.items()[0].status, QueueItemStatus::Pending);
}
