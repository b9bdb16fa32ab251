#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use docbatch::{ConversionOptions, ConversionQueue, ProcessRunner, ToolLocator};

/// Isolated input/output/bin directories for one test.
pub struct TestHarness {
    temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub bin_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let input_dir = temp_dir.path().join("input");
        let output_dir = temp_dir.path().join("output");
        let bin_dir = temp_dir.path().join("bin");

        for dir in [&input_dir, &output_dir, &bin_dir] {
            fs::create_dir_all(dir).expect("Failed to create test directory");
        }

        Self {
            temp_dir,
            input_dir,
            output_dir,
            bin_dir,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Creates an input file and returns its path.
    pub fn input_file(&self, name: &str) -> PathBuf {
        let path = self.input_dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create input subdirectory");
        }
        fs::write(&path, format!("contents of {}", name)).expect("Failed to write input file");
        path
    }

    /// Queue holding one fresh input file per name, in order.
    pub fn queue_with(&self, names: &[&str]) -> ConversionQueue {
        let mut queue = ConversionQueue::new();
        for name in names {
            queue
                .add(self.input_file(name))
                .expect("Failed to queue input file");
        }
        queue
    }

    /// Writes an executable `#!/bin/sh` script into the bin directory.
    #[cfg(unix)]
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.bin_dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to mark script executable");
        path
    }

    /// Runner whose converter is a script with the given body.
    #[cfg(unix)]
    pub fn runner(&self, body: &str) -> Arc<ProcessRunner> {
        let tool = self.script("docling", body);
        Arc::new(ProcessRunner::new(
            ToolLocator::default().with_override(Some(tool)),
        ))
    }

    pub fn options(&self) -> Arc<ConversionOptions> {
        Arc::new(
            ConversionOptions::builder(&self.output_dir)
                .build()
                .expect("Failed to build options"),
        )
    }
}
