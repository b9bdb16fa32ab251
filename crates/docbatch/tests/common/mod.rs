//! Shared test utilities for docbatch integration tests.
//!
//! `TestHarness` gives each test its own temp directories and writes small
//! POSIX shell scripts that stand in for the converter.

pub mod harness;

pub use harness::TestHarness;
