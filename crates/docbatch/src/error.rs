use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocbatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("Invalid conversion parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Could not determine a config directory for this platform")]
    NoConfigDirectory,
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid input '{path}': {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    #[error("Directory scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Conversion already in progress")]
    Busy,

    #[error("{tool} not found. {hint}")]
    ToolNotFound { tool: String, hint: String },

    #[error("Failed to start worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParamsError {
    #[error("An output directory is required")]
    MissingOutputDirectory,

    #[error("Offline mode requires an artifacts path")]
    MissingArtifactsPath,

    #[error("Verbosity must be between 0 and 2, got {0}")]
    InvalidVerbosity(u8),

    #[error("Unknown {field} '{value}'")]
    UnknownOption { field: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Could not create output directory '{path}': {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Offline mode: required models not found. {diagnostic}")]
    ModelsMissing { diagnostic: String },
}

pub type Result<T> = std::result::Result<T, DocbatchError>;
