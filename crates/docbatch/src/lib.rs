pub mod broadcast;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod params;
pub mod queue;
pub mod runner;

pub use broadcast::{ConsoleLine, LogBroadcaster, QueueEvent, QueueEventBroadcaster};
pub use config::{default_config_path, merge_with_defaults, Settings};
pub use driver::{BatchDriver, BatchSummary, CancelHandle};
pub use error::{
    BatchError, ConfigError, DocbatchError, ParamsError, QueueError, Result, RunnerError,
};
pub use logging::{init_logging, LoggingOptions};
pub use params::{ConversionOptions, ConversionOptionsBuilder, ConversionParams, ProcessingMode};
pub use queue::{ConversionQueue, ItemId, QueueItem, QueueItemStatus, QueueStats};
pub use runner::{
    ModelDownload, ModelValidator, ProbeResult, ProcessRunner, RequiredArtifacts, RunHandle,
    RunId, RunnerEvent, ToolLocator,
};
