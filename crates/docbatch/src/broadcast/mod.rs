//! Fan-out of queue and console events to any number of UI subscribers.

pub mod log_broadcaster;
pub mod queue_events;

pub use log_broadcaster::{ConsoleLevel, ConsoleLine, LogBroadcaster};
pub use queue_events::{QueueEvent, QueueEventBroadcaster};
