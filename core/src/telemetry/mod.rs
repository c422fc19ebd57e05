pub mod log;
pub mod metrics;

pub use self::log::{LogChannel, LOG_CHANNEL};
pub use metrics::{MetricsRecorder, MetricsSnapshot};
