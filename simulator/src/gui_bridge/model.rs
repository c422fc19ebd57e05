use serde::{Deserialize, Serialize};

/// Session summary served on `/status`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StatusModel {
    pub running: bool,
    pub recording: bool,
    pub ticks: u64,
    pub device_count: usize,
}
