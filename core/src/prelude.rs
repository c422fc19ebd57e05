use std::path::PathBuf;
use std::sync::Arc;

pub use crate::device::{DeviceId, DeviceReading, DeviceRole, DeviceSet};
pub use crate::generation::Generation;
pub use crate::math::{ScreenPoint, Vec2, WorldPoint};
pub use crate::plan::{FloorPlanAsset, PlanImage};
pub use crate::viewport::{ViewConfig, Viewport, ViewportCommand, ViewportController};

/// Failure to turn a floor-plan blob into a displayable image.
#[derive(thiserror::Error, Debug, Clone)]
pub enum DecodeError {
    #[error("unknown image format for extension {0:?}")]
    UnknownFormat(String),
    #[error("failed to decode floor plan image: {source}")]
    DecodeFailed {
        #[source]
        source: Arc<image::ImageError>,
    },
    #[error("decode {0} was superseded by a newer request")]
    StaleDecode(u64),
}

impl From<image::ImageError> for DecodeError {
    fn from(source: image::ImageError) -> Self {
        DecodeError::DecodeFailed {
            source: Arc::new(source),
        }
    }
}

/// Failure to read an INI map description.
#[derive(thiserror::Error, Debug)]
pub enum MapError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed map file: {0}")]
    Syntax(#[from] ini::ParseError),
    #[error("no section: [{0}]")]
    MissingSection(String),
    #[error("no value: {0}")]
    MissingValue(String),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("no value: FloorX_FILE")]
    MissingFloorImage,
    #[error("floor plan image {0} has no extension")]
    MissingExtension(PathBuf),
}

/// Failure to decode a device batch from the positioning backend.
#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("invalid device batch: {0}")]
    Json(#[from] serde_json::Error),
}
