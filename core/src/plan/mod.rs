pub mod asset;
pub mod blob;
pub mod decoder;
pub mod loader;

pub use asset::{FloorPlanAsset, FloorPlanSource, PlanImage};
pub use blob::{BlobRegistry, ObjectUrl};
pub use decoder::{media_type_for, DecodeOutcome, PlanDecoder};
pub use loader::{load_map, parse_map, MapBundle, SURVEYED_QUALITY};
