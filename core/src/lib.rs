//! Core of the indoor positioning live map.
//!
//! Merges polled device readings into a stable view model, maintains the
//! pointer-anchored pan/zoom transform of the map canvas, and decodes
//! floor-plan images with generation-tagged completions so a superseded
//! decode can never replace a newer plan.

pub mod device;
pub mod generation;
pub mod math;
pub mod plan;
pub mod prelude;
pub mod scene;
pub mod telemetry;
pub mod viewport;

pub use prelude::{DecodeError, MapError, RecordError};
pub use scene::MapScene;
