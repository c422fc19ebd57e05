pub mod deadband;
pub mod geometry;

pub use deadband::DeadBand;
pub use geometry::{ScreenPoint, Vec2, WorldPoint};
