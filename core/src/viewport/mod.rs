pub mod config;
pub mod controller;
pub mod transform;

pub use config::ViewConfig;
pub use controller::{ViewportCommand, ViewportController};
pub use transform::{CanvasSize, Viewport};
