use crate::math::{ScreenPoint, Vec2, WorldPoint};
use serde::{Deserialize, Serialize};

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn center(self) -> ScreenPoint {
        Vec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

/// Uniform-scale affine map between world meters (y up) and screen pixels
/// (y down): `screen = origin_screen + (x, -y) * scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scale: f64,
    pub origin_screen: ScreenPoint,
    pub canvas_size: CanvasSize,
}

impl Viewport {
    /// Places the world origin in the middle of the canvas.
    pub fn centered(canvas_size: CanvasSize, scale: f64) -> Self {
        Self {
            scale,
            origin_screen: canvas_size.center(),
            canvas_size,
        }
    }

    pub fn world_to_screen(&self, p: WorldPoint) -> ScreenPoint {
        self.origin_screen + p.flip_y() * self.scale
    }

    pub fn screen_to_world(&self, p: ScreenPoint) -> WorldPoint {
        ((p - self.origin_screen) / self.scale).flip_y()
    }

    /// Length in pixels of `meters` at the current scale.
    pub fn to_pixels(&self, meters: f64) -> f64 {
        meters * self.scale
    }
}
