use crate::math::{Vec2, WorldPoint};
use std::sync::Arc;

/// Decoded RGBA8 raster. Cloning shares the pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl PlanImage {
    pub fn from_dynamic(image: image::DynamicImage) -> Self {
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            pixels: rgba.into_raw().into(),
        }
    }
}

/// Undecoded floor plan as described by a map file.
#[derive(Debug, Clone)]
pub struct FloorPlanSource {
    pub origin_world: WorldPoint,
    pub pixels_per_meter: f64,
    pub bytes: Vec<u8>,
    pub extension: String,
}

/// Floor plan ready for display. `origin_world` is the world position of
/// the image's bottom-left corner.
#[derive(Debug, Clone)]
pub struct FloorPlanAsset {
    pub origin_world: WorldPoint,
    pub pixels_per_meter: f64,
    pub image: PlanImage,
}

impl FloorPlanAsset {
    pub fn new(origin_world: WorldPoint, pixels_per_meter: f64, image: PlanImage) -> Self {
        Self {
            origin_world,
            pixels_per_meter,
            image,
        }
    }

    /// Image extent in meters.
    pub fn size_m(&self) -> Vec2 {
        let ppm = if self.pixels_per_meter > 0.0 {
            self.pixels_per_meter
        } else {
            1.0
        };
        Vec2::new(self.image.width as f64 / ppm, self.image.height as f64 / ppm)
    }

    /// World position of the image's top-left corner.
    pub fn top_left_world(&self) -> WorldPoint {
        self.origin_world + Vec2::new(0.0, self.size_m().y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(width: u32, height: u32, ppm: f64) -> FloorPlanAsset {
        FloorPlanAsset::new(
            Vec2::new(-1.0, -2.0),
            ppm,
            PlanImage {
                width,
                height,
                pixels: vec![0; (width * height * 4) as usize].into(),
            },
        )
    }

    #[test]
    fn extent_follows_pixels_per_meter() {
        let plan = asset(200, 100, 50.0);
        assert_eq!(plan.size_m(), Vec2::new(4.0, 2.0));
        assert_eq!(plan.top_left_world(), Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn zero_pixels_per_meter_does_not_divide_by_zero() {
        assert_eq!(asset(10, 10, 0.0).size_m(), Vec2::new(10.0, 10.0));
    }
}
