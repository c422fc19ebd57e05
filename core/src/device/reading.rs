use crate::math::WorldPoint;
use serde::{Deserialize, Serialize};

/// Stable hardware address of a positioning device.
pub type DeviceId = u8;

/// Anchors are fixed references; tags (hedgehogs) are tracked objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceRole {
    Anchor,
    Tag,
}

impl DeviceRole {
    pub fn from_hedge_flag(is_hedge: bool) -> Self {
        if is_hedge {
            DeviceRole::Tag
        } else {
            DeviceRole::Anchor
        }
    }

    pub fn is_hedge(self) -> bool {
        matches!(self, DeviceRole::Tag)
    }
}

/// One report from a positioning device. Position is in meters, y up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    pub id: DeviceId,
    pub role: DeviceRole,
    pub position: WorldPoint,
    pub quality: u8,
}

impl DeviceReading {
    pub fn new(id: DeviceId, role: DeviceRole, x: f64, y: f64, quality: u8) -> Self {
        Self {
            id,
            role,
            position: WorldPoint::new(x, y),
            quality,
        }
    }

    pub fn anchor(id: DeviceId, x: f64, y: f64, quality: u8) -> Self {
        Self::new(id, DeviceRole::Anchor, x, y, quality)
    }

    pub fn tag(id: DeviceId, x: f64, y: f64, quality: u8) -> Self {
        Self::new(id, DeviceRole::Tag, x, y, quality)
    }
}
