use super::config::ViewConfig;
use super::transform::{CanvasSize, Viewport};
use crate::math::{ScreenPoint, Vec2, WorldPoint};
use log::{debug, trace};
use std::time::Instant;

/// Input that can mutate the viewport. Pointer positions are canvas-relative
/// and `None` when the pointer is outside the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportCommand {
    Zoom {
        pointer: Option<ScreenPoint>,
        delta_y: f64,
    },
    DragStart {
        pointer: Option<ScreenPoint>,
    },
    DragMove {
        pointer: Option<ScreenPoint>,
    },
    DragEnd,
    PanBy(Vec2),
    Resize {
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, Copy)]
struct PendingZoom {
    pointer: ScreenPoint,
    delta_y: f64,
    opened: Instant,
}

/// Owns the viewport and applies pan/zoom/resize commands to it.
///
/// Wheel zooms are coalesced: the first wheel event opens a window of
/// `wheel_debounce_ms`, later events in that window overwrite it, and only
/// the latest one is applied by [`ViewportController::flush`] once the window
/// has elapsed.
#[derive(Debug, Clone)]
pub struct ViewportController {
    config: ViewConfig,
    viewport: Viewport,
    drag_anchor: Option<ScreenPoint>,
    pending_zoom: Option<PendingZoom>,
}

impl ViewportController {
    /// Creates the controller for a freshly mounted canvas: default scale,
    /// world origin centred.
    pub fn mount(config: ViewConfig, width: u32, height: u32) -> Self {
        let config = config.normalized();
        let viewport = Viewport::centered(CanvasSize::new(width, height), config.default_scale);
        debug!("viewport mounted at {}x{}", width, height);
        Self::with_viewport(config, viewport)
    }

    pub fn with_viewport(config: ViewConfig, mut viewport: Viewport) -> Self {
        let config = config.normalized();
        viewport.scale = config.clamp_scale(viewport.scale);
        Self {
            config,
            viewport,
            drag_anchor: None,
            pending_zoom: None,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    pub fn has_pending_zoom(&self) -> bool {
        self.pending_zoom.is_some()
    }

    /// Single entry point for all input. Returns true when the viewport
    /// changed as a result of this call.
    pub fn dispatch(&mut self, command: ViewportCommand, now: Instant) -> bool {
        match command {
            ViewportCommand::Zoom { pointer, delta_y } => self.queue_zoom(pointer, delta_y, now),
            ViewportCommand::DragStart { pointer } => {
                if let Some(pointer) = pointer {
                    self.drag_anchor = Some(pointer);
                }
                false
            }
            ViewportCommand::DragMove { pointer } => self.drag_to(pointer),
            ViewportCommand::DragEnd => {
                self.drag_anchor = None;
                false
            }
            ViewportCommand::PanBy(delta) => self.pan_by(delta),
            ViewportCommand::Resize { width, height } => self.resize(width, height),
        }
    }

    /// Applies the coalesced wheel event once its window has elapsed.
    pub fn flush(&mut self, now: Instant) -> bool {
        let window = self.config.wheel_debounce();
        match self.pending_zoom {
            Some(pending) if now.saturating_duration_since(pending.opened) >= window => {
                self.pending_zoom = None;
                self.zoom_at(pending.pointer, pending.delta_y)
            }
            _ => false,
        }
    }

    pub fn on_resize(&mut self, width: u32, height: u32) -> bool {
        self.dispatch(ViewportCommand::Resize { width, height }, Instant::now())
    }

    pub fn on_wheel(&mut self, pointer: Option<ScreenPoint>, delta_y: f64, now: Instant) -> bool {
        self.dispatch(ViewportCommand::Zoom { pointer, delta_y }, now)
    }

    pub fn on_drag_start(&mut self, pointer: Option<ScreenPoint>) {
        self.dispatch(ViewportCommand::DragStart { pointer }, Instant::now());
    }

    pub fn on_drag_move(&mut self, pointer: Option<ScreenPoint>) -> bool {
        self.dispatch(ViewportCommand::DragMove { pointer }, Instant::now())
    }

    pub fn on_drag_end(&mut self) {
        self.dispatch(ViewportCommand::DragEnd, Instant::now());
    }

    pub fn world_to_screen(&self, p: WorldPoint) -> ScreenPoint {
        self.viewport.world_to_screen(p)
    }

    pub fn screen_to_world(&self, p: ScreenPoint) -> WorldPoint {
        self.viewport.screen_to_world(p)
    }

    fn queue_zoom(&mut self, pointer: Option<ScreenPoint>, delta_y: f64, now: Instant) -> bool {
        let Some(pointer) = pointer else {
            trace!("wheel event without pointer ignored");
            return false;
        };
        if delta_y == 0.0 || !delta_y.is_finite() {
            return false;
        }

        let opened = self
            .pending_zoom
            .map(|pending| pending.opened)
            .unwrap_or(now);
        self.pending_zoom = Some(PendingZoom {
            pointer,
            delta_y,
            opened,
        });
        self.flush(now)
    }

    /// Pointer-anchored zoom: the world point under `pointer` keeps its
    /// screen position.
    fn zoom_at(&mut self, pointer: ScreenPoint, delta_y: f64) -> bool {
        let old_scale = self.viewport.scale;
        let stepped = if delta_y < 0.0 {
            old_scale * self.config.zoom_factor
        } else {
            old_scale / self.config.zoom_factor
        };
        let new_scale = self.config.clamp_scale(stepped);
        if new_scale == old_scale {
            return false;
        }

        let ratio = new_scale / old_scale;
        self.viewport.origin_screen = pointer - (pointer - self.viewport.origin_screen) * ratio;
        self.viewport.scale = new_scale;
        trace!("zoomed to {:.3} px/m", new_scale);
        true
    }

    fn drag_to(&mut self, pointer: Option<ScreenPoint>) -> bool {
        let (Some(anchor), Some(pointer)) = (self.drag_anchor, pointer) else {
            return false;
        };
        self.drag_anchor = Some(pointer);
        self.pan_by(pointer - anchor)
    }

    fn pan_by(&mut self, delta: Vec2) -> bool {
        if delta == Vec2::zero() || !delta.is_finite() {
            return false;
        }
        self.viewport.origin_screen += delta;
        true
    }

    fn resize(&mut self, width: u32, height: u32) -> bool {
        let size = CanvasSize::new(width, height);
        if self.viewport.canvas_size == size {
            return false;
        }
        debug!("viewport resized to {}x{}", width, height);
        self.viewport.canvas_size = size;
        true
    }
}
