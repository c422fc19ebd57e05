use crate::Message;
use iced::widget::canvas::{self, Frame, Geometry, Path, Stroke, Text};
use iced::widget::image;
use iced::{mouse, Color, Event, Pixels, Point, Rectangle, Renderer, Size, Theme};
use trackcore::device::{DeviceReading, DeviceRole, DeviceSet};
use trackcore::math::{ScreenPoint, Vec2};
use trackcore::plan::FloorPlanAsset;
use trackcore::viewport::{CanvasSize, ViewConfig, Viewport, ViewportCommand, ViewportController};

const MARKER_RADIUS: f32 = 6.0;
const MIN_GRID_SPACING_PX: f64 = 40.0;

/// Canvas program drawing the floor plan and devices through the viewport
/// transform. It never mutates state; input is published as
/// [`ViewportCommand`]s.
pub struct MapCanvas<'a> {
    pub devices: &'a DeviceSet,
    pub plan: Option<(&'a FloorPlanAsset, &'a image::Handle)>,
    pub viewport: Option<&'a ViewportController>,
    pub view_config: &'a ViewConfig,
    pub cache: &'a canvas::Cache,
}

impl MapCanvas<'_> {
    fn current_viewport(&self, bounds: Rectangle) -> Viewport {
        match self.viewport {
            Some(controller) => *controller.viewport(),
            None => Viewport::centered(canvas_size(bounds), self.view_config.default_scale),
        }
    }

    fn is_dragging(&self) -> bool {
        self.viewport.is_some_and(|controller| controller.is_dragging())
    }

    fn input_command(&self, event: &Event, pointer: Option<ScreenPoint>) -> Option<ViewportCommand> {
        let command = match event {
            Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                pointer?;
                let y = match delta {
                    mouse::ScrollDelta::Lines { y, .. } | mouse::ScrollDelta::Pixels { y, .. } => *y,
                };
                // scrolling up reports positive y; zoom-in expects a negative delta
                ViewportCommand::Zoom {
                    pointer,
                    delta_y: -f64::from(y),
                }
            }
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                pointer?;
                ViewportCommand::DragStart { pointer }
            }
            Event::Mouse(mouse::Event::CursorMoved { .. }) if self.is_dragging() => {
                ViewportCommand::DragMove { pointer }
            }
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) if self.is_dragging() => {
                ViewportCommand::DragEnd
            }
            _ => return None,
        };
        Some(command)
    }
}

/// Commands for one canvas event: a resize when the bounds no longer match
/// the controller, followed by the input command itself.
fn viewport_commands(
    current: Option<CanvasSize>,
    size: CanvasSize,
    input: Option<ViewportCommand>,
) -> Vec<ViewportCommand> {
    let mut commands = Vec::with_capacity(2);
    if current != Some(size) {
        commands.push(ViewportCommand::Resize {
            width: size.width,
            height: size.height,
        });
    }
    commands.extend(input);
    commands
}

impl canvas::Program<Message> for MapCanvas<'_> {
    type State = ();

    fn update(
        &self,
        _state: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        let pointer = cursor.position_in(bounds).map(to_screen);
        let input = self.input_command(event, pointer);
        let captured = input.is_some();
        let current = self
            .viewport
            .map(|controller| controller.viewport().canvas_size);

        let commands = viewport_commands(current, canvas_size(bounds), input);
        if commands.is_empty() {
            return None;
        }
        let action = canvas::Action::publish(Message::Viewport(commands));
        Some(if captured { action.and_capture() } else { action })
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let viewport = self.current_viewport(bounds);

        let scene = self.cache.draw(renderer, bounds.size(), |frame| {
            frame.fill_rectangle(
                Point::ORIGIN,
                bounds.size(),
                Color::from_rgb(0.04, 0.04, 0.06),
            );
            if let Some((plan, handle)) = self.plan {
                draw_plan(frame, &viewport, plan, handle);
            }
            draw_grid(frame, &viewport);
            for device in self.devices {
                draw_device(frame, &viewport, device);
            }
        });

        let mut overlay = Frame::new(renderer, bounds.size());
        if let Some(position) = cursor.position_in(bounds) {
            let world = viewport.screen_to_world(to_screen(position));
            overlay.fill_text(Text {
                content: format!("{:.2} m, {:.2} m", world.x, world.y),
                position: Point::new(8.0, bounds.height - 20.0),
                color: Color::from_rgb(0.7, 0.7, 0.75),
                size: Pixels(12.0),
                ..Default::default()
            });
        }

        vec![scene, overlay.into_geometry()]
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if self.is_dragging() {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::default()
        }
    }
}

fn draw_plan(frame: &mut Frame, viewport: &Viewport, plan: &FloorPlanAsset, handle: &image::Handle) {
    let top_left = to_point(viewport.world_to_screen(plan.top_left_world()));
    let extent = plan.size_m() * viewport.scale;
    frame.draw_image(
        Rectangle::new(top_left, Size::new(extent.x as f32, extent.y as f32)),
        canvas::Image::new(handle.clone()),
    );
}

/// Meter grid whose step grows in 1-2-5 increments so lines stay at least
/// `MIN_GRID_SPACING_PX` apart.
fn draw_grid(frame: &mut Frame, viewport: &Viewport) {
    let step = grid_step(viewport.scale);
    let size = viewport.canvas_size;
    let top_left = viewport.screen_to_world(Vec2::zero());
    let bottom_right = viewport.screen_to_world(Vec2::new(size.width as f64, size.height as f64));

    let grid = Path::new(|builder| {
        let mut x = (top_left.x / step).floor() * step;
        while x <= bottom_right.x {
            let screen = viewport.world_to_screen(Vec2::new(x, 0.0));
            builder.move_to(Point::new(screen.x as f32, 0.0));
            builder.line_to(Point::new(screen.x as f32, size.height as f32));
            x += step;
        }
        let mut y = (bottom_right.y / step).floor() * step;
        while y <= top_left.y {
            let screen = viewport.world_to_screen(Vec2::new(0.0, y));
            builder.move_to(Point::new(0.0, screen.y as f32));
            builder.line_to(Point::new(size.width as f32, screen.y as f32));
            y += step;
        }
    });
    frame.stroke(
        &grid,
        Stroke::default()
            .with_width(1.0)
            .with_color(Color::from_rgba(0.35, 0.35, 0.45, 0.35)),
    );

    let origin = to_point(viewport.world_to_screen(Vec2::zero()));
    let axes = Path::new(|builder| {
        builder.move_to(Point::new(origin.x, 0.0));
        builder.line_to(Point::new(origin.x, size.height as f32));
        builder.move_to(Point::new(0.0, origin.y));
        builder.line_to(Point::new(size.width as f32, origin.y));
    });
    frame.stroke(
        &axes,
        Stroke::default()
            .with_width(1.0)
            .with_color(Color::from_rgb(0.45, 0.45, 0.55)),
    );
}

fn grid_step(scale: f64) -> f64 {
    let mut step = 1.0;
    let mut multipliers = [2.0, 2.5, 2.0].iter().cycle();
    while step * scale < MIN_GRID_SPACING_PX {
        step *= multipliers.next().copied().unwrap_or(2.0);
    }
    step
}

fn draw_device(frame: &mut Frame, viewport: &Viewport, device: &DeviceReading) {
    let center = to_point(viewport.world_to_screen(device.position));
    let alpha = 0.4 + 0.6 * f32::from(device.quality) / 100.0;

    let (marker, color) = match device.role {
        DeviceRole::Anchor => (
            Path::rectangle(
                Point::new(center.x - MARKER_RADIUS, center.y - MARKER_RADIUS),
                Size::new(MARKER_RADIUS * 2.0, MARKER_RADIUS * 2.0),
            ),
            Color::from_rgba(0.18, 0.72, 0.89, alpha),
        ),
        DeviceRole::Tag => (
            Path::circle(center, MARKER_RADIUS),
            Color::from_rgba(0.95, 0.55, 0.2, alpha),
        ),
    };
    frame.fill(&marker, color);
    frame.fill_text(Text {
        content: device.id.to_string(),
        position: Point::new(center.x + MARKER_RADIUS + 2.0, center.y - MARKER_RADIUS - 10.0),
        color: Color::WHITE,
        size: Pixels(12.0),
        ..Default::default()
    });
}

fn canvas_size(bounds: Rectangle) -> CanvasSize {
    CanvasSize::new(
        bounds.width.max(0.0).round() as u32,
        bounds.height.max(0.0).round() as u32,
    )
}

fn to_screen(point: Point) -> ScreenPoint {
    Vec2::new(f64::from(point.x), f64::from(point.y))
}

fn to_point(point: ScreenPoint) -> Point {
    Point::new(point.x as f32, point.y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_step_keeps_lines_apart() {
        assert_eq!(grid_step(70.0), 1.0);
        assert_eq!(grid_step(30.0), 2.0);
        assert_eq!(grid_step(10.0), 5.0);
        assert_eq!(grid_step(5.0), 10.0);
        assert!(grid_step(0.5) * 0.5 >= MIN_GRID_SPACING_PX);
    }

    #[test]
    fn input_after_resize_is_kept() {
        let pointer = Some(Vec2::new(10.0, 20.0));
        let zoom = ViewportCommand::Zoom {
            pointer,
            delta_y: -1.0,
        };
        let commands = viewport_commands(
            Some(CanvasSize::new(800, 600)),
            CanvasSize::new(1024, 768),
            Some(zoom),
        );
        assert_eq!(
            commands,
            vec![
                ViewportCommand::Resize {
                    width: 1024,
                    height: 768
                },
                zoom,
            ]
        );
    }

    #[test]
    fn first_event_mounts_before_input() {
        let press = ViewportCommand::DragStart {
            pointer: Some(Vec2::new(1.0, 1.0)),
        };
        let commands = viewport_commands(None, CanvasSize::new(640, 480), Some(press));
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[1], press);
    }

    #[test]
    fn matching_size_without_input_publishes_nothing() {
        let size = CanvasSize::new(800, 600);
        assert!(viewport_commands(Some(size), size, None).is_empty());
        assert_eq!(
            viewport_commands(Some(size), size, Some(ViewportCommand::DragEnd)),
            vec![ViewportCommand::DragEnd]
        );
    }

    #[test]
    fn canvas_size_rounds_bounds() {
        let size = canvas_size(Rectangle::new(Point::ORIGIN, Size::new(799.6, 600.2)));
        assert_eq!(size, CanvasSize::new(800, 600));
    }
}
