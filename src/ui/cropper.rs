/// Interactive crop editor
///
/// Draws the selected image fitted into the canvas with the crop selection
/// on top: a dimmed mask outside the region, a border with eight drag
/// handles, and a rule-of-thirds grid inside. Mouse interaction moves or
/// resizes the selection (or starts a new one) and emits the resulting
/// geometry as a message on every change.
use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Path, Program, Stroke};
use iced::widget::image::Handle;
use iced::{Color, Point, Rectangle, Renderer, Size, Theme};

use crate::state::crop::{CropRect, DragHandle};
use crate::Message;

const HANDLE_SIZE: f32 = 8.0;
const HANDLE_HIT_SIZE: f32 = 18.0;
const BORDER_WIDTH: f32 = 2.0;
const GRID_WIDTH: f32 = 1.0;
const OVERLAY_COLOR: Color = Color::from_rgba(0.0, 0.0, 0.0, 0.5);
const BORDER_COLOR: Color = Color::WHITE;
const HANDLE_COLOR: Color = Color::WHITE;
const GRID_COLOR: Color = Color::from_rgba(1.0, 1.0, 1.0, 0.8);

/// Crop editor over the loaded image.
pub struct CropEditor<'a> {
    handle: &'a Handle,
    /// Source image dimensions in pixels
    image: Size,
    /// Current selection in source-image pixels
    crop: CropRect,
}

impl<'a> CropEditor<'a> {
    pub fn new(handle: &'a Handle, image: Size, crop: CropRect) -> Self {
        Self {
            handle,
            image,
            crop,
        }
    }
}

/// An in-progress drag, local to the canvas widget.
#[derive(Debug, Clone)]
struct Drag {
    handle: DragHandle,
    /// Pointer position at the press, in image pixels
    anchor: Point,
    /// Selection at the press
    origin: CropRect,
}

#[derive(Debug, Clone, Default)]
pub struct DragState {
    drag: Option<Drag>,
}

impl<'a> Program<Message> for CropEditor<'a> {
    type State = DragState;

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        let fit = fit_rect(self.image, bounds.size());

        match event {
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(position) = cursor.position_in(bounds) {
                    let handle = hit_test(self.crop, fit, self.image, position);
                    let anchor = to_image(position, fit, self.image);
                    state.drag = Some(Drag {
                        handle,
                        anchor,
                        origin: self.crop,
                    });

                    // Pressing outside the selection starts a new one at
                    // the press point
                    if handle == DragHandle::None {
                        let rect = CropRect::from_drag(anchor, anchor, self.image);
                        return (canvas::event::Status::Captured, Some(Message::CropChanged(rect)));
                    }
                    return (canvas::event::Status::Captured, None);
                }
            }

            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                if let Some(drag) = &state.drag {
                    if let Some(position) = cursor.position_in(bounds) {
                        let current = to_image(position, fit, self.image);
                        let rect = match drag.handle {
                            DragHandle::None => {
                                CropRect::from_drag(drag.anchor, current, self.image)
                            }
                            handle => {
                                drag.origin.dragged(handle, current - drag.anchor, self.image)
                            }
                        };
                        return (canvas::event::Status::Captured, Some(Message::CropChanged(rect)));
                    }
                }
            }

            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if state.drag.take().is_some() {
                    return (canvas::event::Status::Captured, None);
                }
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let fit = fit_rect(self.image, bounds.size());

        frame.draw_image(fit, canvas::Image::new(self.handle.clone()));

        let top_left = to_screen(Point::new(self.crop.left, self.crop.top), fit, self.image);
        let bottom_right = to_screen(
            Point::new(self.crop.right(), self.crop.bottom()),
            fit,
            self.image,
        );
        let selection = Rectangle::new(
            top_left,
            Size::new(bottom_right.x - top_left.x, bottom_right.y - top_left.y),
        );

        // Dim the image outside the selection: top, bottom, left, right bands
        frame.fill_rectangle(
            fit.position(),
            Size::new(fit.width, selection.y - fit.y),
            OVERLAY_COLOR,
        );
        frame.fill_rectangle(
            Point::new(fit.x, selection.y + selection.height),
            Size::new(fit.width, fit.y + fit.height - selection.y - selection.height),
            OVERLAY_COLOR,
        );
        frame.fill_rectangle(
            Point::new(fit.x, selection.y),
            Size::new(selection.x - fit.x, selection.height),
            OVERLAY_COLOR,
        );
        frame.fill_rectangle(
            Point::new(selection.x + selection.width, selection.y),
            Size::new(fit.x + fit.width - selection.x - selection.width, selection.height),
            OVERLAY_COLOR,
        );

        // Rule-of-thirds grid inside the selection
        let mut grid = canvas::path::Builder::new();
        for i in 1..3 {
            let x = selection.x + selection.width * i as f32 / 3.0;
            grid.move_to(Point::new(x, selection.y));
            grid.line_to(Point::new(x, selection.y + selection.height));

            let y = selection.y + selection.height * i as f32 / 3.0;
            grid.move_to(Point::new(selection.x, y));
            grid.line_to(Point::new(selection.x + selection.width, y));
        }
        frame.stroke(
            &grid.build(),
            Stroke::default().with_color(GRID_COLOR).with_width(GRID_WIDTH),
        );

        // Selection border
        frame.stroke(
            &Path::rectangle(selection.position(), selection.size()),
            Stroke::default()
                .with_color(BORDER_COLOR)
                .with_width(BORDER_WIDTH),
        );

        // Drag handles on corners and edge midpoints
        let half = HANDLE_SIZE / 2.0;
        for center in handle_centers(selection) {
            frame.fill_rectangle(
                Point::new(center.x - half, center.y - half),
                Size::new(HANDLE_SIZE, HANDLE_SIZE),
                HANDLE_COLOR,
            );
        }

        vec![frame.into_geometry()]
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if let Some(drag) = &state.drag {
            return cursor_for_handle(drag.handle);
        }

        if let Some(position) = cursor.position_in(bounds) {
            let fit = fit_rect(self.image, bounds.size());
            let handle = hit_test(self.crop, fit, self.image, position);
            if handle != DragHandle::None {
                return cursor_for_handle(handle);
            }
            return mouse::Interaction::Crosshair;
        }

        mouse::Interaction::default()
    }
}

/// Rectangle the image occupies when fitted and centered in the canvas.
fn fit_rect(image: Size, bounds: Size) -> Rectangle {
    let scale = (bounds.width / image.width).min(bounds.height / image.height);
    let width = image.width * scale;
    let height = image.height * scale;
    Rectangle::new(
        Point::new((bounds.width - width) / 2.0, (bounds.height - height) / 2.0),
        Size::new(width, height),
    )
}

/// Canvas position -> image pixels, clamped to the image.
fn to_image(point: Point, fit: Rectangle, image: Size) -> Point {
    let scale = fit.width / image.width;
    Point::new(
        ((point.x - fit.x) / scale).clamp(0.0, image.width),
        ((point.y - fit.y) / scale).clamp(0.0, image.height),
    )
}

/// Image pixels -> canvas position.
fn to_screen(point: Point, fit: Rectangle, image: Size) -> Point {
    let scale = fit.width / image.width;
    Point::new(fit.x + point.x * scale, fit.y + point.y * scale)
}

/// Handle centers in canvas coordinates: corners first, then midpoints.
fn handle_centers(selection: Rectangle) -> [Point; 8] {
    let right = selection.x + selection.width;
    let bottom = selection.y + selection.height;
    let mid_x = selection.x + selection.width / 2.0;
    let mid_y = selection.y + selection.height / 2.0;
    [
        Point::new(selection.x, selection.y),
        Point::new(right, selection.y),
        Point::new(selection.x, bottom),
        Point::new(right, bottom),
        Point::new(mid_x, selection.y),
        Point::new(mid_x, bottom),
        Point::new(selection.x, mid_y),
        Point::new(right, mid_y),
    ]
}

/// Which handle (if any) a canvas position lands on. Corners win over edge
/// midpoints, which win over the move area inside the selection.
fn hit_test(crop: CropRect, fit: Rectangle, image: Size, position: Point) -> DragHandle {
    const ORDER: [DragHandle; 8] = [
        DragHandle::TopLeft,
        DragHandle::TopRight,
        DragHandle::BottomLeft,
        DragHandle::BottomRight,
        DragHandle::Top,
        DragHandle::Bottom,
        DragHandle::Left,
        DragHandle::Right,
    ];

    let top_left = to_screen(Point::new(crop.left, crop.top), fit, image);
    let bottom_right = to_screen(Point::new(crop.right(), crop.bottom()), fit, image);
    let selection = Rectangle::new(
        top_left,
        Size::new(bottom_right.x - top_left.x, bottom_right.y - top_left.y),
    );

    for (center, handle) in handle_centers(selection).into_iter().zip(ORDER) {
        if point_in_handle(position, center) {
            return handle;
        }
    }

    if selection.contains(position) {
        return DragHandle::Move;
    }

    DragHandle::None
}

fn point_in_handle(point: Point, center: Point) -> bool {
    let half = HANDLE_HIT_SIZE / 2.0;
    point.x >= center.x - half
        && point.x <= center.x + half
        && point.y >= center.y - half
        && point.y <= center.y + half
}

fn cursor_for_handle(handle: DragHandle) -> mouse::Interaction {
    match handle {
        DragHandle::TopLeft | DragHandle::BottomRight => mouse::Interaction::ResizingDiagonallyDown,
        DragHandle::TopRight | DragHandle::BottomLeft => mouse::Interaction::ResizingDiagonallyUp,
        DragHandle::Top | DragHandle::Bottom => mouse::Interaction::ResizingVertically,
        DragHandle::Left | DragHandle::Right => mouse::Interaction::ResizingHorizontally,
        DragHandle::Move => mouse::Interaction::Grabbing,
        DragHandle::None => mouse::Interaction::Crosshair,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: Size = Size::new(800.0, 600.0);
    const CANVAS: Size = Size::new(400.0, 400.0);

    #[test]
    fn test_fit_preserves_aspect_and_centers() {
        let fit = fit_rect(IMAGE, CANVAS);
        assert_eq!(fit.width, 400.0);
        assert_eq!(fit.height, 300.0);
        assert_eq!(fit.x, 0.0);
        assert_eq!(fit.y, 50.0);
    }

    #[test]
    fn test_screen_image_round_trip() {
        let fit = fit_rect(IMAGE, CANVAS);
        let image_point = Point::new(200.0, 150.0);
        let screen = to_screen(image_point, fit, IMAGE);
        let back = to_image(screen, fit, IMAGE);
        assert!((back.x - image_point.x).abs() < 0.001);
        assert!((back.y - image_point.y).abs() < 0.001);
    }

    #[test]
    fn test_to_image_clamps_outside_positions() {
        let fit = fit_rect(IMAGE, CANVAS);
        let outside = to_image(Point::new(-50.0, 1000.0), fit, IMAGE);
        assert_eq!(outside.x, 0.0);
        assert_eq!(outside.y, IMAGE.height);
    }

    #[test]
    fn test_hit_test_finds_corner_edge_and_move() {
        let fit = fit_rect(IMAGE, CANVAS);
        let crop = CropRect {
            left: 100.0,
            top: 100.0,
            width: 400.0,
            height: 200.0,
        };

        let corner = to_screen(Point::new(100.0, 100.0), fit, IMAGE);
        assert_eq!(hit_test(crop, fit, IMAGE, corner), DragHandle::TopLeft);

        let edge = to_screen(Point::new(300.0, 300.0), fit, IMAGE);
        assert_eq!(hit_test(crop, fit, IMAGE, edge), DragHandle::Bottom);

        let inside = to_screen(Point::new(250.0, 180.0), fit, IMAGE);
        assert_eq!(hit_test(crop, fit, IMAGE, inside), DragHandle::Move);

        let outside = to_screen(Point::new(700.0, 500.0), fit, IMAGE);
        assert_eq!(hit_test(crop, fit, IMAGE, outside), DragHandle::None);
    }
}
