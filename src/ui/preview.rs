/// Live crop preview
///
/// Mirrors the crop editor's current selection into the result pane: the
/// selected region is scaled to fit the preview surface and everything
/// else is clipped away. Pure pass-through over the shared render handle;
/// no re-decode and no state of its own.
use iced::mouse::Cursor;
use iced::widget::canvas::{self, Program};
use iced::widget::image::Handle;
use iced::{Point, Rectangle, Renderer, Size, Theme};

use crate::state::crop::CropRect;
use crate::Message;

pub struct CropPreview<'a> {
    handle: &'a Handle,
    /// Source image dimensions in pixels
    image: Size,
    /// Region to mirror, in source-image pixels
    crop: CropRect,
}

impl<'a> CropPreview<'a> {
    pub fn new(handle: &'a Handle, image: Size, crop: CropRect) -> Self {
        Self {
            handle,
            image,
            crop,
        }
    }
}

impl<'a> Program<Message> for CropPreview<'a> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let scale = (bounds.width / self.crop.width).min(bounds.height / self.crop.height);
        let target = Rectangle::new(
            Point::new(
                (bounds.width - self.crop.width * scale) / 2.0,
                (bounds.height - self.crop.height * scale) / 2.0,
            ),
            Size::new(self.crop.width * scale, self.crop.height * scale),
        );

        // Draw the whole image shifted so the crop region lands exactly in
        // the clipped target; coordinates inside the clip are relative to
        // its top-left corner.
        let handle = self.handle.clone();
        let image = self.image;
        let crop = self.crop;
        frame.with_clip(target, move |frame| {
            let destination = Rectangle::new(
                Point::new(-crop.left * scale, -crop.top * scale),
                Size::new(image.width * scale, image.height * scale),
            );
            frame.draw_image(destination, canvas::Image::new(handle));
        });

        vec![frame.into_geometry()]
    }
}
