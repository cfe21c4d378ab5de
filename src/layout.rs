// Window geometry
// Computed once before the window is created, immutable afterwards.

use crate::image_loader::ImageData;

/// Position and size of the window. Coordinates are stored as the INT16
/// the protocol carries, so creation and later reconfiguration agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl Layout {
    /// With `bottom`, `y` is an offset from the bottom edge of the screen,
    /// measured against the unscaled image height.
    pub fn compute(x: i32, y: i32, bottom: bool, image: &ImageData, screen_height: u16) -> Self {
        let y = if bottom {
            screen_height as i32 - image.natural_height as i32 - y
        } else {
            y
        };

        Self {
            x: clamp_coordinate(x),
            y: clamp_coordinate(y),
            width: image.width as u16,
            height: image.height as u16,
        }
    }
}

/// Saturate to the INT16 range window coordinates live in.
fn clamp_coordinate(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
