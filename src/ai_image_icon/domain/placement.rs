use crate::domain::corner::Corner;
use crate::domain::error::DomainError;
use crate::domain::overlay_config::OverlayConfig;
use imageproc::rect::Rect;

/// Where the scaled icon lands on the base image.
///
/// The origin is the top-left pixel of the scaled icon in base image
/// coordinates. The scaled icon never exceeds the base image, but a large
/// padding can still push the origin negative; the part outside the base
/// image is clipped at composite time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub padding: u32,
}

impl Placement {
    pub fn compute(
        base_width: u32,
        base_height: u32,
        icon_width: u32,
        icon_height: u32,
        config: &OverlayConfig,
    ) -> Result<Self, DomainError> {
        config.validate()?;
        if icon_width == 0 || icon_height == 0 {
            return Err(DomainError::InvalidInput(format!(
                "icon has an empty size {}x{}",
                icon_width, icon_height
            )));
        }

        let height = target_icon_height(base_height, config.icon_height_ratio);
        let width = scaled_icon_width(icon_width, icon_height, height);
        if width > base_width || height > base_height {
            return Err(DomainError::InvalidInput(format!(
                "scaled icon {}x{} does not fit on a {}x{} image",
                width, height, base_width, base_height
            )));
        }
        let padding = padding_for(base_height, config.padding_ratio);

        let (pad, w, h) = (padding as i64, width as i64, height as i64);
        let far_x = base_width as i64 - w - pad;
        let far_y = base_height as i64 - h - pad;
        let (x, y) = match config.corner {
            Corner::TopLeft => (pad, pad),
            Corner::TopRight => (far_x, pad),
            Corner::BottomLeft => (pad, far_y),
            Corner::BottomRight => (far_x, far_y),
        };

        Ok(Self {
            x: clamp_to_i32(x),
            y: clamp_to_i32(y),
            width,
            height,
            padding,
        })
    }

    /// Bounding box of the scaled icon, unclipped.
    pub fn bounds(&self) -> Rect {
        Rect::at(self.x, self.y).of_size(self.width, self.height)
    }

    /// Part of the icon bounding box that lies on a base image of the given size.
    pub fn visible_bounds(&self, base_width: u32, base_height: u32) -> Option<Rect> {
        if base_width == 0 || base_height == 0 {
            return None;
        }
        self.bounds().intersect(Rect::at(0, 0).of_size(base_width, base_height))
    }
}

/// round(base_height / ratio), at least one pixel.
pub fn target_icon_height(base_height: u32, ratio: f64) -> u32 {
    ((base_height as f64 / ratio).round() as u32).max(1)
}

/// Width that keeps the icon's aspect ratio at the target height, at least one pixel.
pub fn scaled_icon_width(icon_width: u32, icon_height: u32, target_height: u32) -> u32 {
    let aspect_ratio = icon_width as f64 / icon_height as f64;
    ((target_height as f64 * aspect_ratio).round() as u32).max(1)
}

/// round(base_height / ratio).
pub fn padding_for(base_height: u32, ratio: f64) -> u32 {
    (base_height as f64 / ratio).round() as u32
}

fn clamp_to_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
