use crate::domain::error::DomainError;
use crate::domain::icon_compositor_trait::IconCompositor;
use crate::domain::overlay_config::OverlayConfig;
use crate::domain::placement::Placement;
use super::error::InfrastructureError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use tracing::debug;

pub struct DefaultIconCompositor;

impl DefaultIconCompositor {
    pub fn new() -> Self {
        Self
    }

    fn scale_icon(&self, icon: &RgbaImage, placement: &Placement) -> RgbaImage {
        if icon.dimensions() == (placement.width, placement.height) {
            return icon.clone();
        }
        imageops::resize(icon, placement.width, placement.height, FilterType::Lanczos3)
    }
}

impl Default for DefaultIconCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl IconCompositor for DefaultIconCompositor {
    fn add_icon_to_image(
        &self,
        mut base: RgbaImage,
        icon: &RgbaImage,
        config: &OverlayConfig,
    ) -> Result<RgbaImage, DomainError> {
        let (base_width, base_height) = base.dimensions();
        let placement = Placement::compute(base_width, base_height, icon.width(), icon.height(), config)?;
        debug!(
            "Icon {}x{} -> {}x{} at ({}, {}) with padding {}",
            icon.width(),
            icon.height(),
            placement.width,
            placement.height,
            placement.x,
            placement.y,
            placement.padding
        );

        let visible = match placement.visible_bounds(base_width, base_height) {
            Some(rect) => rect,
            None => return Ok(base),
        };
        let scaled = self.scale_icon(icon, &placement);

        for y in visible.top()..=visible.bottom() {
            for x in visible.left()..=visible.right() {
                let icon_pixel = scaled.get_pixel((x - placement.x) as u32, (y - placement.y) as u32);
                blend_over(base.get_pixel_mut(x as u32, y as u32), icon_pixel);
            }
        }
        Ok(base)
    }
}

/// Porter-Duff "source over": `icon` is drawn on top of `base` using its alpha.
pub fn blend_over(base: &mut Rgba<u8>, icon: &Rgba<u8>) {
    let icon_alpha = icon[3];
    if icon_alpha == 0 {
        return;
    }
    if icon_alpha == u8::MAX {
        *base = *icon;
        return;
    }

    let a = icon_alpha as f32 / 255.0;
    let base_a = base[3] as f32 / 255.0;
    let out_a = a + base_a * (1.0 - a);
    for c in 0..3 {
        let value = (icon[c] as f32 * a + base[c] as f32 * base_a * (1.0 - a)) / out_a;
        base[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    base[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Decodes raw bytes into RGBA8, guessing the format when none is given.
pub fn decode_image(
    image_bytes: Vec<u8>,
    input_format_opt: Option<ImageFormat>,
) -> Result<RgbaImage, InfrastructureError> {
    let reader = match input_format_opt {
        Some(format) => image::io::Reader::with_format(Cursor::new(image_bytes), format),
        None => image::io::Reader::new(Cursor::new(image_bytes)).with_guessed_format()?,
    };
    Ok(reader.decode()?.to_rgba8())
}

/// Encodes an RGBA8 image. Formats without an alpha channel get the RGB channels only.
pub fn encode_image(image: RgbaImage, output_format: ImageFormat) -> Result<Vec<u8>, InfrastructureError> {
    let dynamic = match output_format {
        ImageFormat::Jpeg | ImageFormat::Bmp => {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image).to_rgb8())
        }
        _ => DynamicImage::ImageRgba8(image),
    };
    let mut buffer = Cursor::new(Vec::new());
    dynamic.write_to(&mut buffer, output_format)?;
    Ok(buffer.into_inner())
}
