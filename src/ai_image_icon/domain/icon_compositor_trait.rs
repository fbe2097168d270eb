use crate::domain::error::DomainError;
use crate::domain::overlay_config::OverlayConfig;
use image::RgbaImage;

// Pixel work lives in the infrastructure layer; the application layer only sees this trait.
#[cfg_attr(test, mockall::automock)]
pub trait IconCompositor {
    /// Scales `icon`, places it per `config` and blends it over `base`.
    /// The returned image always has the dimensions of `base`.
    fn add_icon_to_image(
        &self,
        base: RgbaImage,
        icon: &RgbaImage,
        config: &OverlayConfig,
    ) -> Result<RgbaImage, DomainError>;
}
