use crate::domain::corner::Corner;
use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};

pub const IMAGE_HEIGHT_TO_ICON_HEIGHT_RATIO: f64 = 40.0;
pub const IMAGE_HEIGHT_TO_PADDING_RATIO: f64 = 100.0;
pub const MIN_RATIO: f64 = 1.0;

/// How large the icon is and where it goes, relative to the base image height.
///
/// Both ratios are divisors: an `icon_height_ratio` of 40 makes the icon
/// 1/40 of the base image height. Neither may be below 1, so the icon and the
/// padding never exceed the base image height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub icon_height_ratio: f64,
    pub padding_ratio: f64,
    pub corner: Corner,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            icon_height_ratio: IMAGE_HEIGHT_TO_ICON_HEIGHT_RATIO,
            padding_ratio: IMAGE_HEIGHT_TO_PADDING_RATIO,
            corner: Corner::BottomRight,
        }
    }
}

impl OverlayConfig {
    pub fn new(icon_height_ratio: f64, padding_ratio: f64, corner: Corner) -> Result<Self, DomainError> {
        let config = Self {
            icon_height_ratio,
            padding_ratio,
            corner,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        check_ratio("icon_height_ratio", self.icon_height_ratio)?;
        check_ratio("padding_ratio", self.padding_ratio)
    }
}

fn check_ratio(name: &str, value: f64) -> Result<(), DomainError> {
    if value.is_finite() && value >= MIN_RATIO {
        Ok(())
    } else {
        Err(DomainError::InvalidInput(format!(
            "{} must be a finite number of at least {}, got {}",
            name, MIN_RATIO, value
        )))
    }
}
