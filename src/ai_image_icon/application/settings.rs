use super::error::ApplicationError;
use crate::domain::corner::Corner;
use crate::domain::overlay_config::OverlayConfig;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct OverlayOverrides {
    pub icon_height_ratio: Option<f64>,
    pub padding_ratio: Option<f64>,
    pub corner: Option<Corner>,
}

/// Built-in defaults, then the JSON file (if any), then explicit overrides.
pub fn resolve_overlay_config(
    config_file: Option<&Path>,
    overrides: &OverlayOverrides,
) -> Result<OverlayConfig, ApplicationError> {
    let base = match config_file {
        Some(path) => load_config_file(path)?,
        None => OverlayConfig::default(),
    };
    let config = OverlayConfig::new(
        overrides.icon_height_ratio.unwrap_or(base.icon_height_ratio),
        overrides.padding_ratio.unwrap_or(base.padding_ratio),
        overrides.corner.unwrap_or(base.corner),
    )?;
    debug!("Overlay config: {:?}", config);
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<OverlayConfig, ApplicationError> {
    let text = fs::read_to_string(path).map_err(|e| {
        ApplicationError::ConfigurationError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        ApplicationError::ConfigurationError(format!("Failed to parse {}: {}", path.display(), e))
    })
}
