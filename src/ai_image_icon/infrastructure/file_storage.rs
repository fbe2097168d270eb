use super::error::InfrastructureError;
use super::icon_compositor::encode_image;
use image::{ImageFormat, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Blocking filesystem access for the CLI path.
pub struct LocalFileStorage;

impl LocalFileStorage {
    pub fn new() -> Self {
        Self
    }

    pub fn load_image(&self, path: &Path) -> Result<RgbaImage, InfrastructureError> {
        info!("Opening image: {}", path.display());
        let load_error = |source: image::ImageError| InfrastructureError::LoadError {
            path: path.to_path_buf(),
            source,
        };
        let reader = image::io::Reader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| load_error(image::ImageError::IoError(e)))?;
        Ok(reader.decode().map_err(load_error)?.to_rgba8())
    }

    /// Encodes in the format implied by the extension of `path` (PNG when unknown) and writes it.
    pub fn save_image(&self, path: &Path, image: RgbaImage) -> Result<(), InfrastructureError> {
        let format = output_format_for(path);
        let data = encode_image(image, format)?;
        info!("Saving result to: {}", path.display());
        fs::write(path, data).map_err(|source| InfrastructureError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// PNG files directly inside `dir`, sorted by file name.
    pub fn list_icons(&self, dir: &Path) -> Result<Vec<PathBuf>, InfrastructureError> {
        let mut icons = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_png = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("png"))
                .unwrap_or(false);
            if is_png && path.is_file() {
                icons.push(path);
            }
        }
        icons.sort();
        Ok(icons)
    }
}

impl Default for LocalFileStorage {
    fn default() -> Self {
        Self::new()
    }
}

// Formats that encode an RGBA8 image of any size. ICO caps the width at 256 and
// OpenEXR only takes float samples, so those fall back to PNG like unknown extensions.
const WRITABLE_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::Tga,
];

pub fn output_format_for(path: &Path) -> ImageFormat {
    ImageFormat::from_path(path)
        .ok()
        .filter(|format| WRITABLE_FORMATS.contains(format))
        .unwrap_or(ImageFormat::Png)
}
