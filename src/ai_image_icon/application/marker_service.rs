use std::path::{Path, PathBuf};
use std::sync::Arc;
use super::error::ApplicationError;
use image::{ImageFormat as InnerImageFormat, RgbaImage};
use tracing::{info, warn};

use crate::domain::encoded_image::EncodedImage;
use crate::domain::icon_compositor_trait::IconCompositor;
use crate::domain::overlay_config::OverlayConfig;
use crate::infrastructure::file_storage::LocalFileStorage;
use crate::infrastructure::icon_compositor::{decode_image, encode_image};

pub const ALL_ICONS: &str = "all";

pub struct MarkerService {
    compositor: Arc<dyn IconCompositor + Send + Sync>,
    storage: LocalFileStorage,
}

impl MarkerService {
    pub fn new(compositor: Arc<dyn IconCompositor + Send + Sync>) -> Self {
        Self {
            compositor,
            storage: LocalFileStorage::new(),
        }
    }

    fn map_format_str_to_enum(&self, format_str: &str) -> InnerImageFormat {
        match format_str.to_lowercase().as_str() {
            "jpeg" | "jpg" => InnerImageFormat::Jpeg,
            _ => InnerImageFormat::Png,
        }
    }

    pub fn load_icon(&self, icon_path: &Path) -> Result<RgbaImage, ApplicationError> {
        Ok(self.storage.load_image(icon_path)?)
    }

    /// Marks `base_path` with a single icon and returns where the result was written.
    pub fn mark_file(
        &self,
        base_path: &Path,
        icon_path: &Path,
        output_path: Option<&Path>,
        config: &OverlayConfig,
    ) -> Result<PathBuf, ApplicationError> {
        config.validate()?;
        let base = self.storage.load_image(base_path)?;
        let icon = self.storage.load_image(icon_path)?;
        let output_path = output_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(base_path, icon_path));

        self.composite_and_save(base, &icon, &output_path, config)?;
        Ok(output_path)
    }

    /// Writes one marked copy of `base_path` per PNG icon in `icon_dir`.
    ///
    /// A failing icon is skipped; the call only fails when no icon succeeded.
    pub fn mark_with_all_icons(
        &self,
        base_path: &Path,
        icon_dir: &Path,
        config: &OverlayConfig,
    ) -> Result<Vec<PathBuf>, ApplicationError> {
        config.validate()?;
        if !icon_dir.is_dir() {
            return Err(ApplicationError::IconDirectoryNotFound(icon_dir.to_path_buf()));
        }
        let icons = self.storage.list_icons(icon_dir)?;
        if icons.is_empty() {
            return Err(ApplicationError::NoIconsFound(icon_dir.to_path_buf()));
        }
        info!("Found icons: {}", display_names(&icons));

        let base = self.storage.load_image(base_path)?;
        let mut written = Vec::with_capacity(icons.len());
        let mut last_error = None;
        for (i, icon_path) in icons.iter().enumerate() {
            info!("Processing icon {}/{}: {}", i + 1, icons.len(), icon_path.display());
            let output_path = default_output_path(base_path, icon_path);
            let result = self
                .storage
                .load_image(icon_path)
                .map_err(ApplicationError::from)
                .and_then(|icon| self.composite_and_save(base.clone(), &icon, &output_path, config));
            match result {
                Ok(()) => written.push(output_path),
                Err(e) => {
                    warn!("Skipping icon {}: {}", icon_path.display(), e);
                    last_error = Some(e);
                }
            }
        }

        match (written.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(written),
        }
    }

    /// In-memory variant used by the HTTP surface.
    pub fn mark_bytes(
        &self,
        image_data: Vec<u8>,
        icon: &RgbaImage,
        config: &OverlayConfig,
        output_format_str: &str,
    ) -> Result<EncodedImage, ApplicationError> {
        config.validate()?;
        let base = decode_image(image_data, None)?;
        let marked = self.compositor.add_icon_to_image(base, icon, config)?;
        let (width, height) = marked.dimensions();
        let format = self.map_format_str_to_enum(output_format_str);
        let data = encode_image(marked, format)?;
        Ok(EncodedImage::new(data, width, height, format))
    }

    fn composite_and_save(
        &self,
        base: RgbaImage,
        icon: &RgbaImage,
        output_path: &Path,
        config: &OverlayConfig,
    ) -> Result<(), ApplicationError> {
        let marked = self.compositor.add_icon_to_image(base, icon, config)?;
        self.storage.save_image(output_path, marked)?;
        info!("Done.");
        Ok(())
    }
}

/// Uses `icon` as a path when it names an existing file, otherwise looks it up in `icon_dir`.
pub fn resolve_icon_path(icon: &str, icon_dir: &Path) -> PathBuf {
    let direct = Path::new(icon);
    if direct.is_file() {
        direct.to_path_buf()
    } else {
        icon_dir.join(icon)
    }
}

/// `<dir>/<stem>_with_icon_<icon stem>.<ext>` next to the base image.
pub fn default_output_path(base_path: &Path, icon_path: &Path) -> PathBuf {
    let stem = base_path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let icon_stem = icon_path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let mut file_name = format!("{}_with_icon_{}", stem, icon_stem);
    if let Some(ext) = base_path.extension() {
        file_name.push('.');
        file_name.push_str(&ext.to_string_lossy());
    }
    base_path.with_file_name(file_name)
}

fn display_names(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::domain::icon_compositor_trait::MockIconCompositor;
    use crate::infrastructure::error::InfrastructureError;
    use crate::infrastructure::icon_compositor::DefaultIconCompositor;
    use image::Rgba;
    use mockall::predicate::always;
    use std::fs;

    fn write_png(path: &Path, width: u32, height: u32, color: Rgba<u8>) {
        RgbaImage::from_pixel(width, height, color).save(path).unwrap();
    }

    fn real_service() -> MarkerService {
        MarkerService::new(Arc::new(DefaultIconCompositor::new()))
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("examples/originals/summer.png"), Path::new("icon/png/white_on_black.png")),
            PathBuf::from("examples/originals/summer_with_icon_white_on_black.png")
        );
        assert_eq!(
            default_output_path(Path::new("photo.jpg"), Path::new("blue.png")),
            PathBuf::from("photo_with_icon_blue.jpg")
        );
        assert_eq!(
            default_output_path(Path::new("/tmp/raw"), Path::new("blue.png")),
            PathBuf::from("/tmp/raw_with_icon_blue")
        );
    }

    #[test]
    fn test_resolve_icon_path() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("mine.png");
        write_png(&existing, 2, 2, Rgba([0, 0, 0, 255]));

        let resolved = resolve_icon_path(existing.to_str().unwrap(), Path::new("icon/png"));
        assert_eq!(resolved, existing);
        assert_eq!(
            resolve_icon_path("white_on_blue.png", Path::new("icon/png")),
            PathBuf::from("icon/png/white_on_blue.png")
        );
    }

    #[test]
    fn test_mark_file_writes_marked_image() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("winter.png");
        let icon_path = dir.path().join("white_on_black.png");
        write_png(&base_path, 800, 400, Rgba([0, 0, 255, 255]));
        write_png(&icon_path, 64, 64, Rgba([255, 255, 255, 255]));

        let output = real_service()
            .mark_file(&base_path, &icon_path, None, &OverlayConfig::default())
            .unwrap();
        assert_eq!(output, dir.path().join("winter_with_icon_white_on_black.png"));

        let marked = image::open(&output).unwrap().to_rgba8();
        assert_eq!(marked.dimensions(), (800, 400));
        // 10px icon, 4px padding
        assert_eq!(*marked.get_pixel(800 - 4 - 1, 400 - 4 - 1), Rgba([255, 255, 255, 255]));
        assert_eq!(*marked.get_pixel(800 - 4, 400 - 4), Rgba([0, 0, 255, 255]));
        assert_eq!(*marked.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_mark_file_twice_adds_a_second_icon() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("base.png");
        let icon_path = dir.path().join("half.png");
        write_png(&base_path, 400, 400, Rgba([0, 0, 0, 255]));
        write_png(&icon_path, 10, 10, Rgba([255, 255, 255, 128]));
        let service = real_service();
        let config = OverlayConfig::default();

        let first = service.mark_file(&base_path, &icon_path, None, &config).unwrap();
        let second_path = dir.path().join("again.png");
        service.mark_file(&first, &icon_path, Some(&second_path), &config).unwrap();

        let once = image::open(&first).unwrap().to_rgba8();
        let twice = image::open(&second_path).unwrap().to_rgba8();
        // 10px icon at (386, 386)
        assert_eq!(*once.get_pixel(386, 386), Rgba([128, 128, 128, 255]));
        assert_eq!(*twice.get_pixel(386, 386), Rgba([192, 192, 192, 255]));
    }

    #[test]
    fn test_mark_file_missing_base_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let icon_path = dir.path().join("icon.png");
        write_png(&icon_path, 4, 4, Rgba([1, 1, 1, 255]));

        let mut compositor = MockIconCompositor::new();
        compositor.expect_add_icon_to_image().never();
        let service = MarkerService::new(Arc::new(compositor));

        let err = service
            .mark_file(&dir.path().join("nope.png"), &icon_path, None, &OverlayConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::InfrastructureError(InfrastructureError::LoadError { .. })
        ));
    }

    #[test]
    fn test_mark_file_unwritable_output_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("base.png");
        write_png(&base_path, 40, 40, Rgba([1, 1, 1, 255]));

        let mut compositor = MockIconCompositor::new();
        compositor
            .expect_add_icon_to_image()
            .times(1)
            .returning(|base, _, _| Ok(base));
        let service = MarkerService::new(Arc::new(compositor));

        let output = dir.path().join("missing/out.png");
        let err = service
            .mark_file(&base_path, &base_path, Some(&output), &OverlayConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::InfrastructureError(InfrastructureError::WriteError { .. })
        ));
    }

    #[test]
    fn test_mark_file_rejects_invalid_config_before_io() {
        let mut compositor = MockIconCompositor::new();
        compositor.expect_add_icon_to_image().never();
        let service = MarkerService::new(Arc::new(compositor));
        let config = OverlayConfig {
            icon_height_ratio: 0.0,
            ..OverlayConfig::default()
        };

        let err = service
            .mark_file(Path::new("a.png"), Path::new("b.png"), None, &config)
            .unwrap_err();
        assert!(matches!(err, ApplicationError::DomainError(DomainError::InvalidInput(_))));
    }

    #[test]
    fn test_mark_with_all_icons() {
        let dir = tempfile::tempdir().unwrap();
        let icon_dir = dir.path().join("icons");
        fs::create_dir(&icon_dir).unwrap();
        write_png(&icon_dir.join("blue.png"), 8, 8, Rgba([0, 0, 255, 255]));
        write_png(&icon_dir.join("white_on_black.png"), 8, 8, Rgba([255, 255, 255, 255]));
        fs::write(icon_dir.join("readme.txt"), "not an icon").unwrap();
        let base_path = dir.path().join("summer.png");
        write_png(&base_path, 200, 200, Rgba([10, 10, 10, 255]));

        let mut compositor = MockIconCompositor::new();
        compositor
            .expect_add_icon_to_image()
            .with(always(), always(), always())
            .times(2)
            .returning(|base, _, _| Ok(base));
        let service = MarkerService::new(Arc::new(compositor));

        let written = service
            .mark_with_all_icons(&base_path, &icon_dir, &OverlayConfig::default())
            .unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("summer_with_icon_blue.png"),
                dir.path().join("summer_with_icon_white_on_black.png"),
            ]
        );
        for path in &written {
            assert!(path.is_file());
        }
    }

    #[test]
    fn test_mark_with_all_icons_skips_broken_icon() {
        let dir = tempfile::tempdir().unwrap();
        let icon_dir = dir.path().join("icons");
        fs::create_dir(&icon_dir).unwrap();
        fs::write(icon_dir.join("broken.png"), b"garbage").unwrap();
        write_png(&icon_dir.join("good.png"), 8, 8, Rgba([255, 255, 255, 255]));
        let base_path = dir.path().join("base.png");
        write_png(&base_path, 100, 100, Rgba([0, 0, 0, 255]));

        let written = real_service()
            .mark_with_all_icons(&base_path, &icon_dir, &OverlayConfig::default())
            .unwrap();
        assert_eq!(written, vec![dir.path().join("base_with_icon_good.png")]);
    }

    #[test]
    fn test_mark_with_all_icons_fails_when_every_icon_fails() {
        let dir = tempfile::tempdir().unwrap();
        let icon_dir = dir.path().join("icons");
        fs::create_dir(&icon_dir).unwrap();
        fs::write(icon_dir.join("broken.png"), b"garbage").unwrap();
        let base_path = dir.path().join("base.png");
        write_png(&base_path, 100, 100, Rgba([0, 0, 0, 255]));

        let err = real_service()
            .mark_with_all_icons(&base_path, &icon_dir, &OverlayConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::InfrastructureError(InfrastructureError::LoadError { .. })
        ));
    }

    #[test]
    fn test_mark_with_all_icons_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let service = real_service();
        let base_path = dir.path().join("base.png");

        let missing = service
            .mark_with_all_icons(&base_path, &dir.path().join("nowhere"), &OverlayConfig::default())
            .unwrap_err();
        assert!(matches!(missing, ApplicationError::IconDirectoryNotFound(_)));

        let empty_dir = dir.path().join("empty");
        fs::create_dir(&empty_dir).unwrap();
        let empty = service
            .mark_with_all_icons(&base_path, &empty_dir, &OverlayConfig::default())
            .unwrap_err();
        assert!(matches!(empty, ApplicationError::NoIconsFound(_)));
    }

    #[test]
    fn test_mark_bytes_formats() {
        let service = real_service();
        let base = encode_image(RgbaImage::from_pixel(120, 80, Rgba([5, 5, 5, 255])), InnerImageFormat::Png).unwrap();
        let icon = RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 255]));

        let png = service
            .mark_bytes(base.clone(), &icon, &OverlayConfig::default(), "png")
            .unwrap();
        assert_eq!(png.content_type(), "image/png");
        assert_eq!((png.width, png.height), (120, 80));
        assert_eq!(image::guess_format(&png.data).unwrap(), InnerImageFormat::Png);

        let jpeg = service
            .mark_bytes(base, &icon, &OverlayConfig::default(), "JPG")
            .unwrap();
        assert_eq!(jpeg.content_type(), "image/jpeg");
        assert_eq!(image::guess_format(&jpeg.data).unwrap(), InnerImageFormat::Jpeg);
    }

    #[test]
    fn test_mark_bytes_compositor_fails() {
        let mut compositor = MockIconCompositor::new();
        compositor
            .expect_add_icon_to_image()
            .times(1)
            .returning(|_, _, _| Err(DomainError::InvalidInput("mock processing error".to_string())));
        let service = MarkerService::new(Arc::new(compositor));
        let base = encode_image(RgbaImage::new(4, 4), InnerImageFormat::Png).unwrap();

        let result = service.mark_bytes(base, &RgbaImage::new(1, 1), &OverlayConfig::default(), "png");
        match result {
            Err(ApplicationError::DomainError(DomainError::InvalidInput(msg))) => {
                assert_eq!(msg, "mock processing error")
            }
            other => panic!("Expected ApplicationError::DomainError, got {:?}", other),
        }
    }

    #[test]
    fn test_mark_bytes_invalid_image_data() {
        let result = real_service().mark_bytes(vec![1, 2, 3], &RgbaImage::new(1, 1), &OverlayConfig::default(), "png");
        assert!(matches!(result, Err(ApplicationError::InfrastructureError(_))));
    }
}
