pub mod corner;
pub mod encoded_image;
pub mod error;
pub mod icon_compositor_trait;
pub mod overlay_config;
pub mod placement;
