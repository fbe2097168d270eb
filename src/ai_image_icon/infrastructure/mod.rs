pub mod axum_handler;
pub mod error;
pub mod external_image_fetcher;
pub mod file_storage;
pub mod icon_compositor;
pub mod logging;
