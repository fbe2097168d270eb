pub mod error;
pub mod marker_service;
pub mod settings;
