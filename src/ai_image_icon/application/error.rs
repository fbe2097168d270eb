use thiserror::Error;
use std::path::PathBuf;
use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Marking failed: {0}")]
    MarkingFailed(String),

    #[error("Request body of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: usize },

    #[error("Icon directory not found at '{}'", .0.display())]
    IconDirectoryNotFound(PathBuf),

    #[error("No icons found in '{}'", .0.display())]
    NoIconsFound(PathBuf),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Domain error occurred: {0}")]
    DomainError(#[from] DomainError),

    #[error("Infrastructure error occurred: {0}")]
    InfrastructureError(#[from] InfrastructureError),
}

use axum::response::{IntoResponse, Response};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use tracing::error;

impl ApplicationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApplicationError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApplicationError::MarkingFailed(_)
            | ApplicationError::IconDirectoryNotFound(_)
            | ApplicationError::NoIconsFound(_)
            | ApplicationError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApplicationError::DomainError(_) => StatusCode::BAD_REQUEST,
            ApplicationError::InfrastructureError(infra_err) => match infra_err {
                InfrastructureError::ExternalApiError(_) | InfrastructureError::ReqwestError(_) => {
                    StatusCode::BAD_GATEWAY
                }
                InfrastructureError::DecodingError(_)
                | InfrastructureError::Base64DecodeError(_) => StatusCode::BAD_REQUEST,
                InfrastructureError::ImageLibError(_) | InfrastructureError::LoadError { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
