use crate::application::error::ApplicationError;
use crate::application::marker_service::MarkerService;
use crate::domain::corner::Corner;
use crate::domain::encoded_image::EncodedImage;
use crate::domain::overlay_config::OverlayConfig;
use super::error::InfrastructureError;
use super::external_image_fetcher::DefaultExternalImageFetcher;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Json, Multipart, Query, State},
    http::header::{HeaderName, CONTENT_LENGTH, CONTENT_TYPE},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use image::RgbaImage;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

const IMAGE_FIELD: &str = "image";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub struct AppState {
    pub marker_service: Arc<MarkerService>,
    pub fetcher: Arc<DefaultExternalImageFetcher>,
    pub icon: Arc<RgbaImage>,
    pub config: OverlayConfig,
    /// Largest request body accepted, replacing axum's 2 MB default.
    pub max_upload_bytes: usize,
}

#[derive(Deserialize, Debug, Default)]
pub struct MarkParams {
    pub corner: Option<String>,
    pub format: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct FetchImageParams {
    pub url: String,
    pub corner: Option<String>,
    #[serde(rename = "outputFormat")]
    pub output_format: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(vec![HeaderName::from_static("content-type")]);

    Router::new()
        .route("/mark", post(mark_image_handler))
        .route("/fetch", post(fetch_image_handler))
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}

pub async fn mark_image_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MarkParams>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApplicationError> {
    check_content_length(&headers, state.max_upload_bytes)?;
    let mut image_data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| InfrastructureError::DecodingError(format!("Multipart error: {}", e)))?
    {
        let is_image_field = field.name() == Some(IMAGE_FIELD);
        if image_data.is_some() && !is_image_field {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| InfrastructureError::DecodingError(format!("Failed to read multipart field: {}", e)))?;
        image_data = Some(data.to_vec());
        if is_image_field {
            break;
        }
    }
    let image_data = image_data
        .ok_or_else(|| InfrastructureError::DecodingError("No image field in upload".to_string()))?;

    let encoded = mark_in_background(&state, image_data, params.corner, params.format).await?;
    image_response(encoded)
}

pub async fn fetch_image_handler(
    State(state): State<Arc<AppState>>,
    Json(params): Json<FetchImageParams>,
) -> Result<impl IntoResponse, ApplicationError> {
    let image_data = state.fetcher.fetch_image_from_url_impl(&params.url).await?;
    let encoded = mark_in_background(&state, image_data, params.corner, params.output_format).await?;
    image_response(encoded)
}

// Bodies without a Content-Length still stop at the body limit, as a multipart error.
fn check_content_length(headers: &HeaderMap, limit: usize) -> Result<(), ApplicationError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    match declared {
        Some(size) if size > limit as u64 => Err(ApplicationError::PayloadTooLarge { size, limit }),
        _ => Ok(()),
    }
}

// Compositing is CPU-bound; keep it off the async workers.
async fn mark_in_background(
    state: &Arc<AppState>,
    image_data: Vec<u8>,
    corner: Option<String>,
    format: Option<String>,
) -> Result<EncodedImage, ApplicationError> {
    let mut config = state.config.clone();
    if let Some(corner) = corner {
        config.corner = corner.parse::<Corner>()?;
    }
    let format = format.unwrap_or_else(|| "png".to_string());
    let service = state.marker_service.clone();
    let icon = state.icon.clone();

    let encoded = tokio::task::spawn_blocking(move || service.mark_bytes(image_data, &icon, &config, &format))
        .await
        .map_err(|e| ApplicationError::MarkingFailed(format!("Marking task failed: {}", e)))??;
    info!("Marked {}x{} image as {:?}", encoded.width, encoded.height, encoded.format);
    Ok(encoded)
}

fn image_response(encoded: EncodedImage) -> Result<Response, ApplicationError> {
    Response::builder()
        .header(CONTENT_TYPE, encoded.content_type())
        .body(Body::from(encoded.data))
        .map(IntoResponse::into_response)
        .map_err(|e| ApplicationError::MarkingFailed(format!("Failed to build response: {}", e)))
}
