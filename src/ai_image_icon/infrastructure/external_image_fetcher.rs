use super::error::InfrastructureError;
use base64::decode;
use tracing::info;

pub struct DefaultExternalImageFetcher {
    client: reqwest::Client,
}

impl DefaultExternalImageFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Returns the raw bytes behind an `http(s)://` URL or a base64 `data:` URL.
    pub async fn fetch_image_from_url_impl(&self, url: &str) -> Result<Vec<u8>, InfrastructureError> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(InfrastructureError::DecodingError(format!("Unsupported URL scheme: {}", url)));
        }

        info!("Fetching base image from {}", url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(InfrastructureError::ExternalApiError(format!(
                "{} responded with {}",
                url,
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

impl Default for DefaultExternalImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_data_url(url: &str) -> Result<Vec<u8>, InfrastructureError> {
    let (header, payload) = url
        .split_once(',')
        .ok_or_else(|| InfrastructureError::DecodingError("Invalid data URL: missing comma".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(InfrastructureError::DecodingError(
            "Invalid data URL: only base64 payloads are supported".to_string(),
        ));
    }
    Ok(decode(payload)?)
}
