use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue, USER_AGENT};

use crate::error::HarvestError;
use crate::probe::{ProbeResult, probe_stream};

pub trait ImageClient: Send + Sync {
    /// Size and dimensions from the headers and a bounded prefix of the body.
    fn probe(&self, url: &str) -> Result<ProbeResult, HarvestError>;
    /// Full download of the image bytes.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError>;
}

#[derive(Clone)]
pub struct ImageHttpClient {
    client: Client,
}

impl ImageHttpClient {
    pub fn new() -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gbif-images/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HarvestError::ImageHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| HarvestError::ImageHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<Response, HarvestError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HarvestError::ImageHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(HarvestError::ImageStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

impl ImageClient for ImageHttpClient {
    fn probe(&self, url: &str) -> Result<ProbeResult, HarvestError> {
        let response = self.get(url)?;
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        // Dropping the response afterwards abandons the rest of the body.
        probe_stream(content_length, response)
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError> {
        let response = self.get(url)?;
        let bytes = response
            .bytes()
            .map_err(|err| HarvestError::ImageHttp(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}
