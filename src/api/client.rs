use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Response};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::models::{
    ApiConfig, BackendContract, DownloadRequest, ErrorPayload, InfoResponse, VideoInfoRequest,
    VideoInfoResponse,
};
use crate::domain::{FormatOption, VideoInfo, VideoQuery};
use crate::utils::filename_from_content_disposition;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("API responded with status {0}")]
    Status(u16),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// An accepted download: optional server-side name, size and the body stream.
pub struct DownloadBody {
    pub filename: Option<String>,
    pub total_size: Option<u64>,
    pub stream: BoxStream<'static, Result<bytes::Bytes>>,
}

#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    client: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self { config, client }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Turn a non-success response into an error, preferring the payload's message.
    async fn error_from_response(response: Response) -> ApiError {
        let status = response.status().as_u16();
        match response.json::<ErrorPayload>().await {
            Ok(payload) if !payload.error.trim().is_empty() => ApiError::ApiError(payload.error),
            _ => ApiError::Status(status),
        }
    }

    /// Ask the backend which formats exist for `query`.
    pub async fn fetch_video_info(&self, query: &VideoQuery) -> Result<VideoInfo> {
        info!(url = %query.url, contract = ?self.config.contract, "Fetching video info");

        let info = match self.config.contract {
            BackendContract::Info => self.get_info(&query.url).await?,
            BackendContract::VideoInfo => self.post_video_info(&query.url).await?,
        };

        debug!(title = %info.title, formats = info.formats.len(), "Video info received");
        Ok(info)
    }

    async fn get_info(&self, url: &str) -> Result<VideoInfo> {
        let response = self
            .client
            .get(self.endpoint("info"))
            .query(&[("url", url)])
            .header("Accept", "application/json")
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let json: InfoResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;

        Ok(json.into_video_info(url))
    }

    async fn post_video_info(&self, url: &str) -> Result<VideoInfo> {
        let response = self
            .client
            .post(self.endpoint("video-info"))
            .json(&VideoInfoRequest { url })
            .header("Accept", "application/json")
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let json: VideoInfoResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;

        if let Some(error) = json.error.clone().filter(|e| !e.trim().is_empty()) {
            return Err(ApiError::ApiError(error));
        }

        Ok(json.into_video_info(url))
    }

    /// Request the file for `format` and hand back its body as a stream.
    pub async fn download_file_stream(
        &self,
        source_url: &str,
        format: &FormatOption,
    ) -> Result<DownloadBody> {
        let (path, body) = match self.config.contract {
            BackendContract::Info => (
                "download",
                DownloadRequest {
                    url: source_url,
                    resolution: Some(&format.resolution),
                    format_id: None,
                },
            ),
            BackendContract::VideoInfo => (
                "download-stream",
                DownloadRequest {
                    url: source_url,
                    resolution: None,
                    format_id: Some(&format.format_id),
                },
            ),
        };

        info!(url = %source_url, format = %format.format_id, "Requesting download");

        let response = self
            .client
            .post(self.endpoint(path))
            .json(&body)
            .header("Accept", "application/json")
            .timeout(self.config.download_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_content_disposition);

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        // A JSON body on a 200 is either an error report or a very odd file.
        if is_json {
            let bytes = response.bytes().await?;
            if let Ok(payload) = serde_json::from_slice::<ErrorPayload>(&bytes) {
                if payload.error.trim().is_empty() {
                    return Err(ApiError::InvalidResponse("empty error payload".to_string()));
                }
                return Err(ApiError::ApiError(payload.error));
            }
            let total_size = Some(bytes.len() as u64);
            return Ok(DownloadBody {
                filename,
                total_size,
                stream: futures::stream::once(async move { Ok(bytes) }).boxed(),
            });
        }

        let total_size = response.content_length();
        let stream = response
            .bytes_stream()
            .map_err(ApiError::RequestError)
            .boxed();

        Ok(DownloadBody {
            filename,
            total_size,
            stream,
        })
    }
}
