use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{FormatOption, VideoInfo};

/// Which request/response shapes the backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BackendContract {
    /// `GET /info` + `POST /download`, formats keyed by resolution.
    #[default]
    Info,
    /// `POST /video-info` + `POST /download-stream`, formats keyed by `format_id`.
    VideoInfo,
}

/// Response from `GET /info`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InfoResponse {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub available_formats: Vec<InfoFormat>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InfoFormat {
    pub resolution: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default = "unknown_size", deserialize_with = "size_text")]
    pub filesize: String,
}

/// Response from `POST /video-info`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoInfoResponse {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub formats: Vec<VideoInfoFormat>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoInfoFormat {
    pub format_id: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default = "unknown_size", deserialize_with = "size_text")]
    pub filesize_str: String,
}

fn unknown_size() -> String {
    "unknown".to_string()
}

/// Sizes arrive as text, raw byte counts or `null`.
fn size_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let size = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) if !text.trim().is_empty() => text,
        Some(Value::Number(n)) => n.to_string(),
        _ => unknown_size(),
    };
    Ok(size)
}

/// `{ "error": "..." }` body sent alongside failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorPayload {
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoInfoRequest<'a> {
    pub url: &'a str,
}

/// Body of the download call. Exactly one of the selectors is sent.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadRequest<'a> {
    pub url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_id: Option<&'a str>,
}

impl InfoResponse {
    pub fn into_video_info(self, source_url: &str) -> VideoInfo {
        VideoInfo {
            source_url: source_url.to_string(),
            title: self.title,
            formats: self
                .available_formats
                .into_iter()
                .map(|f| FormatOption {
                    format_id: f.resolution.clone(),
                    resolution: f.resolution,
                    ext: f.ext,
                    filesize: f.filesize,
                })
                .collect(),
        }
    }
}

impl VideoInfoResponse {
    pub fn into_video_info(self, source_url: &str) -> VideoInfo {
        VideoInfo {
            source_url: source_url.to_string(),
            title: self.title,
            formats: self
                .formats
                .into_iter()
                .map(|f| FormatOption {
                    format_id: f.format_id,
                    resolution: f.resolution,
                    ext: f.ext,
                    filesize: f.filesize_str,
                })
                .collect(),
        }
    }
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub contract: BackendContract,
    /// Upper bound for the metadata call.
    pub request_timeout: Duration,
    /// Upper bound for the whole download, body included.
    pub download_timeout: Duration,
}

impl ApiConfig {
    pub const DEFAULT_BASE_URL: &'static str = match option_env!("POPUP_API_BASE") {
        Some(base) => base,
        None => "http://localhost:8000",
    };
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            contract: BackendContract::default(),
            request_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(600),
        }
    }
}
