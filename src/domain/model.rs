use super::AppError;
use crate::utils::extract_video_id;

/// A user-supplied URL that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoQuery {
    pub url: String,
}

impl VideoQuery {
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let url = input.trim();
        if url.is_empty() {
            return Err(AppError::validation("Please enter a URL."));
        }
        if extract_video_id(url).is_none() {
            return Err(AppError::validation(
                "That does not look like a supported video URL.",
            ));
        }

        Ok(Self {
            url: url.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOption {
    pub format_id: String,
    pub resolution: String,
    pub ext: String,
    pub filesize: String,
}

impl FormatOption {
    /// Text shown for the option, e.g. `720p (mp4, 10MB)`.
    pub fn label(&self) -> String {
        format!("{} ({}, {})", self.resolution, self.ext, self.filesize)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    /// The query URL this info was fetched for; downloads are requested with it.
    pub source_url: String,
    pub title: String,
    pub formats: Vec<FormatOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Idle,
    Fetching,
    FormatsReady,
    FetchError,
    FormatSelected,
    Downloading,
    DownloadError,
    DownloadComplete,
}

/// Only one banner can be up at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Banner {
    #[default]
    None,
    Error(String),
    Success(String),
}

impl Banner {
    pub fn error(&self) -> Option<&str> {
        match self {
            Banner::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn success(&self) -> Option<&str> {
        match self {
            Banner::Success(message) => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_rejects_empty_input() {
        assert!(matches!(
            VideoQuery::parse("   "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_query_trims_input() {
        let query = VideoQuery::parse("  https://youtu.be/abc123 \n").unwrap();
        assert_eq!(query.url, "https://youtu.be/abc123");
    }

    #[test]
    fn test_query_rejects_unknown_host() {
        assert!(VideoQuery::parse("https://example.com/watch?v=abc").is_err());
    }

    #[test]
    fn test_format_label() {
        let format = FormatOption {
            format_id: "720p".to_string(),
            resolution: "720p".to_string(),
            ext: "mp4".to_string(),
            filesize: "10MB".to_string(),
        };
        assert_eq!(format.label(), "720p (mp4, 10MB)");
    }

    #[test]
    fn test_banner_holds_one_message() {
        let banner = Banner::Error("boom".to_string());
        assert_eq!(banner.error(), Some("boom"));
        assert_eq!(banner.success(), None);
    }
}
