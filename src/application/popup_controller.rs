use futures::stream::BoxStream;
use tracing::{debug, info};

use super::download_coordinator::{DownloadCoordinator, DownloadEvent};
use crate::{
    domain::{AppError, Banner, DownloadPhase, FormatOption, VideoInfo, VideoQuery},
    host::TabQuery,
    utils::extract_video_id,
};

/// A validated info lookup, ready to run off the UI thread.
pub struct FetchJob {
    coordinator: DownloadCoordinator,
    query: VideoQuery,
}

impl FetchJob {
    pub fn query(&self) -> &VideoQuery {
        &self.query
    }

    pub async fn run(self) -> Result<VideoInfo, AppError> {
        self.coordinator.fetch_video_info(self.query).await
    }
}

/// State of one popup session.
///
/// Every operation is split in two: `start_*` validates and marks the
/// controls busy, `finish_*` always releases them before applying the result.
pub struct PopupController {
    coordinator: DownloadCoordinator,
    url_input: String,
    video: Option<VideoInfo>,
    selected: Option<usize>,
    phase: DownloadPhase,
    banner: Banner,
    fetching: bool,
    downloading: bool,
    progress: f32,
}

impl PopupController {
    pub fn new(coordinator: DownloadCoordinator) -> Self {
        Self {
            coordinator,
            url_input: String::new(),
            video: None,
            selected: None,
            phase: DownloadPhase::Idle,
            banner: Banner::None,
            fetching: false,
            downloading: false,
            progress: 0.0,
        }
    }

    pub fn url_input(&self) -> &str {
        &self.url_input
    }

    pub fn set_url_input(&mut self, value: String) {
        if !self.is_busy() {
            self.url_input = value;
        }
    }

    pub fn phase(&self) -> DownloadPhase {
        self.phase
    }

    pub fn banner(&self) -> &Banner {
        &self.banner
    }

    pub fn video(&self) -> Option<&VideoInfo> {
        self.video.as_ref()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_format(&self) -> Option<&FormatOption> {
        let index = self.selected?;
        self.video.as_ref()?.formats.get(index)
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading
    }

    pub fn is_busy(&self) -> bool {
        self.fetching || self.downloading
    }

    pub fn supports_tab_detection(&self) -> bool {
        self.coordinator.host().active_tab_url() != TabQuery::Unsupported
    }

    /// The download button only shows once there is something to download.
    pub fn download_visible(&self) -> bool {
        self.video.as_ref().is_some_and(|v| !v.formats.is_empty())
    }

    pub fn loading_text(&self) -> Option<String> {
        if self.is_fetching() {
            Some("Fetching formats...".to_string())
        } else if self.is_downloading() {
            if self.progress > 0.0 {
                Some(format!("Downloading: {:.1}%", self.progress * 100.0))
            } else {
                Some("Downloading...".to_string())
            }
        } else {
            None
        }
    }

    /// Fill the input from the host's active tab when it is a video page.
    pub fn detect_current_tab_url(&mut self) {
        if self.is_busy() {
            return;
        }
        self.banner = Banner::None;

        match self.coordinator.host().active_tab_url() {
            TabQuery::Unsupported => {
                self.banner = Banner::Error("Tab detection is not supported here.".to_string());
            }
            TabQuery::NoActiveTab => {
                self.banner = Banner::Error("No active tab to read.".to_string());
            }
            TabQuery::Url(url) if extract_video_id(&url).is_some() => {
                debug!("Using active tab URL {}", url);
                self.url_input = url;
            }
            TabQuery::Url(url) => {
                debug!("Active tab is not a video page: {}", url);
                self.banner =
                    Banner::Error("The current tab is not a supported video page.".to_string());
            }
        }
    }

    pub fn start_fetch(&mut self) -> Option<FetchJob> {
        if self.is_busy() {
            return None;
        }
        self.banner = Banner::None;

        let query = match VideoQuery::parse(&self.url_input) {
            Ok(query) => query,
            Err(e) => {
                self.banner = Banner::Error(e.to_string());
                return None;
            }
        };

        info!("Fetching formats for {}", query.url);
        self.fetching = true;
        self.phase = DownloadPhase::Fetching;

        Some(FetchJob {
            coordinator: self.coordinator.clone(),
            query,
        })
    }

    pub fn finish_fetch(&mut self, result: Result<VideoInfo, AppError>) {
        self.fetching = false;

        match result {
            Ok(info) if !info.formats.is_empty() => {
                self.banner = Banner::Success(format!(
                    "Found {} formats for \"{}\"",
                    info.formats.len(),
                    info.title
                ));
                self.video = Some(info);
                self.selected = None;
                self.phase = DownloadPhase::FormatsReady;
            }
            Ok(_) => {
                self.banner = Banner::Error("No valid formats found.".to_string());
                self.phase = DownloadPhase::FetchError;
            }
            Err(e) => {
                self.banner = Banner::Error(e.to_string());
                self.phase = DownloadPhase::FetchError;
            }
        }
    }

    /// Mark `index` of the current format list as the one to download.
    pub fn select_format(&mut self, index: usize) {
        if self.downloading {
            return;
        }
        let in_range = self
            .video
            .as_ref()
            .is_some_and(|video| index < video.formats.len());
        if !in_range {
            return;
        }

        self.selected = Some(index);
        self.phase = DownloadPhase::FormatSelected;
    }

    pub fn start_download(&mut self) -> Option<BoxStream<'static, DownloadEvent>> {
        if self.is_busy() {
            return None;
        }
        self.banner = Banner::None;

        let Some(video) = self.video.clone() else {
            self.banner = Banner::Error("Please fetch the available formats first.".to_string());
            return None;
        };
        let Some(format) = self.selected_format().cloned() else {
            self.banner = Banner::Error("Please choose a format first.".to_string());
            return None;
        };

        info!("Downloading {} as {}", video.source_url, format.label());
        self.downloading = true;
        self.progress = 0.0;
        self.phase = DownloadPhase::Downloading;

        Some(self.coordinator.download_stream(video, format))
    }

    pub fn on_download_event(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Progress(progress) => {
                self.progress = progress;
            }
            DownloadEvent::Completed { path, filename } => {
                info!("Saved {}", path.display());
                self.finish_download(Ok(filename));
            }
            DownloadEvent::Failed(e) => {
                self.finish_download(Err(e));
            }
        }
    }

    pub fn finish_download(&mut self, result: Result<String, AppError>) {
        self.downloading = false;
        self.progress = 0.0;

        match result {
            Ok(filename) => {
                self.banner = Banner::Success(format!("Downloaded: {}", filename));
                self.phase = DownloadPhase::DownloadComplete;
            }
            Err(e) => {
                self.banner = Banner::Error(e.to_string());
                self.phase = DownloadPhase::DownloadError;
            }
        }
    }
}
