use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{stream::BoxStream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::{
    api::{ApiClient, ApiError},
    domain::{AppError, FormatOption, VideoInfo, VideoQuery},
    host::HostCapabilities,
    utils::fallback_filename,
};

const FETCH_FAILED: &str = "Failed to fetch video info.";
const NO_FORMATS: &str = "No valid formats found.";
const DOWNLOAD_FAILED: &str = "Download failed.";

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Progress(f32),
    Completed { path: PathBuf, filename: String },
    Failed(AppError),
}

/// Runs the network side of the popup: metadata lookups and file downloads.
#[derive(Clone)]
pub struct DownloadCoordinator {
    api_client: ApiClient,
    host: Arc<dyn HostCapabilities>,
}

impl DownloadCoordinator {
    pub fn new(api_client: ApiClient, host: Arc<dyn HostCapabilities>) -> Self {
        Self { api_client, host }
    }

    pub fn host(&self) -> &dyn HostCapabilities {
        self.host.as_ref()
    }

    pub async fn fetch_video_info(&self, query: VideoQuery) -> Result<VideoInfo, AppError> {
        let info = self
            .api_client
            .fetch_video_info(&query)
            .await
            .map_err(|e| {
                warn!("Video info lookup failed: {}", e);
                to_app_error(e, FETCH_FAILED, NO_FORMATS)
            })?;

        if info.formats.is_empty() {
            return Err(AppError::Backend(NO_FORMATS.to_string()));
        }

        Ok(info)
    }

    pub fn download_stream(
        &self,
        info: VideoInfo,
        format: FormatOption,
    ) -> BoxStream<'static, DownloadEvent> {
        futures::stream::unfold(
            DownloadRuntimeState::Start {
                client: self.api_client.clone(),
                host: Arc::clone(&self.host),
                info,
                format,
            },
            |state| async move {
                match state {
                    DownloadRuntimeState::Start {
                        client,
                        host,
                        info,
                        format,
                    } => {
                        let body = match client
                            .download_file_stream(&info.source_url, &format)
                            .await
                        {
                            Ok(body) => body,
                            Err(e) => {
                                warn!("Download request failed: {}", e);
                                return Some((
                                    DownloadEvent::Failed(to_app_error(
                                        e,
                                        DOWNLOAD_FAILED,
                                        DOWNLOAD_FAILED,
                                    )),
                                    DownloadRuntimeState::Finished,
                                ));
                            }
                        };

                        let filename = body
                            .filename
                            .clone()
                            .unwrap_or_else(|| fallback_filename(&info.title, &format.ext));

                        let path = match host.save_destination(&filename).await {
                            Ok(Some(path)) => path,
                            Ok(None) => {
                                return Some((
                                    DownloadEvent::Failed(AppError::validation(
                                        "Download cancelled.",
                                    )),
                                    DownloadRuntimeState::Finished,
                                ));
                            }
                            Err(e) => {
                                return Some((
                                    DownloadEvent::Failed(e),
                                    DownloadRuntimeState::Finished,
                                ));
                            }
                        };

                        let file = match tokio::fs::File::create(&path).await {
                            Ok(file) => file,
                            Err(e) => {
                                return Some((
                                    DownloadEvent::Failed(AppError::Io(format!(
                                        "Failed to create file: {}",
                                        e
                                    ))),
                                    DownloadRuntimeState::Finished,
                                ));
                            }
                        };

                        info!("Writing {} to {}", filename, path.display());

                        Some((
                            DownloadEvent::Progress(0.0),
                            DownloadRuntimeState::Downloading {
                                file,
                                stream: body.stream,
                                downloaded: 0,
                                total: body.total_size,
                                path,
                                filename,
                            },
                        ))
                    }
                    DownloadRuntimeState::Downloading {
                        mut file,
                        mut stream,
                        mut downloaded,
                        total,
                        path,
                        filename,
                    } => match stream.next().await {
                        Some(Ok(chunk)) => {
                            if let Err(e) = file.write_all(&chunk).await {
                                discard_partial(file, &path).await;
                                return Some((
                                    DownloadEvent::Failed(AppError::Io(format!(
                                        "Write error: {}",
                                        e
                                    ))),
                                    DownloadRuntimeState::Finished,
                                ));
                            }

                            downloaded += chunk.len() as u64;

                            let progress = match total {
                                Some(total_size) if total_size > 0 => {
                                    (downloaded as f32 / total_size as f32).min(1.0)
                                }
                                _ => 0.0,
                            };

                            Some((
                                DownloadEvent::Progress(progress),
                                DownloadRuntimeState::Downloading {
                                    file,
                                    stream,
                                    downloaded,
                                    total,
                                    path,
                                    filename,
                                },
                            ))
                        }
                        Some(Err(e)) => {
                            warn!("Download interrupted: {}", e);
                            discard_partial(file, &path).await;
                            Some((
                                DownloadEvent::Failed(to_app_error(
                                    e,
                                    DOWNLOAD_FAILED,
                                    DOWNLOAD_FAILED,
                                )),
                                DownloadRuntimeState::Finished,
                            ))
                        }
                        None => {
                            if let Err(e) = file.sync_all().await {
                                discard_partial(file, &path).await;
                                return Some((
                                    DownloadEvent::Failed(AppError::Io(format!(
                                        "Failed to sync file: {}",
                                        e
                                    ))),
                                    DownloadRuntimeState::Finished,
                                ));
                            }

                            info!("Download finished: {} bytes", downloaded);
                            Some((
                                DownloadEvent::Completed { path, filename },
                                DownloadRuntimeState::Finished,
                            ))
                        }
                    },
                    DownloadRuntimeState::Finished => None,
                }
            },
        )
        .boxed()
    }
}

/// Map an API failure onto the popup's error classes.
/// `network` is shown when no response arrived, `fallback` for a bare bad status.
fn to_app_error(error: ApiError, network: &str, fallback: &str) -> AppError {
    match error {
        ApiError::ApiError(message) => AppError::Backend(message),
        ApiError::Status(_) | ApiError::InvalidResponse(_) => {
            AppError::Backend(fallback.to_string())
        }
        ApiError::RequestError(_) => AppError::Network(network.to_string()),
    }
}

async fn discard_partial(file: tokio::fs::File, path: &Path) {
    drop(file);
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Could not remove partial file {}: {}", path.display(), e);
    }
}

enum DownloadRuntimeState {
    Start {
        client: ApiClient,
        host: Arc<dyn HostCapabilities>,
        info: VideoInfo,
        format: FormatOption,
    },
    Downloading {
        file: tokio::fs::File,
        stream: BoxStream<'static, crate::api::Result<bytes::Bytes>>,
        downloaded: u64,
        total: Option<u64>,
        path: PathBuf,
        filename: String,
    },
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiConfig, BackendContract};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct DirHost(PathBuf);

    #[async_trait]
    impl HostCapabilities for DirHost {
        fn name(&self) -> &'static str {
            "test"
        }

        fn active_tab_url(&self) -> crate::host::TabQuery {
            crate::host::TabQuery::Unsupported
        }

        async fn save_destination(&self, filename: &str) -> Result<Option<PathBuf>, AppError> {
            Ok(Some(self.0.join(filename)))
        }
    }

    struct CancellingHost;

    #[async_trait]
    impl HostCapabilities for CancellingHost {
        fn name(&self) -> &'static str {
            "cancelling"
        }

        fn active_tab_url(&self) -> crate::host::TabQuery {
            crate::host::TabQuery::Unsupported
        }

        async fn save_destination(&self, _filename: &str) -> Result<Option<PathBuf>, AppError> {
            Ok(None)
        }
    }

    fn coordinator_for(
        server: &mockito::ServerGuard,
        host: Arc<dyn HostCapabilities>,
    ) -> DownloadCoordinator {
        let client = ApiClient::new(ApiConfig {
            base_url: server.url(),
            contract: BackendContract::Info,
            request_timeout: Duration::from_secs(5),
            download_timeout: Duration::from_secs(5),
        });
        DownloadCoordinator::new(client, host)
    }

    fn sample_info() -> (VideoInfo, FormatOption) {
        let format = FormatOption {
            format_id: "720p".to_string(),
            resolution: "720p".to_string(),
            ext: "mp4".to_string(),
            filesize: "10MB".to_string(),
        };
        let info = VideoInfo {
            source_url: "https://youtu.be/abc123".to_string(),
            title: "My: Clip".to_string(),
            formats: vec![format.clone()],
        };
        (info, format)
    }

    #[tokio::test]
    async fn test_zero_formats_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/info")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(json!({"title": "Empty", "available_formats": []}).to_string())
            .create_async()
            .await;

        let coordinator = coordinator_for(&server, Arc::new(CancellingHost));
        let err = coordinator
            .fetch_video_info(VideoQuery::parse("https://youtu.be/abc123").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err, AppError::Backend(NO_FORMATS.to_string()));
    }

    #[tokio::test]
    async fn test_download_uses_title_when_header_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/download")
            .with_status(200)
            .with_header("content-type", "video/mp4")
            .with_body(b"0123456789")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator_for(&server, Arc::new(DirHost(dir.path().to_path_buf())));
        let (info, format) = sample_info();

        let events: Vec<DownloadEvent> = coordinator.download_stream(info, format).collect().await;

        match events.last() {
            Some(DownloadEvent::Completed { path, filename }) => {
                assert_eq!(filename, "My_ Clip.mp4");
                assert_eq!(std::fs::read(path).unwrap(), b"0123456789".to_vec());
            }
            other => panic!("unexpected final event: {:?}", other),
        }
        assert!(matches!(events.first(), Some(DownloadEvent::Progress(p)) if *p == 0.0));
    }

    #[tokio::test]
    async fn test_download_uses_header_filename_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/download")
            .with_status(200)
            .with_header("content-disposition", "attachment; filename=Server%20Name.webm")
            .with_body(b"abc")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator_for(&server, Arc::new(DirHost(dir.path().to_path_buf())));
        let (info, format) = sample_info();

        let events: Vec<DownloadEvent> = coordinator.download_stream(info, format).collect().await;

        match events.last() {
            Some(DownloadEvent::Completed { path, filename }) => {
                assert_eq!(filename, "Server Name.webm");
                assert_eq!(path, &dir.path().join("Server Name.webm"));
            }
            other => panic!("unexpected final event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_download_failure_payload_and_fallback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/download")
            .with_status(400)
            .with_body(json!({"error": "Format not available"}).to_string())
            .expect(1)
            .create_async()
            .await;

        let coordinator = coordinator_for(&server, Arc::new(CancellingHost));
        let (info, format) = sample_info();
        let events: Vec<DownloadEvent> = coordinator
            .download_stream(info.clone(), format.clone())
            .collect()
            .await;
        assert!(matches!(
            events.as_slice(),
            [DownloadEvent::Failed(AppError::Backend(m))] if m == "Format not available"
        ));

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/download")
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let coordinator = coordinator_for(&server, Arc::new(CancellingHost));
        let events: Vec<DownloadEvent> = coordinator.download_stream(info, format).collect().await;
        assert!(matches!(
            events.as_slice(),
            [DownloadEvent::Failed(AppError::Backend(m))] if m == DOWNLOAD_FAILED
        ));
    }

    #[tokio::test]
    async fn test_cancelled_destination_writes_nothing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/download")
            .with_status(200)
            .with_body(b"abc")
            .create_async()
            .await;

        let coordinator = coordinator_for(&server, Arc::new(CancellingHost));
        let (info, format) = sample_info();
        let events: Vec<DownloadEvent> = coordinator.download_stream(info, format).collect().await;

        assert!(matches!(
            events.as_slice(),
            [DownloadEvent::Failed(AppError::Validation(_))]
        ));
    }

    #[tokio::test]
    async fn test_discard_partial_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("half.mp4");
        let mut file = tokio::fs::File::create(&path).await.unwrap();
        file.write_all(b"half").await.unwrap();

        discard_partial(file, &path).await;

        assert!(!path.exists());
    }
}
