use iced::Task;
use tracing::debug;

use crate::application::{DownloadCoordinator, DownloadEvent, PopupController};
use crate::domain::{AppError, VideoInfo};
use crate::ui::{self, PopupMessage};

pub struct PopupApp {
    controller: PopupController,
}

impl PopupApp {
    pub fn new(coordinator: DownloadCoordinator) -> Self {
        let mut controller = PopupController::new(coordinator);

        // Hosted launches start with the active tab already filled in.
        if controller.supports_tab_detection() {
            controller.detect_current_tab_url();
        }

        Self { controller }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(PopupMessage),
    VideoInfoReceived(Result<VideoInfo, AppError>),
    Download(DownloadEvent),
}

pub fn update(app: &mut PopupApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => match ui_msg {
            PopupMessage::UrlChanged(value) => {
                app.controller.set_url_input(value);
            }
            PopupMessage::DetectTabPressed => {
                app.controller.detect_current_tab_url();
            }
            PopupMessage::FetchPressed => {
                if let Some(job) = app.controller.start_fetch() {
                    debug!("Dispatching lookup for {}", job.query().url);
                    return Task::perform(job.run(), Message::VideoInfoReceived);
                }
            }
            PopupMessage::FormatSelected(index) => {
                app.controller.select_format(index);
            }
            PopupMessage::DownloadPressed => {
                if let Some(stream) = app.controller.start_download() {
                    return Task::stream(stream).map(Message::Download);
                }
            }
        },
        Message::VideoInfoReceived(result) => {
            app.controller.finish_fetch(result);
            debug!(phase = ?app.controller.phase(), "Lookup finished");
        }
        Message::Download(event) => {
            app.controller.on_download_event(event);
        }
    }
    Task::none()
}

pub fn view(app: &PopupApp) -> iced::Element<'_, Message> {
    ui::view(&app.controller).map(Message::UiMessage)
}
