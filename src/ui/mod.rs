use iced::{
    widget::{button, column, progress_bar, radio, row, text, text_input, Column, Space},
    Element, Length,
};

use crate::application::PopupController;

#[derive(Debug, Clone)]
pub enum PopupMessage {
    UrlChanged(String),
    DetectTabPressed,
    FetchPressed,
    FormatSelected(usize),
    DownloadPressed,
}

pub fn view(controller: &PopupController) -> Element<'_, PopupMessage> {
    let idle = !controller.is_busy();

    let url_field = text_input("Paste a video URL...", controller.url_input())
        .on_input_maybe(idle.then_some(PopupMessage::UrlChanged))
        .on_submit_maybe(idle.then_some(PopupMessage::FetchPressed))
        .padding(10);

    let mut actions = row![button("Get formats")
        .on_press_maybe(idle.then_some(PopupMessage::FetchPressed))
        .padding([10, 20])]
    .spacing(10);

    if controller.supports_tab_detection() {
        actions = actions.push(
            button("Use current tab")
                .on_press_maybe(idle.then_some(PopupMessage::DetectTabPressed))
                .padding([10, 20]),
        );
    }

    let mut content = column![
        text("Video Downloader").size(32),
        Space::new().height(Length::Fixed(20.0)),
        text("Video URL:").size(16),
        url_field,
        actions,
    ]
    .padding(20)
    .spacing(10);

    if let Some(loading) = controller.loading_text() {
        content = content.push(text(loading).size(14));
        if controller.is_downloading() {
            content = content.push(progress_bar(0.0..=1.0, controller.progress()));
        }
    }

    let banner = controller.banner();
    if let Some(message) = banner.error() {
        content = content.push(text(message).size(14).style(text::danger));
    } else if let Some(message) = banner.success() {
        content = content.push(text(message).size(14).style(text::success));
    }

    if let Some(video) = controller.video() {
        let selected = controller.selected_index();
        let options: Column<'_, PopupMessage> =
            Column::with_children(video.formats.iter().enumerate().map(|(index, format)| {
                radio(format.label(), index, selected, PopupMessage::FormatSelected).into()
            }))
            .spacing(6);

        content = content
            .push(Space::new().height(Length::Fixed(10.0)))
            .push(text(&video.title).size(18))
            .push(options);
    }

    if controller.download_visible() {
        content = content.push(
            button("Download")
                .on_press_maybe(idle.then_some(PopupMessage::DownloadPressed))
                .padding([10, 20]),
        );
    }

    content.into()
}
