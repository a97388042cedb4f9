mod api;
mod app;
mod application;
mod config;
mod domain;
mod host;
mod ui;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::api::ApiClient;
use crate::application::DownloadCoordinator;
use crate::config::{init_logging, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_format);

    let api_config = args.api_config();
    let host = args.host();
    info!(
        backend = %api_config.base_url,
        contract = ?api_config.contract,
        host = host.name(),
        "Starting video popup"
    );

    let coordinator = DownloadCoordinator::new(ApiClient::new(api_config), host);

    iced::application(
        move || app::PopupApp::new(coordinator.clone()),
        app::update,
        app::view,
    )
    .title("Video Downloader")
    .window_size((420.0, 560.0))
    .run()
    .context("Popup window failed")
}
