pub mod download_coordinator;
pub mod popup_controller;

pub use download_coordinator::{DownloadCoordinator, DownloadEvent};
pub use popup_controller::PopupController;
