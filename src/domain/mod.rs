pub mod error;
pub mod model;

pub use error::AppError;
pub use model::{Banner, DownloadPhase, FormatOption, VideoInfo, VideoQuery};
