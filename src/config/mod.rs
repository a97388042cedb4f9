use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use crate::api::{ApiConfig, BackendContract};
use crate::host::{HostCapabilities, HostedCapabilities, StandaloneCapabilities};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Base address of the download backend
    #[arg(long, env = "POPUP_API_BASE", default_value = ApiConfig::DEFAULT_BASE_URL)]
    pub api_base: String,

    /// Request/response shapes the backend speaks
    #[arg(long, value_enum, default_value_t = BackendContract::Info)]
    pub contract: BackendContract,

    /// Active tab URL handed over by the browser launcher
    #[arg(long, env = "POPUP_TAB_URL")]
    pub tab_url: Option<String>,

    /// Seconds before a format lookup gives up
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Seconds before a download gives up
    #[arg(long, default_value_t = 600)]
    pub download_timeout_secs: u64,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_base.clone(),
            contract: self.contract,
            request_timeout: Duration::from_secs(self.timeout_secs.max(1)),
            download_timeout: Duration::from_secs(self.download_timeout_secs.max(1)),
        }
    }

    /// A launcher that passes the active tab means we run hosted.
    pub fn host(&self) -> Arc<dyn HostCapabilities> {
        match &self.tab_url {
            Some(url) => Arc::new(HostedCapabilities::with_default_dir(Some(url.clone()))),
            None => Arc::new(StandaloneCapabilities),
        }
    }
}

pub fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["video-fetch-popup", "--api-base", "http://backend:9000"])
            .unwrap();
        let config = args.api_config();

        assert_eq!(config.base_url, "http://backend:9000");
        assert_eq!(config.contract, BackendContract::Info);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(args.log_format, LogFormat::Text);
    }

    #[test]
    fn test_contract_and_tab_flags() {
        let args = Args::try_parse_from([
            "video-fetch-popup",
            "--api-base",
            "http://backend:9000",
            "--contract",
            "video-info",
            "--tab-url",
            "https://youtu.be/abc123",
            "--timeout-secs",
            "0",
        ])
        .unwrap();

        assert_eq!(args.contract, BackendContract::VideoInfo);
        assert_eq!(args.host().name(), "hosted");
        assert_eq!(args.api_config().request_timeout, Duration::from_secs(1));
    }
}
