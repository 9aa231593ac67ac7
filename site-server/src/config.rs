//! Server configuration from flags and environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use site_publish::{HttpPublishBackend, PollConfig, PublishBackend, PublishResult, Publisher};

/// Default port for the site server.
pub const DEFAULT_PORT: u16 = 9474;

/// Lower bound on the publish backend request timeout.
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Command-line arguments for saorsa-site.
#[derive(Debug, Clone, Parser)]
#[command(name = "saorsa-site")]
#[command(about = "Saorsa Site editor and publish server")]
#[command(version)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "SITE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind (localhost unless deliberately exposed)
    #[arg(long, env = "SITE_BIND", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// Directory holding one JSON document per site; in-memory when unset
    #[arg(long, env = "SITE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the publish backend (e.g., <https://deploy.example.com>)
    #[arg(long, env = "PUBLISH_BACKEND_URL")]
    pub publish_url: Option<String>,

    /// Milliseconds between publish status polls
    #[arg(long, env = "PUBLISH_POLL_INTERVAL_MS", default_value_t = 2_000)]
    pub poll_interval_ms: u64,

    /// Seconds after which a publish job stops being polled
    #[arg(long, env = "PUBLISH_POLL_CEILING_SECS", default_value_t = 300)]
    pub poll_ceiling_secs: u64,
}

impl Config {
    /// Address the listener binds to.
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Poll timing for publish jobs.
    #[must_use]
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            Duration::from_millis(self.poll_interval_ms.max(1)),
            Duration::from_secs(self.poll_ceiling_secs.max(1)),
        )
    }

    /// Build the publisher when a backend URL is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend URL is invalid.
    pub fn publisher(&self) -> PublishResult<Option<Publisher>> {
        let Some(url) = self.publish_url.as_deref() else {
            return Ok(None);
        };
        let poll = self.poll_config();
        let http = HttpPublishBackend::new(url)?
            .with_request_timeout(poll.interval.max(MIN_REQUEST_TIMEOUT));
        let backend: Arc<dyn PublishBackend> = Arc::new(http);
        Ok(Some(Publisher::new(backend, poll)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["saorsa-site"]).expect("parse");
        assert_eq!(config.socket_addr(), SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)));
        assert_eq!(config.poll_config(), PollConfig::default());
        assert!(config.publisher().expect("publisher").is_none());
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "saorsa-site",
            "--port",
            "8080",
            "--bind",
            "0.0.0.0",
            "--data-dir",
            "/tmp/sites",
            "--publish-url",
            "http://127.0.0.1:9000",
            "--poll-interval-ms",
            "500",
            "--poll-ceiling-secs",
            "60",
        ])
        .expect("parse");
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/sites")));
        let poll = config.poll_config();
        assert_eq!(poll.interval, Duration::from_millis(500));
        assert_eq!(poll.ceiling, Duration::from_secs(60));
        assert!(config.publisher().expect("publisher").is_some());
    }

    #[test]
    fn test_invalid_publish_url() {
        let config =
            Config::try_parse_from(["saorsa-site", "--publish-url", "not a url"]).expect("parse");
        assert!(config.publisher().is_err());
    }
}
