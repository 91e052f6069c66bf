//! Process configuration.
//!
//! Provides [`Config`] for the server binary and the sync worker.
//! Values are loaded from `SYNCBOX_*` environment variables via
//! [`Config::from_env`] and are immutable after startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Syncbox configuration.
///
/// All fields have defaults suitable for a local single-tenant deployment.
/// An empty `access_key` disables request authentication; an empty `repo`
/// disables every remote operation (the sync worker still commits locally).
///
/// # Examples
///
/// ```
/// use syncbox_core::Config;
///
/// let config = Config::default();
/// assert_eq!(config.listen, "0.0.0.0:9000");
/// assert_eq!(config.bucket, "vault");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Bind address for the HTTP listener (e.g. `"0.0.0.0:9000"`).
    #[builder(default = String::from("0.0.0.0:9000"))]
    pub listen: String,

    /// Filesystem root for the object store; also the git working tree.
    #[builder(default = String::from("/var/lib/syncbox"))]
    pub dir: String,

    /// The single bucket name the server accepts.
    #[builder(default = String::from("vault"))]
    pub bucket: String,

    /// Access key for SigV4 verification. Empty disables authentication.
    #[builder(default)]
    pub access_key: String,

    /// Secret key paired with `access_key`.
    #[builder(default)]
    pub secret_key: String,

    /// Region accepted in the SigV4 credential scope.
    #[builder(default = String::from("us-east-1"))]
    pub region: String,

    /// Remote repository URL. Empty disables clone, push and pull.
    #[builder(default)]
    pub repo: String,

    /// Branch that commits land on and that pulls track.
    #[builder(default = String::from("main"))]
    pub branch: String,

    /// Commit author name.
    #[builder(default = String::from("syncbox"))]
    pub user: String,

    /// Commit author email.
    #[builder(default = String::from("syncbox@localhost"))]
    pub email: String,

    /// HTTP basic-auth password for the remote (username is the literal
    /// `token`). Empty disables authentication to the remote.
    #[builder(default)]
    pub token: String,

    /// Quiet interval, in seconds, after the last write before a sync runs.
    #[builder(default = 10)]
    pub debounce_secs: u64,

    /// Interval, in seconds, between periodic pulls. Zero disables the loop.
    #[builder(default = 300)]
    pub pull_interval_secs: u64,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: String::from("0.0.0.0:9000"),
            dir: String::from("/var/lib/syncbox"),
            bucket: String::from("vault"),
            access_key: String::new(),
            secret_key: String::new(),
            region: String::from("us-east-1"),
            repo: String::new(),
            branch: String::from("main"),
            user: String::from("syncbox"),
            email: String::from("syncbox@localhost"),
            token: String::new(),
            debounce_secs: 10,
            pull_interval_secs: 300,
            log_level: String::from("info"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Reads the following variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SYNCBOX_LISTEN` | `0.0.0.0:9000` |
    /// | `SYNCBOX_DIR` | `/var/lib/syncbox` |
    /// | `SYNCBOX_BUCKET` | `vault` |
    /// | `SYNCBOX_ACCESS_KEY` | *(empty, auth disabled)* |
    /// | `SYNCBOX_SECRET_KEY` | *(empty)* |
    /// | `SYNCBOX_REGION` | `us-east-1` |
    /// | `SYNCBOX_REPO` | *(empty, remote disabled)* |
    /// | `SYNCBOX_BRANCH` | `main` |
    /// | `SYNCBOX_USER` | `syncbox` |
    /// | `SYNCBOX_EMAIL` | `syncbox@localhost` |
    /// | `SYNCBOX_TOKEN` | *(empty)* |
    /// | `SYNCBOX_DEBOUNCE_SECS` | `10` |
    /// | `SYNCBOX_PULL_INTERVAL_SECS` | `300` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("SYNCBOX_LISTEN") {
            config.listen = v;
        }
        if let Ok(v) = std::env::var("SYNCBOX_DIR") {
            config.dir = v;
        }
        if let Ok(v) = std::env::var("SYNCBOX_BUCKET") {
            config.bucket = v;
        }
        if let Ok(v) = std::env::var("SYNCBOX_ACCESS_KEY") {
            config.access_key = v;
        }
        if let Ok(v) = std::env::var("SYNCBOX_SECRET_KEY") {
            config.secret_key = v;
        }
        if let Ok(v) = std::env::var("SYNCBOX_REGION") {
            config.region = v;
        }
        if let Ok(v) = std::env::var("SYNCBOX_REPO") {
            config.repo = v;
        }
        if let Ok(v) = std::env::var("SYNCBOX_BRANCH") {
            config.branch = v;
        }
        if let Ok(v) = std::env::var("SYNCBOX_USER") {
            config.user = v;
        }
        if let Ok(v) = std::env::var("SYNCBOX_EMAIL") {
            config.email = v;
        }
        if let Ok(v) = std::env::var("SYNCBOX_TOKEN") {
            config.token = v;
        }
        if let Ok(v) = std::env::var("SYNCBOX_DEBOUNCE_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.debounce_secs = n;
            }
        }
        if let Ok(v) = std::env::var("SYNCBOX_PULL_INTERVAL_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.pull_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// The debounce window as a [`Duration`].
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }

    /// The periodic pull interval, or `None` when the loop is disabled.
    #[must_use]
    pub fn pull_interval(&self) -> Option<Duration> {
        (self.pull_interval_secs > 0).then(|| Duration::from_secs(self.pull_interval_secs))
    }

    /// Whether SigV4 authentication is enabled.
    #[must_use]
    pub fn auth_enabled(&self) -> bool {
        !self.access_key.is_empty()
    }

    /// Whether a remote repository is configured.
    #[must_use]
    pub fn remote_enabled(&self) -> bool {
        !self.repo.is_empty()
    }
}
