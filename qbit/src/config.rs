//! Connection settings for a qBittorrent Web API.
//!
//! [`Config`] is plain data so it can be embedded in an application's own
//! configuration file. Load it from TOML with [`Config::from_file`], or build it
//! in code with [`Config::new`] and the `with_*` helpers.

use std::{fmt, fs, path::Path, path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigReadError;

/// Default deadline for API calls when [`Config::request_timeout_ms`] is unset.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The input needed to build a [`crate::Qbit`] client.
///
/// ```toml
/// url = "http://localhost:8080"
/// user = "admin"
/// pass = "adminadmin"
/// # Basic auth for a reverse proxy in front of the Web UI.
/// http_user = "proxy"
/// http_pass = "secret"
/// request_timeout_ms = 30000
/// ```
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Web UI, with or without trailing slash.
    pub url: String,
    /// Web API username.
    pub user: String,
    /// Web API password.
    pub pass: String,
    /// Basic auth username for a reverse proxy.
    pub http_user: String,
    /// Basic auth password for a reverse proxy.
    pub http_pass: String,
    /// Deadline for each API call in milliseconds; [`DEFAULT_TIMEOUT`] when
    /// unset. Zero is rejected when the client is built.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
    /// Path to a public suffix list (`public_suffix_list.dat` format) used to
    /// reject cookies scoped to a public suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_suffix_list: Option<PathBuf>,
}

impl Config {
    /// Settings for `url` with Web API credentials and no proxy auth.
    pub fn new(url: impl Into<String>, user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            pass: pass.into(),
            ..Self::default()
        }
    }

    /// Adds Basic auth credentials for a reverse proxy.
    #[must_use]
    pub fn with_http_auth(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.http_user = user.into();
        self.http_pass = pass.into();
        self
    }

    /// Overrides the default per-call deadline, kept at millisecond
    /// precision (a non-zero sub-millisecond value rounds up to 1ms).
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let millis = if millis == 0 && !timeout.is_zero() { 1 } else { millis };
        self.request_timeout_ms = Some(millis);
        self
    }

    /// The per-call deadline.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_ms
            .map_or(DEFAULT_TIMEOUT, Duration::from_millis)
    }

    /// The base URL with exactly one trailing slash.
    pub fn normalized_url(&self) -> String {
        format!("{}/", self.url.trim_end_matches('/'))
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigReadError> {
        let raw = fs::read_to_string(path)?;
        Ok(raw.parse()?)
    }
}

impl FromStr for Config {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(secret: &str) -> &str {
            if secret.is_empty() {
                ""
            } else {
                "<redacted>"
            }
        }

        f.debug_struct("Config")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("pass", &redact(&self.pass))
            .field("http_user", &self.http_user)
            .field("http_pass", &redact(&self.http_pass))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("public_suffix_list", &self.public_suffix_list)
            .finish()
    }
}
