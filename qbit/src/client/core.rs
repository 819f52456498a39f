use std::fmt::Debug;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderValue;
use url::Url;

use crate::auth::basic_auth_value;
use crate::cookies::SessionJar;
use crate::errors::{BuildError, Result};
use crate::Config;

const DEFAULT_USER_AGENT: &str = concat!("qbit-rs", "@", env!("CARGO_PKG_VERSION"));

/// Configures a [`Qbit`] client before construction.
///
/// Most code goes through [`Qbit::new`] or [`Qbit::new_no_auth`]; the builder
/// is for callers that bring their own transport settings or a public suffix
/// list.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// # use qbit::{Config, Qbit};
/// # async fn run() -> qbit::Result<()> {
/// let http = reqwest::Client::builder().connect_timeout(Duration::from_secs(5));
/// let qbit = Qbit::builder(Config::new("http://localhost:8080", "admin", "adminadmin"))
///     .http_client(http)
///     .request_timeout(Duration::from_secs(10))
///     .login()
///     .await?;
/// # Ok(()) }
/// ```
#[must_use]
pub struct QbitBuilder {
    config: Config,
    http: Option<reqwest::ClientBuilder>,
    public_suffix_list: Option<publicsuffix::List>,
    request_timeout: Option<Duration>,
}

impl QbitBuilder {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            public_suffix_list: None,
            request_timeout: None,
        }
    }

    /// Use a caller-configured reqwest client builder as the transport.
    ///
    /// The session cookie jar is attached to it during [`Self::build`], so
    /// any cookie provider set on it is replaced.
    pub fn http_client(mut self, http: reqwest::ClientBuilder) -> Self {
        self.http = Some(http);
        self
    }

    /// Reject cookies scoped to entries of this public suffix list.
    ///
    /// Takes precedence over [`Config::public_suffix_list`].
    pub fn public_suffix_list(mut self, list: publicsuffix::List) -> Self {
        self.public_suffix_list = Some(list);
        self
    }

    /// Default deadline for API calls, overriding [`Config::request_timeout`].
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the client without logging in.
    ///
    /// The first API call fails to decode, logs in, and retries.
    pub fn build(self) -> std::result::Result<Qbit, BuildError> {
        if self.config.url.trim().is_empty() {
            return Err(BuildError::EmptyUrl);
        }

        let timeout = self
            .request_timeout
            .unwrap_or_else(|| self.config.request_timeout());
        if timeout.is_zero() {
            return Err(BuildError::ZeroTimeout);
        }

        let base = self.config.normalized_url();
        let base_url = Url::parse(&base).map_err(|source| BuildError::InvalidUrl {
            url: base.clone(),
            source,
        })?;

        let jar = Arc::new(session_jar(self.public_suffix_list, &self.config)?);
        let basic_auth = basic_auth_value(&self.config.http_user, &self.config.http_pass)?;

        let http = self
            .http
            .unwrap_or_else(|| reqwest::Client::builder().user_agent(DEFAULT_USER_AGENT))
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        Ok(Qbit {
            http,
            jar,
            base_url,
            basic_auth,
            timeout,
            config: Arc::new(self.config),
            login_lock: Arc::new(tokio::sync::Mutex::new(())),
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Build the client and log in once, under [`crate::LOGIN_TIMEOUT`].
    pub async fn login(self) -> Result<Qbit> {
        let qbit = self.build()?;
        qbit.login().await?;

        Ok(qbit)
    }
}

impl Debug for QbitBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QbitBuilder")
            .field("config", &self.config)
            .field("http", &self.http)
            .field("public_suffix_list", &self.public_suffix_list.is_some())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// The builder's list wins over the config file path.
fn session_jar(
    list: Option<publicsuffix::List>,
    config: &Config,
) -> std::result::Result<SessionJar, BuildError> {
    if let Some(list) = list {
        return Ok(SessionJar::with_public_suffix_list(list));
    }

    match &config.public_suffix_list {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let list = raw
                .parse::<publicsuffix::List>()
                .map_err(|e| BuildError::PublicSuffix(e.to_string()))?;
            Ok(SessionJar::with_public_suffix_list(list))
        }
        None => Ok(SessionJar::default()),
    }
}

/// Client for one qBittorrent Web API.
///
/// `Qbit` owns the authenticated session: a cookie jar attached to its reqwest
/// client, filled by [`Qbit::login`] and refreshed transparently when a call
/// comes back with a body that doesn't decode (qBittorrent answers expired
/// sessions with `403 Forbidden.`, which isn't JSON).
///
/// ### Construction
/// - [`Qbit::new`] builds and logs in; bad credentials fail immediately.
/// - [`Qbit::new_no_auth`] builds only; the first call logs in lazily.
/// - [`Qbit::builder`] for a custom transport or public suffix list.
///
/// ### Concurrency
/// Cheap to clone and thread-safe; clones share the transport, the session jar
/// and the login guard. Concurrent calls that all find an expired session log
/// in only once.
///
/// ### Example
/// ```no_run
/// # use qbit::{Config, Qbit};
/// # async fn run() -> qbit::Result<()> {
/// let qbit = Qbit::new(Config::new("http://localhost:8080", "admin", "adminadmin")).await?;
///
/// for transfer in qbit.transfers().await? {
///     println!("{} {:.1}%", transfer.name, transfer.progress * 100.0);
/// }
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct Qbit {
    pub(crate) http: reqwest::Client,
    pub(crate) jar: Arc<SessionJar>,
    pub(crate) config: Arc<Config>,
    /// Normalized base URL, always ending in `/`.
    pub(crate) base_url: Url,
    pub(crate) basic_auth: Option<HeaderValue>,
    pub(crate) timeout: Duration,
    /// Serializes logins triggered by expired sessions.
    pub(crate) login_lock: Arc<tokio::sync::Mutex<()>>,
    /// Bumped after every successful login.
    pub(crate) generation: Arc<AtomicU64>,
}

impl Qbit {
    /// Build a client and log in.
    pub async fn new(config: Config) -> Result<Qbit> {
        Self::builder(config).login().await
    }

    /// Build a client without logging in.
    pub fn new_no_auth(config: Config) -> std::result::Result<Qbit, BuildError> {
        Self::builder(config).build()
    }

    /// Returns a builder to edit settings before creating [`Qbit`].
    pub fn builder(config: Config) -> QbitBuilder {
        QbitBuilder::new(config)
    }

    // === Getters ===

    /// The configuration this client was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The normalized base URL (always ends in `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Default deadline applied to API calls.
    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns true if the jar holds a cookie for the Web API host.
    ///
    /// This says nothing about whether the server still accepts it.
    pub fn has_session(&self) -> bool {
        self.jar.has_cookies(&self.base_url)
    }

    /// Forget the current session. The next call logs in again.
    pub fn clear_session(&self) {
        self.jar.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_network() {
        let qbit = Qbit::new_no_auth(Config::new("http://localhost:8080", "admin", "pw")).unwrap();

        assert_eq!(qbit.base_url().as_str(), "http://localhost:8080/");
        assert_eq!(qbit.request_timeout(), Duration::from_secs(60));
        assert!(qbit.basic_auth.is_none());
        assert!(!qbit.has_session());
    }

    #[test]
    fn empty_url_is_a_build_error() {
        let err = Qbit::new_no_auth(Config::new("  ", "admin", "pw")).unwrap_err();
        assert!(matches!(err, BuildError::EmptyUrl));
    }

    #[test]
    fn unparsable_url_is_a_build_error() {
        let err = Qbit::new_no_auth(Config::new("not a url", "admin", "pw")).unwrap_err();
        assert!(matches!(err, BuildError::InvalidUrl { .. }));
    }

    #[test]
    fn missing_public_suffix_file_is_a_build_error() {
        let mut config = Config::new("http://localhost:8080", "admin", "pw");
        config.public_suffix_list = Some("/nonexistent/public_suffix_list.dat".into());

        let err = Qbit::new_no_auth(config).unwrap_err();
        assert!(matches!(err, BuildError::PublicSuffixIo(_)));
    }

    #[test]
    fn proxy_credentials_become_basic_auth() {
        let config = Config::new("http://localhost:8080", "admin", "pw").with_http_auth("a", "b");
        let qbit = Qbit::new_no_auth(config).unwrap();

        assert_eq!(qbit.basic_auth.unwrap().to_str().unwrap(), "Basic YTpi");
    }

    #[test]
    fn builder_timeout_overrides_config() {
        let config = Config::new("http://localhost:8080/", "admin", "pw")
            .with_request_timeout(Duration::from_secs(30));
        let qbit = Qbit::builder(config)
            .request_timeout(Duration::from_millis(1500))
            .build()
            .unwrap();

        assert_eq!(qbit.request_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn sub_second_config_timeout_survives_build() {
        let config = Config::new("http://localhost:8080", "admin", "pw")
            .with_request_timeout(Duration::from_millis(500));
        let qbit = Qbit::new_no_auth(config).unwrap();

        assert_eq!(qbit.request_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn zero_timeout_is_a_build_error() {
        let mut config = Config::new("http://localhost:8080", "admin", "pw");
        config.request_timeout_ms = Some(0);
        let err = Qbit::new_no_auth(config.clone()).unwrap_err();
        assert!(matches!(err, BuildError::ZeroTimeout));

        config.request_timeout_ms = None;
        let err = Qbit::builder(config)
            .request_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::ZeroTimeout));
    }
}
