use std::sync::atomic::Ordering;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, info};

use super::core::Qbit;
use super::form::Form;
use crate::errors::{AuthError, Result};

/// Login always runs under this deadline, independent of the caller's.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) const LOGIN_PATH: &str = "api/v2/auth/login";

/// qBittorrent answers a good login with the plain text body `Ok.`, and a bad
/// one with `200 Fails.`.
///
/// This is a substring match on undocumented plaintext; if upstream ever
/// rewords the response, every login will be classified as failed.
pub(crate) const LOGIN_SUCCESS_MARKER: &str = "Ok.";

pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

impl Qbit {
    /// Log in to the Web API, replacing the current session cookie.
    ///
    /// POSTs `username`/`password` to `api/v2/auth/login`. Succeeds only on
    /// status `200` with a body containing `Ok.`; anything else is
    /// [`AuthError::Rejected`] carrying status, URL and body.
    pub async fn login(&self) -> Result<()> {
        self.login_within(LOGIN_TIMEOUT).await
    }

    pub(crate) async fn login_within(&self, timeout: Duration) -> Result<()> {
        let url = self.endpoint(LOGIN_PATH)?;

        let body = Form::new()
            .with("username", self.config.user.as_str())
            .with("password", self.config.pass.as_str())
            .encode();

        debug!(%url, user = %self.config.user, "Logging in");

        let mut request = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .timeout(timeout);

        if let Some(auth) = &self.basic_auth {
            request = request.header(AUTHORIZATION, auth.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|source| AuthError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| AuthError::Transport {
                url: url.clone(),
                source,
            })?;

        if status != StatusCode::OK || !body.contains(LOGIN_SUCCESS_MARKER) {
            return Err(AuthError::Rejected { status, url, body }.into());
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(%url, generation, "Logged in");

        Ok(())
    }

    /// Log in again after a call observed session `seen` fail.
    ///
    /// Logins are serialized; if another task already logged in after `seen`
    /// was read, its session is reused instead of logging in twice.
    pub(crate) async fn relogin(&self, seen: u64, timeout: Duration) -> Result<()> {
        let _guard = self.login_lock.lock().await;

        if self.generation.load(Ordering::SeqCst) != seen {
            debug!("Session already refreshed by a concurrent call");
            return Ok(());
        }

        self.login_within(timeout.min(LOGIN_TIMEOUT)).await
    }
}
