use std::sync::atomic::Ordering;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use super::core::Qbit;
use super::form::Form;
use super::login::FORM_CONTENT_TYPE;
use crate::errors::{RequestError, Result};

/// How many times one call may log in again and retry after its response
/// failed to decode.
pub(crate) const MAX_RELOGIN_RETRIES: usize = 1;

/// Response bodies quoted in errors are cut to this many characters.
const ERROR_BODY_LIMIT: usize = 512;

/// Decode a response body into the expected shape.
///
/// This is the only session-expiry signal: qBittorrent answers calls made with
/// a missing or expired `SID` with `403 Forbidden.` (plain text), which fails
/// here like any other non-JSON body does. An empty body decodes as `null`, so
/// endpoints that answer `200` with nothing can be called with `T = ()`.
pub(crate) fn decode_response<T: DeserializeOwned>(body: &[u8]) -> serde_json::Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_slice(b"null");
    }

    serde_json::from_slice(body)
}

impl Qbit {
    /// Resolve an API path (e.g. `api/v2/torrents/info`) against the base URL.
    ///
    /// The result must stay under the base URL, so absolute URLs and `..`
    /// segments that climb out of it are refused.
    pub(crate) fn endpoint(&self, path: &str) -> std::result::Result<Url, RequestError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| RequestError::InvalidPath {
                path: path.to_owned(),
                source,
            })?;

        if !url.as_str().starts_with(self.base_url.as_str()) {
            return Err(RequestError::OutsideBaseUrl {
                path: path.to_owned(),
                url,
            });
        }

        Ok(url)
    }

    /// Call an API endpoint and decode its JSON response, under the default
    /// deadline.
    ///
    /// See [`Self::request_with_timeout`].
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        values: &Form,
    ) -> Result<T> {
        self.request_with_timeout(method, path, values, self.timeout)
            .await
    }

    /// Call an API endpoint and decode its JSON response into `T`.
    ///
    /// - `GET`: `values` and `filter=all` go into the query string.
    /// - Any other method: `values` are sent as a form-encoded body.
    ///
    /// Every request carries `Accept: application/json` and, when configured,
    /// the proxy `Authorization` header. If the body does not decode, the
    /// session is assumed expired: the client logs in again and repeats the
    /// request once. A second decode failure is returned as
    /// [`RequestError::Decode`].
    ///
    /// `timeout` bounds the whole call, re-login and retry included.
    pub async fn request_with_timeout<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        values: &Form,
        timeout: Duration,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let deadline = Deadline::after(timeout);
        let mut relogins = 0;

        loop {
            let remaining = deadline.remaining(&url)?;
            let seen = self.generation.load(Ordering::SeqCst);
            let (status, body) = self.send(&method, &url, values, remaining).await?;

            match decode_response::<T>(&body) {
                Ok(value) => return Ok(value),
                Err(source) if relogins < MAX_RELOGIN_RETRIES => {
                    relogins += 1;
                    warn!(%method, %url, %status, error = %source, "Response did not decode, logging in again");

                    // Waiting behind another task's login counts against this call too.
                    let remaining = deadline.remaining(&url)?;
                    let Ok(relogged) =
                        tokio::time::timeout(remaining, self.relogin(seen, remaining)).await
                    else {
                        return Err(deadline.exceeded(&url).into());
                    };
                    relogged?;
                }
                Err(source) => {
                    return Err(RequestError::Decode {
                        status,
                        url,
                        body: snippet(&body),
                        source,
                    }
                    .into())
                }
            }
        }
    }

    /// GET `path` with `values` in the query string and decode the JSON
    /// response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, values: &Form) -> Result<T> {
        self.request(Method::GET, path, values).await
    }

    /// POST `values` form-encoded to `path` and decode the JSON response
    /// (use `T = ()` for endpoints that answer with an empty body).
    pub async fn post_form<T: DeserializeOwned>(&self, path: &str, values: &Form) -> Result<T> {
        self.request(Method::POST, path, values).await
    }

    /// Send one attempt and read the whole body.
    async fn send(
        &self,
        method: &Method,
        url: &Url,
        values: &Form,
        timeout: Duration,
    ) -> std::result::Result<(StatusCode, Vec<u8>), RequestError> {
        let transport = |source: reqwest::Error| RequestError::Transport {
            method: method.clone(),
            url: url.clone(),
            source,
        };

        let request = if *method == Method::GET {
            let mut query = values.clone();
            query.set("filter", "all");

            let mut url = url.clone();
            url.query_pairs_mut().extend_pairs(query.pairs());

            self.http.get(url)
        } else {
            self.http
                .request(method.clone(), url.clone())
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(values.encode())
        };

        let mut request = request
            .header(ACCEPT, "application/json")
            .timeout(timeout);

        if let Some(auth) = &self.basic_auth {
            request = request.header(AUTHORIZATION, auth.clone());
        }

        debug!(%method, %url, "Sending request");

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        Ok((status, body.to_vec()))
    }
}

/// The point in time a whole call must finish by.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Option<Instant>,
    timeout: Duration,
}

impl Deadline {
    fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
            timeout,
        }
    }

    /// Time left, or [`RequestError::DeadlineExceeded`] once it runs out.
    fn remaining(&self, url: &Url) -> std::result::Result<Duration, RequestError> {
        let Some(at) = self.at else {
            return Ok(self.timeout);
        };

        match at.checked_duration_since(Instant::now()) {
            Some(left) if !left.is_zero() => Ok(left),
            _ => Err(self.exceeded(url)),
        }
    }

    fn exceeded(&self, url: &Url) -> RequestError {
        RequestError::DeadlineExceeded {
            url: url.clone(),
            timeout: self.timeout,
        }
    }
}

fn snippet(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(ERROR_BODY_LIMIT)
        .collect()
}
