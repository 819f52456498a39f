//! HTTP Basic authentication for a reverse proxy in front of the Web API.
//!
//! This is independent from the API's own cookie session: the proxy sees the
//! `Authorization` header, qBittorrent sees the `SID` cookie.

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::HeaderValue;

use crate::errors::BuildError;

/// Returns the `Authorization` header value for the given proxy credentials.
///
/// `None` when both `user` and `pass` are empty, otherwise
/// `Basic base64(user:pass)`. A single empty half is still sent.
pub fn basic_auth_header(user: &str, pass: &str) -> Option<String> {
    if user.is_empty() && pass.is_empty() {
        return None;
    }

    Some(format!("Basic {}", STANDARD.encode(format!("{user}:{pass}"))))
}

/// Same as [`basic_auth_header`], as a sensitive header value ready to be
/// attached to requests.
pub(crate) fn basic_auth_value(user: &str, pass: &str) -> Result<Option<HeaderValue>, BuildError> {
    basic_auth_header(user, pass)
        .map(|auth| {
            let mut value = HeaderValue::from_str(&auth)?;
            value.set_sensitive(true);
            Ok(value)
        })
        .transpose()
}
