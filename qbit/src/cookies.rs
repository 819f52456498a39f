use std::sync::{PoisonError, RwLock};

use reqwest::{cookie::CookieStore, header::HeaderValue};
use url::Url;

/// Cookie jar holding the Web API session for one client.
///
/// Wraps [`cookie_store::CookieStore`] so cookies follow the usual domain and
/// path matching rules: the `SID` set by the login response is sent back to the
/// same host and never to unrelated hosts. When built with a public suffix
/// list, cookies scoped to a public suffix (e.g. `Domain=co.uk`) are rejected.
#[derive(Debug, Default)]
pub struct SessionJar {
    store: RwLock<cookie_store::CookieStore>,
}

impl SessionJar {
    /// A jar that also rejects cookies scoped to entries of `list`.
    pub fn with_public_suffix_list(list: publicsuffix::List) -> Self {
        Self {
            store: RwLock::new(cookie_store::CookieStore::new(Some(list))),
        }
    }

    /// Returns true if at least one unexpired cookie would be sent to `url`.
    pub fn has_cookies(&self, url: &Url) -> bool {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_request_values(url)
            .next()
            .is_some()
    }

    /// Drops every stored cookie. The next API call will fail to decode and
    /// log in again.
    pub fn clear(&self) {
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies = cookie_headers.filter_map(|val| {
            val.to_str()
                .ok()
                .and_then(|s| cookie::Cookie::parse(s.to_owned()).ok())
        });

        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .store_response_cookies(cookies, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let s = self
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");

        if s.is_empty() {
            return None;
        }

        HeaderValue::from_str(&s).ok()
    }
}
