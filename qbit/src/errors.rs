//! Unified error types for the `qbit` crate.
//!
//! This module centralizes all failures that can occur while talking to a
//! qBittorrent Web API and provides a single top-level [`Error`] enum plus the
//! convenient [`Result`] alias. Errors from lower layers (`reqwest`,
//! `serde_json`, URL parsing) are mapped into structured variants that carry
//! the URL, status and body needed to log them meaningfully.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use thiserror::Error;
use url::Url;

// --- Build-Time Error ---

/// Errors that can occur while building a [`crate::Qbit`] client.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The configured base URL was empty.
    #[error("The qBittorrent URL must not be empty")]
    EmptyUrl,

    /// The configured base URL could not be parsed.
    #[error("Invalid qBittorrent URL {url:?}: {source}")]
    InvalidUrl {
        /// The URL as configured (after trailing-slash normalization).
        url: String,
        /// Parser error.
        source: url::ParseError,
    },

    /// The per-call deadline was zero, so no request could ever be sent.
    #[error("The request timeout must be greater than zero")]
    ZeroTimeout,

    /// The public suffix list file could not be read.
    #[error("Failed to read the public suffix list: {0}")]
    PublicSuffixIo(#[from] std::io::Error),

    /// The public suffix list could not be parsed.
    #[error("Failed to parse the public suffix list: {0}")]
    PublicSuffix(String),

    /// The proxy credentials produced an unusable `Authorization` header.
    #[error("Invalid proxy credentials: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// Failed to build the HTTP client (reqwest configuration).
    #[error("Failed to build the HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

// --- The Main Operational Error Enum ---

/// The crate’s top-level error type.
///
/// - [`Error::Request`]: transport failures and undecodable responses
/// - [`Error::Authentication`]: the login handshake failed
/// - [`Error::Build`]: construction of the client failed
#[derive(Debug, Error)]
pub enum Error {
    /// An API call failed (transport, deadline or decoding).
    #[error("Request failed: {0}")]
    Request(#[from] RequestError),

    /// Logging in to the Web API failed.
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthError),

    /// Building the client failed.
    #[error("Client build failed: {0}")]
    Build(#[from] BuildError),
}

impl Error {
    /// Returns true if the login handshake was rejected or could not be sent.
    pub fn is_auth_failed(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }

    /// Returns true if a response body could not be decoded, even after
    /// logging in again and retrying.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Request(RequestError::Decode { .. }))
    }

    /// Returns true if the call ran out of time (reqwest timeout or the
    /// caller's deadline).
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Request(err) => err.is_timeout(),
            Error::Authentication(AuthError::Transport { source, .. }) => source.is_timeout(),
            _ => false,
        }
    }

    /// The HTTP status attached to this error, if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Request(RequestError::Decode { status, .. })
            | Error::Authentication(AuthError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

// --- Authentication Error ---

/// Failures of the `api/v2/auth/login` handshake.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login request could not be sent or its response could not be read.
    #[error("login request to {url} failed: {source}")]
    Transport {
        /// The login URL.
        url: Url,
        /// Underlying reqwest failure.
        source: reqwest::Error,
    },

    /// The server answered, but not with `200` and the `Ok.` marker.
    ///
    /// qBittorrent answers bad credentials with `200 Fails.`, so the status
    /// alone is not enough to classify a login.
    #[error("{status}: {url}: {body}")]
    Rejected {
        /// The HTTP status returned by the login endpoint.
        status: StatusCode,
        /// The login URL.
        url: Url,
        /// Raw response body.
        body: String,
    },
}

// --- Request Error ---

/// Transport and decoding failures of API calls.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Network/protocol failure from reqwest (DNS, refused connection,
    /// timeouts, TLS, I/O).
    #[error("{method} {url} failed: {source}")]
    Transport {
        /// HTTP method of the failed call.
        method: Method,
        /// Full request URL (without query string).
        url: Url,
        /// Underlying reqwest failure.
        source: reqwest::Error,
    },

    /// The response body could not be decoded into the expected JSON shape,
    /// after one re-login and retry.
    #[error("{status}: {url}: {source}")]
    Decode {
        /// The HTTP status of the last attempt.
        status: StatusCode,
        /// Full request URL (without query string).
        url: Url,
        /// Leading part of the response body, for diagnosis.
        body: String,
        /// JSON decoder error.
        source: serde_json::Error,
    },

    /// The caller's deadline expired between attempts.
    #[error("deadline of {timeout:?} exceeded for {url}")]
    DeadlineExceeded {
        /// Full request URL (without query string).
        url: Url,
        /// The deadline the call was given.
        timeout: Duration,
    },

    /// The API path could not be joined onto the base URL.
    #[error("invalid API path {path:?}: {source}")]
    InvalidPath {
        /// The path as given by the caller.
        path: String,
        /// Parser error.
        source: url::ParseError,
    },

    /// The API path resolved to a URL outside the configured base URL
    /// (another host, or `..` above the base path).
    #[error("API path {path:?} resolves outside the base URL: {url}")]
    OutsideBaseUrl {
        /// The path as given by the caller.
        path: String,
        /// Where the path resolved to.
        url: Url,
    },
}

impl RequestError {
    /// Returns true if the request ran out of time.
    pub fn is_timeout(&self) -> bool {
        match self {
            RequestError::Transport { source, .. } => source.is_timeout(),
            RequestError::DeadlineExceeded { .. } => true,
            _ => false,
        }
    }
}

/// Error that can occur when reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigReadError {
    /// The file did not exist or could not be read.
    #[error("config file not found: {0}")]
    ConfigFileNotFound(#[from] std::io::Error),
    /// The TOML was syntactically invalid or did not match [`crate::Config`].
    #[error("config file is not valid TOML: {0}")]
    ConfigFileNotValid(#[from] toml::de::Error),
}

/// A specialized `Result` type for `qbit` operations.
pub type Result<T> = std::result::Result<T, Error>;
