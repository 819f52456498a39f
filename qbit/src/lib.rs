#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(any(), deny(clippy::unwrap_used))]

mod auth;
mod client;
mod config;
mod cookies;
pub mod errors;
mod torrents;

pub mod prelude;

// --- PUBLIC API EXPORTS ---
// Client
pub use client::{Form, Qbit, QbitBuilder, LOGIN_TIMEOUT};
pub use config::{Config, DEFAULT_TIMEOUT};
pub use cookies::SessionJar;

// Web API records
pub use torrents::{Category, Transfer, TransferState, UnknownState};

// Errors
pub use errors::{BuildError, Error, Result};

// Helpers
pub use auth::basic_auth_header;

// Re-exports
pub use reqwest::{Method, StatusCode};
