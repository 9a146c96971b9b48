//! Error kinds for the fetcher module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Why a page could not be fetched
///
/// Fetch failures are per-page and recoverable: the page is skipped and the job
/// continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchErrorKind {
    /// The request or render exceeded its timeout
    #[error("request timed out")]
    Timeout,

    /// The response was not HTML
    #[error("not an HTML document: {0}")]
    NonHtml(String),

    /// The server answered with a non-success status
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Connection, DNS, TLS or browser failure
    #[error("network error: {0}")]
    Network(String),

    /// robots.txt forbids fetching the URL
    #[error("disallowed by robots.txt")]
    RobotsDisallowed,
}

impl From<FetchErrorKind> for CrateError {
    fn from(err: FetchErrorKind) -> Self {
        CrateError::Fetch(err.to_string())
    }
}

impl From<&reqwest::Error> for FetchErrorKind {
    fn from(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchErrorKind::Timeout
        } else if let Some(status) = err.status() {
            FetchErrorKind::HttpStatus(status.as_u16())
        } else {
            FetchErrorKind::Network(err.to_string())
        }
    }
}
