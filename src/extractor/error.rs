//! Error types for the extractor module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for content extraction
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The page URL could not be parsed
    #[error("invalid page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The markdown converter rejected the document
    #[error("markdown conversion failed: {0}")]
    Convert(String),

    /// Extraction panicked
    #[error("extraction panicked: {0}")]
    Panicked(String),
}

impl From<ExtractError> for CrateError {
    fn from(err: ExtractError) -> Self {
        CrateError::Extract(err.to_string())
    }
}
