//! Error types for image loading and mask submission.

use thiserror::Error;

/// Errors that can occur while loading the user's image.
#[derive(Error, Debug)]
pub enum LoadError {
    /// I/O error while reading the file (native only)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not an image the decoder understands
    #[error("Could not read '{name}' as an image: {message}")]
    Decode {
        /// File name as supplied by the user
        name: String,
        /// Decoder message
        message: String,
    },

    /// The file exceeds the configured upload limit
    #[error("'{name}' is {size} bytes, larger than the {limit} byte upload limit")]
    TooLarge {
        /// File name as supplied by the user
        name: String,
        /// Actual file size
        size: u64,
        /// Configured limit
        limit: u64,
    },
}

impl LoadError {
    /// Create a decode error for the named file.
    pub fn decode(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

/// Errors that end a submission attempt.
///
/// The `Display` text is what the user sees.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    /// No image has been loaded yet
    #[error("Load an image first")]
    NoImage,

    /// The active selection is empty or degenerate
    #[error("Make a selection first")]
    EmptySelection,

    /// Another submission is still in flight
    #[error("A request is already in progress")]
    Busy,

    /// The request never produced a response (network, DNS, timeout)
    #[error("Request failed: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("{message}")]
    Backend {
        /// HTTP status code
        status: u16,
        /// Message reported by the backend, or a generic fallback
        message: String,
    },

    /// The backend answered with an empty body
    #[error("The segmentation service returned an empty mask")]
    EmptyResponse,

    /// The request could not be assembled
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SubmitError {
    /// Create a transport error from any displayable cause.
    pub fn transport(cause: impl ToString) -> Self {
        Self::Transport(cause.to_string())
    }

    /// Create an invalid request error from any displayable cause.
    pub fn invalid_request(cause: impl ToString) -> Self {
        Self::InvalidRequest(cause.to_string())
    }
}

impl From<serde_json::Error> for SubmitError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_request(e)
    }
}
