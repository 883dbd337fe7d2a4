// error.rs - Error types for every layer of the tracker.
//
// RUST NOTE: `thiserror` derives `std::error::Error` and `Display` from the
// `#[error("...")]` attributes, so each enum stays a plain list of variants.

use thiserror::Error;

/// Failures talking to the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status. `message` is the `error`
    /// field of the JSON body when the body had one.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no error message"))]
    Status { status: u16, message: Option<String> },

    #[error("could not encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// The text to show the user: the server's own message when it sent one,
    /// otherwise the caller's generic fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status { message: Some(m), .. } if !m.trim().is_empty() => m.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Local-consistency failures of a record store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no record with id {0} in the store")]
    NotFound(String),
}

/// Client-side validation failures, reported before any request is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("release year must be a number")]
    YearNotNumeric,

    #[error("release year must be between {min} and {max}")]
    YearOutOfRange { min: i32, max: i32 },

    #[error("rating must be between 1 and 5")]
    RatingOutOfRange,

    #[error("hours played must be a non-negative whole number")]
    InvalidHours,
}

#[derive(Debug, Error)]
pub enum FormError {
    /// A submission is already in flight for this form.
    #[error("form is already submitting")]
    Busy,

    /// The overlay hosting this form is not open.
    #[error("form is not open")]
    NotOpen,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverlayError {
    #[error("the review form can only be opened from the detail view")]
    DetailNotOpen,

    #[error("no game with id {0} is loaded")]
    UnknownGame(String),

    #[error("no review with id {0} is loaded")]
    UnknownReview(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}
