use thiserror::Error;

use crate::model::MovieId;

/// Minimum number of rated movies the backend accepts for an analysis.
pub const MIN_RATINGS_FOR_ANALYSIS: usize = 5;

/// Why the backend answered 403.
///
/// The backend has no structured error code for this, so the cause is read
/// off the `detail` text of the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForbiddenCause {
    /// No session credentials reached the backend.
    MissingCredentials,
    /// The CSRF token was missing or did not match the cookie.
    CsrfMismatch,
    /// Any other 403, with the backend's detail text.
    Other(String),
}

impl ForbiddenCause {
    pub fn from_detail(detail: &str) -> Self {
        if detail.contains("Authentication credentials") {
            ForbiddenCause::MissingCredentials
        } else if detail.contains("CSRF") {
            ForbiddenCause::CsrfMismatch
        } else {
            ForbiddenCause::Other(detail.to_string())
        }
    }
}

impl std::fmt::Display for ForbiddenCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForbiddenCause::MissingCredentials => write!(f, "no credentials provided"),
            ForbiddenCause::CsrfMismatch => write!(f, "CSRF token rejected"),
            ForbiddenCause::Other(detail) => write!(f, "{detail}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("authentication required: {0}")]
    AuthRequired(ForbiddenCause),

    #[error("authentication expired: {0}")]
    AuthExpired(ForbiddenCause),

    #[error("forbidden: {0}")]
    Forbidden(ForbiddenCause),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not enough rated movies for analysis: {0}")]
    InsufficientRatings(String),

    #[error("server error ({status}): {detail}")]
    ServerError { status: u16, detail: String },

    #[error("backend unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("unexpected response ({status:?}): {detail}")]
    Unclassified { status: Option<u16>, detail: String },

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),

    #[error("movie {0} is unknown; search for it before rating")]
    UnknownMovie(MovieId),

    #[error("search query is empty")]
    EmptyQuery,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl Error {
    /// Classify a non-success HTTP status and its detail text.
    pub fn from_status(status: u16, detail: String) -> Self {
        match status {
            400 => Error::BadRequest(detail),
            403 => Error::Forbidden(ForbiddenCause::from_detail(&detail)),
            404 => Error::NotFound(detail),
            500..=599 => Error::ServerError { status, detail },
            _ => Error::Unclassified {
                status: Some(status),
                detail,
            },
        }
    }

    /// Re-tag a raw 403 as "credentials needed" (used on cold loads).
    pub fn into_auth_required(self) -> Self {
        match self {
            Error::Forbidden(cause) => Error::AuthRequired(cause),
            other => other,
        }
    }

    /// Re-tag a raw 403 as "credentials expired" (used on writes).
    pub fn into_auth_expired(self) -> Self {
        match self {
            Error::Forbidden(cause) => Error::AuthExpired(cause),
            other => other,
        }
    }

    /// Authentication failures route to the re-authentication view.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Error::AuthRequired(_) | Error::AuthExpired(_) | Error::Forbidden(_)
        )
    }

    pub fn forbidden_cause(&self) -> Option<&ForbiddenCause> {
        match self {
            Error::AuthRequired(cause) | Error::AuthExpired(cause) | Error::Forbidden(cause) => {
                Some(cause)
            }
            _ => None,
        }
    }

    /// Message rendered next to the action that failed.
    pub fn user_message(&self) -> String {
        match self {
            Error::AuthRequired(cause) | Error::Forbidden(cause) => match cause {
                ForbiddenCause::MissingCredentials => {
                    "Authentication required. Log in to the backend admin and reload.".to_string()
                }
                ForbiddenCause::CsrfMismatch => {
                    "CSRF token rejected. Clear the site cookies and log in again.".to_string()
                }
                ForbiddenCause::Other(detail) => format!("403 Forbidden: {detail}"),
            },
            Error::AuthExpired(_) => {
                "Your session has expired. Log in to the backend admin again.".to_string()
            }
            Error::NotFound(_) => {
                "No analysis yet. Rate some movies and run an analysis first.".to_string()
            }
            Error::InsufficientRatings(_) => format!(
                "At least {MIN_RATINGS_FOR_ANALYSIS} rated movies are required for an analysis."
            ),
            Error::ServerError { .. } => {
                "The server failed while processing the request. Please try again.".to_string()
            }
            Error::NetworkUnreachable(_) => {
                "Cannot reach the server. Check that the backend is running.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Error::from_status(status.as_u16(), err.to_string())
        } else if err.is_connect() || err.is_timeout() || err.is_request() {
            Error::NetworkUnreachable(err.to_string())
        } else {
            Error::Unclassified {
                status: None,
                detail: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
