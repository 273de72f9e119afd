//! Backend error types
//!
//! `BackendError` covers the document store, `AuthError` the identity
//! service. Both keep transport failures apart from semantic ones so the API
//! layer can pick a status code.

use thiserror::Error;

/// Errors from the document store (or transport to any managed service)
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited")]
    RateLimited,

    /// Document does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A write precondition failed (the document changed since it was read)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored document could not be decoded into the typed record
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

impl BackendError {
    /// Classify a transport error the same way for every client
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_connect() {
            BackendError::Unavailable
        } else {
            BackendError::Request(e)
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Unavailable | BackendError::Timeout | BackendError::RateLimited
        )
    }
}

/// Errors from the identity service
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("email already in use")]
    EmailInUse,

    #[error("weak password")]
    WeakPassword,

    #[error("invalid email")]
    InvalidEmail,

    /// Wrong email/password pair, or unknown account
    #[error("invalid credential")]
    InvalidCredential,

    #[error("invalid id token")]
    InvalidToken,

    #[error("id token expired")]
    TokenExpired,

    #[error("user disabled")]
    UserDisabled,

    #[error("identity service rejected the request: {0}")]
    Rejected(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AuthError {
    /// Map an Identity Toolkit error code (`error.message`) to a variant
    ///
    /// Messages look like `WEAK_PASSWORD : Password should be at least 6
    /// characters`, so only the part before ` : ` is significant.
    pub fn from_code(message: &str) -> Self {
        let code = message.split(" : ").next().unwrap_or(message).trim();
        match code {
            "EMAIL_EXISTS" => AuthError::EmailInUse,
            "WEAK_PASSWORD" => AuthError::WeakPassword,
            "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::InvalidEmail,
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND"
            | "MISSING_PASSWORD" => AuthError::InvalidCredential,
            "INVALID_ID_TOKEN" | "USER_NOT_FOUND" => AuthError::InvalidToken,
            "TOKEN_EXPIRED" => AuthError::TokenExpired,
            "USER_DISABLED" => AuthError::UserDisabled,
            other => AuthError::Rejected(other.to_string()),
        }
    }

    /// Message shown to the person at the auth form
    pub fn friendly_message(&self) -> &'static str {
        match self {
            AuthError::EmailInUse => "This email is already registered. Please sign in.",
            AuthError::WeakPassword => "Password should be at least 6 characters long.",
            AuthError::InvalidCredential => "Invalid email or password.",
            _ => "An error occurred. Please try again.",
        }
    }
}
