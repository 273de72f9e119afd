use thiserror::Error;

use crate::backend::{AuthError, BackendError};
use crate::forms::FormError;

/// Errors from donor and admin operations
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation failed: {0}")]
    Validation(#[from] FormError),

    #[error(transparent)]
    Auth(AuthError),

    #[error("Not signed in")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Backend(BackendError),
}

impl From<BackendError> for ServiceError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(what) => ServiceError::NotFound(what),
            BackendError::Conflict(what) => ServiceError::Conflict(what),
            other => ServiceError::Backend(other),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken | AuthError::TokenExpired | AuthError::UserDisabled => {
                ServiceError::Unauthorized
            }
            AuthError::Backend(inner) => inner.into(),
            other => ServiceError::Auth(other),
        }
    }
}

impl From<csv::Error> for ServiceError {
    fn from(err: csv::Error) -> Self {
        ServiceError::Export(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_mapping() {
        assert!(matches!(
            ServiceError::from(BackendError::Conflict("x".into())),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            ServiceError::from(BackendError::NotFound("x".into())),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            ServiceError::from(BackendError::Timeout),
            ServiceError::Backend(BackendError::Timeout)
        ));
    }

    #[test]
    fn test_auth_mapping() {
        assert!(matches!(
            ServiceError::from(AuthError::TokenExpired),
            ServiceError::Unauthorized
        ));
        assert!(matches!(
            ServiceError::from(AuthError::EmailInUse),
            ServiceError::Auth(AuthError::EmailInUse)
        ));
        assert!(matches!(
            ServiceError::from(AuthError::Backend(BackendError::Unavailable)),
            ServiceError::Backend(BackendError::Unavailable)
        ));
    }
}
