use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use quotes_core::auth::AuthError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Too many requests: {0}")]
    TooManyRequests(String, u64),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("External dependency error: {0}")]
    External(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>, retry_after_secs: u64) -> Self {
        Self::TooManyRequests(message.into(), retry_after_secs)
    }

    /// The message without the status prefix, for inline display.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::TooManyRequests(message, _)
            | Self::Config(message)
            | Self::External(message)
            | Self::Internal(message) => message,
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TooManyRequests(_, _) => StatusCode::TOO_MANY_REQUESTS,
            Self::External(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<quotes_core::Error> for AppError {
    fn from(error: quotes_core::Error) -> Self {
        use quotes_core::Error;

        match error {
            Error::InvalidInput(message) => Self::BadRequest(message),
            Error::Unauthenticated(message) => Self::Unauthorized(message),
            Error::PermissionDenied(message) => Self::Forbidden(message),
            Error::NotFound(message) => Self::NotFound(message),
            Error::Store(failure) => match failure.status {
                Some(401) => Self::Unauthorized(failure.to_string()),
                Some(403) => Self::Forbidden(failure.to_string()),
                Some(404) => Self::NotFound(failure.to_string()),
                Some(400 | 409 | 422) => Self::BadRequest(failure.to_string()),
                _ => Self::External(failure.to_string()),
            },
            Error::Auth(auth) => auth.into(),
            Error::Http(error) => Self::External(error.to_string()),
            Error::Config(message) => Self::Config(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidToken => Self::Unauthorized(error.to_string()),
            AuthError::NotConfigured | AuthError::InvalidConfiguration(_) => {
                Self::Config(error.to_string())
            }
            other => Self::External(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            Self::TooManyRequests(_, secs) => Some(*secs),
            _ => None,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotes_core::StoreFailure;

    #[test]
    fn core_errors_map_to_status_codes() {
        let cases = [
            (
                quotes_core::Error::PermissionDenied("no".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (
                quotes_core::Error::Unauthenticated("login".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                quotes_core::Error::InvalidInput("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                quotes_core::Error::NotFound("q".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                quotes_core::Error::Render("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(AppError::from(error).status(), status);
        }
    }

    #[test]
    fn store_failures_use_backend_status() {
        let mut failure = StoreFailure::new("JWT expired");
        failure.status = Some(401);
        let error = AppError::from(quotes_core::Error::Store(failure));
        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);

        let failure = StoreFailure::new("upstream down");
        let error = AppError::from(quotes_core::Error::Store(failure));
        assert_eq!(error.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn rate_limit_response_sets_retry_after() {
        let response = AppError::too_many_requests("slow down", 42).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            "42"
        );
    }
}
