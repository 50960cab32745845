use warp::{hyper::StatusCode, reject::Reject};

/// Failures raised by the login endpoint and the bearer-token gate.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingHeader,
    #[error("Authorization header must be of the form 'Bearer <token>'")]
    MalformedHeader,
    #[error("Invalid credentials")]
    LoginFailed,
    #[error("Invalid or expired token")]
    InvalidToken {
        #[from]
        source: jsonwebtoken::errors::Error,
    },
    #[error("Could not generate token")]
    Signing { source: jsonwebtoken::errors::Error },
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Signing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl Reject for AuthError {}

/// Failures reported by a [`DocumentStore`](crate::DocumentStore) backend.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("document could not be (de)serialized")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    #[error("stored document is malformed: {0}")]
    MalformedDocument(&'static str),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Failures raised by the employee resource handlers.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Invalid request body")]
    InvalidRequestBody,
    #[error("{0}")]
    InvalidBody(String),
    #[error("Invalid ID format")]
    InvalidId,
    #[error("Employee not found")]
    NotFound,
    #[error("store operation timed out")]
    Timeout,
    #[error("store operation failed")]
    Store {
        #[from]
        source: StoreError,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequestBody | ApiError::InvalidBody(_) | ApiError::InvalidId => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Timeout | ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message exposed to clients. Store internals stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Timeout | ApiError::Store { .. } => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl Reject for ApiError {}
