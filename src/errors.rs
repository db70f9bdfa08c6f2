use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy of the booking core.
///
/// The first four variants abort the request and surface to the caller.
/// `Dependency` covers mail/payment collaborator failures; those are caught
/// at the call site, logged, and never unwind a committed state change, so
/// a `Dependency` error reaching the HTTP layer means a collaborator failed
/// before any state was written.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("dependency failure: {0}")]
    Dependency(String),
}

impl BookingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        BookingError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        BookingError::NotFound(msg.into())
    }
}

impl ResponseError for BookingError {
    fn status_code(&self) -> StatusCode {
        match self {
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::InvalidTransition(_) => StatusCode::CONFLICT,
            BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BookingError::Dependency(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let BookingError::Database(e) = self {
            log::error!("database error: {}", e);
            // Don't leak driver internals to the client
            return HttpResponse::InternalServerError().json(json!({
                "success": false,
                "message": "Internal server error",
            }));
        }

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": self.to_string(),
        }))
    }
}
