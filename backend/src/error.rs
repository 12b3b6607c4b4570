use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::envelope;

pub const YIELD_MODEL_MISSING: &str = "Yield prediction model not loaded";
pub const CROP_MODEL_MISSING: &str = "Crop recommendation model not loaded";

/// Request-terminal failures. None of them take the process down.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    ModelUnavailable(&'static str),

    #[error("Internal server error: {0}")]
    Prediction(String),

    #[error("Payload too large (limit {limit} bytes)")]
    PayloadTooLarge { limit: usize },

    #[error("Endpoint not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl GatewayError {
    pub fn prediction(err: impl std::fmt::Display) -> Self {
        GatewayError::Prediction(err.to_string())
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::ModelUnavailable(_) | GatewayError::Prediction(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        envelope::error(&self.to_string(), self.status_code())
    }
}
