//! Success/error envelope shared by every route.
//!
//! Handlers never serialize bare payloads: they go through [`success`] or
//! [`error`] so that all endpoints expose the same response schema.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T = serde_json::Value> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Current UTC time as RFC 3339 with microseconds and a `Z` suffix.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn success<T: Serialize>(message: &str, data: Option<T>) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        message: Some(message.to_string()),
        error: None,
        timestamp: timestamp(),
        data,
    }
}

/// Builds the failure envelope and attaches it to a response with `status`.
pub fn error(message: &str, status: StatusCode) -> HttpResponse {
    let body: ApiResponse = ApiResponse {
        success: false,
        message: None,
        error: Some(message.to_string()),
        timestamp: timestamp(),
        data: None,
    };
    HttpResponse::build(status).json(body)
}
