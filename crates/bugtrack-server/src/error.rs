//! API error type and its mapping onto status codes and envelopes.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bugtrack_store::{Status, StoreError};
use serde_json::json;
use thiserror::Error;

use crate::envelope::ApiResponse;

/// Message returned for every 500; detail is only attached in development.
pub const SERVER_ERROR_MESSAGE: &str = "Server Error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid request body: {0}")]
    BadJson(String),

    #[error("route not found: {0}")]
    RouteNotFound(String),

    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Internal failure detail carried on a 500 response for the
/// development-mode middleware to expose.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadJson(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(err) => match err {
                StoreError::Validation(_)
                | StoreError::InvalidIdentifier(_)
                | StoreError::InvalidStatus(_)
                | StoreError::MissingRequiredField(_) => StatusCode::BAD_REQUEST,
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Jsonl(_) | StoreError::LockBusy { .. } | StoreError::LockIo { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::BadJson(_) => StatusCode::BAD_REQUEST,
            ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn envelope(&self) -> ApiResponse<()> {
        match self {
            ApiError::Store(StoreError::Validation(err)) => {
                ApiResponse::failure("Validation failed").with_error(json!(err.violations))
            }
            ApiError::Store(StoreError::MissingRequiredField(fields)) => ApiResponse::failure(
                format!("Please provide {}", fields.join(", ")),
            )
            .with_error(json!(fields)),
            ApiError::Store(StoreError::InvalidIdentifier(id)) => {
                ApiResponse::failure(format!("Invalid bug id: {id}"))
            }
            ApiError::Store(StoreError::NotFound(_)) => ApiResponse::failure("Bug not found"),
            ApiError::Store(StoreError::InvalidStatus(_)) => {
                let allowed: Vec<&str> = Status::ALL.iter().map(|s| s.as_str()).collect();
                ApiResponse::failure(format!(
                    "Invalid status. Must be one of: {}",
                    allowed.join(", ")
                ))
            }
            ApiError::BadJson(detail) => {
                ApiResponse::failure("Invalid request body").with_error(json!(detail))
            }
            ApiError::RouteNotFound(path) => {
                ApiResponse::failure(format!("Route not found: {path}"))
            }
            ApiError::MethodNotAllowed { method, path } => {
                ApiResponse::failure(format!("Method {method} not allowed on {path}"))
            }
            ApiError::Store(_) | ApiError::Internal(_) => {
                ApiResponse::failure(SERVER_ERROR_MESSAGE)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(self.envelope())).into_response();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            response
                .extensions_mut()
                .insert(ErrorDetail(self.to_string()));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugtrack_store::{ValidationError, Violation};

    #[test]
    fn store_errors_map_to_fixed_status_codes() {
        let cases = [
            (
                StoreError::Validation(ValidationError {
                    violations: vec![Violation::new("title", "is required")],
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                StoreError::InvalidIdentifier("42".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                StoreError::InvalidStatus("Done".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                StoreError::MissingRequiredField(vec!["status".to_string()]),
                StatusCode::BAD_REQUEST,
            ),
            (
                StoreError::NotFound("x".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                StoreError::LockBusy {
                    lock_path: "bugs.jsonl.lock".to_string(),
                    holder: "pid 7".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn wrong_method_is_enveloped_405() {
        let err = ApiError::MethodNotAllowed {
            method: "POST".to_string(),
            path: "/api/health".to_string(),
        };
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = serde_json::to_value(err.envelope()).expect("envelope serializes");
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Method POST not allowed on /api/health");
    }

    #[test]
    fn validation_envelope_lists_violations() {
        let err = ApiError::from(StoreError::Validation(ValidationError {
            violations: vec![Violation::new("description", "is required")],
        }));
        let body = serde_json::to_value(err.envelope()).expect("envelope serializes");
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["error"][0]["field"], "description");
    }

    #[test]
    fn server_errors_do_not_leak_detail_in_body() {
        let response = ApiError::Internal("disk on fire".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response
            .extensions()
            .get::<ErrorDetail>()
            .expect("detail attached for middleware");
        assert!(detail.0.contains("disk on fire"));
    }
}
