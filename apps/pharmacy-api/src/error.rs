//! # HTTP Errors and Response Envelope
//!
//! Every body has the same shape:
//!
//! ```text
//! { "code": "0000", "message": "success", "data": ... }      200
//! { "code": "4041", "message": "Order not found: O1", "data": null }
//! ```
//!
//! ## Status Mapping
//! ```text
//! ┌──────────────────────┬────────┬───────┐
//! │ ErrorKind            │ status │ code  │
//! ├──────────────────────┼────────┼───────┤
//! │ Validation           │ 400    │ 4001  │
//! │ NotFound             │ 404    │ 4041  │
//! │ Conflict             │ 409    │ 4091  │
//! │ InsufficientStock    │ 422    │ 4221  │
//! │ InvalidState         │ 422    │ 4222  │
//! │ Internal             │ 500    │ 5001  │
//! └──────────────────────┴────────┴───────┘
//! ```
//! Internal errors are logged and replaced by a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use pharmacy_service::{ErrorKind, ServiceError};

pub const SUCCESS_CODE: &str = "0000";

// =============================================================================
// Envelope
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: &'static str,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            code: SUCCESS_CODE,
            message: "success".to_string(),
            data: Some(data),
        }
    }
}

/// Wraps `data` in a success envelope.
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

// =============================================================================
// AppError
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Request parameters the service layer never sees.
    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    fn kind(&self) -> ErrorKind {
        match self {
            AppError::Service(e) => e.kind(),
            AppError::BadRequest(_) => ErrorKind::Validation,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InsufficientStock | ErrorKind::InvalidState => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "4001",
            ErrorKind::NotFound => "4041",
            ErrorKind::Conflict => "4091",
            ErrorKind::InsufficientStock => "4221",
            ErrorKind::InvalidState => "4222",
            ErrorKind::Internal => "5001",
        }
    }

    /// Structured detail for errors a client can act on.
    fn data(&self) -> Option<Value> {
        match self {
            AppError::Service(ServiceError::InsufficientStock {
                medicine_id,
                available,
                requested,
            }) => Some(json!({
                "medicine_id": medicine_id,
                "available": available,
                "requested": requested,
            })),
            AppError::Service(ServiceError::InvalidState { entity, id, status }) => Some(json!({
                "entity": entity,
                "id": id,
                "status": status,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Internal error while handling request");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ApiResponse {
            code: self.code(),
            message,
            data: self.data(),
        };
        (status, Json(body)).into_response()
    }
}
