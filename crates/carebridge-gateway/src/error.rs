// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `CareError` to HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use carebridge_core::CareError;
use serde::Serialize;

/// Error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Newtype carrying a domain error out of a handler.
pub struct ApiError(pub CareError);

impl From<CareError> for ApiError {
    fn from(e: CareError) -> Self {
        Self(e)
    }
}

fn status_for(error: &CareError) -> StatusCode {
    match error {
        CareError::Validation(_) => StatusCode::BAD_REQUEST,
        CareError::NotFound(_) => StatusCode::NOT_FOUND,
        CareError::Forbidden(_) => StatusCode::FORBIDDEN,
        CareError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        CareError::EngineUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        CareError::EngineError { .. } => StatusCode::BAD_GATEWAY,
        // Cancellation is not a failure, but a cancelled non-streaming turn
        // has nothing else to answer with.
        CareError::Cancelled => StatusCode::CONFLICT,
        CareError::Storage { .. } | CareError::Config(_) | CareError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(code = self.0.error_code(), error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.0.error_code().to_string(),
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
