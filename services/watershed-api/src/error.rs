//! HTTP rendering of delineation errors.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use watershed::{DelineationError, ErrorKind};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub detail: String,
}

/// Wrapper that turns a [`DelineationError`] into an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub DelineationError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::InvalidParameter => StatusCode::BAD_REQUEST,
            ErrorKind::OutOfCoverage => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::ResultTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::MissingData => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::EmptyResult | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DelineationError> for ApiError {
    fn from(err: DelineationError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(DelineationError::invalid_parameter(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.kind(),
            detail: self.0.detail().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
