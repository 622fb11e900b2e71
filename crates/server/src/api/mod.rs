use std::fmt::Display;

use axum::{http::StatusCode, Json};
use shared::error::{ApiError, ErrorCode};
use tracing::error;
use wizard::{SessionError, WizardError};

pub(crate) mod items;
pub(crate) mod orders;
pub(crate) mod products;
pub(crate) mod todos;

pub(crate) type ApiFailure = (StatusCode, Json<ApiError>);

pub(crate) fn internal_error(err: impl Display) -> ApiFailure {
    error!(error = %err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(ErrorCode::Internal, err.to_string())),
    )
}

pub(crate) fn not_found(message: impl Into<String>) -> ApiFailure {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(ErrorCode::NotFound, message)),
    )
}

pub(crate) fn wizard_failure(err: WizardError) -> ApiFailure {
    let (status, code) = match &err {
        WizardError::SessionUnavailable(SessionError::Expired(_)) => {
            (StatusCode::GONE, ErrorCode::SessionExpired)
        }
        WizardError::SessionUnavailable(SessionError::Backend(_)) | WizardError::Catalog(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::Unavailable)
        }
        WizardError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Internal),
        WizardError::OrderNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
    };
    if status.is_server_error() {
        error!(error = %err, "wizard request failed");
    }
    (status, Json(ApiError::new(code, err.to_string())))
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
