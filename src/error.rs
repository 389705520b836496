use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::video::format::Resolution;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Camera unavailable [{device}]: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    #[error("Frame read failed: {0}")]
    FrameRead(String),

    #[error("Frame size mismatch: sink expects {expected}, got {actual}")]
    FrameMismatch {
        expected: Resolution,
        actual: Resolution,
    },

    #[error("Frame rejected: {0}")]
    FrameRejected(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Video error: {0}")]
    VideoError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Errors that concern a single frame; the frame is skipped and the
    /// sink stays usable.
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            AppError::FrameMismatch { .. } | AppError::FrameRejected(_)
        )
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DeviceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(
                status = status.as_u16(),
                error_message = %message,
                "Request failed"
            );
        } else {
            tracing::debug!(
                status = status.as_u16(),
                error_message = %message,
                "Request rejected"
            );
        }

        (status, message).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
