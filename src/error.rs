//! Failure taxonomy and the JSON envelope every failure is rendered as.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::identifier::ValidationError;

/// Cap on the diagnostic text attached to a failure.
pub const DETAILS_LIMIT: usize = 1000;
/// Cap on the raw stdout echoed back when parsing fails.
pub const PREVIEW_LIMIT: usize = 500;

/// Classified extractor failures. Each variant carries the diagnostic text
/// that ends up in the response's `details` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("Video, Playlist, or Channel not found or unavailable.")]
    ResourceNotFound { details: String },
    #[error("Invalid URL provided to yt-dlp.")]
    BadUpstreamUrl { details: String },
    #[error("Process killed, possibly due to timeout or excessive resource usage.")]
    Killed { details: String },
    #[error("Command not found: '{program}'. Ensure yt-dlp is installed and accessible.")]
    MissingExecutable { program: String, details: String },
    #[error("Failed to execute yt-dlp command.")]
    ExecutionFailed { details: String },
    #[error("yt-dlp produced non-JSON output.")]
    NonJsonOutput { details: String },
    #[error("Failed to parse yt-dlp output as JSON.")]
    OutputParse { details: String, preview: String },
}

impl ExtractionError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadUpstreamUrl { .. } => StatusCode::BAD_REQUEST,
            Self::Killed { .. }
            | Self::MissingExecutable { .. }
            | Self::ExecutionFailed { .. }
            | Self::NonJsonOutput { .. }
            | Self::OutputParse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn details(&self) -> &str {
        match self {
            Self::ResourceNotFound { details }
            | Self::BadUpstreamUrl { details }
            | Self::Killed { details }
            | Self::MissingExecutable { details, .. }
            | Self::ExecutionFailed { details }
            | Self::NonJsonOutput { details }
            | Self::OutputParse { details, .. } => details,
        }
    }
}

/// Error returned by every handler; renders as
/// `{success: false, error, details?, raw_output_preview?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
    pub raw_output_preview: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::plain(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::plain(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::plain(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn plain(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            raw_output_preview: None,
        }
    }

    pub fn body(&self) -> FailureEnvelope<'_> {
        FailureEnvelope {
            success: false,
            error: &self.message,
            details: self.details.as_deref(),
            raw_output_preview: self.raw_output_preview.as_deref(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        let raw_output_preview = match &err {
            ExtractionError::OutputParse { preview, .. } => Some(preview.clone()),
            _ => None,
        };
        Self {
            status: err.status(),
            message: err.to_string(),
            details: Some(err.details().to_string()),
            raw_output_preview,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct FailureEnvelope<'a> {
    pub success: bool,
    pub error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output_preview: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct SuccessEnvelope {
    pub success: bool,
    pub data: Value,
}

impl SuccessEnvelope {
    pub fn new(data: Value) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// First `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
