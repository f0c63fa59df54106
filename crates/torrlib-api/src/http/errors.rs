//! RFC9457-style API error wrapper.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use torrlib_torrent_core::TorrentError;
use tracing::error;

use crate::http::constants::{PROBLEM_BAD_REQUEST, PROBLEM_INTERNAL, PROBLEM_NOT_FOUND};
use crate::models::ProblemDetails;

/// Structured API error with optional RFC9457 fields.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    detail: Option<String>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request").with_detail(detail)
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            PROBLEM_NOT_FOUND,
            "resource not found",
        )
        .with_detail(detail)
    }
}

impl From<TorrentError> for ApiError {
    fn from(err: TorrentError) -> Self {
        match err {
            TorrentError::Validation { field } => {
                Self::bad_request(format!("missing required field `{field}`"))
            }
            TorrentError::InvalidHash { value } => {
                Self::bad_request(format!("`{value}` is not a valid info hash"))
            }
            TorrentError::InvalidSpec { reason, detail } => Self::bad_request(match detail {
                Some(detail) => format!("torrent source rejected ({reason}): {detail}"),
                None => format!("torrent source rejected ({reason})"),
            }),
            TorrentError::NotFound { hash } => Self::not_found(format!("torrent {hash} not found")),
            TorrentError::Registration { source } => {
                error!(error = %source, "engine refused torrent registration");
                Self::internal("failed to register torrent")
            }
            TorrentError::OperationFailed {
                operation,
                hash,
                source,
            } => {
                error!(
                    operation,
                    hash = hash.as_deref().unwrap_or(""),
                    error = %source,
                    "torrent operation failed"
                );
                Self::internal(format!("torrent operation `{operation}` failed"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}
