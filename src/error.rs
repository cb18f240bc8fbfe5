//! Error taxonomy for scraping, push delivery and the HTTP layer.
//!
//! [`ApiError`] converts into an axum response with a `{error, message}` body,
//! where `error` names the failure class.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failure reaching or reading the scraped site.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    /// No purely numeric label in the pagination control.
    #[error("no numeric pagination links found")]
    NoPaginationFound,
}

impl ScrapeError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } | Self::Status { .. } => "ScrapeFailure",
            Self::NoPaginationFound => "PaginationFailure",
        }
    }
}

/// Failure handing a message to the push provider.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid push token format")]
    InvalidTokenFormat,

    #[error("push request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered but refused the message.
    #[error("push rejected: {0}")]
    Rejected(String),
}

impl NotifyError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTokenFormat => "InvalidTokenFormat",
            Self::Http(_) | Self::Rejected(_) => "NotificationDeliveryFailure",
        }
    }
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed request fields.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(format!("{e:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationFailure"),
            Self::Scrape(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.kind()),
            Self::Notify(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.kind()),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        if status.is_server_error() {
            tracing::warn!(target: "api", error = %self, kind, "request failed");
        }

        let body = serde_json::json!({
            "error": kind,
            "message": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let resp = ApiError::validation("token is required").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_token_maps_to_500() {
        let resp = ApiError::from(NotifyError::InvalidTokenFormat).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn pagination_failure_has_its_own_kind() {
        assert_eq!(ScrapeError::NoPaginationFound.kind(), "PaginationFailure");
        let e = ScrapeError::Status {
            url: "https://x".into(),
            status: 503,
        };
        assert_eq!(e.kind(), "ScrapeFailure");
    }
}
