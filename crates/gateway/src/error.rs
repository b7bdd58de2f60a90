use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    folio_retrieval::RetrievalError,
    tracing::{error, warn},
};

use crate::extract::ExtractError;

/// Errors returned by handlers, rendered as `{"detail": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Map a service error, prefixing backend failures with `context`.
    pub fn from_retrieval(context: &str, err: RetrievalError) -> Self {
        match err {
            RetrievalError::Validation(msg) => Self::BadRequest(msg),
            other => Self::Internal(format!("{context}: {other}")),
        }
    }

    pub fn from_extract(context: &str, err: ExtractError) -> Self {
        match err {
            ExtractError::Parse(_) => Self::BadRequest(format!("{context}: {err}")),
            ExtractError::Panicked => Self::Internal(format!("{context}: {err}")),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            error!(%status, detail = %detail, "request failed");
        } else {
            warn!(%status, detail = %detail, "request rejected");
        }
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}
