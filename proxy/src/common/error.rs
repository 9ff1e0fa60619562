//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! # OpenAI互換エラーレスポンス
//!
//! `ProxyError`は`error_type()`と`status_code()`メソッドを提供し、
//! OpenAI互換のエラーレスポンスを生成できます。
//!
//! 不正なJSONボディ（クライアント側の壊れたJSON）はここに現れない。
//! リライタ内で生バイト転送にフォールバックして回復する。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// proxy error type
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Transport failure talking to the backend (connect/reset/body read)
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// Backend answered with a non-success status
    #[error("Upstream returned {status}: {message}")]
    Upstream {
        /// HTTP status returned by the backend
        status: u16,
        /// Response body (or reason) returned by the backend
        message: String,
    },

    /// Inbound request could not be read
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Bounded backend call exceeded its timeout
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// reqwestの送信・受信エラーを分類する
    pub fn transport(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{}: {}", context, err))
        } else {
            Self::UpstreamUnreachable(format!("{}: {}", context, err))
        }
    }

    /// Returns a safe error message for external clients.
    ///
    /// Upstream URLs and backend bodies only appear in server logs
    /// (`Display`), never in client responses.
    pub fn external_message(&self) -> &'static str {
        match self {
            Self::UpstreamUnreachable(_) => "Backend service unavailable",
            Self::Upstream { .. } => "Backend service returned an error",
            Self::InvalidRequest(_) => "Invalid request",
            Self::Timeout(_) => "Request timeout",
            Self::Internal(_) => "Internal server error",
        }
    }

    /// Returns the OpenAI-compatible error type string.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UpstreamUnreachable(_) => "service_unavailable",
            Self::Upstream { .. } => "service_unavailable",
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Timeout(_) => "server_error",
            Self::Internal(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts this error to an OpenAI-compatible error response.
    pub fn to_openai_error(&self) -> OpenAIErrorResponse {
        OpenAIErrorResponse {
            error: OpenAIErrorDetail {
                message: self.external_message().to_string(),
                error_type: self.error_type().to_string(),
                code: Some(self.status_code().as_u16().to_string()),
            },
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Request failed");
        (self.status_code(), Json(self.to_openai_error())).into_response()
    }
}

/// OpenAI互換エラーレスポンス
///
/// # Example
///
/// ```json
/// {
///   "error": {
///     "message": "Backend service unavailable",
///     "type": "service_unavailable",
///     "code": "502"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct OpenAIErrorResponse {
    /// The error details
    pub error: OpenAIErrorDetail,
}

/// OpenAIエラー詳細
#[derive(Debug, Clone, Serialize)]
pub struct OpenAIErrorDetail {
    /// Human-readable error message
    pub message: String,
    /// Error type (e.g., "service_unavailable", "server_error")
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error code (optional, typically HTTP status as string)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Result type alias (proxy)
pub type ProxyResult<T> = Result<T, ProxyError>;
