// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Json,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Our custom error type for the application.
///
/// Every failure kind is its own variant and maps to its own status code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or missing input, rejected before the store is touched.
    #[error("{0}")]
    Validation(String),

    #[error("Task with ID {0} not found.")]
    NotFound(i64),

    /// The viewer is authenticated but may not act on this task.
    #[error("You are not allowed to access task with ID {0}.")]
    Forbidden(i64),

    #[error("Authentication required.")]
    Unauthenticated,

    #[error("Task store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),
}

/// Allows converting an `anyhow::Error` (coming from the store)
/// into our `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::StoreUnavailable(err)
    }
}

// Extractor rejections are client input errors and get the same JSON body
// as every other failure.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Short machine-readable tag put in the JSON body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::Unauthenticated => "unauthenticated",
            AppError::StoreUnavailable(_) => "store_unavailable",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Reports a forbidden task as missing when `conceal` is set, so that
    /// other users' task ids cannot be probed.
    pub fn conceal_foreign(self, conceal: bool) -> Self {
        match self {
            AppError::Forbidden(id) if conceal => AppError::NotFound(id),
            other => other,
        }
    }
}

/// Allows Axum to convert our `AppError` into an HTTP `Response`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let message = match &self {
            AppError::StoreUnavailable(err) => {
                // Log the internal error, the client only gets a generic message.
                tracing::error!("Internal server error: {:?}", err);
                "An internal error occurred.".to_string()
            }
            other => other.to_string(),
        };
        tracing::error!(
            "Responding with error: status_code={}, kind={}, message={}",
            code.as_u16(),
            self.kind(),
            message
        );

        let body = Json(serde_json::json!({ "error": message, "kind": self.kind() }));
        if matches!(self, AppError::Unauthenticated) {
            (
                code,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"task-calendar\"")],
                body,
            )
                .into_response()
        } else {
            (code, body).into_response()
        }
    }
}
