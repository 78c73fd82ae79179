use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::path::PathBuf;
use thiserror::Error;

use crate::types::ErrorBody;

/// Errors a prediction request can end with. Each maps to one HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unified endpoint only; checked before the batch is looked at.
    #[error("Invalid model type")]
    InvalidBackend,

    #[error("{0}")]
    InvalidShape(String),

    /// An engine failed on input that passed validation.
    #[error("{0}")]
    Computation(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBackend => StatusCode::BAD_REQUEST,
            Self::InvalidShape(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Computation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidBackend => "invalid_backend",
            Self::InvalidShape(_) => "invalid_shape",
            Self::Computation(_) => "computation_error",
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Computation(format!("{err:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.category().to_string(),
            detail: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Label registry problems. All of them abort startup.
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("expected exactly {expected} labels, got {actual}")]
    WrongCount { expected: usize, actual: usize },

    #[error("label at position {0} is empty")]
    Empty(usize),

    #[error("label {0:?} appears more than once")]
    Duplicate(String),

    #[error("failed to read labels file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("labels file {path} is not a JSON array of strings")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
