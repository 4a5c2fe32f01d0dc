use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::types::IndicatorKind;

/// Failures raised by the signal core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("Insufficient data for {indicator}: need {required} points, got {actual}")]
    InsufficientData {
        indicator: IndicatorKind,
        required: usize,
        actual: usize,
    },

    #[error("Insufficient history: need {required} snapshots, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("Incomplete signal set, missing: {}", format_kinds(.missing))]
    IncompleteSignalSet { missing: Vec<IndicatorKind> },

    #[error("Malformed series: {0}")]
    MalformedSeries(String),
}

fn format_kinds(kinds: &[IndicatorKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Signal(SignalError::InsufficientHistory { .. }) => StatusCode::CONFLICT,
            AppError::Signal(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
