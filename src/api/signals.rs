//! Signal API endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::services::signals::strong_correlations;
use crate::types::{CorrelationMatrix, EvaluationResult, HistorySnapshot, PricePoint, StrongCorrelation};
use crate::AppState;

/// API response wrapper.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta: ApiMeta,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMeta {
    pub generated_at: i64,
}

impl<T> ApiResponse<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            meta: ApiMeta {
                generated_at: chrono::Utc::now().timestamp_millis(),
            },
        }
    }
}

/// Body of an evaluation request.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub points: Vec<PricePoint>,
}

/// Query parameters for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Window in hours back from the newest snapshot; everything retained if absent.
    pub hours: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub asset: String,
    pub count: usize,
    pub snapshots: Vec<HistorySnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationResponse {
    pub asset: String,
    pub matrix: CorrelationMatrix,
    pub strong_correlations: Vec<StrongCorrelation>,
}

/// Create the signals router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:asset/evaluate", post(evaluate))
        .route("/:asset/history", get(get_history))
        .route("/:asset/correlations", get(get_correlations))
}

fn require_asset(asset: &str) -> Result<String> {
    let asset = asset.trim();
    if asset.is_empty() {
        return Err(AppError::BadRequest("Asset id is required".to_string()));
    }
    Ok(asset.to_lowercase())
}

/// Evaluate a price series for an asset.
async fn evaluate(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<ApiResponse<EvaluationResult>>> {
    let asset = require_asset(&asset)?;
    let engine = state.engine.clone();

    // Indicator math is CPU-bound; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || engine.evaluate(&asset, &request.points))
        .await
        .map_err(|e| AppError::Anyhow(e.into()))??;

    Ok(Json(ApiResponse::new(result)))
}

/// Get stored snapshots for an asset.
async fn get_history(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<HistoryResponse>>> {
    let asset = require_asset(&asset)?;
    if state.engine.history_store().is_empty(&asset) {
        return Err(AppError::NotFound(format!("No history for {}", asset)));
    }

    let window = query.hours.map(|h| Duration::from_secs(h.saturating_mul(3600)));
    let snapshots = state.engine.history(&asset, window);

    Ok(Json(ApiResponse::new(HistoryResponse {
        asset,
        count: snapshots.len(),
        snapshots,
    })))
}

/// Get the correlation matrix over an asset's rolling window.
async fn get_correlations(
    State(state): State<AppState>,
    Path(asset): Path<String>,
) -> Result<Json<ApiResponse<CorrelationResponse>>> {
    let asset = require_asset(&asset)?;
    let matrix = state.engine.correlation_matrix(&asset)?;
    let config = state.engine.config();
    let strong = strong_correlations(
        &matrix,
        config.strong_correlation_threshold,
        config.strong_correlation_limit,
    );

    Ok(Json(ApiResponse::new(CorrelationResponse {
        asset,
        matrix,
        strong_correlations: strong,
    })))
}
