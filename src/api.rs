use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    response::Json,
    routing::{get, post},
};
use metrics::{counter, histogram};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;

use crate::dispatch::Engines;
use crate::error::ApiError;
use crate::formatter::format_response;
use crate::labels::LabelRegistry;
use crate::openapi;
use crate::types::{BackendSelector, PredictionResponse, RootMessage};
use crate::validation::{validate_batch, validate_unified};

#[derive(Clone)]
pub struct AppState {
    engines: Engines,
    labels: Arc<LabelRegistry>,
    specification: Arc<Value>,
}

impl AppState {
    pub fn new(engines: Engines, labels: LabelRegistry) -> Self {
        let specification = Arc::new(openapi::document(&labels));
        Self {
            engines,
            labels: Arc::new(labels),
            specification,
        }
    }
}

/// How a prediction endpoint picks its engine.
#[derive(Debug, Clone, Copy)]
enum Routing {
    Fixed(BackendSelector),
    FromRequest,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/specifications", get(specifications_handler))
        .route("/sklearn", post(sklearn_handler))
        .route("/pytorch", post(pytorch_handler))
        .route("/astromech", post(astromech_handler))
        .with_state(state)
}

async fn root_handler() -> Json<RootMessage> {
    Json(RootMessage {
        message: "Welcome to the Astromech Crystal Classifier API",
    })
}

async fn specifications_handler(State(state): State<AppState>) -> Json<Value> {
    Json(state.specification.as_ref().clone())
}

async fn sklearn_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    predict(&state, "sklearn", Routing::Fixed(BackendSelector::Sklearn), body).await
}

async fn pytorch_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    predict(&state, "pytorch", Routing::Fixed(BackendSelector::Pytorch), body).await
}

async fn astromech_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    predict(&state, "astromech", Routing::FromRequest, body).await
}

/// Validation, engine selection, inference and formatting, shared by all
/// three prediction endpoints.
#[tracing::instrument(
    skip(state, body),
    fields(backend = tracing::field::Empty, batch_size = tracing::field::Empty)
)]
async fn predict(
    state: &AppState,
    endpoint: &'static str,
    routing: Routing,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    counter!("prediction_requests_total", "endpoint" => endpoint).increment(1);
    let start = Instant::now();

    let result = run(state, routing, body).await;

    match &result {
        Ok(response) => {
            histogram!("prediction_processing_seconds", "endpoint" => endpoint)
                .record(start.elapsed().as_secs_f64());
            tracing::info!(
                samples = response.prediction.len(),
                "Prediction completed successfully"
            );
        }
        Err(err) => {
            counter!("prediction_errors_total", "endpoint" => endpoint, "error" => err.category())
                .increment(1);
            match err {
                ApiError::Computation(_) => tracing::error!(error = %err, "Prediction failed"),
                _ => tracing::warn!(error = %err, category = err.category(), "Rejected request"),
            }
        }
    }

    result.map(Json)
}

async fn run(
    state: &AppState,
    routing: Routing,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<PredictionResponse, ApiError> {
    let Json(body) = body.map_err(|rejection| ApiError::InvalidShape(rejection.body_text()))?;

    let (backend, batch) = match routing {
        Routing::Fixed(backend) => (backend, validate_batch(&body)?),
        Routing::FromRequest => validate_unified(&body)?,
    };

    let span = tracing::Span::current();
    span.record("backend", backend.as_str());
    span.record("batch_size", batch.len());

    let engine = state.engines.select(backend);
    let probabilities = engine.predict(&batch).await?;
    if probabilities.len() != batch.len() {
        return Err(ApiError::Computation(format!(
            "{} engine returned {} results for {} samples",
            engine.name(),
            probabilities.len(),
            batch.len()
        )));
    }

    Ok(format_response(&probabilities, &state.labels))
}
