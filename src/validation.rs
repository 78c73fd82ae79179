use serde_json::Value;

use crate::error::ApiError;
use crate::types::{BackendSelector, Batch, FeatureVector, NUM_FEATURES};

pub const BATCH_KEY: &str = "crystalData";
pub const MODEL_KEY: &str = "model";

fn ensure_object(body: &Value) -> Result<(), ApiError> {
    if body.is_object() {
        Ok(())
    } else {
        Err(ApiError::InvalidShape("request body must be a JSON object".into()))
    }
}

/// Extracts the feature batch from a request body.
pub fn validate_batch(body: &Value) -> Result<Batch, ApiError> {
    ensure_object(body)?;

    let samples = body
        .get(BATCH_KEY)
        .ok_or_else(|| ApiError::InvalidShape(format!("{BATCH_KEY}: field required")))?
        .as_array()
        .ok_or_else(|| {
            ApiError::InvalidShape(format!("{BATCH_KEY}: expected a list of samples"))
        })?;

    let batch = samples
        .iter()
        .enumerate()
        .map(|(index, sample)| validate_sample(index, sample))
        .collect::<Result<Vec<_>, _>>()?;

    Batch::new(batch).ok_or_else(|| {
        ApiError::InvalidShape(format!("{BATCH_KEY}: at least one sample is required"))
    })
}

fn validate_sample(index: usize, sample: &Value) -> Result<FeatureVector, ApiError> {
    let values = sample.as_array().ok_or_else(|| {
        ApiError::InvalidShape(format!(
            "{BATCH_KEY}[{index}]: expected a list of {NUM_FEATURES} numbers"
        ))
    })?;

    if values.len() != NUM_FEATURES {
        return Err(ApiError::InvalidShape(format!(
            "{BATCH_KEY}[{index}]: expected {NUM_FEATURES} features, found {}",
            values.len()
        )));
    }

    let mut features = [0.0; NUM_FEATURES];
    for (position, (slot, value)) in features.iter_mut().zip(values).enumerate() {
        *slot = value.as_f64().ok_or_else(|| {
            ApiError::InvalidShape(format!(
                "{BATCH_KEY}[{index}][{position}]: expected a number, found {value}"
            ))
        })?;
    }
    Ok(features)
}

/// Reads the backend selector. Runs before `validate_batch` on the unified
/// endpoint, so a bad selector wins over a bad batch.
pub fn validate_backend(body: &Value) -> Result<BackendSelector, ApiError> {
    body.get(MODEL_KEY)
        .and_then(Value::as_str)
        .and_then(BackendSelector::parse)
        .ok_or(ApiError::InvalidBackend)
}

/// Validation for the unified endpoint: the body must be an object, then
/// the selector is checked, then the batch.
pub fn validate_unified(body: &Value) -> Result<(BackendSelector, Batch), ApiError> {
    ensure_object(body)?;
    let backend = validate_backend(body)?;
    let batch = validate_batch(body)?;
    Ok((backend, batch))
}
