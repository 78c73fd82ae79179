use anyhow::{Result, bail};
use async_trait::async_trait;
use candle_core::{DType, Tensor};

use crate::types::{Batch, NUM_CLASSES, ProbabilityVector};

/// A loaded, read-only classifier.
///
/// `predict` must not mutate the engine: the same instance serves every
/// in-flight request. Output is one probability vector per sample, in input order.
#[async_trait]
pub trait Engine {
    fn name(&self) -> &'static str;

    fn num_classes(&self) -> usize;

    async fn predict(&self, batch: &Batch) -> Result<Vec<ProbabilityVector>>;
}

/// Converts a `(batch, classes)` score tensor into per-sample vectors.
pub fn probability_rows(engine: &str, scores: &Tensor) -> Result<Vec<ProbabilityVector>> {
    let rows = scores.to_dtype(DType::F64)?.to_vec2::<f64>()?;

    let probabilities = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| -> Result<ProbabilityVector> {
            row.try_into().map_err(|row: Vec<f64>| {
                anyhow::anyhow!(
                    "{engine} returned {} scores for sample {index}, expected {NUM_CLASSES}",
                    row.len()
                )
            })
        })
        .collect::<Result<Vec<ProbabilityVector>>>()?;

    ensure_finite(engine, &probabilities)?;
    Ok(probabilities)
}

/// Rejects engine output that cannot be serialized as scores.
pub fn ensure_finite(engine: &str, probabilities: &[ProbabilityVector]) -> Result<()> {
    for (index, probs) in probabilities.iter().enumerate() {
        if probs.iter().any(|p| !p.is_finite()) {
            bail!("{engine} produced non-finite scores for sample {index}: {probs:?}");
        }
    }
    Ok(())
}
