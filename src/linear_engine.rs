use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use candle_core::{Device, Module, Tensor};
use candle_nn::Linear;
use candle_nn::ops::{sigmoid, softmax};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::{Engine, probability_rows};
use crate::types::{Batch, NUM_CLASSES, NUM_FEATURES, ProbabilityVector};

/// How class scores are turned into probabilities, as in scikit-learn's
/// `LogisticRegression.predict_proba`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiClass {
    /// Softmax over the decision values.
    #[default]
    Multinomial,
    /// Independent sigmoids, normalized to sum to one.
    Ovr,
}

/// Exported logistic regression parameters.
///
/// ```json
/// { "coef": [[..4..], [..4..], [..4..]], "intercept": [.., .., ..], "multi_class": "multinomial" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LinearWeights {
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    #[serde(default)]
    pub multi_class: MultiClass,
}

#[derive(Debug, Clone)]
pub struct LinearConfig {
    pub model_path: PathBuf,
}

/// The "sklearn" backend: a pre-fitted multinomial linear classifier.
///
/// Runs in f64 on the CPU; the weights are a few dozen numbers.
#[derive(Debug)]
pub struct LinearEngine {
    decision: Linear,
    multi_class: MultiClass,
    device: Device,
}

impl LinearEngine {
    #[tracing::instrument(skip(config), fields(model_path = %config.model_path.display()))]
    pub fn new(config: LinearConfig) -> Result<Self> {
        let weights = Self::read_weights(&config.model_path)?;
        let engine = Self::from_weights(weights)?;
        tracing::info!(multi_class = ?engine.multi_class, "Linear model loaded");
        Ok(engine)
    }

    fn read_weights(path: &Path) -> Result<LinearWeights> {
        if !path.is_file() {
            bail!("Linear model file {} does not exist.", path.display());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading linear model {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing linear model {}", path.display()))
    }

    pub fn from_weights(weights: LinearWeights) -> Result<Self> {
        if weights.coef.len() != NUM_CLASSES {
            bail!(
                "linear model has {} coefficient rows, expected {NUM_CLASSES}",
                weights.coef.len()
            );
        }
        if weights.intercept.len() != NUM_CLASSES {
            bail!(
                "linear model has {} intercepts, expected {NUM_CLASSES}",
                weights.intercept.len()
            );
        }
        for (class, row) in weights.coef.iter().enumerate() {
            if row.len() != NUM_FEATURES {
                bail!(
                    "coefficient row {class} has {} values, expected {NUM_FEATURES}",
                    row.len()
                );
            }
        }
        if weights
            .coef
            .iter()
            .flatten()
            .chain(weights.intercept.iter())
            .any(|w| !w.is_finite())
        {
            bail!("linear model contains non-finite weights");
        }

        let device = Device::Cpu;
        let coef: Vec<f64> = weights.coef.into_iter().flatten().collect();
        let coef = Tensor::from_vec(coef, (NUM_CLASSES, NUM_FEATURES), &device)?;
        let intercept = Tensor::from_vec(weights.intercept, NUM_CLASSES, &device)?;

        Ok(Self {
            decision: Linear::new(coef, Some(intercept)),
            multi_class: weights.multi_class,
            device,
        })
    }

    fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        let scores = self.decision.forward(input)?;
        match self.multi_class {
            MultiClass::Multinomial => softmax(&scores, 1),
            MultiClass::Ovr => {
                let probs = sigmoid(&scores)?;
                let total = probs.sum_keepdim(1)?;
                probs.broadcast_div(&total)
            }
        }
    }
}

#[async_trait]
impl Engine for LinearEngine {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn num_classes(&self) -> usize {
        self.decision.weight().dims()[0]
    }

    #[tracing::instrument(skip(self, batch), fields(batch_size = batch.len()))]
    async fn predict(&self, batch: &Batch) -> Result<Vec<ProbabilityVector>> {
        let flat: Vec<f64> = batch.samples().iter().flatten().copied().collect();
        let input = Tensor::from_vec(flat, (batch.len(), NUM_FEATURES), &self.device)?;

        let probs = self
            .forward(&input)
            .context("linear decision function")?;
        probability_rows(self.name(), &probs)
    }
}
