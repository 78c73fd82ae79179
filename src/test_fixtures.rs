//! Deterministic in-memory engines and inputs shared by the unit and router tests.

use anyhow::{Result, bail};
use async_trait::async_trait;
use candle_core::{Device, Tensor};
use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatch::Engines;
use crate::engine::Engine;
use crate::labels::LabelRegistry;
use crate::linear_engine::{LinearEngine, LinearWeights, MultiClass};
use crate::network_engine::{HIDDEN_SIZE, NetworkEngine};
use crate::types::{Batch, NUM_CLASSES, NUM_FEATURES, ProbabilityVector};

/// The eight samples used throughout the service's acceptance tests.
pub const CRYSTAL_DATA: [[f64; 4]; 8] = [
    [0.92, 0.12, 0.31, 0.09],
    [0.31, 0.112, 0.311, 0.09],
    [0.9212, 0.1112, 0.931, 0.409],
    [0.43921, 0.1222, 0.22, 0.0911],
    [0.93, 0.122, 0.311, 0.12],
    [0.64, 0.51, 0.92312, 0.329],
    [0.32, 0.32, 0.7312, 0.43],
    [0.90, 0.124, 0.131, 0.12],
];

pub fn sample_batch() -> Batch {
    Batch::new(CRYSTAL_DATA.to_vec()).unwrap()
}

pub fn labels() -> LabelRegistry {
    LabelRegistry::new(vec!["blue".into(), "green".into(), "yellow".into()]).unwrap()
}

pub fn linear_weights() -> LinearWeights {
    LinearWeights {
        coef: vec![
            vec![2.1, -1.3, -3.2, -1.4],
            vec![-0.4, 0.9, 0.1, -0.6],
            vec![-1.7, 0.4, 3.1, 2.0],
        ],
        intercept: vec![0.3, 1.2, -1.5],
        multi_class: MultiClass::Multinomial,
    }
}

pub fn linear_engine() -> LinearEngine {
    LinearEngine::from_weights(linear_weights()).unwrap()
}

fn pseudo_random(rows: usize, cols: usize, seed: usize) -> Vec<f32> {
    (0..rows * cols)
        .map(|i| {
            let v = (i * 7919 + seed * 104_729) % 1000;
            (v as f32 / 1000.0 - 0.5) * 0.8
        })
        .collect()
}

fn layer(tensors: &mut HashMap<String, Tensor>, name: &str, out: usize, inp: usize, seed: usize) {
    let weight = Tensor::from_vec(pseudo_random(out, inp, seed), (out, inp), &Device::Cpu).unwrap();
    let bias = Tensor::from_vec(pseudo_random(1, out, seed + 1), out, &Device::Cpu).unwrap();
    tensors.insert(format!("{name}.weight"), weight);
    tensors.insert(format!("{name}.bias"), bias);
}

pub fn network_tensors() -> HashMap<String, Tensor> {
    let mut tensors = HashMap::new();
    layer(&mut tensors, "layer1", HIDDEN_SIZE, NUM_FEATURES, 1);
    layer(&mut tensors, "layer2", HIDDEN_SIZE, HIDDEN_SIZE, 3);
    layer(&mut tensors, "layer3", NUM_CLASSES, HIDDEN_SIZE, 5);
    tensors
}

pub fn network_engine() -> NetworkEngine {
    NetworkEngine::from_tensors(network_tensors(), Device::Cpu).unwrap()
}

/// Returns the same vector for every sample.
pub struct FixedEngine(pub ProbabilityVector);

#[async_trait]
impl Engine for FixedEngine {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn num_classes(&self) -> usize {
        NUM_CLASSES
    }

    async fn predict(&self, batch: &Batch) -> Result<Vec<ProbabilityVector>> {
        Ok(vec![self.0; batch.len()])
    }
}

pub struct FailingEngine;

#[async_trait]
impl Engine for FailingEngine {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn num_classes(&self) -> usize {
        NUM_CLASSES
    }

    async fn predict(&self, _batch: &Batch) -> Result<Vec<ProbabilityVector>> {
        bail!("matmul shape mismatch")
    }
}

pub fn engines() -> Engines {
    Engines::new(Arc::new(linear_engine()), Arc::new(network_engine()))
}
