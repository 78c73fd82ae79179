use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::ops::softmax;
use candle_nn::{Linear, VarBuilder, linear};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::engine::{Engine, probability_rows};
use crate::types::{Batch, NUM_CLASSES, NUM_FEATURES, ProbabilityVector};

/// Width of both hidden layers.
pub const HIDDEN_SIZE: usize = 50;

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub model_path: PathBuf,
    pub use_pth: bool,
    pub cpu: bool,
}

/// The "pytorch" backend: a 4 -> 50 -> 50 -> 3 feed-forward network with
/// ReLU activations and a softmax head.
///
/// Weights are named after the module that trained them:
/// `layer1.weight`, `layer1.bias`, ..., `layer3.bias`.
pub struct NetworkEngine {
    layer1: Linear,
    layer2: Linear,
    layer3: Linear,
    device: Device,
}

impl NetworkEngine {
    fn device(cpu: bool) -> Result<Device> {
        if cpu {
            Ok(Device::Cpu)
        } else if metal_is_available() {
            tracing::info!("Using metal acceleration");
            Ok(Device::new_metal(0)?)
        } else if cuda_is_available() {
            tracing::info!("Using CUDA GPU acceleration");
            Ok(Device::new_cuda(0)?)
        } else {
            tracing::info!(
                "CUDA not available, running on CPU. To run on GPU, build with `--features cuda`"
            );
            Ok(Device::Cpu)
        }
    }

    #[tracing::instrument(skip(config), fields(model_path = %config.model_path.display(), cpu = config.cpu))]
    pub fn new(config: NetworkConfig) -> Result<Self> {
        let device = Self::device(config.cpu)?;

        if !config.model_path.is_file() {
            bail!(
                "Network model file {} does not exist.",
                config.model_path.display()
            );
        }

        let vb = if config.use_pth {
            VarBuilder::from_pth(&config.model_path, DType::F32, &device)?
        } else {
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[&config.model_path], DType::F32, &device)?
            }
        };

        let engine = Self::load(vb, device)
            .with_context(|| format!("loading network model {}", config.model_path.display()))?;
        tracing::info!("Network model loaded");
        Ok(engine)
    }

    /// Builds the network from already materialized tensors.
    pub fn from_tensors(tensors: HashMap<String, Tensor>, device: Device) -> Result<Self> {
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
        Self::load(vb, device)
    }

    fn load(vb: VarBuilder, device: Device) -> Result<Self> {
        // `linear` checks each tensor's shape, so a head that is not
        // NUM_CLASSES wide is rejected here rather than per request.
        let layer1 = linear(NUM_FEATURES, HIDDEN_SIZE, vb.pp("layer1"))?;
        let layer2 = linear(HIDDEN_SIZE, HIDDEN_SIZE, vb.pp("layer2"))?;
        let layer3 = linear(HIDDEN_SIZE, NUM_CLASSES, vb.pp("layer3"))?;
        Ok(Self {
            layer1,
            layer2,
            layer3,
            device,
        })
    }

    fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        let hidden = self.layer1.forward(input)?.relu()?;
        let hidden = self.layer2.forward(&hidden)?.relu()?;
        let logits = self.layer3.forward(&hidden)?;
        softmax(&logits, 1)
    }
}

#[async_trait]
impl Engine for NetworkEngine {
    fn name(&self) -> &'static str {
        "network"
    }

    fn num_classes(&self) -> usize {
        self.layer3.weight().dims()[0]
    }

    #[tracing::instrument(skip(self, batch), fields(batch_size = batch.len()))]
    async fn predict(&self, batch: &Batch) -> Result<Vec<ProbabilityVector>> {
        let flat: Vec<f32> = batch
            .samples()
            .iter()
            .flat_map(|sample| sample.iter().map(|&x| x as f32))
            .collect();
        let input = Tensor::from_vec(flat, (batch.len(), NUM_FEATURES), &self.device)?;

        let probs = self
            .forward(&input)
            .context("network forward pass")?;
        probability_rows(self.name(), &probs)
    }
}
