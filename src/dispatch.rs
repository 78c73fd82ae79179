use anyhow::{Result, bail};
use std::sync::Arc;

use crate::engine::Engine;
use crate::labels::LabelRegistry;
use crate::types::BackendSelector;

pub type SharedEngine = Arc<dyn Engine + Send + Sync>;

/// The two loaded backends. Built once at startup, read-only afterwards.
#[derive(Clone)]
pub struct Engines {
    linear: SharedEngine,
    network: SharedEngine,
}

impl Engines {
    pub fn new(linear: SharedEngine, network: SharedEngine) -> Self {
        Self { linear, network }
    }

    /// Infallible: the selector has already been validated.
    pub fn select(&self, backend: BackendSelector) -> &SharedEngine {
        match backend {
            BackendSelector::Sklearn => &self.linear,
            BackendSelector::Pytorch => &self.network,
        }
    }

    /// Every engine must score exactly one class per configured label.
    pub fn check_labels(&self, labels: &LabelRegistry) -> Result<()> {
        for engine in [&self.linear, &self.network] {
            if engine.num_classes() != labels.len() {
                bail!(
                    "{} engine scores {} classes but {} labels are configured",
                    engine.name(),
                    engine.num_classes(),
                    labels.len()
                );
            }
        }
        Ok(())
    }
}
