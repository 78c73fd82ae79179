use clap::Parser;
use std::path::PathBuf;

use crate::error::LabelError;
use crate::labels::LabelRegistry;
use crate::linear_engine::LinearConfig;
use crate::network_engine::NetworkConfig;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Exported logistic regression weights (JSON)
    #[arg(long, env = "LINEAR_MODEL_PATH", default_value = "models/linear.json")]
    pub linear_model_path: PathBuf,

    /// Neural network weights (safetensors, or a PyTorch state dict with --use-pth)
    #[arg(long, env = "NETWORK_MODEL_PATH", default_value = "models/network.safetensors")]
    pub network_model_path: PathBuf,

    /// Read network weights from a PyTorch state dict instead of safetensors
    #[arg(long, env = "USE_PTH")]
    pub use_pth: bool,

    /// Run the network on CPU instead of GPU
    #[arg(long, env = "CPU_ONLY")]
    pub cpu_only: bool,

    /// Ordered class names, one per model output
    #[arg(
        long,
        env = "LABELS",
        value_delimiter = ',',
        default_value = "blue,green,yellow"
    )]
    pub labels: Vec<String>,

    /// JSON array of class names; takes precedence over --labels
    #[arg(long, env = "LABELS_PATH")]
    pub labels_path: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl From<&Config> for LinearConfig {
    fn from(config: &Config) -> Self {
        Self {
            model_path: config.linear_model_path.clone(),
        }
    }
}

impl From<&Config> for NetworkConfig {
    fn from(config: &Config) -> Self {
        Self {
            model_path: config.network_model_path.clone(),
            use_pth: config.use_pth,
            cpu: config.cpu_only,
        }
    }
}

impl Config {
    pub fn label_registry(&self) -> Result<LabelRegistry, LabelError> {
        match &self.labels_path {
            Some(path) => LabelRegistry::from_file(path),
            None => LabelRegistry::new(self.labels.clone()),
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse_from(["astromech"]);
        assert_eq!(config.server_address(), "127.0.0.1:3000");
        assert_eq!(config.labels, vec!["blue", "green", "yellow"]);
        assert!(!config.use_pth);

        let network = NetworkConfig::from(&config);
        assert_eq!(network.model_path, PathBuf::from("models/network.safetensors"));
        assert!(!network.cpu);
    }

    #[test]
    fn labels_flag_is_comma_separated() {
        let config = Config::parse_from(["astromech", "--labels", "red,green,blue"]);
        let registry = config.label_registry().unwrap();
        assert_eq!(registry.get(0), "red");
        assert_eq!(registry.get(2), "blue");

        let config = Config::parse_from(["astromech", "--labels", "red,green"]);
        assert!(config.label_registry().is_err());
    }

    #[test]
    fn labels_path_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, r#"["a", "b", "c"]"#).unwrap();

        let config = Config::parse_from([
            "astromech",
            "--labels",
            "red,green,blue",
            "--labels-path",
            path.to_str().unwrap(),
        ]);
        assert_eq!(config.label_registry().unwrap().get(0), "a");
    }
}
