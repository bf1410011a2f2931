//! CLI configuration
//!
//! Loaded from environment variables with sensible defaults. Command-line
//! flags override these values per invocation.

use std::path::PathBuf;

use pixelguard_core::adversarial::{ClassifierConfig, DEFAULT_EPSILON};

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Watermark record file (default: pixelguard-records.json)
    pub store_path: PathBuf,
    /// CBOR classifier file; the seeded reference model is used when unset
    pub model_path: Option<PathBuf>,
    /// Default watermark strength (default: 5)
    pub strength: u8,
    /// Default perturbation epsilon (default: 0.01)
    pub epsilon: f32,
    /// Largest image accepted by `protect`, in pixels (default: 40 MP)
    pub max_pixels: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("pixelguard-records.json"),
            model_path: None,
            strength: 5,
            epsilon: DEFAULT_EPSILON,
            max_pixels: 40_000_000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let store_path = std::env::var("PIXELGUARD_STORE_PATH")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        let model_path = std::env::var("PIXELGUARD_MODEL_PATH")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let strength = std::env::var("PIXELGUARD_STRENGTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.strength);

        let epsilon = std::env::var("PIXELGUARD_EPSILON")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.epsilon);

        let max_pixels = std::env::var("PIXELGUARD_MAX_PIXELS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_pixels);

        Self {
            store_path,
            model_path,
            strength,
            epsilon,
            max_pixels,
        }
    }

    /// Classifier selection derived from `model_path`
    pub fn classifier_config(&self) -> ClassifierConfig {
        match &self.model_path {
            Some(path) => ClassifierConfig::File(path.clone()),
            None => ClassifierConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.strength, 5);
        assert_eq!(config.epsilon, 0.01);
        assert!(config.model_path.is_none());
        assert_eq!(config.store_path, PathBuf::from("pixelguard-records.json"));
    }

    #[test]
    fn test_classifier_config_from_model_path() {
        let config = Config {
            model_path: Some(PathBuf::from("model.cbor")),
            ..Config::default()
        };
        assert!(matches!(
            config.classifier_config(),
            ClassifierConfig::File(path) if path == PathBuf::from("model.cbor")
        ));
        assert!(matches!(
            Config::default().classifier_config(),
            ClassifierConfig::Seeded { .. }
        ));
    }
}
