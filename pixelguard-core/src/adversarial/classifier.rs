//! Frozen image classifier capability.
//!
//! The perturber only needs two things from a model: class probabilities for
//! an input and the gradient of the cross-entropy loss with respect to that
//! input. [`ImageClassifier`] captures exactly that, so the attack can run
//! against any backend, including the in-crate [`LinearClassifier`].
//!
//! ## Lifecycle
//!
//! A model is loaded once through [`ClassifierService::load`] and shared
//! read-only behind an `Arc`. Nothing mutates it after loading.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use tracing::{debug, info};

use super::perturb::AdversarialPerturber;
use super::tensor::Tensor;
use crate::error::{PixelGuardError, Result};
use crate::pixel::CHANNELS;

/// Input edge length used by ImageNet-style classifiers.
pub const DEFAULT_INPUT_SIZE: usize = 224;

/// Class count of the seeded reference model.
pub const DEFAULT_NUM_CLASSES: usize = 10;

/// Seed of the default reference model.
pub const DEFAULT_SEED: u64 = 0x5049_5845_4C47_5244;

/// Largest weight count a seeded model may allocate.
pub const MAX_SEEDED_PARAMETERS: usize = 1 << 28;

/// Trait for frozen image classifiers.
///
/// Implementations must be thread-safe (`Send + Sync`) and must not keep
/// mutable state between calls: concurrent forward/backward passes on
/// different inputs are expected.
pub trait ImageClassifier: Send + Sync {
    /// Edge length of the square `[3, size, size]` normalized input.
    fn input_size(&self) -> usize;

    fn num_classes(&self) -> usize;

    /// Softmax class probabilities for a normalized input.
    fn forward(&self, input: &Tensor) -> Result<Vec<f32>>;

    /// Gradient of `cross_entropy(forward(input), target_class)` w.r.t. `input`.
    fn loss_gradient(&self, input: &Tensor, target_class: usize) -> Result<Tensor>;

    fn input_shape(&self) -> [usize; 3] {
        [CHANNELS, self.input_size(), self.input_size()]
    }
}

/// Softmax regression over the flattened input.
///
/// The gradient is exact, which makes this a convenient stand-in for a deep
/// network wherever the surrounding plumbing is under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClassifier {
    input_size: usize,
    num_classes: usize,
    /// Row-major `num_classes x (3 * input_size^2)`.
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl LinearClassifier {
    pub fn new(
        input_size: usize,
        num_classes: usize,
        weights: Vec<f32>,
        bias: Vec<f32>,
    ) -> Result<Self> {
        let model = Self {
            input_size,
            num_classes,
            weights,
            bias,
        };
        model.validate()?;
        Ok(model)
    }

    /// Deterministic weights drawn from a SHAKE256 stream over `seed`.
    ///
    /// Weights are uniform in `[-1, 1] / sqrt(dim)` so logits stay O(1) for
    /// normalized inputs.
    pub fn seeded(input_size: usize, num_classes: usize, seed: u64) -> Result<Self> {
        let dim = input_dim(input_size)?;
        let count = weight_count(input_size, num_classes)?;
        if count > MAX_SEEDED_PARAMETERS {
            return Err(PixelGuardError::Serialization(format!(
                "seeded model would need {count} weights, limit is {MAX_SEEDED_PARAMETERS}"
            )));
        }
        let mut xof = Shake256::default();
        xof.update(&seed.to_le_bytes());
        xof.update(b"pixelguard-linear-classifier");
        let mut reader = xof.finalize_xof();

        let scale = 1.0 / (dim as f32).sqrt();
        let mut next = || {
            let mut buf = [0u8; 4];
            reader.read(&mut buf);
            let unit = u32::from_le_bytes(buf) as f64 / u32::MAX as f64;
            (unit * 2.0 - 1.0) as f32
        };

        let weights = (0..count).map(|_| next() * scale).collect();
        let bias = (0..num_classes).map(|_| next() * 0.1).collect();

        debug!(input_size, num_classes, seed, "Generated seeded linear classifier");
        Self::new(input_size, num_classes, weights, bias)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let model: Self = ciborium::from_reader(bytes)
            .map_err(|e| PixelGuardError::Serialization(format!("Invalid model file: {e}")))?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| PixelGuardError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            PixelGuardError::ModelInference(format!(
                "Failed to read model {}: {e}",
                path.display()
            ))
        })?;
        Self::from_cbor(&bytes)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_cbor()?)
            .map_err(|e| PixelGuardError::Serialization(format!("Failed to write model: {e}")))
    }

    fn dim(&self) -> Result<usize> {
        input_dim(self.input_size)
    }

    fn validate(&self) -> Result<()> {
        if self.input_size == 0 || self.num_classes == 0 {
            return Err(PixelGuardError::Serialization(
                "model needs a non-zero input size and class count".into(),
            ));
        }
        let expected = weight_count(self.input_size, self.num_classes)?;
        if self.weights.len() != expected || self.bias.len() != self.num_classes {
            return Err(PixelGuardError::Serialization(format!(
                "model parameters do not match {} classes over {} inputs",
                self.num_classes,
                self.dim()?
            )));
        }
        Ok(())
    }

    fn probabilities(&self, input: &Tensor) -> Result<Vec<f32>> {
        let dim = self.dim()?;
        input.ensure_shape(self.input_shape())?;
        let x = input.data();

        let logits: Vec<f32> = self
            .weights
            .chunks_exact(dim)
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f32>() + b)
            .collect();

        softmax(&logits)
    }
}

impl ImageClassifier for LinearClassifier {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn forward(&self, input: &Tensor) -> Result<Vec<f32>> {
        self.probabilities(input)
    }

    fn loss_gradient(&self, input: &Tensor, target_class: usize) -> Result<Tensor> {
        if target_class >= self.num_classes {
            return Err(PixelGuardError::ModelInference(format!(
                "target class {target_class} out of range for {} classes",
                self.num_classes
            )));
        }

        // d CE / d x = sum_k (p_k - [k == target]) * w_k
        let dim = self.dim()?;
        let probs = self.probabilities(input)?;
        let mut grad = vec![0.0f32; dim];
        for (k, row) in self.weights.chunks_exact(dim).enumerate() {
            let coeff = probs[k] - if k == target_class { 1.0 } else { 0.0 };
            for (g, w) in grad.iter_mut().zip(row) {
                *g += coeff * w;
            }
        }

        Tensor::from_vec(self.input_shape(), grad)
    }
}

/// Flattened input length `3 * input_size^2`. Zero and overflow are errors.
fn input_dim(input_size: usize) -> Result<usize> {
    input_size
        .checked_mul(input_size)
        .and_then(|n| n.checked_mul(CHANNELS))
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            PixelGuardError::Serialization(format!("input size {input_size} is out of range"))
        })
}

/// Total weight count `num_classes * 3 * input_size^2`.
fn weight_count(input_size: usize, num_classes: usize) -> Result<usize> {
    input_dim(input_size)?.checked_mul(num_classes).ok_or_else(|| {
        PixelGuardError::Serialization(format!(
            "{num_classes} classes over input size {input_size} overflow the weight count"
        ))
    })
}

fn softmax(logits: &[f32]) -> Result<Vec<f32>> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return Err(PixelGuardError::ModelInference(
            "non-finite logits".into(),
        ));
    }
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    Ok(exps.into_iter().map(|e| e / total).collect())
}

/// Configuration for creating classifiers.
#[derive(Debug, Clone)]
pub enum ClassifierConfig {
    /// CBOR-serialized [`LinearClassifier`] on disk.
    File(PathBuf),

    /// Deterministic reference model generated from a seed.
    Seeded {
        input_size: usize,
        num_classes: usize,
        seed: u64,
    },
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::Seeded {
            input_size: DEFAULT_INPUT_SIZE,
            num_classes: DEFAULT_NUM_CLASSES,
            seed: DEFAULT_SEED,
        }
    }
}

/// Factory for creating classifiers.
pub struct ClassifierFactory;

impl ClassifierFactory {
    pub fn create(config: ClassifierConfig) -> Result<Arc<dyn ImageClassifier>> {
        match config {
            ClassifierConfig::File(path) => {
                let model = LinearClassifier::load(&path)?;
                info!(path = %path.display(), "Loaded classifier from file");
                Ok(Arc::new(model))
            }
            ClassifierConfig::Seeded {
                input_size,
                num_classes,
                seed,
            } => {
                let model = LinearClassifier::seeded(input_size, num_classes, seed)?;
                info!(input_size, num_classes, "Created seeded reference classifier");
                Ok(Arc::new(model))
            }
        }
    }
}

/// Owns the process-wide classifier between load and shutdown.
pub struct ClassifierService {
    classifier: Arc<dyn ImageClassifier>,
}

impl ClassifierService {
    /// Load the classifier. Call once per process and share the service.
    pub fn load(config: ClassifierConfig) -> Result<Self> {
        let classifier = ClassifierFactory::create(config)?;
        Ok(Self { classifier })
    }

    /// Wrap an already constructed classifier.
    pub fn from_classifier(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> Arc<dyn ImageClassifier> {
        Arc::clone(&self.classifier)
    }

    /// A perturber sharing this service's classifier.
    pub fn perturber(&self) -> AdversarialPerturber {
        AdversarialPerturber::new(self.classifier())
    }

    /// Release the service's handle. Perturbers created earlier keep the model
    /// alive until they are dropped.
    pub fn shutdown(self) {
        info!(
            outstanding = Arc::strong_count(&self.classifier) - 1,
            "Classifier service shut down"
        );
    }
}
