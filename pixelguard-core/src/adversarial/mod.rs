//! Adversarial perturbation against automated image recognition.
//!
//! - [`classifier`]: the frozen-model capability, a reference linear model,
//!   the config-driven factory and the load/shutdown service.
//! - [`tensor`]: the small amount of tensor plumbing the attack needs.
//! - [`perturb`]: the FGSM-style perturber and its robustness score.

pub mod classifier;
pub mod perturb;
pub mod tensor;

pub use classifier::{
    ClassifierConfig, ClassifierFactory, ClassifierService, ImageClassifier, LinearClassifier,
    DEFAULT_INPUT_SIZE, DEFAULT_NUM_CLASSES, DEFAULT_SEED,
};
pub use perturb::{
    crop_resize, map_epsilon, robustness_score, AdversarialPerturber, Normalization,
    PerturbationResult, DEFAULT_EPSILON, MAX_SCALED_EPSILON,
};
pub use tensor::Tensor;
