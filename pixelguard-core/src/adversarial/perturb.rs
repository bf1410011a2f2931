//! Single-step (FGSM-style) adversarial perturbation.
//!
//! # Algorithm
//!
//! 1. Take the centred square that survives resizing the shorter side to
//!    `input_size * 256 / 224` and cropping to `input_size`, resample it with
//!    a triangle filter, normalize with ImageNet mean/std.
//! 2. Forward pass; the top class becomes the attack target.
//! 3. One backward pass for the cross-entropy gradient w.r.t. the input.
//! 4. Score: re-run the classifier on `input + eps * sign(grad)` and measure
//!    the relative drop of the target class probability.
//! 5. Output: upsample the gradient to the original resolution, take its sign,
//!    add `eps * sign` to the `[0, 1]` image and quantize back to 8 bits.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use tracing::{debug, info, warn};

use super::classifier::ImageClassifier;
use super::tensor::Tensor;
use crate::error::{PixelGuardError, Result};
use crate::pixel::PixelBuffer;

/// Epsilon reached at the top of the 0-100 strength scale.
pub const MAX_SCALED_EPSILON: f32 = 0.05;

/// Default perturbation strength.
pub const DEFAULT_EPSILON: f32 = 0.01;

/// Per-channel normalization constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalization {
    pub const IMAGENET: Self = Self {
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
    };
}

impl Default for Normalization {
    fn default() -> Self {
        Self::IMAGENET
    }
}

/// Map a caller-supplied strength to epsilon.
///
/// Values up to 1.0 are taken as epsilon directly; larger values are read as a
/// 0-100 scale mapped linearly onto `[0, 0.05]`. Applying it twice is harmless.
pub fn map_epsilon(raw: f32) -> Result<f32> {
    if !raw.is_finite() || raw < 0.0 {
        return Err(PixelGuardError::InvalidEpsilon(raw));
    }
    if raw <= 1.0 {
        Ok(raw)
    } else {
        Ok(raw / 100.0 * MAX_SCALED_EPSILON)
    }
}

/// Output of [`AdversarialPerturber::protect`].
#[derive(Debug, Clone)]
pub struct PerturbationResult {
    /// Perturbed image at the input's resolution.
    pub image: PixelBuffer,
    /// Relative drop of the target class confidence, in percent `[0, 100]`.
    pub robustness_score: f32,
    pub epsilon: f32,
    pub target_class: usize,
    pub original_confidence: f32,
    pub adversarial_confidence: f32,
}

/// Applies an imperceptible perturbation against a shared frozen classifier.
#[derive(Clone)]
pub struct AdversarialPerturber {
    classifier: Arc<dyn ImageClassifier>,
    normalization: Normalization,
}

impl AdversarialPerturber {
    pub fn new(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self {
            classifier,
            normalization: Normalization::default(),
        }
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn classifier(&self) -> &Arc<dyn ImageClassifier> {
        &self.classifier
    }

    /// Resize, centre-crop and normalize `image` for the classifier.
    pub fn preprocess(&self, image: &PixelBuffer) -> Result<Tensor> {
        let size = self.classifier.input_size();
        let cropped = crop_resize(image, size, size * 256 / 224)?;

        let mut tensor = Tensor::from_pixels(&cropped);
        tensor.normalize(&self.normalization.mean, &self.normalization.std);
        Ok(tensor)
    }

    fn checked_forward(&self, input: &Tensor) -> Result<Vec<f32>> {
        let probs = self.classifier.forward(input)?;
        if probs.len() != self.classifier.num_classes() {
            return Err(PixelGuardError::ModelInference(format!(
                "classifier returned {} probabilities for {} classes",
                probs.len(),
                self.classifier.num_classes()
            )));
        }
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(PixelGuardError::ModelInference(
                "classifier returned non-finite probabilities".into(),
            ));
        }
        Ok(probs)
    }

    /// Perturb `image` and score the effect on the classifier.
    ///
    /// `epsilon` goes through [`map_epsilon`] first. Any classifier failure
    /// aborts the call; no partially perturbed image is returned.
    pub fn protect(&self, image: &PixelBuffer, epsilon: f32) -> Result<PerturbationResult> {
        let epsilon = map_epsilon(epsilon)?;

        let input = self.preprocess(image)?;
        input.ensure_shape(self.classifier.input_shape())?;

        let probs = self.checked_forward(&input)?;
        let (target_class, &original_confidence) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .ok_or_else(|| PixelGuardError::ModelInference("classifier has no classes".into()))?;

        let gradient = self.classifier.loss_gradient(&input, target_class)?;
        gradient.ensure_shape(input.shape())?;
        if !gradient.is_finite() {
            return Err(PixelGuardError::ModelInference(
                "gradient contains non-finite values".into(),
            ));
        }

        let adversarial = input.scaled_add(&gradient.sign(), epsilon)?;
        let adversarial_confidence = self.checked_forward(&adversarial)?[target_class];
        let robustness_score = robustness_score(original_confidence, adversarial_confidence);

        debug!(
            target_class,
            original_confidence, adversarial_confidence, "Scored perturbation"
        );

        let (width, height) = (image.width() as usize, image.height() as usize);
        let full_sign = gradient.resize_bilinear(height, width).sign();
        let protected = Tensor::from_pixels(image)
            .scaled_add(&full_sign, epsilon)?
            .to_pixels()?;

        info!(
            width,
            height,
            epsilon,
            robustness_score,
            "Applied adversarial perturbation"
        );

        Ok(PerturbationResult {
            image: protected,
            robustness_score,
            epsilon,
            target_class,
            original_confidence,
            adversarial_confidence,
        })
    }
}

/// Centre-crop and resample `image` to `size x size`.
///
/// Equivalent to resizing the shorter side to `resize_to` and cropping the
/// centred `size` window, but only the source square that survives the crop
/// is resampled, so memory is bounded by the input and `size^2` regardless
/// of aspect ratio.
pub fn crop_resize(image: &PixelBuffer, size: usize, resize_to: usize) -> Result<PixelBuffer> {
    let target = u32::try_from(size)
        .ok()
        .filter(|&t| t > 0 && size <= resize_to)
        .ok_or_else(|| {
            PixelGuardError::ModelInference(format!("unsupported classifier input size {size}"))
        })?;

    let (width, height) = (image.width(), image.height());
    let short = width.min(height);
    let side = ((f64::from(short) * size as f64 / resize_to as f64).round() as u32).clamp(1, short);
    let (left, top) = ((width - side) / 2, (height - side) / 2);

    let source = image.to_rgb_image();
    let window = imageops::crop_imm(&source, left, top, side, side).to_image();
    let resized = imageops::resize(&window, target, target, FilterType::Triangle);

    debug!(width, height, side, size, "Cropped classifier input");
    PixelBuffer::try_from(resized)
}

/// `max(0, (orig - adv) / orig) * 100`, clamped to `[0, 100]`.
pub fn robustness_score(original_confidence: f32, adversarial_confidence: f32) -> f32 {
    if original_confidence <= 0.0 {
        warn!("Original confidence is zero, robustness score defaults to 0");
        return 0.0;
    }
    let drop = (original_confidence - adversarial_confidence) / original_confidence;
    (drop.max(0.0) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adversarial::classifier::LinearClassifier;

    fn perturber(input_size: usize) -> AdversarialPerturber {
        let model = LinearClassifier::seeded(input_size, 4, 11).unwrap();
        AdversarialPerturber::new(Arc::new(model))
    }

    fn test_image(width: u32, height: u32) -> PixelBuffer {
        let samples = (0..width as usize * height as usize * 3)
            .map(|i| (64 + (i * 13) % 128) as u8)
            .collect();
        PixelBuffer::new(width, height, samples).unwrap()
    }

    #[test]
    fn test_map_epsilon() {
        assert_eq!(map_epsilon(0.01).unwrap(), 0.01);
        assert_eq!(map_epsilon(1.0).unwrap(), 1.0);
        assert!((map_epsilon(50.0).unwrap() - 0.025).abs() < 1e-7);
        assert!((map_epsilon(100.0).unwrap() - 0.05).abs() < 1e-7);
        assert!(map_epsilon(-0.1).is_err());
        assert!(map_epsilon(f32::NAN).is_err());
    }

    #[test]
    fn test_robustness_score_bounds() {
        assert_eq!(robustness_score(0.8, 0.4), 50.0);
        assert_eq!(robustness_score(0.5, 0.9), 0.0);
        assert_eq!(robustness_score(0.0, 0.1), 0.0);
        assert_eq!(robustness_score(0.5, 0.0), 100.0);
    }

    #[test]
    fn test_preprocess_shape() {
        let p = perturber(16);
        let tensor = p.preprocess(&test_image(40, 25)).unwrap();
        assert_eq!(tensor.shape(), [3, 16, 16]);
    }

    #[test]
    fn test_crop_resize_takes_centre_square() {
        // Left third red, middle third green, right third blue.
        let (width, height) = (48u32, 16u32);
        let samples = (0..width * height)
            .flat_map(|i| match (i % width) * 3 / width {
                0 => [255, 0, 0],
                1 => [0, 255, 0],
                _ => [0, 0, 255],
            })
            .collect();
        let image = PixelBuffer::new(width, height, samples).unwrap();

        let crop = crop_resize(&image, 8, 9).unwrap();
        assert_eq!((crop.width(), crop.height()), (8, 8));
        for pixel in crop.samples().chunks_exact(3) {
            assert!(pixel[0] <= 2 && pixel[1] >= 253 && pixel[2] <= 2, "{pixel:?}");
        }
    }

    #[test]
    fn test_crop_resize_filters_when_downscaling() {
        // A one-pixel checkerboard must average out rather than alias.
        let samples = (0..128u32 * 128)
            .flat_map(|i| {
                let v = if (i % 128 + i / 128) % 2 == 0 { 0 } else { 255 };
                [v, v, v]
            })
            .collect();
        let image = PixelBuffer::new(128, 128, samples).unwrap();

        let crop = crop_resize(&image, 16, 18).unwrap();
        for &sample in crop.samples() {
            assert!((96..=160).contains(&sample), "aliased sample {sample}");
        }
    }

    #[test]
    fn test_extreme_aspect_ratio_stays_bounded() {
        // Resizing the whole strip first would need a 1_024_000 x 256 tensor.
        let image = test_image(1, 4000);
        let crop = crop_resize(&image, 224, 256).unwrap();
        assert_eq!((crop.width(), crop.height()), (224, 224));

        let p = perturber(32);
        assert_eq!(p.preprocess(&image).unwrap().shape(), [3, 32, 32]);
        let result = p.protect(&image, 0.01).unwrap();
        assert_eq!((result.image.width(), result.image.height()), (1, 4000));
    }

    #[test]
    fn test_crop_resize_rejects_zero_size() {
        assert!(crop_resize(&test_image(8, 8), 0, 0).is_err());
    }

    #[test]
    fn test_protect_keeps_resolution() {
        let p = perturber(16);
        let image = test_image(37, 23);
        let result = p.protect(&image, 0.02).unwrap();
        let protected = result.image;
        assert_eq!((protected.width(), protected.height()), (37, 23));
        assert!((0.0..=100.0).contains(&result.robustness_score));
    }

    #[test]
    fn test_protect_bounds_pixel_change() {
        let p = perturber(16);
        let image = test_image(32, 32);
        let result = p.protect(&image, 0.02).unwrap();
        let protected = result.image;
        // 0.02 * 255 = 5.1 levels, plus rounding.
        for (a, b) in image.samples().iter().zip(protected.samples()) {
            assert!((*a as i32 - *b as i32).abs() <= 6);
        }
        assert_ne!(protected, image);
    }

    #[test]
    fn test_zero_epsilon_is_identity() {
        let p = perturber(16);
        let image = test_image(20, 20);
        let result = p.protect(&image, 0.0).unwrap();
        assert_eq!(result.image, image);
        assert_eq!(result.robustness_score, 0.0);
    }

    #[test]
    fn test_scaled_epsilon_is_mapped() {
        let p = perturber(16);
        let result = p.protect(&test_image(20, 20), 40.0).unwrap();
        assert!((result.epsilon - 0.02).abs() < 1e-7);
    }

    #[test]
    fn test_invalid_epsilon_rejected() {
        let p = perturber(16);
        assert!(matches!(
            p.protect(&test_image(20, 20), -1.0),
            Err(PixelGuardError::InvalidEpsilon(_))
        ));
    }
}
