//! PixelGuard Core - image protection engine
//!
//! This crate protects decoded RGB images in two ways and later proves or
//! disproves that protection.
//!
//! # Features
//!
//! - Invisible ownership watermark in pixel least-significant bits
//! - Verification verdicts with confidence and tamper classification
//! - Single-step adversarial perturbation with a robustness score
//! - Record store capability for attributing extracted identifiers
//!
//! Image decoding and encoding stay with the caller; everything here works on
//! a [`PixelBuffer`].
//!
//! # Example
//!
//! ```
//! use pixelguard_core::{classify, embed, extract, PixelBuffer, TamperStatus};
//!
//! # fn example() -> pixelguard_core::Result<()> {
//! let image = PixelBuffer::filled(64, 64, [200, 120, 40])?;
//! let marked = embed(&image, "user-42", 5)?;
//!
//! let extraction = extract(&marked.image);
//! assert_eq!(extraction.text, "user-42");
//!
//! let verdict = classify(&extraction, None);
//! assert_eq!(verdict.tamper_status, TamperStatus::Intact);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod adversarial;
pub mod error;
pub mod pixel;
pub mod store;
pub mod verify;
pub mod watermark;

// Re-export main types for convenience
pub use adversarial::{
    map_epsilon, AdversarialPerturber, ClassifierConfig, ClassifierFactory, ClassifierService,
    ImageClassifier, LinearClassifier, PerturbationResult, Tensor,
};
pub use error::{PixelGuardError, Result};
pub use pixel::PixelBuffer;
pub use store::{image_hash, InMemoryRecordStore, RecordStore, WatermarkRecord};
pub use verify::{classify, detect, DetectionReport, TamperStatus, VerificationVerdict, Verifier};
pub use watermark::{embed, extract, EmbeddedWatermark, ExtractionResult, UNKNOWN_TEXT};
