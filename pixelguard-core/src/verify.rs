//! Verification verdicts for extracted watermarks.
//!
//! [`classify`] is a pure, total mapping from an [`ExtractionResult`] and an
//! optional stored record to a [`VerificationVerdict`]. The confidence and
//! tamper status come from a fixed piecewise function of the match ratio,
//! branching first on whether the watermark counts as found.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::pixel::PixelBuffer;
use crate::store::{RecordStore, WatermarkRecord};
use crate::watermark::{extract, ExtractionResult};

/// Match ratio above which an extraction alone counts as a found watermark.
pub const FOUND_RATIO_THRESHOLD: f64 = 0.5;

/// Tamper classification of a verified image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TamperStatus {
    Intact,
    Modified,
    NoWatermark,
}

impl fmt::Display for TamperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intact => write!(f, "intact"),
            Self::Modified => write!(f, "modified"),
            Self::NoWatermark => write!(f, "no_watermark"),
        }
    }
}

/// Result of verifying one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub found: bool,
    pub owner_id: Option<String>,
    /// Confidence in percent, always within `0..=100`.
    pub confidence: u8,
    pub tamper_status: TamperStatus,
    pub extracted_text: String,
    pub match_ratio: f64,
}

/// Classify an extraction, optionally backed by a stored record.
pub fn classify(
    extraction: &ExtractionResult,
    record: Option<&WatermarkRecord>,
) -> VerificationVerdict {
    let ratio = extraction.match_ratio;
    let has_text = !extraction.is_unknown();

    let found = record.is_some() || (ratio > FOUND_RATIO_THRESHOLD && has_text);

    let owner_id = match record {
        Some(record) => Some(record.owner_id.clone()),
        None if has_text => Some(extraction.text.clone()),
        None => None,
    };

    let (raw_confidence, tamper_status) = if found {
        if ratio > 0.9 {
            (90.0 + (ratio - 0.9) * 100.0, TamperStatus::Intact)
        } else if ratio > 0.7 {
            (60.0 + (ratio - 0.7) * 100.0, TamperStatus::Modified)
        } else {
            (40.0 + ratio * 100.0, TamperStatus::Modified)
        }
    } else if ratio > 0.4 {
        (20.0 + ratio * 80.0, TamperStatus::Modified)
    } else {
        (ratio * 40.0, TamperStatus::NoWatermark)
    };

    VerificationVerdict {
        found,
        owner_id,
        confidence: clamp_confidence(raw_confidence),
        tamper_status,
        extracted_text: extraction.text.clone(),
        match_ratio: ratio,
    }
}

/// Truncate toward zero, then clamp into `0..=100`. NaN maps to 0.
fn clamp_confidence(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.trunc().clamp(0.0, 100.0) as u8
}

/// Answer to "does this image already carry a watermark?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub has_watermark: bool,
    /// Extracted identifier, empty when no watermark was detected.
    pub extracted_text: String,
    pub match_ratio: f64,
    pub message: String,
}

/// Decide whether an image is already watermarked, e.g. to refuse re-watermarking.
pub fn detect(extraction: &ExtractionResult, record: Option<&WatermarkRecord>) -> DetectionReport {
    let has_text = !extraction.is_unknown();
    let has_watermark =
        (extraction.match_ratio > FOUND_RATIO_THRESHOLD && has_text) || record.is_some();

    let message = if has_watermark {
        let owner = if has_text {
            extraction.text.as_str()
        } else {
            record.map_or(crate::watermark::UNKNOWN_TEXT, |r| r.owner_id.as_str())
        };
        format!("Image already contains a watermark. Owner ID: {owner}. Cannot re-watermark.")
    } else {
        "Image is clean and ready to be watermarked.".to_string()
    };

    DetectionReport {
        has_watermark,
        extracted_text: if has_watermark {
            extraction.text.clone()
        } else {
            String::new()
        },
        match_ratio: extraction.match_ratio,
        message,
    }
}

/// Extract, look up and classify against a shared record store.
pub struct Verifier {
    store: Arc<dyn RecordStore>,
}

impl Verifier {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    fn lookup(&self, extraction: &ExtractionResult, image_hash: &str) -> Option<WatermarkRecord> {
        if extraction.is_unknown() {
            return None;
        }
        let record = self
            .store
            .find_by_owner_and_hash(&extraction.text, image_hash);
        debug!(owner = %extraction.text, matched = record.is_some(), "Record lookup");
        record
    }

    /// Verify `image`, whose encoded form hashes to `image_hash`.
    pub fn verify(&self, image: &PixelBuffer, image_hash: &str) -> VerificationVerdict {
        let extraction = extract(image);
        let record = self.lookup(&extraction, image_hash);
        let verdict = classify(&extraction, record.as_ref());

        info!(
            found = verdict.found,
            confidence = verdict.confidence,
            tamper_status = %verdict.tamper_status,
            "Verification complete"
        );
        verdict
    }

    pub fn detect(&self, image: &PixelBuffer, image_hash: &str) -> DetectionReport {
        let extraction = extract(image);
        let record = self.lookup(&extraction, image_hash);
        detect(&extraction, record.as_ref())
    }
}
