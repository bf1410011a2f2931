//! LSB watermark embedding and extraction.
//!
//! # Layout
//!
//! The payload bitstream is repeated `strength` times end to end and written
//! into the least-significant bit of consecutive samples, starting at sample 0
//! in `(row, col, channel)` order. Extraction reads the same order but only
//! inspects the first [`EXTRACTION_SCAN_LIMIT`] samples and stops at the first
//! delimiter. The repeated copies are never consulted during extraction.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::payload::{bits_to_byte, payload_bits, ByteDecoder, DecodeStep, DELIMITER};
use crate::error::{PixelGuardError, Result};
use crate::pixel::PixelBuffer;

/// Number of leading samples inspected during extraction.
pub const EXTRACTION_SCAN_LIMIT: usize = 16_000;

/// Text reported when no delimiter is found inside the scan window.
pub const UNKNOWN_TEXT: &str = "unknown";

/// Match ratio reported when a delimiter-terminated payload was decoded.
pub const FOUND_MATCH_RATIO: f64 = 1.0;

/// Match ratio reported when extraction gave up.
pub const NOT_FOUND_MATCH_RATIO: f64 = 0.1;

pub const MIN_STRENGTH: u8 = 1;
pub const MAX_STRENGTH: u8 = 10;

/// Output of [`embed`].
#[derive(Debug, Clone)]
pub struct EmbeddedWatermark {
    /// Copy of the input with the payload written into its LSBs.
    pub image: PixelBuffer,
    /// The full (repeated) bitstream that was written.
    pub bits: Vec<u8>,
}

impl EmbeddedWatermark {
    pub fn bit_length(&self) -> usize {
        self.bits.len()
    }
}

/// Output of [`extract`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    pub match_ratio: f64,
}

impl ExtractionResult {
    pub fn found(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            match_ratio: FOUND_MATCH_RATIO,
        }
    }

    pub fn unknown() -> Self {
        Self {
            text: UNKNOWN_TEXT.to_string(),
            match_ratio: NOT_FOUND_MATCH_RATIO,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.text == UNKNOWN_TEXT
    }
}

/// Number of bits [`embed`] would write for `identifier` at `strength`.
pub fn required_bits(identifier: &str, strength: u8) -> usize {
    (identifier.len() + DELIMITER.len()) * 8 * strength as usize
}

/// Embed `identifier` into the least-significant bits of a copy of `image`.
///
/// Fails with [`PixelGuardError::Capacity`] before touching any sample when
/// the repeated bitstream is longer than the number of samples.
pub fn embed(image: &PixelBuffer, identifier: &str, strength: u8) -> Result<EmbeddedWatermark> {
    if !(MIN_STRENGTH..=MAX_STRENGTH).contains(&strength) {
        return Err(PixelGuardError::InvalidStrength(strength.into()));
    }
    if identifier.is_empty() {
        return Err(PixelGuardError::InvalidIdentifier(
            "identifier must not be empty".into(),
        ));
    }

    let required = required_bits(identifier, strength);
    let available = image.len();
    if required > available {
        return Err(PixelGuardError::Capacity {
            required,
            available,
        });
    }

    let payload = payload_bits(identifier);
    let bits: Vec<u8> = payload
        .iter()
        .copied()
        .cycle()
        .take(payload.len() * strength as usize)
        .collect();

    let mut output = image.clone();
    for (sample, &bit) in output.samples_mut().iter_mut().zip(&bits) {
        *sample = (*sample & 0xFE) | bit;
    }

    info!(
        width = image.width(),
        height = image.height(),
        strength,
        bits = bits.len(),
        "Embedded watermark"
    );

    Ok(EmbeddedWatermark {
        image: output,
        bits,
    })
}

/// Recover an embedded identifier from the first [`EXTRACTION_SCAN_LIMIT`] samples.
///
/// Undecodable bytes are dropped and scanning continues; running out of the
/// window without seeing the delimiter yields [`ExtractionResult::unknown`].
pub fn extract(image: &PixelBuffer) -> ExtractionResult {
    let window = image.len().min(EXTRACTION_SCAN_LIMIT);
    let lsbs: Vec<u8> = image.samples()[..window].iter().map(|s| s & 1).collect();

    let mut decoder = ByteDecoder::new();
    let mut decoded = String::new();
    let mut skipped = 0usize;

    for chunk in lsbs.chunks_exact(8) {
        match decoder.push(bits_to_byte(chunk)) {
            DecodeStep::Char(c) => {
                decoded.push(c);
                if decoded.ends_with(DELIMITER) {
                    decoded.truncate(decoded.len() - DELIMITER.len());
                    debug!(chars = decoded.chars().count(), skipped, "Delimiter found");
                    return ExtractionResult::found(decoded);
                }
            }
            DecodeStep::Incomplete => {}
            DecodeStep::Skipped => skipped += 1,
        }
    }

    debug!(window, skipped, "No delimiter inside scan window");
    ExtractionResult::unknown()
}
