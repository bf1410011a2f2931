#![no_main]

//! Fuzz target for watermark extraction
//!
//! Arbitrary sample bytes are treated as a one-row RGB image. Extraction and
//! classification must be total: no panics, confidence always within 0..=100.
//!
//! Run with: cargo +nightly fuzz run fuzz_extract

use libfuzzer_sys::fuzz_target;
use pixelguard_core::{classify, extract, PixelBuffer};

fuzz_target!(|data: &[u8]| {
    let width = (data.len() / 3) as u32;
    if width == 0 {
        return;
    }
    let samples = data[..width as usize * 3].to_vec();
    if let Ok(image) = PixelBuffer::new(width, 1, samples) {
        let extraction = extract(&image);
        let verdict = classify(&extraction, None);
        assert!(verdict.confidence <= 100);
    }
});
