#![no_main]

//! Fuzz target for LinearClassifier::from_cbor()
//!
//! Malformed model files must be rejected with an error, never a panic.
//!
//! Run with: cargo +nightly fuzz run fuzz_model_cbor

use libfuzzer_sys::fuzz_target;
use pixelguard_core::LinearClassifier;

fuzz_target!(|data: &[u8]| {
    let _ = LinearClassifier::from_cbor(data);
});
