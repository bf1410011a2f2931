//! Invisible ownership watermark carried in pixel least-significant bits.
//!
//! # Components
//!
//! - **Payload**: identifier + `@@@@` delimiter, serialized MSB-first, and the
//!   incremental decoder used on the way back.
//! - **Codec**: [`embed`] writes the payload `strength` times into sample LSBs;
//!   [`extract`] scans a bounded window for the first delimiter.
//!
//! The scheme is a fixed-pattern LSB embed. It does not survive lossy
//! re-encoding and offers no resistance to deliberate removal.

pub mod codec;
pub mod payload;

pub use codec::{
    embed, extract, required_bits, EmbeddedWatermark, ExtractionResult, EXTRACTION_SCAN_LIMIT,
    FOUND_MATCH_RATIO, MAX_STRENGTH, MIN_STRENGTH, NOT_FOUND_MATCH_RATIO, UNKNOWN_TEXT,
};
pub use payload::{ByteDecoder, DecodeStep, DELIMITER};
