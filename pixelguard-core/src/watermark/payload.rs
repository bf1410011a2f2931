//! Payload serialization for the LSB channel.
//!
//! A payload is the UTF-8 identifier followed by the 4-byte delimiter `@@@@`.
//! Each byte becomes 8 bits, most-significant bit first. On the way back,
//! bytes are fed one at a time through [`ByteDecoder`], which reports whether
//! a byte completed a character, needs more bytes, or had to be dropped.

/// Delimiter terminating every embedded payload.
pub const DELIMITER: &str = "@@@@";

/// Serialize `identifier + DELIMITER` into bits (each element 0 or 1).
pub fn payload_bits(identifier: &str) -> Vec<u8> {
    identifier
        .as_bytes()
        .iter()
        .chain(DELIMITER.as_bytes())
        .flat_map(|&byte| byte_to_bits(byte))
        .collect()
}

/// Split a byte into 8 bits, MSB first.
pub fn byte_to_bits(byte: u8) -> [u8; 8] {
    let mut bits = [0u8; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (byte >> (7 - i)) & 1;
    }
    bits
}

/// Pack up to 8 bits (MSB first) into a byte. Only the low bit of each input is used.
pub fn bits_to_byte(bits: &[u8]) -> u8 {
    bits.iter().fold(0u8, |acc, &bit| (acc << 1) | (bit & 1))
}

/// Outcome of feeding one byte to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
    /// The byte completed a character.
    Char(char),
    /// The byte started or continued a multi-byte sequence.
    Incomplete,
    /// The byte (and any pending prefix) could not form a character and was dropped.
    Skipped,
}

/// Incremental UTF-8 decoder over a byte stream.
#[derive(Debug, Default)]
pub struct ByteDecoder {
    pending: Vec<u8>,
}

impl ByteDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> DecodeStep {
        self.pending.push(byte);

        match std::str::from_utf8(&self.pending) {
            Ok(s) => {
                let step = s.chars().next().map_or(DecodeStep::Skipped, DecodeStep::Char);
                self.pending.clear();
                step
            }
            Err(e) if e.error_len().is_none() => DecodeStep::Incomplete,
            Err(_) => {
                // A broken sequence drops its prefix; the current byte may still
                // start a fresh character.
                let restart = self.pending.len() > 1;
                self.pending.clear();
                if restart {
                    match self.push(byte) {
                        DecodeStep::Char(c) => DecodeStep::Char(c),
                        _ => DecodeStep::Skipped,
                    }
                } else {
                    DecodeStep::Skipped
                }
            }
        }
    }
}
