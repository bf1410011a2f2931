//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

use pixelguard_core::PixelGuardError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid strength, epsilon or identifier).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (capacity exceeded, no watermark, already watermarked).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file or record.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Classifier failure during protection.
/// Maps to EX_SOFTWARE from sysexits.h.
pub const MODEL_ERROR: i32 = 70;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Typed engine errors first, then classify by inspecting the chain
        let code = match err.chain().find_map(|e| e.downcast_ref::<PixelGuardError>()) {
            Some(PixelGuardError::Capacity { .. }) | Some(PixelGuardError::InvalidImage(_)) => {
                DATA_ERROR
            }
            Some(PixelGuardError::InvalidStrength(_))
            | Some(PixelGuardError::InvalidEpsilon(_))
            | Some(PixelGuardError::InvalidIdentifier(_)) => USAGE_ERROR,
            Some(PixelGuardError::ModelInference(_))
            | Some(PixelGuardError::ShapeMismatch { .. }) => MODEL_ERROR,
            _ if message.contains("Failed to read") || message.contains("not found") => {
                INPUT_ERROR
            }
            _ if message.contains("No watermark")
                || message.contains("already contains a watermark")
                || message.contains("too large") =>
            {
                DATA_ERROR
            }
            _ if message.contains("Failed to write") => IO_ERROR,
            _ => GENERAL_ERROR,
        };

        Self {
            code,
            message: Some(message),
        }
    }
}
