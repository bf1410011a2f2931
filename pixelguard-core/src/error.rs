use thiserror::Error;

#[derive(Error, Debug)]
pub enum PixelGuardError {
    #[error("Watermark capacity exceeded: need {required} bits but image only has {available} samples")]
    Capacity { required: usize, available: usize },

    #[error("Invalid strength {0}: must be between 1 and 10")]
    InvalidStrength(u32),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid epsilon {0}: must be finite and non-negative")]
    InvalidEpsilon(f32),

    #[error("Model inference error: {0}")]
    ModelInference(String),

    #[error("Tensor shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        actual: [usize; 3],
    },

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, PixelGuardError>;
