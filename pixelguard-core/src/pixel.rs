//! In-memory RGB raster.
//!
//! [`PixelBuffer`] is the only image representation the engine works on.
//! Samples are stored row-major as `(row, col, channel)` with channels in
//! R, G, B order, so the flattened sample order used by the watermark codec
//! is simply the order of the backing vector.

use crate::error::{PixelGuardError, Result};

/// Number of channels per pixel (R, G, B).
pub const CHANNELS: usize = 3;

/// A decoded RGB image, `height * width * 3` unsigned 8-bit samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw row-major RGB samples.
    ///
    /// Fails if either dimension is zero or the sample count does not equal
    /// `width * height * 3`.
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PixelGuardError::InvalidImage(format!(
                "dimensions must be non-zero, got {width}x{height}"
            )));
        }

        let expected = sample_count(width, height);
        if samples.len() != expected {
            return Err(PixelGuardError::InvalidImage(format!(
                "expected {expected} samples for {width}x{height}, got {}",
                samples.len()
            )));
        }

        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Create a buffer filled with a single colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self> {
        let samples = rgb
            .iter()
            .copied()
            .cycle()
            .take(sample_count(width, height))
            .collect();
        Self::new(width, height, samples)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Flattened samples in `(row, col, channel)` order.
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    /// Number of samples, which is also the LSB capacity in bits.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([
            self.samples[idx],
            self.samples[idx + 1],
            self.samples[idx + 2],
        ])
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }
}

fn sample_count(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}

mod image_io {
    use image::{DynamicImage, RgbImage};

    use super::PixelBuffer;
    use crate::error::{PixelGuardError, Result};

    impl PixelBuffer {
        /// Convert any decoded image to RGB8, dropping alpha and metadata.
        pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
            Self::try_from(image.to_rgb8())
        }

        /// Decode PNG/JPEG bytes into a pixel buffer.
        pub fn decode(bytes: &[u8]) -> Result<Self> {
            let image = image::load_from_memory(bytes)
                .map_err(|e| PixelGuardError::InvalidImage(format!("Failed to decode image: {e}")))?;
            Self::from_dynamic(&image)
        }

        pub fn to_rgb_image(&self) -> RgbImage {
            // Dimensions and length were validated on construction.
            RgbImage::from_raw(self.width, self.height, self.samples.clone())
                .unwrap_or_else(|| RgbImage::new(self.width, self.height))
        }
    }

    impl TryFrom<RgbImage> for PixelBuffer {
        type Error = PixelGuardError;

        fn try_from(image: RgbImage) -> Result<Self> {
            let (width, height) = image.dimensions();
            PixelBuffer::new(width, height, image.into_raw())
        }
    }
}
